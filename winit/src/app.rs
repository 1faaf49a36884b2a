//! winit 窗口与事件循环入口

#![cfg(not(target_arch = "wasm32"))]
use std::{collections::HashMap, sync::mpsc};

use anyhow::Result;
use tracing::{error, info};
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowId,
};

use beat_lanes::entry::VisualApp;
use beat_lanes::loops::{ControlMsg, KeyState, RawInputMsg, RawKeyCode, VisualMsg, visual};

/// 视觉应用状态
///
/// `app` 持有引用窗口的表面，必须先于 `window` 析构
struct App {
    /// 视觉渲染应用
    app: VisualApp,
    /// 窗口实例
    window: winit::window::Window,
}

/// 视觉事件处理器
struct Handler {
    /// 可选的视觉应用状态
    app: Option<App>,
    /// 视觉消息接收端
    visual_rx: Option<mpsc::Receiver<VisualMsg>>,
    /// 控制消息发送端
    control_tx: mpsc::SyncSender<ControlMsg>,
    /// 原始输入消息发送端
    raw_input_tx: mpsc::SyncSender<RawInputMsg>,
    /// 已配置的按键及其配置名称
    key_names: HashMap<KeyCode, String>,
}

impl Handler {
    /// 创建视觉事件处理器
    fn new(
        control_tx: mpsc::SyncSender<ControlMsg>,
        raw_input_tx: mpsc::SyncSender<RawInputMsg>,
        visual_rx: mpsc::Receiver<VisualMsg>,
        key_codes: Vec<(KeyCode, String)>,
    ) -> Self {
        Self {
            app: None,
            visual_rx: Some(visual_rx),
            control_tx,
            raw_input_tx,
            key_names: key_codes.into_iter().collect(),
        }
    }

    /// 通知主循环退出并结束事件循环
    fn quit(&mut self, event_loop: &ActiveEventLoop) {
        info!("退出");
        let _ = self.control_tx.try_send(ControlMsg::Quit);
        self.app = None;
        event_loop.exit();
    }
}

impl ApplicationHandler for Handler {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.app.is_some() {
            return;
        }
        let attrs = winit::window::Window::default_attributes()
            .with_title("Beat Lanes")
            .with_inner_size(LogicalSize::new(
                f64::from(visual::WINDOW_WIDTH),
                f64::from(visual::WINDOW_HEIGHT),
            ));
        let window = match event_loop.create_window(attrs) {
            Ok(w) => w,
            Err(e) => {
                error!(error = %e, "创建窗口失败");
                event_loop.exit();
                return;
            }
        };

        let size = window.inner_size();
        let renderer = match visual::init_gpu(&window, (size.width, size.height))
            .and_then(visual::Renderer::new)
        {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, "初始化渲染器失败");
                self.quit(event_loop);
                return;
            }
        };

        let Some(rx) = self.visual_rx.take() else {
            return;
        };
        self.app = Some(App {
            app: VisualApp::new(renderer, rx),
            window,
        });
        let _ = self.control_tx.try_send(ControlMsg::Start);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.quit(event_loop),
            WindowEvent::Resized(size) => {
                if let Some(app) = self.app.as_mut() {
                    app.app.resize(size.width, size.height);
                    app.window.request_redraw();
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };
                if code == KeyCode::Escape && event.state == ElementState::Pressed {
                    self.quit(event_loop);
                    return;
                }
                // 长按产生的重复事件不算新的按键
                if event.repeat {
                    return;
                }
                let Some(name) = self.key_names.get(&code) else {
                    return;
                };
                let state = match event.state {
                    ElementState::Pressed => KeyState::Pressed,
                    ElementState::Released => KeyState::Released,
                };
                let _ = self.raw_input_tx.try_send(RawInputMsg::Key {
                    code: RawKeyCode(name.clone()),
                    state,
                });
            }
            WindowEvent::RedrawRequested => {
                if let Some(app) = self.app.as_mut() {
                    app.app.redraw();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(app) = self.app.as_mut() {
            app.window.request_redraw();
        }
    }
}

/// 运行 winit 事件循环并驱动渲染与输入分发（内部实现）
pub fn run_internal(
    control_tx: mpsc::SyncSender<ControlMsg>,
    raw_input_tx: mpsc::SyncSender<RawInputMsg>,
    visual_rx: mpsc::Receiver<VisualMsg>,
    key_codes: Vec<(KeyCode, String)>,
) -> Result<()> {
    let event_loop = EventLoop::new()?;
    let mut handler = Handler::new(control_tx, raw_input_tx, visual_rx, key_codes);
    event_loop.run_app(&mut handler)?;
    Ok(())
}
