//! 程序入口模块

use std::sync::mpsc;

use tracing::warn;

use crate::Instance;
use crate::loops::{VisualMsg, visual};

/// 视觉应用：负责驱动渲染器与处理视觉消息
pub struct VisualApp {
    /// 绑定到窗口表面的渲染器
    window_renderer: visual::Renderer,
    /// 视觉消息接收端
    visual_rx: mpsc::Receiver<VisualMsg>,
    /// 最新一帧的实例列表
    latest_instances: Vec<Instance>,
}

impl VisualApp {
    /// 创建视觉应用
    #[must_use]
    pub const fn new(
        window_renderer: visual::Renderer,
        visual_rx: mpsc::Receiver<VisualMsg>,
    ) -> Self {
        Self {
            window_renderer,
            visual_rx,
            latest_instances: Vec::new(),
        }
    }

    /// 处理窗口大小变化
    pub fn resize(&mut self, width: u32, height: u32) {
        self.window_renderer.resize(width, height);
    }

    /// 执行一次渲染：只保留最新一帧实例并绘制
    pub fn redraw(&mut self) {
        while let Ok(msg) = self.visual_rx.try_recv() {
            match msg {
                VisualMsg::Instances(instances) => {
                    self.latest_instances = instances;
                }
            }
        }

        if let Err(e) = self.window_renderer.draw(&self.latest_instances) {
            warn!(error = %e, "绘制失败，跳过本帧");
        }
    }
}
