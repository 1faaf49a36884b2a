//! # Beat Lanes - winit 平台实现
//!
//! 提供 winit 窗口系统与事件循环的桌面平台实现

#![cfg(not(target_arch = "wasm32"))]

mod app;

use std::sync::mpsc;

use anyhow::Result;
use tracing::warn;
use winit::keyboard::KeyCode;

use beat_lanes::loops::{ControlMsg, RawInputMsg, VisualMsg};

/// 将配置文件中的按键代码字符串转换为 `winit::KeyCode`
///
/// 借用 `KeyCode` 的 serde 实现，名称与 `Debug` 输出一致（如 `KeyA`、`Space`）
fn parse_key_code(s: &str) -> Option<KeyCode> {
    serde_json::from_value::<KeyCode>(serde_json::Value::String(s.to_owned())).ok()
}

/// 运行 winit 事件循环并驱动渲染与输入分发
///
/// # 参数
///
/// - `control_tx`：启动/退出控制消息发送端
/// - `raw_input_tx`：原始输入消息发送端
/// - `visual_rx`：视觉消息接收端
/// - `key_codes`：按键代码字符串列表（从配置文件读取），无效名称会被跳过
///
/// # Errors
///
/// - winit 事件循环创建失败
pub fn run(
    control_tx: mpsc::SyncSender<ControlMsg>,
    raw_input_tx: mpsc::SyncSender<RawInputMsg>,
    visual_rx: mpsc::Receiver<VisualMsg>,
    key_codes: Vec<String>,
) -> Result<()> {
    let mut parsed_codes = Vec::new();
    for code_str in key_codes {
        match parse_key_code(&code_str) {
            Some(code) => parsed_codes.push((code, code_str)),
            None => warn!("无效的按键代码: {}", code_str),
        }
    }

    app::run_internal(control_tx, raw_input_tx, visual_rx, parsed_codes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_code() {
        assert_eq!(parse_key_code("KeyA"), Some(KeyCode::KeyA));
        assert_eq!(parse_key_code("Space"), Some(KeyCode::Space));
        assert_eq!(parse_key_code("NotAKey"), None);
    }
}
