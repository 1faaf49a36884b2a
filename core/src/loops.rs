//! 事件循环模块入口
//!
//! 提供三个子模块：
//! - `key_map`：按键映射模块
//! - `main_loop`：节拍推进与事件分发循环
//! - `visual`：事件线程上的渲染循环

pub mod key_map;
pub mod main_loop;
pub mod visual;

use crate::lane::Lane;

/// 控制主循环的消息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMsg {
    /// 触发主循环开始
    Start,
    /// 退出主循环
    Quit,
}

/// 原始按键代码（平台无关表示）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawKeyCode(pub String);

/// 原始按键状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    /// 按键按下
    Pressed,
    /// 按键释放
    Released,
}

/// 原始输入消息（从 winit 传递到 core）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawInputMsg {
    /// 键盘输入事件
    Key {
        /// 按键代码
        code: RawKeyCode,
        /// 按键状态
        state: KeyState,
    },
}

/// 游戏逻辑输入
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMsg {
    /// 某轨道按键按下
    KeyDown(Lane),
    /// 重新开始
    Restart,
    /// 暂停/继续
    TogglePause,
}

/// 视觉循环消息
#[derive(Debug, Clone, PartialEq)]
pub enum VisualMsg {
    /// 更新实例列表
    Instances(Vec<crate::Instance>),
}
