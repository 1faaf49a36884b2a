//! 双轨节拍反应游戏核心库
//!
//! A/D 两个按键交替高亮，玩家需在成功窗口内按下对应按键；
//! 按错或超时会触发一段慢动作作为惩罚。

pub mod config;
pub mod engine;
pub mod entry;
pub mod grade;
pub mod lane;
pub mod logging;
pub mod loops;
pub mod presenter;
pub mod scheduler;
pub mod score;
pub mod slow_motion;
pub mod time;

use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Zeroable, Pod)]
/// 单个矩形实例（位置、大小、颜色）
pub struct Instance {
    /// 中心坐标（x, y）
    pos: [f32; 2],
    /// 尺寸（宽, 高）
    size: [f32; 2],
    /// 颜色（RGBA）
    color: [f32; 4],
}

impl Instance {
    /// 创建矩形实例
    #[must_use]
    pub const fn new(pos: [f32; 2], size: [f32; 2], color: [f32; 4]) -> Self {
        Self { pos, size, color }
    }

    /// 颜色
    #[must_use]
    pub const fn color(&self) -> [f32; 4] {
        self.color
    }
}
