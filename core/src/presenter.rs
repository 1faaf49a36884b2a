//! 视觉反馈接口与按键面板
//!
//! 引擎只通过 [`Presenter`] 描述"某轨道应显示什么颜色"，
//! [`LaneBoard`] 是基于矩形实例的默认实现。

use gametime::TimeSpan;
use serde::Deserialize;
use tracing::error;

use crate::Instance;
use crate::lane::{Lane, PerLane};
use crate::scheduler::{Scheduler, TaskToken};

/// RGBA 颜色
pub type Color = [f32; 4];

/// 反馈配色
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Palette {
    /// 常态颜色
    pub normal: Color,
    /// 期望按键高亮颜色
    pub highlight: Color,
    /// 成功颜色
    pub success: Color,
    /// 失误颜色
    pub miss: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            normal: [0.5, 0.5, 0.5, 1.0],
            highlight: [1.0, 1.0, 1.0, 1.0],
            success: [0.0, 1.0, 0.0, 1.0],
            miss: [1.0, 0.0, 0.0, 1.0],
        }
    }
}

/// 视觉反馈接口
pub trait Presenter {
    /// 直接设置轨道颜色，并取消该轨道尚未执行的回退
    fn set_lane_color(&mut self, lane: Lane, color: Color);

    /// 显示 `duration` 后回退到 `neutral` 的临时颜色，覆盖该轨道尚未执行的回退
    fn show_transient_feedback(
        &mut self,
        lane: Lane,
        color: Color,
        neutral: Color,
        duration: TimeSpan,
    );

    /// 每帧推进（游戏时间）
    fn advance(&mut self, delta: TimeSpan) {
        let _ = delta;
    }
}

/// 按键在屏幕上的摆放（以屏幕中心为原点的像素坐标）
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LaneSlot {
    /// 中心坐标
    pub position: [f32; 2],
    /// 尺寸
    #[serde(default = "default_slot_size")]
    pub size: [f32; 2],
}

const fn default_slot_size() -> [f32; 2] {
    [96.0, 96.0]
}

impl LaneSlot {
    /// 默认摆放：A 在左，D 在右
    #[must_use]
    pub const fn default_for(lane: Lane) -> Self {
        let x = match lane {
            Lane::A => -80.0,
            Lane::D => 80.0,
        };
        Self {
            position: [x, 0.0],
            size: default_slot_size(),
        }
    }
}

/// 已绑定的按键视觉
#[derive(Debug, Clone, Copy)]
struct LaneVisual {
    slot: LaneSlot,
    color: Color,
}

/// 双轨按键面板
///
/// 未绑定的轨道跳过所有视觉调用，不影响计时逻辑。
pub struct LaneBoard {
    /// 轨道视觉，`None` 为未绑定
    lanes: PerLane<Option<LaneVisual>>,
    /// 颜色回退任务
    reverts: Scheduler<(Lane, Color)>,
    /// 各轨道当前有效的回退令牌
    pending: PerLane<Option<TaskToken>>,
}

impl LaneBoard {
    /// 创建面板，所有已绑定轨道以 `initial` 颜色显示
    #[must_use]
    pub fn new(slots: PerLane<Option<LaneSlot>>, initial: Color) -> Self {
        for lane in Lane::ALL {
            if slots.get(lane).is_none() {
                error!(%lane, "轨道没有绑定视觉，跳过该轨道的显示");
            }
        }
        let bind = |slot: Option<LaneSlot>| {
            slot.map(|slot| LaneVisual {
                slot,
                color: initial,
            })
        };
        Self {
            lanes: PerLane::new(bind(slots.a), bind(slots.d)),
            reverts: Scheduler::new(),
            pending: PerLane::default(),
        }
    }

    /// 轨道当前颜色，未绑定时为 `None`
    #[must_use]
    pub fn color(&self, lane: Lane) -> Option<Color> {
        self.lanes.get(lane).map(|v| v.color)
    }

    /// 轨道是否已绑定
    #[must_use]
    pub const fn is_bound(&self, lane: Lane) -> bool {
        self.lanes.get(lane).is_some()
    }

    /// 轨道是否有尚未执行的颜色回退
    #[must_use]
    pub const fn has_pending_revert(&self, lane: Lane) -> bool {
        self.pending.get(lane).is_some()
    }

    /// 追加已绑定轨道的矩形实例
    pub fn extend_instances(&self, out: &mut Vec<Instance>) {
        for lane in Lane::ALL {
            if let Some(v) = self.lanes.get(lane) {
                out.push(Instance::new(v.slot.position, v.slot.size, v.color));
            }
        }
    }

    fn cancel_revert(&mut self, lane: Lane) {
        if let Some(token) = self.pending.get_mut(lane).take() {
            self.reverts.cancel(token);
        }
    }

    fn paint(&mut self, lane: Lane, color: Color) {
        if let Some(v) = self.lanes.get_mut(lane) {
            v.color = color;
        }
    }
}

impl Presenter for LaneBoard {
    fn set_lane_color(&mut self, lane: Lane, color: Color) {
        self.cancel_revert(lane);
        self.paint(lane, color);
    }

    fn show_transient_feedback(
        &mut self,
        lane: Lane,
        color: Color,
        neutral: Color,
        duration: TimeSpan,
    ) {
        self.cancel_revert(lane);
        if !self.is_bound(lane) {
            return;
        }
        self.paint(lane, color);
        let token = self.reverts.schedule_after(duration, (lane, neutral));
        *self.pending.get_mut(lane) = Some(token);
    }

    fn advance(&mut self, delta: TimeSpan) {
        self.reverts.advance(delta);
        while let Some(fired) = self.reverts.pop_due() {
            let (lane, neutral) = fired.payload;
            let slot = self.pending.get_mut(lane);
            if *slot == Some(fired.token) {
                *slot = None;
            }
            self.paint(lane, neutral);
        }
    }
}
