//! 慢动作惩罚
//!
//! 失误时把全局时间倍率降为慢速，按真实时间计时，到期后恢复初始化时记录的正常倍率。
//! 已处于慢动作时再次触发不会重置计时。

use gametime::TimeSpan;

use tracing::info;

use crate::time::{TimeScaleController, saturating_add, saturating_sub};

/// 慢动作状态
#[derive(Debug, Clone, PartialEq)]
pub struct SlowMotion {
    /// 是否处于慢动作
    active: bool,
    /// 已持续的真实时间
    elapsed: TimeSpan,
    /// 正常倍率（引擎初始化时记录）
    normal_scale: f32,
    /// 慢动作倍率
    slow_scale: f32,
    /// 持续时长
    duration: TimeSpan,
}

impl SlowMotion {
    /// 创建未激活的慢动作状态
    #[must_use]
    pub const fn new(normal_scale: f32, slow_scale: f32, duration: TimeSpan) -> Self {
        Self {
            active: false,
            elapsed: TimeSpan::ZERO,
            normal_scale,
            slow_scale,
            duration,
        }
    }

    /// 触发慢动作，返回本次是否真正开始
    pub fn trigger<T>(&mut self, time_scale: &mut T) -> bool
    where
        T: TimeScaleController + ?Sized,
    {
        if self.active {
            return false;
        }
        time_scale.set_multiplier(self.slow_scale);
        self.active = true;
        self.elapsed = TimeSpan::ZERO;
        info!(scale = self.slow_scale, "触发慢动作");
        true
    }

    /// 以真实时间推进，返回本帧是否结束了慢动作
    pub fn advance<T>(&mut self, unscaled_delta: TimeSpan, time_scale: &mut T) -> bool
    where
        T: TimeScaleController + ?Sized,
    {
        if !self.active {
            return false;
        }
        self.elapsed = saturating_add(self.elapsed, unscaled_delta.max(TimeSpan::ZERO));
        if self.elapsed < self.duration {
            return false;
        }
        time_scale.set_multiplier(self.normal_scale);
        self.active = false;
        self.elapsed = TimeSpan::ZERO;
        info!("慢动作结束");
        true
    }

    /// 清除状态，不改动倍率
    pub const fn reset(&mut self) {
        self.active = false;
        self.elapsed = TimeSpan::ZERO;
    }

    /// 暂停恢复时应使用的倍率
    #[must_use]
    pub const fn resume_scale(&self) -> f32 {
        if self.active {
            self.slow_scale
        } else {
            self.normal_scale
        }
    }

    /// 是否处于慢动作
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// 已持续的真实时间
    #[must_use]
    pub const fn elapsed(&self) -> TimeSpan {
        self.elapsed
    }

    /// 剩余时长占比，未激活时为 0
    #[must_use]
    pub fn remaining_ratio(&self) -> f32 {
        if !self.active || self.duration <= TimeSpan::ZERO {
            return 0.0;
        }
        let left = saturating_sub(self.duration, self.elapsed);
        (left.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0)
    }

    /// 正常倍率
    #[must_use]
    pub const fn normal_scale(&self) -> f32 {
        self.normal_scale
    }

    /// 慢动作倍率
    #[must_use]
    pub const fn slow_scale(&self) -> f32 {
        self.slow_scale
    }

    /// 持续时长
    #[must_use]
    pub const fn duration(&self) -> TimeSpan {
        self.duration
    }
}
