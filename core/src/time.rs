//! 时间缩放与帧时钟
//!
//! - [`TimeScaleController`]：全局时间倍率的读写接口
//! - [`GameClock`]：持有倍率，把未缩放的帧间隔换算为游戏时间
//! - [`FrameTick`]：每帧送入引擎的时钟输入
//!
//! 所有时长均为 [`TimeSpan`]，负值在入口处截为零。

use gametime::TimeSpan;

/// 单帧时钟输入
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTick {
    /// 当前游戏时间（受倍率影响）
    pub now: TimeSpan,
    /// 本帧游戏时间增量
    pub delta: TimeSpan,
    /// 本帧真实时间增量（不受倍率影响）
    pub unscaled_delta: TimeSpan,
}

/// 全局时间倍率控制
pub trait TimeScaleController {
    /// 当前倍率
    fn multiplier(&self) -> f32;

    /// 设置倍率
    fn set_multiplier(&mut self, value: f32);
}

/// 游戏时钟：累计缩放后的游戏时间
#[derive(Debug, Clone)]
pub struct GameClock {
    /// 时间倍率
    multiplier: f32,
    /// 游戏时间
    game_time: TimeSpan,
    /// 真实时间
    real_time: TimeSpan,
}

impl GameClock {
    /// 以给定初始倍率创建时钟
    #[must_use]
    pub const fn new(multiplier: f32) -> Self {
        Self {
            multiplier,
            game_time: TimeSpan::ZERO,
            real_time: TimeSpan::ZERO,
        }
    }

    /// 推进一帧；负的帧间隔按零处理
    pub fn tick(&mut self, unscaled_delta: TimeSpan) -> FrameTick {
        let unscaled_delta = unscaled_delta.max(TimeSpan::ZERO);
        let delta = scale(unscaled_delta, self.multiplier);
        self.game_time = saturating_add(self.game_time, delta);
        self.real_time = saturating_add(self.real_time, unscaled_delta);
        FrameTick {
            now: self.game_time,
            delta,
            unscaled_delta,
        }
    }

    /// 当前游戏时间
    #[must_use]
    pub const fn now(&self) -> TimeSpan {
        self.game_time
    }

    /// 累计真实时间
    #[must_use]
    pub const fn real_time(&self) -> TimeSpan {
        self.real_time
    }
}

impl Default for GameClock {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl TimeScaleController for GameClock {
    fn multiplier(&self) -> f32 {
        self.multiplier
    }

    fn set_multiplier(&mut self, value: f32) {
        self.multiplier = value;
    }
}

/// 溢出时停在 [`TimeSpan::MAX`]
#[must_use]
pub fn saturating_add(a: TimeSpan, b: TimeSpan) -> TimeSpan {
    a.checked_add(b).unwrap_or(TimeSpan::MAX)
}

/// 差值小于零时为零
#[must_use]
pub fn saturating_sub(a: TimeSpan, b: TimeSpan) -> TimeSpan {
    a.checked_sub(b).map_or(TimeSpan::ZERO, |d| d.max(TimeSpan::ZERO))
}

/// 按倍率缩放时长；非正或非有限倍率得到零
#[allow(clippy::cast_precision_loss)]
#[allow(clippy::cast_possible_truncation)]
fn scale(span: TimeSpan, multiplier: f32) -> TimeSpan {
    if !multiplier.is_finite() || multiplier <= 0.0 {
        return TimeSpan::ZERO;
    }
    let nanos = (span.as_nanos() as f64 * f64::from(multiplier)).round();
    if nanos >= i64::MAX as f64 {
        return TimeSpan::MAX;
    }
    TimeSpan::new(nanos as i64)
}
