//! 节拍计时引擎
//!
//! - A/D 交替出拍，每拍在成功窗口内等待按键
//! - 按对键为成功并评级；按错键或超时为失误，触发慢动作
//! - 每拍结束后经过两段延时（0.1s 复位 + 剩余间隔）再开始下一拍，
//!   延时按真实时间计算，不受慢动作倍率影响
//!
//! 引擎每帧由 [`BeatTimingEngine::update`] 驱动，按键事件经
//! [`BeatTimingEngine::key_down`] 送入。

use gametime::TimeSpan;
use tracing::{info, warn};

use crate::grade::Grade;
use crate::lane::Lane;
use crate::presenter::{Color, Palette, Presenter};
use crate::scheduler::Scheduler;
use crate::score::Scoreboard;
use crate::slow_motion::SlowMotion;
use crate::time::{FrameTick, TimeScaleController, saturating_add, saturating_sub};

/// 一拍结束后先复位颜色的固定延时
pub const SETTLE_DELAY: TimeSpan = TimeSpan::new(100_000_000);

/// 引擎参数，初始化后不再改变
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// 节拍间隔
    pub beat_interval: TimeSpan,
    /// 成功窗口
    pub success_window: TimeSpan,
    /// 高亮持续时间（保留项，不参与计时）
    pub highlight_duration: TimeSpan,
    /// 成功/失误反馈的显示时长
    pub feedback_duration: TimeSpan,
    /// 慢动作持续时长（真实时间）
    pub slow_motion_duration: TimeSpan,
    /// 慢动作倍率
    pub slow_motion_scale: f32,
    /// 无限循环；关闭时第一拍结束后停止
    pub infinite_loop: bool,
    /// 配色
    pub palette: Palette,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            beat_interval: TimeSpan::MILLISECOND * 1000,
            success_window: TimeSpan::MILLISECOND * 400,
            highlight_duration: TimeSpan::MILLISECOND * 800,
            feedback_duration: TimeSpan::MILLISECOND * 200,
            slow_motion_duration: TimeSpan::MILLISECOND * 1500,
            slow_motion_scale: 0.3,
            infinite_loop: true,
            palette: Palette::default(),
        }
    }
}

/// 节拍状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeatState {
    /// 尚未开始
    Idle,
    /// 等待玩家按键
    AwaitingInput,
    /// 两拍之间的间隔
    Cooldown,
    /// 非循环模式下序列已结束
    Stopped,
}

/// 一拍的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionOutcome {
    /// 按对键
    Success {
        /// 反应时间
        response: TimeSpan,
        /// 评级
        grade: Grade,
    },
    /// 按错键
    WrongKey {
        /// 实际按下的轨道
        pressed: Lane,
    },
    /// 超出成功窗口
    Missed,
}

impl ReactionOutcome {
    /// 是否为失误（触发慢动作）
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        !matches!(self, Self::Success { .. })
    }
}

/// 当前节拍
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeatCycle {
    /// 节拍序号，从 0 开始
    pub index: u64,
    /// 期望轨道
    pub expected: Lane,
    /// 开始时刻（游戏时间）
    pub started_at: TimeSpan,
    /// 是否仍在等待按键
    pub awaiting_input: bool,
}

/// 拍间延时的两个阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BeatPhase {
    /// 复位所有轨道颜色
    Settle,
    /// 开始下一拍或结束序列
    Next,
}

/// 节拍计时引擎
pub struct BeatTimingEngine<P, T> {
    /// 参数
    config: EngineConfig,
    /// 视觉反馈
    presenter: P,
    /// 全局时间倍率
    time_scale: T,
    /// 慢动作
    slow_motion: SlowMotion,
    /// 已开始的节拍数
    beat_counter: u64,
    /// 当前节拍
    current: Option<BeatCycle>,
    /// 节拍状态
    state: BeatState,
    /// 是否暂停（只由 `toggle_pause` 与 `restart` 改变）
    paused: bool,
    /// 拍间延时（真实时间）
    pending: Scheduler<BeatPhase>,
    /// 最近一帧的游戏时间
    now: TimeSpan,
    /// 最近一次节拍结果
    last_outcome: Option<ReactionOutcome>,
    /// 本局统计
    scoreboard: Scoreboard,
}

impl<P, T> BeatTimingEngine<P, T>
where
    P: Presenter,
    T: TimeScaleController,
{
    /// 创建引擎；正常倍率在此刻从 `time_scale` 读取一次
    pub fn new(config: EngineConfig, presenter: P, time_scale: T) -> Self {
        let slow_motion = SlowMotion::new(
            time_scale.multiplier(),
            config.slow_motion_scale,
            config.slow_motion_duration,
        );
        Self {
            config,
            presenter,
            time_scale,
            slow_motion,
            beat_counter: 0,
            current: None,
            state: BeatState::Idle,
            paused: false,
            pending: Scheduler::new(),
            now: TimeSpan::ZERO,
            last_outcome: None,
            scoreboard: Scoreboard::default(),
        }
    }

    /// 开始第一拍
    pub fn start(&mut self, now: TimeSpan) {
        self.now = now;
        self.set_all_lanes(self.config.palette.normal);
        self.start_next_beat();
        info!(
            infinite = self.config.infinite_loop,
            "节奏游戏开始！A-D 交替"
        );
    }

    /// 推进一帧，返回本帧因超时产生的结果
    pub fn update(&mut self, frame: FrameTick) -> Option<ReactionOutcome> {
        self.now = frame.now;
        self.presenter.advance(frame.delta);
        if !self.paused {
            self.slow_motion
                .advance(frame.unscaled_delta, &mut self.time_scale);
            self.advance_pending(frame.unscaled_delta);
        }
        self.tick(frame.now)
    }

    /// 检查成功窗口，超时则以错过结束当前拍
    pub fn tick(&mut self, now: TimeSpan) -> Option<ReactionOutcome> {
        self.now = self.now.max(now);
        let beat = self.awaiting_beat()?;
        let elapsed = saturating_sub(now, beat.started_at);
        if elapsed <= self.config.success_window {
            return None;
        }
        warn!(
            beat = beat.index,
            elapsed_ms = elapsed.as_millis(),
            "错过节拍！"
        );
        self.end_beat(ReactionOutcome::Missed);
        Some(ReactionOutcome::Missed)
    }

    /// 处理按键按下
    ///
    /// 返回这次按键产生的结果；不在等待状态的按键只给出失误颜色反馈，返回 `None`。
    /// 暂停时照常判定，反应时间按冻结的游戏时间计算。
    pub fn key_down(&mut self, lane: Lane, now: TimeSpan) -> Option<ReactionOutcome> {
        // 同一帧内超时先于按键结算
        self.tick(now);
        let Some(beat) = self.awaiting_beat() else {
            warn!(%lane, state = ?self.state, "不在等待输入状态时按下了按键");
            let palette = self.config.palette;
            self.presenter.show_transient_feedback(
                lane,
                palette.miss,
                palette.normal,
                self.config.feedback_duration,
            );
            self.scoreboard.record_stray();
            return None;
        };
        let response = saturating_sub(now, beat.started_at);
        let outcome = if lane == beat.expected {
            let grade = Grade::from_response(response);
            info!(
                beat = beat.index,
                %lane,
                response_ms = response.as_millis(),
                "✅ {} 成功！",
                grade
            );
            ReactionOutcome::Success { response, grade }
        } else {
            warn!(
                beat = beat.index,
                expected = %beat.expected,
                pressed = %lane,
                "❌ 按错了！"
            );
            ReactionOutcome::WrongKey { pressed: lane }
        };
        self.end_beat(outcome);
        Some(outcome)
    }

    /// 重新开始：取消拍间延时，清空慢动作与统计，立即开始第 0 拍
    pub fn restart(&mut self, now: TimeSpan) {
        self.pending.clear();
        self.paused = false;
        self.beat_counter = 0;
        self.current = None;
        self.last_outcome = None;
        self.time_scale.set_multiplier(self.slow_motion.normal_scale());
        self.slow_motion.reset();
        self.scoreboard.reset();
        self.set_all_lanes(self.config.palette.normal);
        self.now = now;
        self.start_next_beat();
        info!("游戏重新开始！");
    }

    /// 切换暂停，返回切换后是否处于暂停
    ///
    /// 暂停期间游戏时间冻结，慢动作与拍间延时都停止计时。
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        if self.paused {
            self.time_scale.set_multiplier(0.0);
            info!("游戏暂停");
        } else {
            let scale = self.slow_motion.resume_scale();
            self.time_scale.set_multiplier(scale);
            info!(scale, "游戏继续");
        }
        self.paused
    }

    /// 是否暂停
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// 节拍状态
    #[must_use]
    pub const fn state(&self) -> BeatState {
        self.state
    }

    /// 当前节拍
    #[must_use]
    pub const fn current_beat(&self) -> Option<&BeatCycle> {
        self.current.as_ref()
    }

    /// 当前节拍期望的轨道
    #[must_use]
    pub fn expected_lane(&self) -> Option<Lane> {
        self.current.map(|b| b.expected)
    }

    /// 是否在等待按键
    #[must_use]
    pub fn awaiting_input(&self) -> bool {
        self.awaiting_beat().is_some()
    }

    /// 已开始的节拍数
    #[must_use]
    pub const fn beat_counter(&self) -> u64 {
        self.beat_counter
    }

    /// 最近一次节拍结果
    #[must_use]
    pub const fn last_outcome(&self) -> Option<ReactionOutcome> {
        self.last_outcome
    }

    /// 是否有尚未执行的拍间延时
    #[must_use]
    pub fn has_pending_beat(&self) -> bool {
        !self.pending.is_empty()
    }

    /// 慢动作状态
    #[must_use]
    pub const fn slow_motion(&self) -> &SlowMotion {
        &self.slow_motion
    }

    /// 本局统计
    #[must_use]
    pub const fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    /// 参数
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 视觉反馈实现
    #[must_use]
    pub const fn presenter(&self) -> &P {
        &self.presenter
    }

    /// 可变的视觉反馈实现
    pub const fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    /// 时间倍率控制
    #[must_use]
    pub const fn time_scale(&self) -> &T {
        &self.time_scale
    }

    /// 可变的时间倍率控制（宿主用它推进时钟）
    pub const fn time_scale_mut(&mut self) -> &mut T {
        &mut self.time_scale
    }

    fn awaiting_beat(&self) -> Option<BeatCycle> {
        self.current.filter(|b| b.awaiting_input)
    }

    fn start_next_beat(&mut self) {
        let index = self.beat_counter;
        let expected = Lane::for_beat(index);
        self.current = Some(BeatCycle {
            index,
            expected,
            started_at: self.now,
            awaiting_input: true,
        });
        self.state = BeatState::AwaitingInput;
        info!(
            beat = index,
            %expected,
            start_s = self.now.as_secs_f32(),
            "节拍开始"
        );
        self.presenter
            .set_lane_color(expected, self.config.palette.highlight);
        self.beat_counter = self.beat_counter.saturating_add(1);
    }

    fn end_beat(&mut self, outcome: ReactionOutcome) {
        let Some(beat) = self.current.as_mut() else {
            return;
        };
        beat.awaiting_input = false;
        let expected = beat.expected;
        let palette = self.config.palette;
        let color = if outcome.is_failure() {
            palette.miss
        } else {
            palette.success
        };
        self.presenter.show_transient_feedback(
            expected,
            color,
            palette.normal,
            self.config.feedback_duration,
        );
        if outcome.is_failure()
            && self.slow_motion.trigger(&mut self.time_scale)
            && self.paused
        {
            // 暂停中触发的慢动作等到继续时才生效
            self.time_scale.set_multiplier(0.0);
        }
        self.scoreboard.record(&outcome);
        self.last_outcome = Some(outcome);
        self.state = BeatState::Cooldown;
        self.pending.schedule_after(SETTLE_DELAY, BeatPhase::Settle);
    }

    fn advance_pending(&mut self, unscaled_delta: TimeSpan) {
        self.pending.advance(unscaled_delta);
        while let Some(fired) = self.pending.pop_due() {
            match fired.payload {
                BeatPhase::Settle => {
                    self.set_all_lanes(self.config.palette.normal);
                    let rest = saturating_sub(self.config.beat_interval, SETTLE_DELAY);
                    self.pending
                        .schedule_at(saturating_add(fired.due, rest), BeatPhase::Next);
                }
                BeatPhase::Next => {
                    if self.config.infinite_loop {
                        self.start_next_beat();
                    } else {
                        self.state = BeatState::Stopped;
                        let s = &self.scoreboard;
                        info!(
                            successes = s.successes(),
                            wrong_keys = s.wrong_keys(),
                            misses = s.misses(),
                            best_streak = s.best_streak(),
                            "节奏序列结束！"
                        );
                    }
                }
            }
        }
    }

    fn set_all_lanes(&mut self, color: Color) {
        for lane in Lane::ALL {
            self.presenter.set_lane_color(lane, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::GameClock;

    const MS: TimeSpan = TimeSpan::MILLISECOND;

    /// 记录所有视觉调用
    #[derive(Default)]
    struct Recorder {
        calls: Vec<(Lane, Color, bool)>,
    }

    impl Presenter for Recorder {
        fn set_lane_color(&mut self, lane: Lane, color: Color) {
            self.calls.push((lane, color, false));
        }

        fn show_transient_feedback(
            &mut self,
            lane: Lane,
            color: Color,
            _neutral: Color,
            _duration: TimeSpan,
        ) {
            self.calls.push((lane, color, true));
        }
    }

    fn engine() -> BeatTimingEngine<Recorder, GameClock> {
        let mut e = BeatTimingEngine::new(
            EngineConfig::default(),
            Recorder::default(),
            GameClock::new(1.0),
        );
        e.start(TimeSpan::ZERO);
        e
    }

    #[test]
    fn test_start_highlights_lane_a() {
        let e = engine();
        assert_eq!(e.state(), BeatState::AwaitingInput);
        assert_eq!(e.expected_lane(), Some(Lane::A));
        assert_eq!(e.beat_counter(), 1);
        let palette = Palette::default();
        assert_eq!(
            e.presenter().calls.last(),
            Some(&(Lane::A, palette.highlight, false))
        );
    }

    #[test]
    fn test_correct_key_is_success() {
        let mut e = engine();
        let outcome = e.key_down(Lane::A, MS * 50);
        assert_eq!(
            outcome,
            Some(ReactionOutcome::Success {
                response: MS * 50,
                grade: Grade::Lightning,
            })
        );
        assert!(!e.awaiting_input());
        assert!(!e.slow_motion().is_active());
        assert_eq!(e.state(), BeatState::Cooldown);
    }

    #[test]
    fn test_wrong_key_triggers_slow_motion_once() {
        let mut e = engine();
        let outcome = e.key_down(Lane::D, MS * 100);
        assert_eq!(outcome, Some(ReactionOutcome::WrongKey { pressed: Lane::D }));
        assert!(e.slow_motion().is_active());
        assert!((e.time_scale().multiplier() - 0.3).abs() < f32::EPSILON);
        // 同一拍不会产生第二个结果
        assert_eq!(e.key_down(Lane::A, MS * 120), None);
        assert_eq!(e.scoreboard().judged(), 1);
        assert_eq!(e.scoreboard().stray_presses(), 1);
    }

    #[test]
    fn test_timeout_is_missed() {
        let mut e = engine();
        assert_eq!(e.tick(MS * 400), None);
        assert_eq!(e.tick(MS * 401), Some(ReactionOutcome::Missed));
        assert!(e.slow_motion().is_active());
        assert_eq!(e.tick(MS * 900), None);
    }

    #[test]
    fn test_late_press_sees_missed_first() {
        let mut e = engine();
        assert_eq!(e.key_down(Lane::A, MS * 450), None);
        assert_eq!(e.last_outcome(), Some(ReactionOutcome::Missed));
        assert_eq!(e.scoreboard().misses(), 1);
        assert_eq!(e.scoreboard().successes(), 0);
    }

    #[test]
    fn test_stray_press_does_not_consume_beat() {
        let mut e = engine();
        e.key_down(Lane::A, MS * 10);
        let counter = e.beat_counter();
        assert_eq!(e.key_down(Lane::D, MS * 20), None);
        assert_eq!(e.beat_counter(), counter);
        assert_eq!(e.state(), BeatState::Cooldown);
        let palette = Palette::default();
        assert_eq!(
            e.presenter().calls.last(),
            Some(&(Lane::D, palette.miss, true))
        );
    }

    fn run_frames(e: &mut BeatTimingEngine<Recorder, GameClock>, frames: u32) {
        for _ in 0..frames {
            let frame = e.time_scale_mut().tick(MS * 10);
            e.update(frame);
        }
    }

    #[test]
    fn test_pause_toggle_restores_slow_scale() {
        let mut e = engine();
        e.key_down(Lane::D, MS * 10);
        assert!(e.toggle_pause());
        assert!(e.is_paused());
        assert!(e.time_scale().multiplier().abs() < f32::EPSILON);
        assert!(!e.toggle_pause());
        assert!(!e.is_paused());
        assert!((e.time_scale().multiplier() - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn test_paused_freezes_countdowns() {
        let mut e = engine();
        e.key_down(Lane::D, MS * 10);
        e.toggle_pause();
        run_frames(&mut e, 500);
        assert!(e.slow_motion().is_active());
        assert_eq!(e.slow_motion().elapsed(), TimeSpan::ZERO);
        assert_eq!(e.state(), BeatState::Cooldown);
        assert_eq!(e.beat_counter(), 1);
    }

    #[test]
    fn test_paused_press_is_judged_at_frozen_time() {
        let mut e = engine();
        run_frames(&mut e, 5);
        e.toggle_pause();
        run_frames(&mut e, 100);
        let now = e.time_scale().now();
        assert_eq!(now, MS * 50);
        assert_eq!(
            e.key_down(Lane::A, now),
            Some(ReactionOutcome::Success {
                response: MS * 50,
                grade: Grade::Lightning,
            })
        );
        assert!(e.is_paused());
        // 暂停期间拍间延时不推进
        run_frames(&mut e, 200);
        assert_eq!(e.beat_counter(), 1);
        e.toggle_pause();
        run_frames(&mut e, 100);
        assert_eq!(e.beat_counter(), 2);
    }

    #[test]
    fn test_paused_wrong_key_keeps_time_frozen() {
        let mut e = engine();
        e.toggle_pause();
        let outcome = e.key_down(Lane::D, TimeSpan::ZERO);
        assert_eq!(outcome, Some(ReactionOutcome::WrongKey { pressed: Lane::D }));
        assert!(e.slow_motion().is_active());
        assert!(e.time_scale().multiplier().abs() < f32::EPSILON);
        // 继续后才进入慢动作倍率
        e.toggle_pause();
        assert!((e.time_scale().multiplier() - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn test_zero_slow_motion_scale_does_not_lock_game() {
        let config = EngineConfig {
            slow_motion_scale: 0.0,
            ..EngineConfig::default()
        };
        let mut e = BeatTimingEngine::new(config, Recorder::default(), GameClock::new(1.0));
        e.start(TimeSpan::ZERO);
        e.key_down(Lane::D, TimeSpan::ZERO);
        assert!(e.slow_motion().is_active());
        assert!(!e.is_paused());
        // 慢动作按真实时间在 1.5s 结束，下一拍在 1s 照常开始
        run_frames(&mut e, 160);
        assert!(!e.slow_motion().is_active());
        assert_eq!(e.beat_counter(), 2);
        assert!(e.awaiting_input());
        assert!((e.time_scale().multiplier() - 1.0).abs() < f32::EPSILON);
        run_frames(&mut e, 840);
        assert!(e.beat_counter() >= 3);
    }

    #[test]
    fn test_restart_from_any_state() {
        let mut e = engine();
        e.key_down(Lane::D, MS * 10);
        e.toggle_pause();
        e.restart(MS * 20);
        assert!(!e.is_paused());
        assert!(e.awaiting_input());
        assert_eq!(e.current_beat().map(|b| b.index), Some(0));
        assert_eq!(e.expected_lane(), Some(Lane::A));
        assert!(!e.slow_motion().is_active());
        assert!((e.time_scale().multiplier() - 1.0).abs() < f32::EPSILON);
        assert!(!e.has_pending_beat());
        assert_eq!(e.scoreboard().judged(), 0);
    }

    #[test]
    fn test_finite_mode_stops_after_first_beat() {
        let config = EngineConfig {
            infinite_loop: false,
            ..EngineConfig::default()
        };
        let mut e = BeatTimingEngine::new(config, Recorder::default(), GameClock::new(1.0));
        e.start(TimeSpan::ZERO);
        e.key_down(Lane::A, MS * 10);
        run_frames(&mut e, 200);
        assert_eq!(e.state(), BeatState::Stopped);
        assert_eq!(e.beat_counter(), 1);
        assert!(!e.has_pending_beat());
    }
}
