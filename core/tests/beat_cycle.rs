//! 节拍循环的端到端测试：以固定帧长推进真实时间

use gametime::TimeSpan;
use beat_lanes::engine::{BeatState, BeatTimingEngine, EngineConfig, ReactionOutcome};
use beat_lanes::grade::Grade;
use beat_lanes::lane::{Lane, PerLane};
use beat_lanes::presenter::{LaneBoard, LaneSlot, Palette};
use beat_lanes::time::{GameClock, TimeScaleController};

const MS: TimeSpan = TimeSpan::MILLISECOND;
const FRAME: TimeSpan = TimeSpan::new(10_000_000);

struct Harness {
    engine: BeatTimingEngine<LaneBoard, GameClock>,
    /// 已推进的帧数
    frames: u32,
}

impl Harness {
    fn new(config: EngineConfig) -> Self {
        let board = LaneBoard::new(
            PerLane::new(
                Some(LaneSlot::default_for(Lane::A)),
                Some(LaneSlot::default_for(Lane::D)),
            ),
            config.palette.normal,
        );
        let mut engine = BeatTimingEngine::new(config, board, GameClock::new(1.0));
        engine.start(TimeSpan::ZERO);
        Self { engine, frames: 0 }
    }

    fn step(&mut self) -> Option<ReactionOutcome> {
        self.frames += 1;
        let frame = self.engine.time_scale_mut().tick(FRAME);
        self.engine.update(frame)
    }

    /// 推进到第 `frame` 帧（含）
    fn step_to(&mut self, frame: u32) {
        while self.frames < frame {
            self.step();
        }
    }

    fn press(&mut self, lane: Lane) -> Option<ReactionOutcome> {
        let now = self.engine.time_scale().now();
        self.engine.key_down(lane, now)
    }
}

#[test]
fn test_next_beat_waits_real_interval_under_slow_motion() {
    let mut h = Harness::new(EngineConfig::default());
    h.step();
    assert_eq!(
        h.press(Lane::D),
        Some(ReactionOutcome::WrongKey { pressed: Lane::D })
    );
    assert!(h.engine.slow_motion().is_active());

    // 按键发生在真实 10ms，下一拍在真实 10 + 100 + 900 = 1010ms 开始
    h.step_to(100);
    assert_eq!(h.engine.beat_counter(), 1);
    assert_eq!(h.engine.state(), BeatState::Cooldown);
    h.step();
    assert_eq!(h.engine.beat_counter(), 2);
    assert_eq!(h.engine.expected_lane(), Some(Lane::D));
    // 慢动作仍未结束
    assert!(h.engine.slow_motion().is_active());
}

#[test]
fn test_missed_beat_slows_time_for_real_duration() {
    let mut h = Harness::new(EngineConfig::default());
    let mut missed_at = None;
    while missed_at.is_none() {
        if h.step() == Some(ReactionOutcome::Missed) {
            missed_at = Some(h.frames);
        }
    }
    // 游戏时间 410ms 时首次超过 400ms 窗口
    assert_eq!(missed_at, Some(41));
    assert!((h.engine.time_scale().multiplier() - 0.3).abs() < f32::EPSILON);

    // 第二拍在真实 410 + 1000ms 开始，此时慢动作仍在进行
    h.step_to(141);
    assert_eq!(h.engine.beat_counter(), 2);
    h.step();
    let elapsed = h.engine.slow_motion().elapsed();
    assert_eq!(
        h.press(Lane::A),
        Some(ReactionOutcome::WrongKey { pressed: Lane::A })
    );
    // 慢动作中再次失误不会重新计时
    assert_eq!(h.engine.slow_motion().elapsed(), elapsed);

    h.step_to(190);
    assert!(h.engine.slow_motion().is_active());
    h.step();
    assert!(!h.engine.slow_motion().is_active());
    assert!((h.engine.time_scale().multiplier() - 1.0).abs() < f32::EPSILON);
}

#[test]
fn test_success_window_edges() {
    let mut h = Harness::new(EngineConfig::default());
    h.step_to(39);
    let outcome = h.press(Lane::A);
    assert_eq!(
        outcome,
        Some(ReactionOutcome::Success {
            response: MS * 390,
            grade: Grade::Good,
        })
    );

    let mut h = Harness::new(EngineConfig::default());
    h.step_to(40);
    // 恰好 400ms 仍在窗口内
    assert_eq!(
        h.press(Lane::A).map(|o| o.is_failure()),
        Some(false)
    );
}

#[test]
fn test_settle_resets_lane_colors() {
    let palette = Palette::default();
    let mut h = Harness::new(EngineConfig::default());
    assert_eq!(h.engine.presenter().color(Lane::A), Some(palette.highlight));
    h.step_to(5);
    h.press(Lane::A);
    assert_eq!(h.engine.presenter().color(Lane::A), Some(palette.success));
    // 0.1s 复位先于 0.2s 的反馈回退
    h.step_to(14);
    assert_eq!(h.engine.presenter().color(Lane::A), Some(palette.success));
    assert!(h.engine.presenter().has_pending_revert(Lane::A));
    h.step_to(15);
    assert_eq!(h.engine.presenter().color(Lane::A), Some(palette.normal));
    assert!(!h.engine.presenter().has_pending_revert(Lane::A));
    // 下一拍高亮 D
    h.step_to(105);
    assert_eq!(h.engine.presenter().color(Lane::D), Some(palette.highlight));
    assert_eq!(h.engine.presenter().color(Lane::A), Some(palette.normal));
}

#[test]
fn test_lanes_alternate_and_grades_accumulate() {
    let mut h = Harness::new(EngineConfig::default());
    let mut seen = Vec::new();
    for _ in 0..6 {
        let beat_start = h.frames;
        let Some(lane) = h.engine.expected_lane() else {
            panic!("没有当前节拍");
        };
        seen.push(lane);
        h.step_to(beat_start + 15);
        let outcome = h.press(lane);
        assert!(matches!(
            outcome,
            Some(ReactionOutcome::Success {
                grade: Grade::Perfect,
                ..
            })
        ));
        let counter = h.engine.beat_counter();
        while h.engine.beat_counter() == counter {
            h.step();
        }
    }
    assert_eq!(
        seen,
        vec![Lane::A, Lane::D, Lane::A, Lane::D, Lane::A, Lane::D]
    );
    assert_eq!(h.engine.scoreboard().count(Grade::Perfect), 6);
    assert_eq!(h.engine.scoreboard().best_streak(), 6);
}

#[test]
fn test_restart_cancels_pending_beat() {
    let mut h = Harness::new(EngineConfig::default());
    h.step_to(5);
    h.press(Lane::D);
    h.step_to(20);
    assert!(h.engine.has_pending_beat());
    let now = h.engine.time_scale().now();
    h.engine.restart(now);
    assert!(!h.engine.has_pending_beat());
    assert_eq!(h.engine.beat_counter(), 1);
    assert!((h.engine.time_scale().multiplier() - 1.0).abs() < f32::EPSILON);

    // 旧的拍间延时原定在第 105 帧开始下一拍
    h.step_to(110);
    assert_eq!(h.engine.beat_counter(), 1);
    assert_eq!(h.engine.last_outcome(), Some(ReactionOutcome::Missed));
}

#[test]
fn test_interval_shorter_than_settle_starts_next_beat_after_settle() {
    let config = EngineConfig {
        beat_interval: MS * 50,
        ..EngineConfig::default()
    };
    let mut h = Harness::new(config);
    h.step();
    assert!(h.press(Lane::A).is_some());
    // 剩余间隔截为零，复位后立即开始下一拍：按键后恰好 10 帧
    h.step_to(10);
    assert_eq!(h.engine.beat_counter(), 1);
    assert_eq!(h.engine.state(), BeatState::Cooldown);
    h.step();
    assert_eq!(h.engine.beat_counter(), 2);
    assert_eq!(h.engine.expected_lane(), Some(Lane::D));
    assert!(!h.engine.has_pending_beat());
}

#[test]
fn test_zero_success_window_misses_on_first_advancing_frame() {
    let config = EngineConfig {
        success_window: TimeSpan::ZERO,
        ..EngineConfig::default()
    };
    let mut h = Harness::new(config.clone());
    // 时间没有前进时按键仍算成功
    assert_eq!(
        h.press(Lane::A),
        Some(ReactionOutcome::Success {
            response: TimeSpan::ZERO,
            grade: Grade::Lightning,
        })
    );

    let mut h = Harness::new(config);
    assert_eq!(h.step(), Some(ReactionOutcome::Missed));
    assert!(h.engine.slow_motion().is_active());
    assert_eq!(h.engine.scoreboard().misses(), 1);
}
