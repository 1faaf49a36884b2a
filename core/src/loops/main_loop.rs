//! 主循环：推进节拍引擎并分发事件
//!
//! - 以固定间隔采样真实时间，经 [`GameClock`] 换算为游戏时间后推进引擎
//! - 将原始输入经按键映射转换为游戏输入
//! - 构建视觉实例列表并发送给视觉循环

use std::{
    sync::mpsc,
    thread,
    time::{Duration, Instant},
};

use gametime::{TimeSpan, TimeStamp};
use tracing::{debug, info};

use crate::Instance;
use crate::config::Sys;
use crate::engine::{BeatTimingEngine, ReactionOutcome};
use crate::loops::key_map::KeyMap;
use crate::loops::visual::{WINDOW_HEIGHT, WINDOW_WIDTH};
use crate::loops::{ControlMsg, InputMsg, RawInputMsg, VisualMsg};
use crate::presenter::{Color, LaneBoard};
use crate::time::{GameClock, TimeScaleController};

/// 主循环步长
const TICK: Duration = Duration::from_millis(16);
/// 单帧真实时间增量上限，窗口拖动等卡顿不会一次跨过多个节拍
const MAX_FRAME_DELTA: TimeSpan = TimeSpan::new(250_000_000);

/// 慢动作进度条满长（像素）
const SLOW_BAR_WIDTH: f32 = 240.0;
/// 慢动作进度条高度（像素）
const SLOW_BAR_HEIGHT: f32 = 8.0;
/// 连击点边长（像素）
const PIP_SIZE: f32 = 8.0;
/// 连击点间距（像素）
const PIP_GAP: f32 = 4.0;
/// 最多显示的连击点数
const MAX_PIPS: u32 = 16;
/// 暂停标记颜色
const PAUSE_COLOR: Color = [1.0, 1.0, 1.0, 0.8];

/// 一局游戏：引擎、按键面板与按键映射
pub struct GameSession {
    /// 节拍引擎
    engine: BeatTimingEngine<LaneBoard, GameClock>,
    /// 按键映射
    key_map: KeyMap,
}

impl GameSession {
    /// 按系统配置组装一局游戏
    #[must_use]
    pub fn new(sys: &Sys) -> Self {
        let config = sys.engine_config();
        let board = LaneBoard::new(sys.visual.slots(), config.palette.normal);
        let clock = GameClock::new(sys.slow_motion.normal_time_scale);
        Self {
            engine: BeatTimingEngine::new(config, board, clock),
            key_map: KeyMap::new(&sys.keys),
        }
    }

    /// 开始第一拍
    pub fn start(&mut self) {
        let now = self.engine.time_scale().now();
        self.engine.start(now);
    }

    /// 以真实时间增量推进一帧
    pub fn advance(&mut self, real_delta: TimeSpan) -> Option<ReactionOutcome> {
        let frame = self.engine.time_scale_mut().tick(real_delta);
        self.engine.update(frame)
    }

    /// 处理原始输入，未映射的按键被忽略
    pub fn handle_raw(&mut self, raw: RawInputMsg) -> Option<ReactionOutcome> {
        let input = self.key_map.convert(raw)?;
        self.handle_input(input)
    }

    /// 处理游戏输入，返回按键产生的节拍结果
    pub fn handle_input(&mut self, input: InputMsg) -> Option<ReactionOutcome> {
        let now = self.engine.time_scale().now();
        match input {
            InputMsg::KeyDown(lane) => self.engine.key_down(lane, now),
            InputMsg::Restart => {
                self.engine.restart(now);
                None
            }
            InputMsg::TogglePause => {
                self.engine.toggle_pause();
                None
            }
        }
    }

    /// 节拍引擎
    #[must_use]
    pub const fn engine(&self) -> &BeatTimingEngine<LaneBoard, GameClock> {
        &self.engine
    }

    /// 构建本帧的矩形实例：轨道按键、慢动作进度条、连击点、暂停标记
    #[must_use]
    pub fn instances(&self) -> Vec<Instance> {
        let mut out = Vec::new();
        self.engine.presenter().extend_instances(&mut out);

        let slow = self.engine.slow_motion();
        if slow.is_active() {
            let width = SLOW_BAR_WIDTH * slow.remaining_ratio();
            let y = -WINDOW_HEIGHT / 2.0 + 32.0;
            let left = -SLOW_BAR_WIDTH / 2.0;
            out.push(Instance::new(
                [left + width / 2.0, y],
                [width, SLOW_BAR_HEIGHT],
                self.engine.config().palette.miss,
            ));
        }

        let pips = self.engine.scoreboard().streak().min(MAX_PIPS);
        let success = self.engine.config().palette.success;
        for i in 0..pips {
            #[allow(clippy::cast_precision_loss)]
            let x = -WINDOW_WIDTH / 2.0 + 24.0 + i as f32 * (PIP_SIZE + PIP_GAP);
            out.push(Instance::new(
                [x, WINDOW_HEIGHT / 2.0 - 24.0],
                [PIP_SIZE, PIP_SIZE],
                success,
            ));
        }

        if self.engine.is_paused() {
            for x in [-10.0, 10.0] {
                out.push(Instance::new([x, 100.0], [8.0, 28.0], PAUSE_COLOR));
            }
        }
        out
    }
}

/// 运行主循环
///
/// - `sys`：系统配置
/// - `control_rx`：启动/退出控制消息接收端
/// - `raw_input_rx`：原始输入消息接收端
/// - `visual_tx`：视觉实例帧发送端
///
/// 收到 `Quit` 或任一通道断开时返回。
pub fn run(
    sys: &Sys,
    control_rx: mpsc::Receiver<ControlMsg>,
    raw_input_rx: mpsc::Receiver<RawInputMsg>,
    visual_tx: mpsc::SyncSender<VisualMsg>,
) {
    match control_rx.recv() {
        Ok(ControlMsg::Start) => {}
        Ok(ControlMsg::Quit) | Err(_) => return,
    }
    let mut session = GameSession::new(sys);
    session.start();

    let mut last_sample = TimeStamp::now();
    let mut last_log_sec: i64 = 0;
    let mut frames_this_sec: u32 = 0;
    let mut inputs_this_sec: u32 = 0;
    let mut next_tick = Instant::now();
    'main: loop {
        let Some(t) = next_tick.checked_add(TICK) else {
            next_tick = Instant::now();
            continue;
        };
        next_tick = t;
        let now_instant = Instant::now();
        if let Some(wait) = next_tick.checked_duration_since(now_instant) {
            thread::sleep(wait);
        } else {
            next_tick = now_instant;
        }

        loop {
            match control_rx.try_recv() {
                Ok(ControlMsg::Start) => {}
                Ok(ControlMsg::Quit) | Err(mpsc::TryRecvError::Disconnected) => break 'main,
                Err(mpsc::TryRecvError::Empty) => break,
            }
        }

        let now = TimeStamp::now();
        let real_delta = now
            .checked_elapsed_since(last_sample)
            .unwrap_or(TimeSpan::ZERO)
            .clamp(TimeSpan::ZERO, MAX_FRAME_DELTA);
        last_sample = now;
        session.advance(real_delta);

        loop {
            match raw_input_rx.try_recv() {
                Ok(raw_msg) => {
                    inputs_this_sec = inputs_this_sec.saturating_add(1);
                    session.handle_raw(raw_msg);
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => break 'main,
            }
        }

        let _ = visual_tx.try_send(VisualMsg::Instances(session.instances()));
        frames_this_sec = frames_this_sec.saturating_add(1);

        let sec = session.engine().time_scale().real_time().as_seconds();
        if sec != last_log_sec {
            let engine = session.engine();
            debug!(
                elapsed_sec = sec,
                frames = frames_this_sec,
                inputs = inputs_this_sec,
                beat = engine.beat_counter(),
                state = ?engine.state(),
                scale = engine.time_scale().multiplier(),
                "主循环性能统计"
            );
            frames_this_sec = 0;
            inputs_this_sec = 0;
            last_log_sec = sec;
        }
    }
    let s = session.engine().scoreboard();
    info!(
        successes = s.successes(),
        wrong_keys = s.wrong_keys(),
        misses = s.misses(),
        best_streak = s.best_streak(),
        accuracy = s.accuracy(),
        "主循环退出"
    );
}
