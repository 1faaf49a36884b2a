//! 系统配置定义与解析

use std::path::Path;

use anyhow::Result;
use gametime::TimeSpan;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

use crate::engine::EngineConfig;
use crate::lane::{Lane, PerLane};
use crate::presenter::{Color, LaneSlot, Palette};

/// 系统运行时配置
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Sys {
    /// 键位映射配置
    pub keys: Keys,
    /// 节奏配置
    pub rhythm: Rhythm,
    /// 反馈配置
    pub feedback: Feedback,
    /// 慢动作配置
    pub slow_motion: SlowMotionCfg,
    /// 按键摆放配置
    pub visual: Visual,
}

/// 键位配置（winit `KeyCode` 名称）
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Keys {
    /// A 轨按键
    pub lane_a: String,
    /// D 轨按键
    pub lane_d: String,
    /// 重新开始
    pub restart: String,
    /// 暂停/继续
    pub pause: String,
}

impl Default for Keys {
    fn default() -> Self {
        Self {
            lane_a: "KeyA".into(),
            lane_d: "KeyD".into(),
            restart: "KeyR".into(),
            pause: "Space".into(),
        }
    }
}

/// 节奏配置
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Rhythm {
    #[serde(rename = "beat_interval_ms", deserialize_with = "de_timespan_ms")]
    /// 节拍间隔
    pub beat_interval: TimeSpan,
    #[serde(rename = "success_window_ms", deserialize_with = "de_timespan_ms")]
    /// 成功窗口
    pub success_window: TimeSpan,
    #[serde(rename = "highlight_duration_ms", deserialize_with = "de_timespan_ms")]
    /// 高亮持续时间
    pub highlight_duration: TimeSpan,
    /// 无限循环模式
    pub infinite_loop: bool,
}

impl Default for Rhythm {
    fn default() -> Self {
        let d = EngineConfig::default();
        Self {
            beat_interval: d.beat_interval,
            success_window: d.success_window,
            highlight_duration: d.highlight_duration,
            infinite_loop: d.infinite_loop,
        }
    }
}

/// 反馈配置
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Feedback {
    #[serde(rename = "display_duration_ms", deserialize_with = "de_timespan_ms")]
    /// 反馈颜色显示时长
    pub display_duration: TimeSpan,
    /// 常态颜色
    pub normal_color: Color,
    /// 高亮颜色
    pub highlight_color: Color,
    /// 成功颜色
    pub success_color: Color,
    /// 失误颜色
    pub miss_color: Color,
}

impl Default for Feedback {
    fn default() -> Self {
        let p = Palette::default();
        Self {
            display_duration: EngineConfig::default().feedback_duration,
            normal_color: p.normal,
            highlight_color: p.highlight,
            success_color: p.success,
            miss_color: p.miss,
        }
    }
}

impl Feedback {
    /// 组装配色
    #[must_use]
    pub const fn palette(&self) -> Palette {
        Palette {
            normal: self.normal_color,
            highlight: self.highlight_color,
            success: self.success_color,
            miss: self.miss_color,
        }
    }
}

/// 慢动作配置
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SlowMotionCfg {
    #[serde(rename = "duration_ms", deserialize_with = "de_timespan_ms")]
    /// 持续时长（真实时间）
    pub duration: TimeSpan,
    /// 慢动作倍率
    pub time_scale: f32,
    /// 启动时的正常倍率
    pub normal_time_scale: f32,
}

impl Default for SlowMotionCfg {
    fn default() -> Self {
        let d = EngineConfig::default();
        Self {
            duration: d.slow_motion_duration,
            time_scale: d.slow_motion_scale,
            normal_time_scale: 1.0,
        }
    }
}

/// 按键摆放配置
///
/// 整个 `[visual]` 表缺省时两轨使用默认摆放；表存在时未写出的轨道视为未绑定。
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Visual {
    /// A 轨
    pub lane_a: Option<LaneSlot>,
    /// D 轨
    pub lane_d: Option<LaneSlot>,
}

impl Default for Visual {
    fn default() -> Self {
        Self {
            lane_a: Some(LaneSlot::default_for(Lane::A)),
            lane_d: Some(LaneSlot::default_for(Lane::D)),
        }
    }
}

impl Visual {
    /// 两轨摆放
    #[must_use]
    pub const fn slots(&self) -> PerLane<Option<LaneSlot>> {
        PerLane::new(self.lane_a, self.lane_d)
    }
}

impl Sys {
    /// 组装引擎参数
    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            beat_interval: self.rhythm.beat_interval,
            success_window: self.rhythm.success_window,
            highlight_duration: self.rhythm.highlight_duration,
            feedback_duration: self.feedback.display_duration,
            slow_motion_duration: self.slow_motion.duration,
            slow_motion_scale: self.slow_motion.time_scale,
            infinite_loop: self.rhythm.infinite_loop,
            palette: self.feedback.palette(),
        }
    }

    /// 按配置顺序列出所有按键代码（用于窗口层过滤）
    #[must_use]
    pub fn key_codes(&self) -> Vec<String> {
        vec![
            self.keys.lane_a.clone(),
            self.keys.lane_d.clone(),
            self.keys.restart.clone(),
            self.keys.pause.clone(),
        ]
    }
}

/// 从 TOML 字符串解析系统配置
///
/// # Errors
///
/// - TOML 解析失败
/// - 配置字段反序列化失败
pub fn parse_sys_str(s: &str) -> Result<Sys> {
    let cfg: Sys = toml::from_str(s)?;
    Ok(cfg)
}

/// 从指定路径加载系统配置（TOML）
///
/// # Errors
///
/// - 读取文件失败
/// - TOML 解析失败
/// - 配置字段反序列化失败
pub fn load_sys(path: &Path) -> Result<Sys> {
    let s = std::fs::read_to_string(path)?;
    parse_sys_str(&s)
}

/// 反序列化毫秒为 `TimeSpan`，拒绝负数与非有限值
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_precision_loss)]
fn de_timespan_ms<'de, D>(deserializer: D) -> Result<TimeSpan, D::Error>
where
    D: Deserializer<'de>,
{
    let ms = f64::deserialize(deserializer)?;
    let nanos = (ms * 1_000_000.0).round();
    if !nanos.is_finite() || nanos < 0.0 || nanos >= i64::MAX as f64 {
        return Err(D::Error::custom(format!("无效的毫秒数: {ms}")));
    }
    Ok(TimeSpan::new(nanos as i64))
}
