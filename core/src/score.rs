//! 本局统计

use crate::engine::ReactionOutcome;
use crate::grade::Grade;

/// 本局计分板，`restart` 时清零
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scoreboard {
    /// 各评级的成功次数，按 [`Grade::ALL`] 排列
    grades: [u32; 4],
    /// 按错键次数
    wrong_keys: u32,
    /// 错过次数
    misses: u32,
    /// 非等待状态下的按键次数
    stray_presses: u32,
    /// 当前连击
    streak: u32,
    /// 最高连击
    best_streak: u32,
}

impl Scoreboard {
    /// 记录一次节拍结果
    pub fn record(&mut self, outcome: &ReactionOutcome) {
        match outcome {
            ReactionOutcome::Success { grade, .. } => {
                if let Some(n) = self.grades.get_mut(grade.index()) {
                    *n = n.saturating_add(1);
                }
                self.streak = self.streak.saturating_add(1);
                self.best_streak = self.best_streak.max(self.streak);
            }
            ReactionOutcome::WrongKey { .. } => {
                self.wrong_keys = self.wrong_keys.saturating_add(1);
                self.streak = 0;
            }
            ReactionOutcome::Missed => {
                self.misses = self.misses.saturating_add(1);
                self.streak = 0;
            }
        }
    }

    /// 记录一次多余按键（不影响连击）
    pub const fn record_stray(&mut self) {
        self.stray_presses = self.stray_presses.saturating_add(1);
    }

    /// 清零
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// 指定评级的次数
    #[must_use]
    pub fn count(&self, grade: Grade) -> u32 {
        self.grades.get(grade.index()).copied().unwrap_or(0)
    }

    /// 成功总数
    #[must_use]
    pub fn successes(&self) -> u32 {
        self.grades.iter().sum()
    }

    /// 已结束的节拍数
    #[must_use]
    pub fn judged(&self) -> u32 {
        self.successes() + self.wrong_keys + self.misses
    }

    /// 按错键次数
    #[must_use]
    pub const fn wrong_keys(&self) -> u32 {
        self.wrong_keys
    }

    /// 错过次数
    #[must_use]
    pub const fn misses(&self) -> u32 {
        self.misses
    }

    /// 多余按键次数
    #[must_use]
    pub const fn stray_presses(&self) -> u32 {
        self.stray_presses
    }

    /// 当前连击
    #[must_use]
    pub const fn streak(&self) -> u32 {
        self.streak
    }

    /// 最高连击
    #[must_use]
    pub const fn best_streak(&self) -> u32 {
        self.best_streak
    }

    /// 成功率，尚无结果时为 0
    #[must_use]
    pub fn accuracy(&self) -> f32 {
        let judged = self.judged();
        if judged == 0 {
            return 0.0;
        }
        self.successes() as f32 / judged as f32
    }
}
