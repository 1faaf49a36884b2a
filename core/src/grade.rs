//! 反应时间评级
//!
//! 仅用于展示与统计，不影响节拍状态。阈值为开区间上界：
//! `< 0.1s`、`< 0.2s`、`< 0.3s`，其余（包括超过 0.3s 的成功）为最低档。

use std::fmt;
use gametime::TimeSpan;

/// 各档评级的上界（不含）
const TIER_BOUNDS: [TimeSpan; 3] = [
    TimeSpan::new(100_000_000),
    TimeSpan::new(200_000_000),
    TimeSpan::new(300_000_000),
];

/// 成功按键的评级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Grade {
    /// 闪电般（< 0.1s）
    Lightning,
    /// 完美（< 0.2s）
    Perfect,
    /// 很好（< 0.3s）
    Great,
    /// 不错（其余）
    Good,
}

impl Grade {
    /// 全部评级，从快到慢
    pub const ALL: [Self; 4] = [Self::Lightning, Self::Perfect, Self::Great, Self::Good];

    /// 根据反应时间评级
    #[must_use]
    pub fn from_response(response: TimeSpan) -> Self {
        match TIER_BOUNDS.iter().position(|bound| response < *bound) {
            Some(0) => Self::Lightning,
            Some(1) => Self::Perfect,
            Some(2) => Self::Great,
            _ => Self::Good,
        }
    }

    /// 档位编号，1 为最快
    #[must_use]
    pub const fn tier(self) -> u8 {
        match self {
            Self::Lightning => 1,
            Self::Perfect => 2,
            Self::Great => 3,
            Self::Good => 4,
        }
    }

    /// 在 [`Grade::ALL`] 中的下标
    #[must_use]
    pub const fn index(self) -> usize {
        self.tier() as usize - 1
    }

    /// 展示用文本
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Lightning => "闪电般！⚡",
            Self::Perfect => "完美！⭐⭐⭐",
            Self::Great => "很好！⭐⭐",
            Self::Good => "不错！⭐",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_boundaries() {
        assert_eq!(Grade::from_response(TimeSpan::MICROSECOND * 99_900).tier(), 1);
        assert_eq!(Grade::from_response(TimeSpan::MILLISECOND * 100).tier(), 2);
        assert_eq!(Grade::from_response(TimeSpan::MILLISECOND * 200).tier(), 3);
        assert_eq!(Grade::from_response(TimeSpan::MILLISECOND * 300).tier(), 4);
    }

    #[test]
    fn test_grade_is_monotonic() {
        let mut last = Grade::Lightning;
        for ms in 0..1000 {
            let g = Grade::from_response(TimeSpan::MILLISECOND * ms);
            assert!(g >= last, "{ms}ms 的评级不应快于更短反应时间");
            last = g;
        }
        assert_eq!(last, Grade::Good);
    }

    #[test]
    fn test_grade_zero_is_fastest() {
        assert_eq!(Grade::from_response(TimeSpan::ZERO), Grade::Lightning);
    }
}
