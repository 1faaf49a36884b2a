//! 双轨道定义：A 轨与 D 轨交替出拍

use std::fmt;

/// 逻辑轨道
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lane {
    /// 左轨（默认按键 A）
    A,
    /// 右轨（默认按键 D）
    D,
}

impl Lane {
    /// 全部轨道，按显示顺序排列
    pub const ALL: [Self; 2] = [Self::A, Self::D];

    /// 第 `beat_index` 拍期望的轨道：偶数为 A，奇数为 D
    #[must_use]
    pub const fn for_beat(beat_index: u64) -> Self {
        if beat_index % 2 == 0 { Self::A } else { Self::D }
    }

    /// 轨道在 [`Lane::ALL`] 中的下标
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::D => 1,
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => f.write_str("A"),
            Self::D => f.write_str("D"),
        }
    }
}

/// 每条轨道各持有一份的数据
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerLane<T> {
    /// A 轨
    pub a: T,
    /// D 轨
    pub d: T,
}

impl<T> PerLane<T> {
    /// 由两轨数据创建
    pub const fn new(a: T, d: T) -> Self {
        Self { a, d }
    }

    /// 取指定轨道
    pub const fn get(&self, lane: Lane) -> &T {
        match lane {
            Lane::A => &self.a,
            Lane::D => &self.d,
        }
    }

    /// 可变地取指定轨道
    pub const fn get_mut(&mut self, lane: Lane) -> &mut T {
        match lane {
            Lane::A => &mut self.a,
            Lane::D => &mut self.d,
        }
    }
}
