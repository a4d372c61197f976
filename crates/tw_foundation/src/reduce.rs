// crates/tw_foundation/src/reduce.rs

//! 并行归约用的原子浮点工具
//!
//! 波速最大值、单元尺寸最小值这类归约在并行循环里通过
//! `f64::to_bits` 映射到 `AtomicU64` 完成。非负 f64 的位模式
//! 与数值同序，因此 `fetch_max`/`fetch_min` 直接可用。
//! 两个类型都只接受非负输入。

use std::sync::atomic::{AtomicU64, Ordering};

/// 非负 f64 的原子最大值收集器
#[derive(Debug)]
pub struct AtomicF64Max {
    bits: AtomicU64,
}

impl AtomicF64Max {
    /// 创建收集器，初始值为 0
    pub fn new() -> Self {
        Self {
            bits: AtomicU64::new(0u64),
        }
    }

    /// 提交一个候选值
    ///
    /// 负值或 NaN 被忽略。
    #[inline]
    pub fn update(&self, value: f64) {
        if value >= 0.0 {
            self.bits.fetch_max(value.to_bits(), Ordering::Relaxed);
        }
    }

    /// 读出当前最大值
    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

impl Default for AtomicF64Max {
    fn default() -> Self {
        Self::new()
    }
}

/// 非负 f64 的原子最小值收集器
#[derive(Debug)]
pub struct AtomicF64Min {
    bits: AtomicU64,
}

impl AtomicF64Min {
    /// 创建收集器，初始值为 `f64::MAX`
    pub fn new() -> Self {
        Self {
            bits: AtomicU64::new(f64::MAX.to_bits()),
        }
    }

    /// 提交一个候选值
    ///
    /// 负值或 NaN 被忽略。
    #[inline]
    pub fn update(&self, value: f64) {
        if value >= 0.0 {
            self.bits.fetch_min(value.to_bits(), Ordering::Relaxed);
        }
    }

    /// 读出当前最小值
    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

impl Default for AtomicF64Min {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_collector() {
        let m = AtomicF64Max::new();
        for v in [0.5, 2.0, 1.5] {
            m.update(v);
        }
        assert_eq!(m.get(), 2.0);
    }

    #[test]
    fn test_min_collector() {
        let m = AtomicF64Min::new();
        for v in [0.5, 2.0, 1.5] {
            m.update(v);
        }
        assert_eq!(m.get(), 0.5);
    }

    #[test]
    fn test_ignores_negative() {
        let m = AtomicF64Max::new();
        m.update(-3.0);
        assert_eq!(m.get(), 0.0);
    }
}
