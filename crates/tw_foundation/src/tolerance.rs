// crates/tw_foundation/src/tolerance.rs

//! 浮点容差
//!
//! 整个求解器共用一个基准容差 [`EQUALITY_TOLERANCE`]。
//! 派生容差按倍数构造，如特征分解校验用 `100 * EQUALITY_TOLERANCE`，
//! 重心坐标包含性判断直接用基准值。

/// 基准相等容差
pub const EQUALITY_TOLERANCE: f64 = 1e-9;

/// 近似相等判断
///
/// 小量用绝对容差，大量退化为相对容差，避免对 1e6 量级的
/// 应力分量做绝对比较。
#[inline]
pub fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
    let scale = 1.0_f64.max(a.abs()).max(b.abs());
    (a - b).abs() <= tolerance * scale
}

/// 近似为零判断（绝对容差）
#[inline]
pub fn approx_zero(a: f64, tolerance: f64) -> bool {
    a.abs() <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approx_eq_small() {
        assert!(approx_eq(1.0, 1.0 + 1e-12, EQUALITY_TOLERANCE));
        assert!(!approx_eq(1.0, 1.0 + 1e-6, EQUALITY_TOLERANCE));
    }

    #[test]
    fn test_approx_eq_relative() {
        // 大量级下退化为相对比较
        assert!(approx_eq(1e9, 1e9 + 0.5, EQUALITY_TOLERANCE));
    }

    #[test]
    fn test_approx_zero() {
        assert!(approx_zero(1e-12, EQUALITY_TOLERANCE));
        assert!(!approx_zero(1e-3, EQUALITY_TOLERANCE));
    }
}
