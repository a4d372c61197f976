// crates/tw_linal/src/ops.rs

//! 矩阵补充运算
//!
//! nalgebra 没有直接提供、但特征步与分解校验需要的几个运算。

use nalgebra::{SMatrix, SVector};
use tw_foundation::tolerance::approx_eq;

/// 对称矩阵压缩存储索引
///
/// 上三角按行主序压缩：`(i, j) -> i*d - i*(i+1)/2 + j`，`i <= j`。
/// PDE 向量中 σ 分量就按这个顺序排列。
#[inline]
pub fn sym_index(d: usize, i: usize, j: usize) -> usize {
    let (i, j) = if i <= j { (i, j) } else { (j, i) };
    i * d - i * (i + 1) / 2 + j
}

/// `A * B` 的对角线
///
/// 只算对角元，不展开整个乘积。特征步里
/// `diag(U * values)` 每列只需要与自己同号的那一行。
pub fn diagonal_multiply<const N: usize>(
    a: &SMatrix<f64, N, N>,
    b: &SMatrix<f64, N, N>,
) -> SVector<f64, N> {
    let mut ans = SVector::<f64, N>::zeros();
    for i in 0..N {
        let mut acc = 0.0;
        for j in 0..N {
            acc += a[(i, j)] * b[(j, i)];
        }
        ans[i] = acc;
    }
    ans
}

/// 与向量最大范数一致的矩阵范数（最大行和）
pub fn norm_max<const R: usize, const C: usize>(m: &SMatrix<f64, R, C>) -> f64 {
    let mut ans = 0.0_f64;
    for i in 0..R {
        let mut row = 0.0;
        for j in 0..C {
            row += m[(i, j)].abs();
        }
        ans = ans.max(row);
    }
    ans
}

/// 矩阵近似相等
pub fn approx_eq_matrix<const R: usize, const C: usize>(
    a: &SMatrix<f64, R, C>,
    b: &SMatrix<f64, R, C>,
    tolerance: f64,
) -> bool {
    for i in 0..R {
        for j in 0..C {
            if !approx_eq(a[(i, j)], b[(i, j)], tolerance) {
                return false;
            }
        }
    }
    true
}

/// min-max 限制器
///
/// 把 `u` 的每个分量夹在 `a`、`b` 对应分量张成的区间内。
/// 高阶 Lagrange 模板在间断附近会越界振荡，用包围节点限制。
pub fn clamp_between<const N: usize>(
    u: &SVector<f64, N>,
    a: &SVector<f64, N>,
    b: &SVector<f64, N>,
) -> SVector<f64, N> {
    let mut ans = *u;
    for i in 0..N {
        let lo = a[i].min(b[i]);
        let hi = a[i].max(b[i]);
        ans[i] = ans[i].clamp(lo, hi);
    }
    ans
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{SMatrix, SVector};

    #[test]
    fn test_sym_index_2d() {
        assert_eq!(sym_index(2, 0, 0), 0);
        assert_eq!(sym_index(2, 0, 1), 1);
        assert_eq!(sym_index(2, 1, 0), 1);
        assert_eq!(sym_index(2, 1, 1), 2);
    }

    #[test]
    fn test_sym_index_3d() {
        let expected = [(0, 0, 0), (0, 1, 1), (0, 2, 2), (1, 1, 3), (1, 2, 4), (2, 2, 5)];
        for (i, j, k) in expected {
            assert_eq!(sym_index(3, i, j), k, "({}, {}) 压缩索引错误", i, j);
            assert_eq!(sym_index(3, j, i), k);
        }
    }

    #[test]
    fn test_diagonal_multiply() {
        let a = SMatrix::<f64, 2, 2>::new(1.0, 2.0, 3.0, 4.0);
        let b = SMatrix::<f64, 2, 2>::new(5.0, 6.0, 7.0, 8.0);
        let d = diagonal_multiply(&a, &b);
        let full = a * b;
        assert!((d[0] - full[(0, 0)]).abs() < 1e-14);
        assert!((d[1] - full[(1, 1)]).abs() < 1e-14);
    }

    #[test]
    fn test_norm_max() {
        let m = SMatrix::<f64, 2, 2>::new(1.0, -2.0, 0.5, 0.5);
        assert!((norm_max(&m) - 3.0).abs() < 1e-14);
    }

    #[test]
    fn test_clamp_between() {
        let u = SVector::<f64, 3>::new(-1.0, 0.5, 9.0);
        let a = SVector::<f64, 3>::new(0.0, 0.0, 0.0);
        let b = SVector::<f64, 3>::new(1.0, 1.0, 1.0);
        let c = clamp_between(&u, &a, &b);
        assert_eq!(c[0], 0.0);
        assert_eq!(c[1], 0.5);
        assert_eq!(c[2], 1.0);
    }
}
