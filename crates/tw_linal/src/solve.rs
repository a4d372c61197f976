// crates/tw_linal/src/solve.rs

//! 小规模线性系统求解
//!
//! 修正器与梯度估计只会遇到 1~9 阶的稠密方阵。
//! 1~3 阶走闭式解，更高阶用部分主元高斯消元。
//! 奇异矩阵返回 `None`，阈值判断留给调用方：
//! 调用方通常先算 [`determinant`] 与自适应阈值比较，
//! 再决定是否求逆（见边界修正器）。

use nalgebra::{SMatrix, SVector};

/// 行列式
///
/// 1~3 阶闭式展开，更高阶通过 LU 分解的主元乘积。
pub fn determinant<const N: usize>(m: &SMatrix<f64, N, N>) -> f64 {
    match N {
        0 => 1.0,
        1 => m[(0, 0)],
        2 => m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)],
        3 => {
            m[(0, 0)] * (m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)])
                - m[(0, 1)] * (m[(1, 0)] * m[(2, 2)] - m[(1, 2)] * m[(2, 0)])
                + m[(0, 2)] * (m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)])
        }
        _ => lu_determinant(m),
    }
}

/// 求逆
///
/// 1~3 阶闭式伴随矩阵，4 阶以上 Gauss-Jordan 部分主元消元。
/// 奇异（主元过小）返回 `None`。
pub fn invert<const N: usize>(m: &SMatrix<f64, N, N>) -> Option<SMatrix<f64, N, N>> {
    match N {
        1 => {
            let d = m[(0, 0)];
            if d == 0.0 || !d.is_finite() {
                return None;
            }
            let mut inv = SMatrix::<f64, N, N>::zeros();
            inv[(0, 0)] = 1.0 / d;
            Some(inv)
        }
        2 => {
            let d = determinant(m);
            if !is_usable_pivot(d, m) {
                return None;
            }
            let mut inv = SMatrix::<f64, N, N>::zeros();
            inv[(0, 0)] = m[(1, 1)] / d;
            inv[(0, 1)] = -m[(0, 1)] / d;
            inv[(1, 0)] = -m[(1, 0)] / d;
            inv[(1, 1)] = m[(0, 0)] / d;
            Some(inv)
        }
        3 => {
            let d = determinant(m);
            if !is_usable_pivot(d, m) {
                return None;
            }
            let mut inv = SMatrix::<f64, N, N>::zeros();
            inv[(0, 0)] = (m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)]) / d;
            inv[(0, 1)] = (m[(0, 2)] * m[(2, 1)] - m[(0, 1)] * m[(2, 2)]) / d;
            inv[(0, 2)] = (m[(0, 1)] * m[(1, 2)] - m[(1, 1)] * m[(0, 2)]) / d;
            inv[(1, 0)] = (m[(1, 2)] * m[(2, 0)] - m[(1, 0)] * m[(2, 2)]) / d;
            inv[(1, 1)] = (m[(0, 0)] * m[(2, 2)] - m[(0, 2)] * m[(2, 0)]) / d;
            inv[(1, 2)] = (m[(0, 2)] * m[(1, 0)] - m[(0, 0)] * m[(1, 2)]) / d;
            inv[(2, 0)] = (m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)]) / d;
            inv[(2, 1)] = (m[(0, 1)] * m[(2, 0)] - m[(0, 0)] * m[(2, 1)]) / d;
            inv[(2, 2)] = (m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)]) / d;
            Some(inv)
        }
        _ => gauss_jordan_invert(m),
    }
}

/// 解线性系统 `A x = b`
///
/// 奇异返回 `None`。
pub fn solve<const N: usize>(
    a: &SMatrix<f64, N, N>,
    b: &SVector<f64, N>,
) -> Option<SVector<f64, N>> {
    let inv = invert(a)?;
    let x = inv * b;
    if x.iter().all(|v| v.is_finite()) {
        Some(x)
    } else {
        None
    }
}

/// 行列式可用性检查：非零、有限，且相对矩阵量级不过分小
#[inline]
fn is_usable_pivot<const N: usize>(det: f64, m: &SMatrix<f64, N, N>) -> bool {
    if det == 0.0 || !det.is_finite() {
        return false;
    }
    let scale: f64 = m.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    // 全零矩阵 scale = 0 已被 det == 0 拦截
    det.abs() > f64::EPSILON * scale.powi(N as i32)
}

/// 部分主元 LU 的主元乘积（带符号）
fn lu_determinant<const N: usize>(m: &SMatrix<f64, N, N>) -> f64 {
    let mut a = *m;
    let mut det = 1.0;
    for k in 0..N {
        // 选列主元
        let mut pivot_row = k;
        let mut pivot_abs = a[(k, k)].abs();
        for i in (k + 1)..N {
            if a[(i, k)].abs() > pivot_abs {
                pivot_abs = a[(i, k)].abs();
                pivot_row = i;
            }
        }
        if pivot_abs == 0.0 {
            return 0.0;
        }
        if pivot_row != k {
            a.swap_rows(pivot_row, k);
            det = -det;
        }
        det *= a[(k, k)];
        for i in (k + 1)..N {
            let factor = a[(i, k)] / a[(k, k)];
            for j in (k + 1)..N {
                a[(i, j)] -= factor * a[(k, j)];
            }
        }
    }
    det
}

/// Gauss-Jordan 部分主元求逆（4 阶以上）
fn gauss_jordan_invert<const N: usize>(
    m: &SMatrix<f64, N, N>,
) -> Option<SMatrix<f64, N, N>> {
    let mut a = *m;
    let mut inv = SMatrix::<f64, N, N>::identity();
    let scale: f64 = m.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if scale == 0.0 {
        return None;
    }
    let pivot_min = f64::EPSILON * scale * N as f64;

    for k in 0..N {
        let mut pivot_row = k;
        let mut pivot_abs = a[(k, k)].abs();
        for i in (k + 1)..N {
            if a[(i, k)].abs() > pivot_abs {
                pivot_abs = a[(i, k)].abs();
                pivot_row = i;
            }
        }
        if pivot_abs <= pivot_min {
            return None;
        }
        if pivot_row != k {
            a.swap_rows(pivot_row, k);
            inv.swap_rows(pivot_row, k);
        }
        let pivot = a[(k, k)];
        for j in 0..N {
            a[(k, j)] /= pivot;
            inv[(k, j)] /= pivot;
        }
        for i in 0..N {
            if i == k {
                continue;
            }
            let factor = a[(i, k)];
            if factor == 0.0 {
                continue;
            }
            for j in 0..N {
                a[(i, j)] -= factor * a[(k, j)];
                inv[(i, j)] -= factor * inv[(k, j)];
            }
        }
    }
    Some(inv)
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{SMatrix, SVector};

    #[test]
    fn test_determinant_closed_forms() {
        let m2 = SMatrix::<f64, 2, 2>::new(1.0, 2.0, 3.0, 4.0);
        assert!((determinant(&m2) - (-2.0)).abs() < 1e-14);

        let m3 = SMatrix::<f64, 3, 3>::new(2.0, 0.0, 1.0, 0.0, 3.0, 0.0, 1.0, 0.0, 2.0);
        assert!((determinant(&m3) - 9.0).abs() < 1e-14);
    }

    #[test]
    fn test_determinant_lu_matches_closed_form() {
        // 5 阶：与按余子式展开过的已知值比较
        let mut m = SMatrix::<f64, 5, 5>::identity();
        m[(0, 0)] = 2.0;
        m[(1, 3)] = 4.0;
        m[(3, 1)] = 1.0;
        m[(4, 4)] = 3.0;
        // det = 2 * (1*1 - 4*1) * 3 = -18
        assert!((determinant(&m) - (-18.0)).abs() < 1e-12);
    }

    #[test]
    fn test_invert_3x3() {
        let m = SMatrix::<f64, 3, 3>::new(2.0, 0.0, 0.0, 0.0, 4.0, 0.0, 1.0, 0.0, 1.0);
        let inv = invert(&m).expect("可逆矩阵求逆失败");
        let prod = m * inv;
        assert!((prod - SMatrix::<f64, 3, 3>::identity()).norm() < 1e-12);
    }

    #[test]
    fn test_invert_singular_returns_none() {
        let m = SMatrix::<f64, 2, 2>::new(1.0, 2.0, 2.0, 4.0);
        assert!(invert(&m).is_none());
    }

    #[test]
    fn test_gauss_jordan_6x6() {
        let mut m = SMatrix::<f64, 6, 6>::identity();
        for i in 0..6 {
            for j in 0..6 {
                m[(i, j)] += 0.1 * ((i * 7 + j * 3) % 5) as f64;
            }
        }
        let inv = invert(&m).expect("满秩矩阵求逆失败");
        let prod = m * inv;
        assert!((prod - SMatrix::<f64, 6, 6>::identity()).norm() < 1e-10);
    }

    #[test]
    fn test_solve() {
        let a = SMatrix::<f64, 2, 2>::new(2.0, 0.0, 0.0, 2.0);
        let b = SVector::<f64, 2>::new(4.0, 6.0);
        let x = solve(&a, &b).unwrap();
        assert!((x[0] - 2.0).abs() < 1e-12);
        assert!((x[1] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_solve_singular() {
        let a = SMatrix::<f64, 3, 3>::zeros();
        let b = SVector::<f64, 3>::new(1.0, 0.0, 0.0);
        assert!(solve(&a, &b).is_none());
    }
}
