// crates/tw_physics/src/numerics/interpolation.rs

//! 单纯形内插值
//!
//! 线性插值 `Σ λ_i v_i`；带梯度的二次插值
//! `Σ λ_i (v_i + ⟨g_i, q − c_i⟩ / 2)`；以及在过定点集中
//! 搜索包含目标点的单纯形再做线性插值（时空插值用）。
//! 子集尝试顺序是字典序，固定且可复现。

use nalgebra::{SMatrix, SVector};
use tw_foundation::EQUALITY_TOLERANCE;
use tw_linal::geometry::{barycentric_tetrahedron, barycentric_triangle};
use tw_linal::{Real2, Real3};

/// 顶点梯度：每个 PDE 分量一行，每个空间方向一列
pub type PdeGradient<const D: usize, const M: usize> = SMatrix<f64, M, D>;

/// 三角形线性插值
pub fn triangle_linear<const M: usize>(
    c: &[Real2; 3],
    v: &[SVector<f64, M>; 3],
    q: &Real2,
) -> SVector<f64, M> {
    let l = barycentric_triangle(&c[0], &c[1], &c[2], q);
    v[0] * l[0] + v[1] * l[1] + v[2] * l[2]
}

/// 三角形二次插值（值 + 梯度）
pub fn triangle_quadratic<const M: usize>(
    c: &[Real2; 3],
    v: &[SVector<f64, M>; 3],
    g: &[PdeGradient<2, M>; 3],
    q: &Real2,
) -> SVector<f64, M> {
    let l = barycentric_triangle(&c[0], &c[1], &c[2], q);
    let mut out = SVector::<f64, M>::zeros();
    for k in 0..3 {
        out += (v[k] + g[k] * (q - c[k]) * 0.5) * l[k];
    }
    out
}

/// 四面体线性插值
pub fn tetrahedron_linear<const M: usize>(
    c: &[Real3; 4],
    v: &[SVector<f64, M>; 4],
    q: &Real3,
) -> SVector<f64, M> {
    let l = barycentric_tetrahedron(&c[0], &c[1], &c[2], &c[3], q);
    v[0] * l[0] + v[1] * l[1] + v[2] * l[2] + v[3] * l[3]
}

/// 四面体二次插值（值 + 梯度）
pub fn tetrahedron_quadratic<const M: usize>(
    c: &[Real3; 4],
    v: &[SVector<f64, M>; 4],
    g: &[PdeGradient<3, M>; 4],
    q: &Real3,
) -> SVector<f64, M> {
    let l = barycentric_tetrahedron(&c[0], &c[1], &c[2], &c[3], q);
    let mut out = SVector::<f64, M>::zeros();
    for k in 0..4 {
        out += (v[k] + g[k] * (q - c[k]) * 0.5) * l[k];
    }
    out
}

/// 过定点集中的属主三角形搜索插值
///
/// 按字典序尝试所有三点子集，第一个所有重心坐标
/// `λ_i ≥ −ε` 的子集即属主，返回其线性插值。
/// 找不到属主时返回 `None`。
pub fn interpolate_in_owner_triangle<const M: usize>(
    points: &[(Real2, SVector<f64, M>)],
    q: &Real2,
) -> Option<SVector<f64, M>> {
    let n = points.len();
    for i in 0..n {
        for j in (i + 1)..n {
            for k in (j + 1)..n {
                let l = barycentric_triangle(&points[i].0, &points[j].0, &points[k].0, q);
                if l.iter().all(|&x| x.is_finite() && x >= -EQUALITY_TOLERANCE) {
                    return Some(
                        points[i].1 * l[0] + points[j].1 * l[1] + points[k].1 * l[2],
                    );
                }
            }
        }
    }
    None
}

/// 过定点集中的属主四面体搜索插值
pub fn interpolate_in_owner_tetrahedron<const M: usize>(
    points: &[(Real3, SVector<f64, M>)],
    q: &Real3,
) -> Option<SVector<f64, M>> {
    let n = points.len();
    for i in 0..n {
        for j in (i + 1)..n {
            for k in (j + 1)..n {
                for m in (k + 1)..n {
                    let l = barycentric_tetrahedron(
                        &points[i].0,
                        &points[j].0,
                        &points[k].0,
                        &points[m].0,
                        q,
                    );
                    if l.iter().all(|&x| x.is_finite() && x >= -EQUALITY_TOLERANCE) {
                        return Some(
                            points[i].1 * l[0]
                                + points[j].1 * l[1]
                                + points[k].1 * l[2]
                                + points[m].1 * l[3],
                        );
                    }
                }
            }
        }
    }
    None
}

// ============================================================
// 测试
// ============================================================
