// crates/tw_physics/src/corrector/mod.rs

//! 外行波修正器
//!
//! 边界/接触节点的新值先由特征步算出（外行不变量为零占位），
//! 再在外行特征向量子空间内解小规模线性系统，使边界或接触
//! 条件成立。系统病态时回退平面修正。

pub mod border;
pub mod contact;

use crate::rheology::gcm_matrix::GcmMatrix;
use nalgebra::{SMatrix, SVector};
use tw_linal::solve::{determinant, invert};

/// 修正结果
#[derive(Debug, Clone)]
pub struct Correction<const M: usize> {
    /// 加到 PDE 向量上的修正量 `Ω·α`
    pub value: SVector<f64, M>,
    /// 系统行列式绝对值（自适应阈值用）
    pub determinant: f64,
}

/// 从 `u1` 抽取指定不变量序号的特征向量列
pub fn eigenvector_columns<const M: usize, const K: usize>(
    gm: &GcmMatrix<M>,
    indices: &[usize; K],
) -> SMatrix<f64, M, K> {
    let mut omega = SMatrix::<f64, M, K>::zeros();
    for (col, &idx) in indices.iter().enumerate() {
        omega.set_column(col, &gm.u1.column(idx).clone_owned());
    }
    omega
}

/// 外行波修正量：`α = (B·Ω)⁻¹·(b − B·u)`，返回 `Ω·α`
///
/// `|det(B·Ω)| ≤ min_determinant` 视为病态，返回 `None`，
/// 调用方回退平面修正。
pub fn outer_wave_correction<const M: usize, const K: usize>(
    u: &SVector<f64, M>,
    omega: &SMatrix<f64, M, K>,
    b_mat: &SMatrix<f64, K, M>,
    b_vec: &SVector<f64, K>,
    min_determinant: f64,
) -> Option<Correction<M>> {
    let system = b_mat * omega;
    let det = determinant(&system).abs();
    if det <= min_determinant {
        return None;
    }
    let inv = invert(&system)?;
    let alpha = inv * (b_vec - b_mat * u);
    let value = omega * alpha;
    if !value.iter().all(|x| x.is_finite()) {
        return None;
    }
    Some(Correction {
        value,
        determinant: det,
    })
}

/// 无反射修正：把记录的外行不变量直接清零
///
/// `U·U1 = I` 使该系统恒为单位阵，不存在病态回退。
pub fn non_reflection_correction<const M: usize>(
    gm: &GcmMatrix<M>,
    u: &SVector<f64, M>,
    outers: &[usize],
) -> SVector<f64, M> {
    let mut value = SVector::<f64, M>::zeros();
    for &k in outers {
        let r_k = (gm.u.row(k) * u)[0];
        value -= gm.u1.column(k) * r_k;
    }
    value
}
