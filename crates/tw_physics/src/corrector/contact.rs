// crates/tw_physics/src/corrector/contact.rs

//! 接触修正器
//!
//! 两个物体的重合顶点对 `(a, b)` 共享法线 `ν`，接触条件写成
//! 两组线性泛函相等：`B1·u_A = B1·u_B`、`B2·u_A = B2·u_B`。
//! 粘接（弹性-弹性）取速度与面力；滑移（声学-声学）取法向
//! 速度与压力。消去一侧后化为 K×K 系统：
//!
//! ```text
//! R = (B1_A·Ω_A)⁻¹
//! p = R·(B1_B·u_B − B1_A·u_A)
//! Q = R·(B1_B·Ω_B)
//! M = (B2_B·Ω_B) − (B2_A·Ω_A)·Q
//! f = (B2_A·Ω_A)·p + B2_A·u_A − B2_B·u_B
//! M·α_B = f,  α_A = p + Q·α_B
//! ```
//!
//! 外行集合只在一侧的顶点按双条件边界问题求解（系统加倍，
//! 动态矩阵），其余退化情形回退到局部基平均。

use super::{eigenvector_columns, outer_wave_correction, Correction};
use crate::rheology::gcm_matrix::MatrixStore;
use crate::rheology::models::{BorderFunctional, WaveModel};
use crate::state::PdeStorage;
use crate::types::ContactKind;
use nalgebra::{DMatrix, DVector, SMatrix, SVector};
use tracing::debug;
use tw_linal::solve::{determinant, invert};

/// 重合顶点对
#[derive(Debug, Clone)]
pub struct ContactPair<const D: usize> {
    /// A 侧局部顶点索引
    pub first: u32,
    /// B 侧局部顶点索引
    pub second: u32,
    /// 接触法线，方向从 A 指向 B
    pub normal: SVector<f64, D>,
}

/// 病态阈值系数
const DET_EPS: f64 = 1e-3;

/// 接触条件的两组泛函矩阵
///
/// 粘接用全局基形式（全分量连续），滑移用法向形式。
fn condition_matrices<Mdl, const D: usize, const M: usize, const K: usize>(
    kind: ContactKind,
    normal: &SVector<f64, D>,
) -> (SMatrix<f64, K, M>, SMatrix<f64, K, M>)
where
    Mdl: WaveModel<D, M, K>,
{
    match kind {
        ContactKind::Adhesion => (
            Mdl::border_matrix_global(BorderFunctional::Velocity, normal),
            Mdl::border_matrix_global(BorderFunctional::Traction, normal),
        ),
        ContactKind::Slide => (
            Mdl::border_matrix(BorderFunctional::Velocity, normal),
            Mdl::border_matrix(BorderFunctional::Traction, normal),
        ),
    }
}

/// 消去法接触修正
#[allow(clippy::too_many_arguments)]
fn pair_correction<const M: usize, const K: usize>(
    ua: &SVector<f64, M>,
    ub: &SVector<f64, M>,
    omega_a: &SMatrix<f64, M, K>,
    omega_b: &SMatrix<f64, M, K>,
    b1: &SMatrix<f64, K, M>,
    b2: &SMatrix<f64, K, M>,
    min_determinant: f64,
) -> Option<(Correction<M>, Correction<M>)> {
    let b1_omega_a = b1 * omega_a;
    let det_r = determinant(&b1_omega_a).abs();
    if det_r <= min_determinant {
        return None;
    }
    let r = invert(&b1_omega_a)?;
    let p = r * (b1 * ub - b1 * ua);
    let q = r * (b1 * omega_b);
    let b2_omega_a = b2 * omega_a;
    let m = b2 * omega_b - b2_omega_a * q;
    let det_m = determinant(&m).abs();
    if det_m <= min_determinant {
        return None;
    }
    let alpha_b = invert(&m)? * (b2_omega_a * p + b2 * ua - b2 * ub);
    let alpha_a = p + q * alpha_b;
    let value_a = omega_a * alpha_a;
    let value_b = omega_b * alpha_b;
    if !value_a.iter().chain(value_b.iter()).all(|x| x.is_finite()) {
        return None;
    }
    Some((
        Correction {
            value: value_a,
            determinant: det_r.min(det_m),
        },
        Correction {
            value: value_b,
            determinant: det_r.min(det_m),
        },
    ))
}

/// 单侧双条件求解：一侧全部外行、另一侧无外行
///
/// 系统规模 2K，用动态矩阵组装 `[B1; B2]·(u + Ω·α) = [B1·u_B; B2·u_B]`。
fn one_sided_correction<const M: usize, const K: usize>(
    u: &SVector<f64, M>,
    u_other: &SVector<f64, M>,
    omega_right: &SMatrix<f64, M, K>,
    omega_left: &SMatrix<f64, M, K>,
    b1: &SMatrix<f64, K, M>,
    b2: &SMatrix<f64, K, M>,
) -> Option<SVector<f64, M>> {
    let size = 2 * K;
    let mut omega = DMatrix::<f64>::zeros(M, size);
    for k in 0..K {
        for r in 0..M {
            omega[(r, k)] = omega_right[(r, k)];
            omega[(r, K + k)] = omega_left[(r, k)];
        }
    }
    let mut b = DMatrix::<f64>::zeros(size, M);
    let mut rhs = DVector::<f64>::zeros(size);
    for k in 0..K {
        for c in 0..M {
            b[(k, c)] = b1[(k, c)];
            b[(K + k, c)] = b2[(k, c)];
        }
        rhs[k] = (b1 * u_other)[k] - (b1 * u)[k];
        rhs[K + k] = (b2 * u_other)[k] - (b2 * u)[k];
    }
    let system = &b * &omega;
    let alpha = system.lu().solve(&rhs)?;
    let value = omega * alpha;
    if !value.iter().all(|x| x.is_finite()) {
        return None;
    }
    let mut out = SVector::<f64, M>::zeros();
    for r in 0..M {
        out[r] = value[r];
    }
    Some(out)
}

/// 全局基模式：每个阶段后修正全部接触对，返回平面回退次数
#[allow(clippy::too_many_arguments)]
pub fn apply_in_global_basis<Mdl, const D: usize, const M: usize, const K: usize>(
    kind: ContactKind,
    pairs: &[ContactPair<D>],
    store_a: &MatrixStore<D, M>,
    storage_a: &mut PdeStorage<M>,
    store_b: &MatrixStore<D, M>,
    storage_b: &mut PdeStorage<M>,
    layer: usize,
    axis: usize,
) -> usize
where
    Mdl: WaveModel<D, M, K>,
{
    if pairs.is_empty() {
        return 0;
    }

    // 参考行列式：法线取阶段方向
    let first = &pairs[0];
    let matrices_a = store_a.get(storage_a.matrix_idx(first.first as usize));
    let reference_normal: SVector<f64, D> = matrices_a.basis.column(axis).clone_owned();
    let (b1_ref, b2_ref) = condition_matrices::<Mdl, D, M, K>(kind, &reference_normal);
    let gm_a_ref = matrices_a.stage(axis);
    let gm_b_ref = store_b
        .get(storage_b.matrix_idx(first.second as usize))
        .stage(axis);
    let omega_a_ref = eigenvector_columns(gm_a_ref, &Mdl::RIGHT_INVARIANTS);
    let omega_b_ref = eigenvector_columns(gm_b_ref, &Mdl::LEFT_INVARIANTS);
    let min_determinant = pair_correction(
        &SVector::<f64, M>::zeros(),
        &SVector::<f64, M>::zeros(),
        &omega_a_ref,
        &omega_b_ref,
        &b1_ref,
        &b2_ref,
        0.0,
    )
    .map(|(a, _)| DET_EPS * a.determinant)
    .unwrap_or(0.0);

    let mut fallback_count = 0usize;
    for pair in pairs {
        let ia = pair.first as usize;
        let ib = pair.second as usize;
        let gm_a = store_a.get(storage_a.matrix_idx(ia)).stage(axis);
        let gm_b = store_b.get(storage_b.matrix_idx(ib)).stage(axis);
        let outers_a = storage_a.outer_invariants(ia).to_vec();
        let outers_b = storage_b.outer_invariants(ib).to_vec();
        let (b1, b2) = condition_matrices::<Mdl, D, M, K>(kind, &pair.normal);

        let mut ua = *storage_a.pde_next(layer, ia);
        let mut ub = *storage_b.pde_next(layer, ib);

        let a_right = outers_a == Mdl::RIGHT_INVARIANTS.as_slice();
        let a_left = outers_a == Mdl::LEFT_INVARIANTS.as_slice();
        let b_right = outers_b == Mdl::RIGHT_INVARIANTS.as_slice();
        let b_left = outers_b == Mdl::LEFT_INVARIANTS.as_slice();

        let corrected = if (a_right && b_left) || (a_left && b_right) {
            // 常规接触：两侧各自单侧外行
            let idx_a = if a_right {
                &Mdl::RIGHT_INVARIANTS
            } else {
                &Mdl::LEFT_INVARIANTS
            };
            let idx_b = if b_right {
                &Mdl::RIGHT_INVARIANTS
            } else {
                &Mdl::LEFT_INVARIANTS
            };
            let omega_a = eigenvector_columns(gm_a, idx_a);
            let omega_b = eigenvector_columns(gm_b, idx_b);
            match pair_correction(&ua, &ub, &omega_a, &omega_b, &b1, &b2, min_determinant) {
                Some((ca, cb)) => {
                    ua += ca.value;
                    ub += cb.value;
                    true
                }
                None => false,
            }
        } else if outers_a.len() == 2 * K && outers_b.is_empty() {
            // A 侧按双条件边界求解
            let omega_r = eigenvector_columns(gm_a, &Mdl::RIGHT_INVARIANTS);
            let omega_l = eigenvector_columns(gm_a, &Mdl::LEFT_INVARIANTS);
            match one_sided_correction(&ua, &ub, &omega_r, &omega_l, &b1, &b2) {
                Some(value) => {
                    ua += value;
                    true
                }
                None => false,
            }
        } else if outers_b.len() == 2 * K && outers_a.is_empty() {
            // B 侧按双条件边界求解
            let omega_r = eigenvector_columns(gm_b, &Mdl::RIGHT_INVARIANTS);
            let omega_l = eigenvector_columns(gm_b, &Mdl::LEFT_INVARIANTS);
            match one_sided_correction(&ub, &ua, &omega_r, &omega_l, &b1, &b2) {
                Some(value) => {
                    ub += value;
                    true
                }
                None => false,
            }
        } else {
            false
        };

        if !corrected {
            debug!(
                first = pair.first,
                second = pair.second,
                "接触修正退化，回退局部基平均"
            );
            Mdl::plain_contact_correction_avg(&mut ua, &mut ub, kind, &pair.normal);
            fallback_count += 1;
        }

        *storage_a.pde_next_mut(layer, ia) = ua;
        *storage_b.pde_next_mut(layer, ib) = ub;
    }
    fallback_count
}

/// 局部基模式：仅阶段 0 后调用
///
/// 接触节点矩阵写在接触局部基里，外行集合先验为右行（A 侧）
/// 与左行（B 侧）。
#[allow(clippy::too_many_arguments)]
pub fn apply_in_local_basis<Mdl, const D: usize, const M: usize, const K: usize>(
    kind: ContactKind,
    pairs: &[ContactPair<D>],
    store_a: &MatrixStore<D, M>,
    storage_a: &mut PdeStorage<M>,
    store_b: &MatrixStore<D, M>,
    storage_b: &mut PdeStorage<M>,
    layer: usize,
) -> usize
where
    Mdl: WaveModel<D, M, K>,
{
    let mut fallback_count = 0usize;
    for pair in pairs {
        let ia = pair.first as usize;
        let ib = pair.second as usize;
        let gm_a = store_a.get(storage_a.matrix_idx(ia)).stage(0);
        let gm_b = store_b.get(storage_b.matrix_idx(ib)).stage(0);
        let (b1, b2) = condition_matrices::<Mdl, D, M, K>(kind, &pair.normal);
        let omega_a = eigenvector_columns(gm_a, &Mdl::RIGHT_INVARIANTS);
        let omega_b = eigenvector_columns(gm_b, &Mdl::LEFT_INVARIANTS);

        let mut ua = *storage_a.pde_next(layer, ia);
        let mut ub = *storage_b.pde_next(layer, ib);
        match pair_correction(&ua, &ub, &omega_a, &omega_b, &b1, &b2, 0.0) {
            Some((ca, cb)) => {
                ua += ca.value;
                ub += cb.value;
            }
            None => {
                debug!(
                    first = pair.first,
                    second = pair.second,
                    "局部基接触修正退化，回退局部基平均"
                );
                Mdl::plain_contact_correction_avg(&mut ua, &mut ub, kind, &pair.normal);
                fallback_count += 1;
            }
        }
        *storage_a.pde_next_mut(layer, ia) = ua;
        *storage_b.pde_next_mut(layer, ib) = ub;
    }
    fallback_count
}

/// 平面修正：当前层直接平均（初值相容化）
pub fn apply_plain<Mdl, const D: usize, const M: usize, const K: usize>(
    kind: ContactKind,
    pairs: &[ContactPair<D>],
    storage_a: &mut PdeStorage<M>,
    storage_b: &mut PdeStorage<M>,
) where
    Mdl: WaveModel<D, M, K>,
{
    for pair in pairs {
        let ia = pair.first as usize;
        let ib = pair.second as usize;
        let mut ua = *storage_a.pde(ia);
        let mut ub = *storage_b.pde(ib);
        Mdl::plain_contact_correction_avg(&mut ua, &mut ub, kind, &pair.normal);
        *storage_a.pde_mut(ia) = ua;
        *storage_b.pde_mut(ib) = ub;
    }
}

// ============================================================
// 测试
// ============================================================
