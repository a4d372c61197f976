// crates/tw_physics/src/corrector/border.rs

//! 边界修正器
//!
//! 对每个边界节点，在外行特征向量子空间解
//! `(B·Ω)·α = b − B·u`，把 `Ω·α` 加到新层 PDE 值上。
//! 行列式低于自适应阈值（阶段方向与法线一致时的行列式乘
//! 1e-3）时回退平面修正：旋到法向局部基、覆盖条件分量、转回。
//! 全局基模式下外行集合既非全左也非全右的节点取两个单侧
//! 修正的平均。

use super::{eigenvector_columns, non_reflection_correction, outer_wave_correction};
use crate::rheology::gcm_matrix::MatrixStore;
use crate::rheology::models::{BorderFunctional, WaveModel};
use crate::state::PdeStorage;
use crate::types::BorderKind;
use nalgebra::SVector;
use tracing::debug;

/// 待修正的边界节点
#[derive(Debug, Clone)]
pub struct BorderNode<const D: usize> {
    /// 局部顶点索引
    pub vertex: u32,
    /// 外法线（指向体外）
    pub normal: SVector<f64, D>,
}

/// 条件类型到泛函类别
fn functional_of(kind: BorderKind) -> Option<BorderFunctional> {
    match kind {
        BorderKind::FixedForce | BorderKind::FreeBorder => Some(BorderFunctional::Traction),
        BorderKind::FixedVelocity => Some(BorderFunctional::Velocity),
        BorderKind::NonReflection => None,
    }
}

/// 病态阈值系数
const DET_EPS: f64 = 1e-3;

/// 全局基模式：每个阶段后修正，返回平面回退次数
#[allow(clippy::too_many_arguments)]
pub fn apply_in_global_basis<Mdl, const D: usize, const M: usize, const K: usize>(
    kind: BorderKind,
    b_value: &SVector<f64, K>,
    nodes: &[BorderNode<D>],
    store: &MatrixStore<D, M>,
    storage: &mut PdeStorage<M>,
    layer: usize,
    axis: usize,
) -> usize
where
    Mdl: WaveModel<D, M, K>,
{
    if nodes.is_empty() {
        return 0;
    }

    let functional = match functional_of(kind) {
        Some(f) => f,
        None => {
            // 无反射：记录的外行不变量直接清零，系统恒为单位阵
            for node in nodes {
                let idx = node.vertex as usize;
                let gm = store.get(storage.matrix_idx(idx)).stage(axis);
                let outers = storage.outer_invariants(idx).to_vec();
                let u = *storage.pde_next(layer, idx);
                let value = non_reflection_correction(gm, &u, &outers);
                *storage.pde_next_mut(layer, idx) = u + value;
            }
            return 0;
        }
    };

    // 参考行列式：阶段方向与法线重合时达到最大
    let first = &nodes[0];
    let matrices = store.get(storage.matrix_idx(first.vertex as usize));
    let reference_normal: SVector<f64, D> = matrices.basis.column(axis).clone_owned();
    let gm_first = matrices.stage(axis);
    let omega_ref = eigenvector_columns(gm_first, &Mdl::RIGHT_INVARIANTS);
    let b_ref = Mdl::border_matrix(functional, &reference_normal);
    let min_determinant = outer_wave_correction(
        &SVector::<f64, M>::zeros(),
        &omega_ref,
        &b_ref,
        &SVector::<f64, K>::zeros(),
        0.0,
    )
    .map(|c| DET_EPS * c.determinant)
    .unwrap_or(0.0);

    let mut fallback_count = 0usize;
    for node in nodes {
        let idx = node.vertex as usize;
        let gm = store.get(storage.matrix_idx(idx)).stage(axis);
        let outers = storage.outer_invariants(idx).to_vec();
        let b_mat = Mdl::border_matrix(functional, &node.normal);
        let mut u = *storage.pde_next(layer, idx);

        let right = outers == Mdl::RIGHT_INVARIANTS.as_slice();
        let left = outers == Mdl::LEFT_INVARIANTS.as_slice();

        let corrected = if right || left {
            let indices = if right {
                &Mdl::RIGHT_INVARIANTS
            } else {
                &Mdl::LEFT_INVARIANTS
            };
            let omega = eigenvector_columns(gm, indices);
            match outer_wave_correction(&u, &omega, &b_mat, b_value, min_determinant) {
                Some(c) => {
                    u += c.value;
                    true
                }
                None => false,
            }
        } else {
            // 双侧外行或空集：两个单侧修正取平均
            let omega_r = eigenvector_columns(gm, &Mdl::RIGHT_INVARIANTS);
            let omega_l = eigenvector_columns(gm, &Mdl::LEFT_INVARIANTS);
            let cr = outer_wave_correction(&u, &omega_r, &b_mat, b_value, min_determinant);
            let cl = outer_wave_correction(&u, &omega_l, &b_mat, b_value, min_determinant);
            match (cr, cl) {
                (Some(r), Some(l)) => {
                    u += (r.value + l.value) * 0.5;
                    true
                }
                _ => false,
            }
        };

        if !corrected {
            debug!(vertex = node.vertex, "边界修正系统病态，回退平面修正");
            Mdl::plain_border_correction(&mut u, kind, &node.normal, b_value);
            fallback_count += 1;
        }
        *storage.pde_next_mut(layer, idx) = u;
    }
    fallback_count
}

/// 局部基模式：仅阶段 0 后调用
///
/// 边界节点的矩阵写在边界局部基里，阶段 0 沿法线方向，
/// 外行集合先验地是右行不变量。
pub fn apply_in_local_basis<Mdl, const D: usize, const M: usize, const K: usize>(
    kind: BorderKind,
    b_value: &SVector<f64, K>,
    nodes: &[BorderNode<D>],
    store: &MatrixStore<D, M>,
    storage: &mut PdeStorage<M>,
    layer: usize,
) -> usize
where
    Mdl: WaveModel<D, M, K>,
{
    let mut fallback_count = 0usize;
    for node in nodes {
        let idx = node.vertex as usize;
        let gm = store.get(storage.matrix_idx(idx)).stage(0);
        let mut u = *storage.pde_next(layer, idx);

        match functional_of(kind) {
            None => {
                let outers = Mdl::RIGHT_INVARIANTS.to_vec();
                u += non_reflection_correction(gm, &u, &outers);
            }
            Some(functional) => {
                let omega = eigenvector_columns(gm, &Mdl::RIGHT_INVARIANTS);
                let b_mat = Mdl::border_matrix(functional, &node.normal);
                match outer_wave_correction(&u, &omega, &b_mat, b_value, 0.0) {
                    Some(c) => u += c.value,
                    None => {
                        debug!(vertex = node.vertex, "局部基边界修正退化，回退平面修正");
                        Mdl::plain_border_correction(&mut u, kind, &node.normal, b_value);
                        fallback_count += 1;
                    }
                }
            }
        }
        *storage.pde_next_mut(layer, idx) = u;
    }
    fallback_count
}

/// 平面修正：直接把当前层值改写成条件要求的值
///
/// 初值与边界条件的相容化用，步进前调用一次。
pub fn apply_plain<Mdl, const D: usize, const M: usize, const K: usize>(
    kind: BorderKind,
    b_value: &SVector<f64, K>,
    nodes: &[BorderNode<D>],
    storage: &mut PdeStorage<M>,
) where
    Mdl: WaveModel<D, M, K>,
{
    for node in nodes {
        let idx = node.vertex as usize;
        let mut u = *storage.pde(idx);
        Mdl::plain_border_correction(&mut u, kind, &node.normal, b_value);
        *storage.pde_mut(idx) = u;
    }
}

// ============================================================
// 测试
// ============================================================
