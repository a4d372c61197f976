// crates/tw_physics/src/gcm/simplex.rs

//! 单纯形网格上的特征步
//!
//! 每个顶点每个特征 `k`：回溯位移 `Δ_k = −Δt·L_kk·n_s`，
//! 射线行走定位落点，按结果分类：
//!
//! - 完整单元：当前层上带梯度的二次空间插值
//! - 立即出体：记为外行不变量，该列置零，交给修正器
//! - 穿过边界面：当前层与下一层边界值张成的时空单纯形内
//!   线性插值（要求边界值已先被计算并修正）
//! - 恰好命中棱/顶点：一维时空插值
//!
//! 顺序约定：接触与边界顶点先算（此时禁用时空插值，出体列
//! 置零）、修正器改写、体内顶点最后算并可读取已修正的边界值。

use crate::grid::SimplexGrid;
use crate::numerics::gradient::estimate_gradients;
use crate::numerics::interpolation::{
    interpolate_in_owner_tetrahedron, interpolate_in_owner_triangle, tetrahedron_quadratic,
    triangle_quadratic, PdeGradient,
};
use crate::rheology::gcm_matrix::MatrixStore;
use crate::state::PdeStorage;
use nalgebra::{SMatrix, SVector};
use tw_linal::geometry::{line_with_plane_intersection, lines_intersection};
use tw_linal::{Real2, Real3};
use tw_mesh::WalkCell;

/// 阶段间复用的工作区
#[derive(Debug, Default)]
pub struct SimplexGcmScratch<const D: usize, const M: usize> {
    /// 顶点梯度，每阶段重建
    pub gradients: Vec<PdeGradient<D, M>>,
}

impl<const D: usize, const M: usize> SimplexGcmScratch<D, M> {
    /// 创建空工作区
    pub fn new() -> Self {
        Self {
            gradients: Vec::new(),
        }
    }

    /// 阶段前置：从当前层重建全部顶点梯度
    pub fn before_stage(&mut self, grid: &SimplexGrid<D>, storage: &PdeStorage<M>) {
        estimate_gradients(grid, storage.pde_all(), &mut self.gradients);
    }
}

/// 对一组顶点执行特征步
///
/// `record_outers` 在接触/边界阶段打开；`can_space_time`
/// 仅体内阶段打开（边界值彼时已写好）。
#[allow(clippy::too_many_arguments)]
pub fn stage_on_group<const D: usize, const M: usize>(
    vertices: &[u32],
    record_outers: bool,
    can_space_time: bool,
    axis: usize,
    tau: f64,
    direction: &SVector<f64, D>,
    grid: &SimplexGrid<D>,
    store: &MatrixStore<D, M>,
    storage: &mut PdeStorage<M>,
    layer: usize,
    gradients: &[PdeGradient<D, M>],
) {
    let (current, next, matrix_idx, outer_store) = storage.simplex_stage_parts(layer);

    for &v in vertices {
        let gm = store.get(matrix_idx[v as usize]).stage(axis);
        let mut outers = Vec::new();
        let mut invariants = SVector::<f64, M>::zeros();

        for k in 0..M {
            let dx = -tau * gm.l[k];
            let col = if dx == 0.0 {
                current[v as usize]
            } else {
                let shift = direction * dx;
                trace_column(
                    grid,
                    current,
                    next,
                    gradients,
                    v,
                    &shift,
                    can_space_time,
                    &mut outers,
                    k,
                )
            };
            invariants[k] = (gm.u.row(k) * col)[0];
        }

        next[v as usize] = gm.u1 * invariants;
        if record_outers {
            outer_store[v as usize] = outers;
        }
    }
}

/// 单个特征列：定位 + 插值
#[allow(clippy::too_many_arguments)]
fn trace_column<const D: usize, const M: usize>(
    grid: &SimplexGrid<D>,
    current: &[SVector<f64, M>],
    next: &[SVector<f64, M>],
    gradients: &[PdeGradient<D, M>],
    v: u32,
    shift: &SVector<f64, D>,
    can_space_time: bool,
    outers: &mut Vec<usize>,
    k: usize,
) -> SVector<f64, M> {
    let walk = grid.find_cell_crossed_by_ray(v, shift);

    if walk.n == D + 1 {
        // 特征落在体内
        let q = grid.coords(v) + shift;
        return interpolate_in_cell(grid, current, gradients, &walk, &q)
            .unwrap_or_else(SVector::zeros);
    }
    if walk.n == 0 {
        // 外行特征：列置零，序号交给修正器
        outers.push(k);
        return SVector::zeros();
    }
    if !can_space_time {
        // 边界顶点阶段没有下一层可用，留零
        return SVector::zeros();
    }
    if walk.n == D {
        return space_time_face(grid, current, next, v, shift, &walk)
            .unwrap_or_else(SVector::zeros);
    }
    space_time_degenerate(grid, current, next, v, shift, &walk).unwrap_or_else(SVector::zeros)
}

/// 完整单元内的二次空间插值
fn interpolate_in_cell<const D: usize, const M: usize>(
    grid: &SimplexGrid<D>,
    current: &[SVector<f64, M>],
    gradients: &[PdeGradient<D, M>],
    walk: &WalkCell,
    q: &SVector<f64, D>,
) -> Option<SVector<f64, M>> {
    match D {
        2 => {
            let mut c = [Real2::zeros(); 3];
            let mut values = [SVector::<f64, M>::zeros(); 3];
            let mut g = [SMatrix::<f64, M, 2>::zeros(); 3];
            for i in 0..3 {
                let local = grid.local_vertex(walk.verts[i])?;
                c[i] = to2(&grid.coords(local));
                values[i] = current[local as usize];
                g[i] = grad2(&gradients[local as usize]);
            }
            Some(triangle_quadratic(&c, &values, &g, &to2(q)))
        }
        3 => {
            let mut c = [Real3::zeros(); 4];
            let mut values = [SVector::<f64, M>::zeros(); 4];
            let mut g = [SMatrix::<f64, M, 3>::zeros(); 4];
            for i in 0..4 {
                let local = grid.local_vertex(walk.verts[i])?;
                c[i] = to3(&grid.coords(local));
                values[i] = current[local as usize];
                g[i] = grad3(&gradients[local as usize]);
            }
            Some(tetrahedron_quadratic(&c, &values, &g, &to3(q)))
        }
        _ => unreachable!("单纯形网格只支持 2、3 维"),
    }
}

/// 穿过边界面的时空插值
fn space_time_face<const D: usize, const M: usize>(
    grid: &SimplexGrid<D>,
    current: &[SVector<f64, M>],
    next: &[SVector<f64, M>],
    v: u32,
    shift: &SVector<f64, D>,
    walk: &WalkCell,
) -> Option<SVector<f64, M>> {
    let r0 = grid.coords(v);
    match D {
        2 => {
            // 边界边两端点在当前层与下一层张成时空三角形
            let b0 = grid.local_vertex(walk.verts[0])?;
            let b1 = grid.local_vertex(walk.verts[1])?;
            let r1 = to2(&grid.coords(b0));
            let r2 = to2(&grid.coords(b1));
            let p0 = to2(&r0);
            let target = to2(&(r0 + shift));
            let rc = lines_intersection(&r1, &r2, &p0, &target);
            if !rc.iter().all(|x| x.is_finite()) {
                return None;
            }
            let xi = ((rc - r1).norm() / (r2 - r1).norm()).clamp(0.0, 1.0);
            let t = (1.0 - (rc - p0).norm() / shift.norm()).clamp(0.0, 1.0);

            let points = [
                (Real2::new(0.0, 0.0), current[b0 as usize]),
                (Real2::new(1.0, 0.0), current[b1 as usize]),
                (Real2::new(0.0, 1.0), next[b0 as usize]),
                (Real2::new(1.0, 1.0), next[b1 as usize]),
            ];
            interpolate_in_owner_triangle(&points, &Real2::new(xi, t))
        }
        3 => {
            // 边界面三顶点在两个时间层张成时空四面体
            let b0 = grid.local_vertex(walk.verts[0])?;
            let b1 = grid.local_vertex(walk.verts[1])?;
            let b2 = grid.local_vertex(walk.verts[2])?;
            let r1 = to3(&grid.coords(b0));
            let r2 = to3(&grid.coords(b1));
            let r3 = to3(&grid.coords(b2));
            let p0 = to3(&r0);
            let target = to3(&(r0 + shift));
            let rc = line_with_plane_intersection(&r1, &r2, &r3, &p0, &target);
            if !rc.iter().all(|x| x.is_finite()) {
                return None;
            }
            let xi1 = ((rc - r1).norm() / (r2 - r1).norm()).clamp(0.0, 1.0);
            let xi2 = ((rc - r1).norm() / (r3 - r1).norm()).clamp(0.0, 1.0);
            let t = (1.0 - (rc - p0).norm() / shift.norm()).clamp(0.0, 1.0);

            let points = [
                (Real3::new(0.0, 0.0, 0.0), current[b0 as usize]),
                (Real3::new(1.0, 0.0, 0.0), current[b1 as usize]),
                (Real3::new(0.0, 1.0, 0.0), current[b2 as usize]),
                (Real3::new(0.0, 0.0, 1.0), next[b0 as usize]),
                (Real3::new(1.0, 0.0, 1.0), next[b1 as usize]),
                (Real3::new(0.0, 1.0, 1.0), next[b2 as usize]),
            ];
            interpolate_in_owner_tetrahedron(&points, &Real3::new(xi1, xi2, t))
        }
        _ => unreachable!("单纯形网格只支持 2、3 维"),
    }
}

/// 恰好从棱/顶点离开的一维时空插值
fn space_time_degenerate<const D: usize, const M: usize>(
    grid: &SimplexGrid<D>,
    current: &[SVector<f64, M>],
    next: &[SVector<f64, M>],
    v: u32,
    shift: &SVector<f64, D>,
    walk: &WalkCell,
) -> Option<SVector<f64, M>> {
    let r0 = grid.coords(v);
    if walk.n == 1 {
        // 命中单个边界顶点
        let bv = grid.local_vertex(walk.verts[0])?;
        let rv = grid.coords(bv);
        let w = ((rv - r0).norm() / shift.norm()).clamp(0.0, 1.0);
        return Some(current[bv as usize] * w + next[v as usize] * (1.0 - w));
    }

    // 3D：命中边界棱，先沿棱插值当前层，再与下一层节点值混合
    let e0 = grid.local_vertex(walk.verts[0])?;
    let e1 = grid.local_vertex(walk.verts[1])?;
    let a = grid.coords(e0);
    let b = grid.coords(e1);

    let d1 = *shift;
    let d2 = b - a;
    let w0 = a - r0;
    let aa = d1.dot(&d1);
    let bb = d1.dot(&d2);
    let cc = d2.dot(&d2);
    let dd = d1.dot(&w0);
    let ee = d2.dot(&w0);
    let denom = aa * cc - bb * bb;
    if denom.abs() < 1e-30 {
        return None;
    }
    let t_ray = ((bb * ee - cc * dd) / -denom).clamp(0.0, 1.0);
    let s_edge = ((aa * ee - bb * dd) / -denom).clamp(0.0, 1.0);

    let edge_value = current[e0 as usize] * (1.0 - s_edge) + current[e1 as usize] * s_edge;
    Some(edge_value * t_ray + next[v as usize] * (1.0 - t_ray))
}

// ============================================================
// 维度转换辅助
// ============================================================

#[inline]
fn to2<const D: usize>(p: &SVector<f64, D>) -> Real2 {
    Real2::new(p[0], p[1])
}

#[inline]
fn to3<const D: usize>(p: &SVector<f64, D>) -> Real3 {
    Real3::new(p[0], p[1], p[2])
}

fn grad2<const D: usize, const M: usize>(g: &PdeGradient<D, M>) -> SMatrix<f64, M, 2> {
    let mut out = SMatrix::<f64, M, 2>::zeros();
    for r in 0..M {
        for c in 0..2 {
            out[(r, c)] = g[(r, c)];
        }
    }
    out
}

fn grad3<const D: usize, const M: usize>(g: &PdeGradient<D, M>) -> SMatrix<f64, M, 3> {
    let mut out = SMatrix::<f64, M, 3>::zeros();
    for r in 0..M {
        for c in 0..3 {
            out[(r, c)] = g[(r, c)];
        }
    }
    out
}

// ============================================================
// 测试
// ============================================================
