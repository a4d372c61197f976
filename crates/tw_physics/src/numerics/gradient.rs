// crates/tw_physics/src/numerics/gradient.rs

//! 逐顶点最小二乘梯度重建
//!
//! 每个阶段开始前对全部顶点重建一次 PDE 梯度，单纯形特征步
//! 的二次插值复用整个阶段。目标泛函
//! `min Σ_j w_j ‖u_j − u_i − g·(c_j − c_i)‖²`，权 `w_j = 1/‖c_j − c_i‖²`。
//! 法方程是 D×D 对称正定系统；边界顶点邻居不足或系统奇异时
//! 退回零梯度，局部降为一阶。

use crate::grid::SimplexGrid;
use crate::numerics::interpolation::PdeGradient;
use nalgebra::{SMatrix, SVector};
use rayon::prelude::*;
use tw_linal::solve::invert;

/// 重建全部顶点梯度
///
/// `values` 按局部顶点索引；`out` 自动重分配到当前顶点数。
/// 逐顶点独立，按索引分块并行。
pub fn estimate_gradients<const D: usize, const M: usize>(
    grid: &SimplexGrid<D>,
    values: &[SVector<f64, M>],
    out: &mut Vec<PdeGradient<D, M>>,
) {
    let n = grid.n_vertices();
    debug_assert_eq!(values.len(), n);
    out.clear();
    out.resize(n, PdeGradient::<D, M>::zeros());

    out.par_iter_mut().enumerate().for_each(|(local, slot)| {
        *slot = vertex_gradient(grid, values, local as u32);
    });
}

/// 单个顶点的梯度
fn vertex_gradient<const D: usize, const M: usize>(
    grid: &SimplexGrid<D>,
    values: &[SVector<f64, M>],
    local: u32,
) -> PdeGradient<D, M> {
    let center = grid.coords(local);
    let u_center = &values[local as usize];

    // 法方程 A·x = b（每个 PDE 分量共用 A）
    let mut a = SMatrix::<f64, D, D>::zeros();
    let mut b = SMatrix::<f64, D, M>::zeros();
    let mut neighbor_count = 0usize;

    for other in grid.neighbor_vertices(local) {
        let d = grid.coords(other) - center;
        let dist_sq = d.norm_squared();
        if dist_sq < 1e-20 {
            continue;
        }
        let w = 1.0 / dist_sq;
        let du = values[other as usize] - u_center;
        a += d * d.transpose() * w;
        b += d * du.transpose() * w;
        neighbor_count += 1;
    }

    // 邻居不足：半空间缺邻居的边界顶点走这里
    if neighbor_count < D {
        return PdeGradient::<D, M>::zeros();
    }

    match invert(&a) {
        Some(inv) => {
            let x = inv * b; // D×M
            x.transpose()
        }
        None => PdeGradient::<D, M>::zeros(),
    }
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tw_mesh::generation::generate_rectangle;

    #[test]
    fn test_linear_field_gradient_exact() {
        let tri = Arc::new(generate_rectangle([1.0, 1.0], 0.25, |_| 1));
        let grid = SimplexGrid::<2>::new(1, tri).unwrap();

        // 线性标量场 f = 3x - 2y，其梯度处处 (3, -2)
        let values: Vec<SVector<f64, 1>> = (0..grid.n_vertices() as u32)
            .map(|v| {
                let c = grid.coords(v);
                SVector::<f64, 1>::new(3.0 * c[0] - 2.0 * c[1])
            })
            .collect();

        let mut grads = Vec::new();
        estimate_gradients(&grid, &values, &mut grads);

        for v in 0..grid.n_vertices() as u32 {
            let g = &grads[v as usize];
            // 线性场的最小二乘重建在任何非退化邻域都精确
            assert!(
                (g[(0, 0)] - 3.0).abs() < 1e-10 && (g[(0, 1)] + 2.0).abs() < 1e-10,
                "顶点 {} 梯度错误: {:?}",
                v,
                g
            );
        }
    }

    #[test]
    fn test_constant_field_zero_gradient() {
        let tri = Arc::new(generate_rectangle([1.0, 1.0], 0.5, |_| 1));
        let grid = SimplexGrid::<2>::new(1, tri).unwrap();
        let values = vec![SVector::<f64, 2>::new(4.0, -1.0); grid.n_vertices()];
        let mut grads = Vec::new();
        estimate_gradients(&grid, &values, &mut grads);
        for g in &grads {
            assert!(g.norm() < 1e-12);
        }
    }

    #[test]
    fn test_output_resized() {
        let tri = Arc::new(generate_rectangle([1.0, 1.0], 0.5, |_| 1));
        let grid = SimplexGrid::<2>::new(1, tri).unwrap();
        let values = vec![SVector::<f64, 1>::zeros(); grid.n_vertices()];
        let mut grads = vec![PdeGradient::<2, 1>::zeros(); 3];
        estimate_gradients(&grid, &values, &mut grads);
        assert_eq!(grads.len(), grid.n_vertices());
    }
}
