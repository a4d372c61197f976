// crates/tw_physics/src/gcm/cubic.rs

//! 立方网格上的特征步
//!
//! 沿阶段轴，每个特征 `k` 回溯 `Δt·L_kk`，在宽 `2·order+1`、
//! 以最近节点为中心的一维模板上做 Lagrange 插值读取 PDE 值，
//! 对包围节点做 min-max 限制，再经 `u_new = U1·diag(U·values)`
//! 组装回 PDE 空间。halo 必须在进入本函数前已填好。

use crate::grid::CubicGrid;
use crate::rheology::gcm_matrix::MatrixStore;
use crate::state::PdeStorage;
use nalgebra::SVector;
use tw_linal::ops::clamp_between;

/// 执行一个轴向特征步
///
/// 结果写入 `layer` 号下一层；当前层只读。
pub fn stage<const D: usize, const M: usize>(
    order: usize,
    axis: usize,
    tau: f64,
    grid: &CubicGrid<D>,
    store: &MatrixStore<D, M>,
    storage: &mut PdeStorage<M>,
    layer: usize,
) {
    debug_assert!(order >= 1);
    let h = grid.step(axis);
    let stride = grid.stride(axis) as isize;
    let (current, next, matrix_idx) = storage.stage_parts_mut(layer);

    grid.for_each_real(|_, idx| {
        let gm = store.get(matrix_idx[idx]).stage(axis);
        let mut invariants = SVector::<f64, M>::zeros();
        for k in 0..M {
            let delta = -tau * gm.l[k] / h;
            let value = if delta == 0.0 {
                current[idx]
            } else {
                interpolate_along(current, idx, stride, delta, order)
            };
            invariants[k] = (gm.u.row(k) * value)[0];
        }
        next[idx] = gm.u1 * invariants;
    });
}

/// 一维模板插值
///
/// `delta` 以节点步长为单位（带符号）。模板节点是
/// `round(delta) ± order`，读取越界落入 halo，由调用方保证
/// halo 深度足够。
pub(crate) fn interpolate_along<const M: usize>(
    current: &[SVector<f64, M>],
    idx: usize,
    stride: isize,
    delta: f64,
    order: usize,
) -> SVector<f64, M> {
    let center = delta.round() as isize;
    let q = order as isize;

    let mut value = SVector::<f64, M>::zeros();
    for i in -q..=q {
        let p_i = (center + i) as f64;
        let mut w = 1.0;
        for j in -q..=q {
            if j != i {
                let p_j = (center + j) as f64;
                w *= (delta - p_j) / (p_i - p_j);
            }
        }
        let node = (idx as isize + (center + i) * stride) as usize;
        value += current[node] * w;
    }

    // 包围节点限制：高阶模板在间断附近的振荡被压回
    let lo = delta.floor() as isize;
    let a = current[(idx as isize + lo * stride) as usize];
    let b = current[(idx as isize + (lo + 1) * stride) as usize];
    clamp_between(&value, &a, &b)
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate_exact_at_nodes() {
        // 整数位移：插值必须精确取节点值
        let data: Vec<SVector<f64, 1>> =
            (0..11).map(|i| SVector::<f64, 1>::new(i as f64 * 2.0)).collect();
        for order in 1..=3 {
            let v = interpolate_along(&data, 5, 1, -2.0, order);
            assert!(
                (v[0] - data[3][0]).abs() < 1e-12,
                "order {} 整数位移不精确",
                order
            );
        }
    }

    #[test]
    fn test_interpolate_linear_field() {
        // 线性数据上任何阶 Lagrange 都应精确
        let data: Vec<SVector<f64, 1>> =
            (0..13).map(|i| SVector::<f64, 1>::new(3.0 + 0.5 * i as f64)).collect();
        for order in 1..=4 {
            let v = interpolate_along(&data, 6, 1, -1.3, order);
            let expected = 3.0 + 0.5 * (6.0 - 1.3);
            assert!(
                (v[0] - expected).abs() < 1e-12,
                "order {}: got {}, want {}",
                order,
                v[0],
                expected
            );
        }
    }

    #[test]
    fn test_minmax_limiter_suppresses_overshoot() {
        // 阶梯数据：高阶插值在间断处不越过包围节点
        let data: Vec<SVector<f64, 1>> = (0..13)
            .map(|i| SVector::<f64, 1>::new(if i < 6 { 0.0 } else { 1.0 }))
            .collect();
        let v = interpolate_along(&data, 6, 1, -0.4, 3);
        assert!(v[0] >= 0.0 && v[0] <= 1.0, "限制器失效: {}", v[0]);
    }
}
