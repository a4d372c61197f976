// crates/tw_physics/src/engine/mod.rs

//! 方向分裂驱动
//!
//! 每个时间步：CFL 求 Δt，按分裂表跑各方向特征步并在阶段间
//! 修正边界/接触，最后推进 ODE 与用户修正器。
//! 新层出现非有限值触发一次 Δt 减半重试，再次失败上抛。

pub mod cubic_engine;
pub mod simplex_engine;
pub mod timestep;

pub use cubic_engine::CubicEngine;
pub use simplex_engine::{SimplexBody, SimplexEngine};
pub use timestep::CflCalculator;

use crate::error::PhysicsError;
use crate::types::PhysicalQuantity;
use tw_foundation::TwResult;

/// 运行时统一的模拟接口
///
/// 顶层按标签把模型 × 网格组合解析成一个单态化引擎后，
/// 快照与步进循环只依赖这个接口。
pub trait Simulation {
    /// 推进一个时间步
    fn step(&mut self) -> TwResult<()>;

    /// 当前模拟时间
    fn time(&self) -> f64;

    /// 最近一次使用的时间步长
    fn tau(&self) -> f64;

    /// 已完成的步数
    fn step_index(&self) -> usize;

    /// 节点数量（全部网格求和）
    fn n_nodes(&self) -> usize;

    /// 节点空间坐标（补零到三维）
    fn positions(&self) -> Vec<[f64; 3]>;

    /// 按节点取物理量；模型不暴露该量时为 NaN
    fn sample(&self, q: PhysicalQuantity) -> Vec<f64>;
}

/// 分裂调度表：(阶段号, 子步长) 序列
///
/// 一阶：各方向各一次完整 Δt。二阶（D = 2）：Strang 对称表
/// `0@Δt/2, 1@Δt, 0@Δt/2`。三维二阶明确不支持。
pub fn stage_schedule(d: usize, order: usize, tau: f64) -> TwResult<Vec<(usize, f64)>> {
    match (order, d) {
        (1, _) => Ok((0..d).map(|s| (s, tau)).collect()),
        (2, 1) => Ok(vec![(0, tau)]),
        (2, 2) => Ok(vec![(0, tau / 2.0), (1, tau), (0, tau / 2.0)]),
        (2, 3) => Err(PhysicsError::NotImplemented {
            feature: "三维二阶方向分裂".to_string(),
        }
        .into()),
        _ => Err(PhysicsError::BadCombination {
            message: format!("分裂阶数 {} 不受支持", order),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_first_order() {
        let s = stage_schedule(3, 1, 0.4).unwrap();
        assert_eq!(s, vec![(0, 0.4), (1, 0.4), (2, 0.4)]);
    }

    #[test]
    fn test_schedule_strang() {
        let s = stage_schedule(2, 2, 0.4).unwrap();
        assert_eq!(s, vec![(0, 0.2), (1, 0.4), (0, 0.2)]);
    }

    #[test]
    fn test_schedule_3d_second_order_rejected() {
        assert!(stage_schedule(3, 2, 0.4).is_err());
    }
}
