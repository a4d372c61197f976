// crates/tw_physics/src/engine/timestep.rs

//! CFL 时间步控制
//!
//! `Δt = C · min_h / λ_max`。最小网格尺寸在网格构建时算好
//! 并缓存；最大特征值由矩阵表缓存。稳定性监控的幅值扫描
//! 用 rayon + 原子位归约。

use nalgebra::SVector;
use rayon::prelude::*;
use tw_foundation::reduce::AtomicF64Max;
use tw_foundation::{ensure, TwError, TwResult};

/// CFL 时间步计算器
#[derive(Debug, Clone)]
pub struct CflCalculator {
    /// 安全系数 C
    courant: f64,
    /// 缓存的最小网格尺寸
    min_h: f64,
}

impl CflCalculator {
    /// 创建计算器
    ///
    /// 一阶分裂要求 `C ≤ 1` 才稳定，上限校验由配置层完成；
    /// 这里只拒绝非正值。
    pub fn new(courant: f64, min_h: f64) -> TwResult<Self> {
        ensure!(
            courant > 0.0,
            TwError::bad_config(format!("Courant 数必须为正: {}", courant))
        );
        ensure!(
            min_h > 0.0,
            TwError::bad_config(format!("最小网格尺寸必须为正: {}", min_h))
        );
        Ok(Self { courant, min_h })
    }

    /// Courant 数
    #[inline]
    pub fn courant(&self) -> f64 {
        self.courant
    }

    /// 缓存的最小网格尺寸
    #[inline]
    pub fn min_h(&self) -> f64 {
        self.min_h
    }

    /// 计算时间步长
    pub fn compute_tau(&self, max_eigenvalue: f64) -> TwResult<f64> {
        ensure!(
            max_eigenvalue > 0.0,
            TwError::bad_config("最大特征值必须为正（材料未安装？）".to_string())
        );
        Ok(self.courant * self.min_h / max_eigenvalue)
    }
}

/// 并行扫描一层状态的最大分量幅值
///
/// 非有限值被归约忽略，调用方需单独检查有限性。
pub fn max_abs_component<const M: usize>(values: &[SVector<f64, M>]) -> f64 {
    let max = AtomicF64Max::new();
    values.par_iter().for_each(|u| {
        for x in u.iter() {
            max.update(x.abs());
        }
    });
    max.get()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tau_formula() {
        let calc = CflCalculator::new(0.9, 0.1).unwrap();
        let tau = calc.compute_tau(2.0).unwrap();
        assert!((tau - 0.9 * 0.1 / 2.0).abs() < 1e-14);
    }

    #[test]
    fn test_cfl_bound_holds() {
        // 测得的 Δt·λ/min_h 不超过 C
        let calc = CflCalculator::new(0.75, 0.05).unwrap();
        let lambda = 3.7;
        let tau = calc.compute_tau(lambda).unwrap();
        assert!(tau * lambda / calc.min_h() <= calc.courant() + 1e-14);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(CflCalculator::new(0.0, 0.1).is_err());
        assert!(CflCalculator::new(0.5, 0.0).is_err());
        let calc = CflCalculator::new(0.5, 0.1).unwrap();
        assert!(calc.compute_tau(0.0).is_err());
    }

    #[test]
    fn test_max_abs_scan() {
        let values = vec![
            SVector::<f64, 2>::new(1.0, -4.0),
            SVector::<f64, 2>::new(2.5, 0.0),
        ];
        assert_eq!(max_abs_component(&values), 4.0);
    }
}
