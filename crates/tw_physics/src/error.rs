// crates/tw_physics/src/error.rs

//! 物理层错误类型

use thiserror::Error;
use tw_foundation::TwError;

/// 物理层错误
///
/// 只承载致命一侧；病态修正系统与首次 CFL 违例在组件内部
/// 回退/重试，不出现在这里。
#[derive(Debug, Error)]
pub enum PhysicsError {
    /// 特征分解校验失败
    #[error("材料 {material:?} 的特征分解残差 {residual:.3e} 超过容许值 {tolerance:.3e}")]
    BadDecomposition {
        /// 材料描述
        material: String,
        /// 实测残差（最大范数）
        residual: f64,
        /// 容许值
        tolerance: f64,
    },

    /// 模型与材料/条件组合无效
    #[error("无效组合: {message}")]
    BadCombination {
        /// 说明
        message: String,
    },

    /// 网格状态不满足求解前提
    #[error("网格状态非法: {message}")]
    BadGrid {
        /// 说明
        message: String,
    },

    /// CFL 违例且重试耗尽
    #[error("第 {step} 步 CFL 违例，重试后仍失败")]
    CflViolation {
        /// 时间步编号
        step: usize,
    },

    /// 功能组合未实现
    #[error("功能未实现: {feature}")]
    NotImplemented {
        /// 功能描述
        feature: String,
    },
}

impl From<PhysicsError> for TwError {
    fn from(err: PhysicsError) -> Self {
        match err {
            PhysicsError::BadDecomposition { .. } | PhysicsError::BadCombination { .. } => {
                TwError::bad_config(err.to_string())
            }
            PhysicsError::BadGrid { .. } => TwError::bad_mesh(err.to_string()),
            PhysicsError::CflViolation { step } => TwError::CflViolation { step },
            PhysicsError::NotImplemented { feature } => TwError::NotImplemented { feature },
        }
    }
}
