// crates/tw_foundation/src/error.rs

//! 统一错误类型
//!
//! 错误按可恢复性分两级：
//!
//! - **致命错误**（本类型）：配置不一致、网格非法、功能未实现等。
//!   一路向上传播到应用层，进程以非零码退出。
//! - **可局部恢复问题**：修正器系数矩阵病态（回退到平面修正）、
//!   首次 CFL 违例（时间步减半重试）。这些在组件内部处理，
//!   只通过 tracing 记录，不出现在函数签名里；重试耗尽后
//!   转化为 [`TwError::CflViolation`] 上抛。
//!
//! # 错误分层
//!
//! ```text
//! 应用层 (tw_cli, anyhow)
//!      ↑
//! 领域错误 (tw_config::ConfigError, tw_mesh::MeshError, ...)
//!      ↑ (转换)
//! 基础错误 ← 你在这里 (tw_foundation::TwError)
//! ```

use std::io;
use thiserror::Error;

/// 统一结果类型别名
pub type TwResult<T> = Result<T, TwError>;

/// 基础错误类型
///
/// 覆盖求解器核心的致命错误分类。高层 crate 的错误类型
/// 通过 `From` 转换收敛到这里。
#[derive(Debug, Error)]
pub enum TwError {
    /// 任务配置无效或不一致
    ///
    /// 未知模型、缺失材料、边界条件与模型不兼容、CFL 超界等。
    /// 任务校验阶段发现，致命。
    #[error("配置错误: {message}")]
    BadConfig {
        /// 说明无效原因
        message: String,
    },

    /// 三角剖分与网格分类不一致
    ///
    /// 例如一个单元被打上多个网格 id，或剖分文件本身损坏。致命。
    #[error("网格错误: {message}")]
    BadMesh {
        /// 说明不一致之处
        message: String,
    },

    /// 修正器系数矩阵病态
    ///
    /// 行列式低于自适应阈值。正常流程中由修正器内部回退处理，
    /// 只有在回退路径同样不可用时才作为错误上抛。
    #[error("病态系统: {context} (|det| = {determinant:.3e})")]
    IllConditioned {
        /// 发生位置（组件名）
        context: &'static str,
        /// 实测行列式绝对值
        determinant: f64,
    },

    /// CFL 条件违例且重试已耗尽
    ///
    /// 首次违例由驱动器减半时间步重试，第二次到达这里。致命。
    #[error("CFL 违例: 第 {step} 步重试后仍不稳定")]
    CflViolation {
        /// 发生违例的时间步编号
        step: usize,
    },

    /// 功能组合未实现
    ///
    /// 任务校验阶段拒绝的组合，如三维二阶分裂。
    #[error("功能未实现: {feature}")]
    NotImplemented {
        /// 未实现的功能描述
        feature: String,
    },

    /// IO 操作失败
    #[error("IO 错误: {message}")]
    Io {
        /// 可读的错误描述
        message: String,
        /// 底层 IO 错误源
        #[source]
        source: Option<io::Error>,
    },

    /// 数组大小不匹配
    #[error("大小不匹配: {name} 期望 {expected}, 实际 {actual}")]
    SizeMismatch {
        /// 数据名称
        name: &'static str,
        /// 期望大小
        expected: usize,
        /// 实际大小
        actual: usize,
    },

    /// 索引越界
    #[error("索引越界: {index_type} 索引 {index} 超出范围 0..{len}")]
    IndexOutOfBounds {
        /// 索引类别（如 "vertex", "cell"）
        index_type: &'static str,
        /// 访问的索引值
        index: usize,
        /// 容器长度
        len: usize,
    },

    /// 内部不变量被破坏
    #[error("内部错误: {message}")]
    Internal {
        /// 内部错误描述
        message: String,
    },
}

// ============================================================
// 便捷构造方法
// ============================================================

impl TwError {
    /// 创建配置错误
    #[inline]
    pub fn bad_config(message: impl Into<String>) -> Self {
        Self::BadConfig {
            message: message.into(),
        }
    }

    /// 创建网格错误
    #[inline]
    pub fn bad_mesh(message: impl Into<String>) -> Self {
        Self::BadMesh {
            message: message.into(),
        }
    }

    /// 创建病态系统错误
    #[inline]
    pub fn ill_conditioned(context: &'static str, determinant: f64) -> Self {
        Self::IllConditioned {
            context,
            determinant,
        }
    }

    /// 创建未实现错误
    #[inline]
    pub fn not_implemented(feature: impl Into<String>) -> Self {
        Self::NotImplemented {
            feature: feature.into(),
        }
    }

    /// 创建 IO 错误
    #[inline]
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            source: None,
        }
    }

    /// 创建内部错误
    #[inline]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// 校验数组大小，不匹配则返回 [`TwError::SizeMismatch`]
    #[inline]
    pub fn check_size(name: &'static str, expected: usize, actual: usize) -> TwResult<()> {
        if expected != actual {
            Err(Self::SizeMismatch {
                name,
                expected,
                actual,
            })
        } else {
            Ok(())
        }
    }

    /// 校验索引范围，越界则返回 [`TwError::IndexOutOfBounds`]
    #[inline]
    pub fn check_index(index_type: &'static str, index: usize, len: usize) -> TwResult<()> {
        if index >= len {
            Err(Self::IndexOutOfBounds {
                index_type,
                index,
                len,
            })
        } else {
            Ok(())
        }
    }
}

impl From<io::Error> for TwError {
    fn from(err: io::Error) -> Self {
        Self::Io {
            message: "IO 操作失败".to_string(),
            source: Some(err),
        }
    }
}

/// 条件不满足时提前返回错误
///
/// # 示例
///
/// ```
/// use tw_foundation::{ensure, TwError, TwResult};
///
/// fn positive(x: f64) -> TwResult<f64> {
///     ensure!(x > 0.0, TwError::bad_config("参数必须为正"));
///     Ok(x)
/// }
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            return Err($err);
        }
    };
}

// ============================================================
// 测试
// ============================================================
