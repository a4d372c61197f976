// crates/tw_foundation/src/lib.rs

//! TerraWave 基础层
//!
//! 零业务依赖的基础抽象，供整个工作区使用。
//!
//! # 模块概览
//!
//! - [`error`]: 统一错误类型与错误分级策略
//! - [`tolerance`]: 浮点容差常量与近似比较
//! - [`reduce`]: 并行归约用的原子浮点工具
//!
//! # 设计原则
//!
//! 1. **纯净性**: 仅依赖 thiserror，不引入网格、物理等高层概念
//! 2. **可恢复性分级**: 致命错误走 [`TwError`]，可局部恢复的问题由各组件
//!    内部处理并记录日志（见 error 模块文档）
//! 3. **零开销**: release 模式下工具函数全部可内联

#![warn(clippy::all)]

pub mod error;
pub mod reduce;
pub mod tolerance;

pub use error::{TwError, TwResult};
pub use tolerance::EQUALITY_TOLERANCE;

/// Prelude 模块，包含常用类型
pub mod prelude {
    pub use crate::error::{TwError, TwResult};
    pub use crate::reduce::{AtomicF64Max, AtomicF64Min};
    pub use crate::tolerance::{approx_eq, approx_zero, EQUALITY_TOLERANCE};
}
