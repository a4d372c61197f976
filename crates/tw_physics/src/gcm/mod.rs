// crates/tw_physics/src/gcm/mod.rs

//! 网格特征法的核心步
//!
//! 立方网格版：沿轴一维回溯 + 定模板 Lagrange 插值。
//! 单纯形网格版：任意方向回溯 + 单元定位 + 空间/时空插值。

pub mod cubic;
pub mod simplex;
