// crates/tw_physics/src/numerics/mod.rs

//! 数值工具
//!
//! 单纯形内插值与逐顶点最小二乘梯度重建。

pub mod gradient;
pub mod interpolation;
