// crates/tw_physics/src/rheology/mod.rs

//! 流变学层
//!
//! 材料参数、单方向通量雅可比的特征三元组 `(U, L, U⁻¹)`、
//! 以及各模型的构造公式。

pub mod gcm_matrix;
pub mod materials;
pub mod models;
