// crates/tw_physics/src/lib.rs

//! TerraWave 物理求解层
//!
//! 网格特征法（grid-characteristic method）求解弹性/声学波动方程：
//! 每个时间步按方向分裂成一维问题，沿特征线回溯并用高阶插值
//! 重建状态，边界与接触节点通过外行波子空间的小规模线性修正
//! 满足边界/接触条件。
//!
//! # 模块概览
//!
//! - [`types`]: 物理量、波型、边界/接触条件等封闭枚举
//! - [`rheology`]: 材料、特征矩阵三元组、弹性/声学模型
//! - [`state`]: 按节点的 PDE 状态容器（SoA，多时间层）
//! - [`grid`]: 结构化立方网格与单纯形网格
//! - [`numerics`]: 单纯形插值器与逐顶点最小二乘梯度
//! - [`gcm`]: 两类网格上的特征步
//! - [`corrector`]: 边界修正器与接触修正器
//! - [`engine`]: CFL 时间步控制与方向分裂驱动
//!
//! # 并发模型
//!
//! 矩阵表与材料表构建后只读；逐节点可变状态按顶点索引分块。
//! 波速/网格尺寸归约用 rayon 并行，修正器串行处理短列表。

#![warn(clippy::all)]

pub mod corrector;
pub mod engine;
pub mod error;
pub mod gcm;
pub mod grid;
pub mod numerics;
pub mod rheology;
pub mod state;
pub mod types;

pub use engine::{
    CflCalculator, CubicEngine, SimplexBody, SimplexEngine, Simulation,
};
pub use engine::cubic_engine::{CubicBorderCondition, CubicFracture};
pub use engine::simplex_engine::BorderPatchSpec;
pub use error::PhysicsError;
pub use grid::{CubicGrid, SimplexGrid};
pub use rheology::gcm_matrix::{GcmMatrices, GcmMatrix, MatrixStore};
pub use rheology::materials::{IsotropicMaterial, Material, OrthotropicMaterial};
pub use rheology::models::{
    Acoustic1d, Acoustic2d, Acoustic3d, Elastic1d, Elastic2d, Elastic3d, WaveModel,
};
pub use state::PdeStorage;
pub use types::{
    Area, BorderKind, ContactKind, GcmMode, NodeKind, PhysicalQuantity, SplittingKind,
    TimeDependency, WaveKind,
};
