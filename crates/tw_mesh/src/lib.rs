// crates/tw_mesh/src/lib.rs

//! TerraWave 网格层
//!
//! 单纯形剖分的平坦数组实现及其几何查询。
//! 剖分对上层是黑盒：物理层只依赖这里暴露的小接口
//! （顶点/单元迭代、顶点关联单元、带提示的点定位、有序射线行走）。
//!
//! # 模块概览
//!
//! - [`triangulation`]: 剖分结构本体与点定位
//! - [`walk`]: 沿射线有序枚举穿越单元
//! - [`builder`]: 从点/单元列表构建剖分（邻接解析、关联表）
//! - [`generation`]: 矩形/长方体均匀剖分（外部网格生成器的替身）
//! - [`inm`]: INM 四面体网格文件加载
//!
//! # 约定
//!
//! - 单元顶点与邻接用跨度 `D+1` 的平坦数组存储，`u32::MAX` 哨兵表示
//!   "无邻接"（凸包外侧）
//! - 每个单元恰好有一个属主网格 id；[`EMPTY_SPACE`] 表示空域单元。
//!   凸包外侧视同空域

#![warn(clippy::all)]

pub mod builder;
pub mod error;
pub mod generation;
pub mod inm;
pub mod triangulation;
pub mod walk;

pub use builder::TriangulationBuilder;
pub use error::MeshError;
pub use triangulation::{GridId, Triangulation, EMPTY_SPACE, NO_CELL};
pub use walk::WalkCell;
