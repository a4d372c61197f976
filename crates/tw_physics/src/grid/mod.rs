// crates/tw_physics/src/grid/mod.rs

//! 网格层
//!
//! 两类网格：轴对齐张量积的立方网格（索引算术即邻接）
//! 与包装全局剖分的单纯形网格（顶点归属 + 几何查询）。

pub mod cubic;
pub mod simplex;

pub use cubic::CubicGrid;
pub use simplex::SimplexGrid;
