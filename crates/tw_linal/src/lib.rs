// crates/tw_linal/src/lib.rs

//! TerraWave 小型稠密线性代数层
//!
//! 在 nalgebra 定长类型之上提供求解器需要的补充运算：
//!
//! - [`solve`]: 行列式、求逆、线性求解（1~3 阶闭式，4~9 阶部分主元消元）
//! - [`geometry`]: 重心坐标、直线/平面求交、单纯形最小高、局部正交基
//! - [`ops`]: 对角乘积、最大范数、min-max 限制器、对称矩阵压缩索引
//!
//! 维度全部走 const 泛型，维度不匹配是编译期错误。
//! 数值奇异通过 `Option` 返回，由调用方决定回退策略。

#![warn(clippy::all)]

pub mod geometry;
pub mod ops;
pub mod solve;

pub use nalgebra;

use nalgebra::{SMatrix, SVector};

/// 标量类型
pub type Real = f64;

/// 定长实向量
pub type RealV<const N: usize> = SVector<f64, N>;
/// 定长实矩阵
pub type RealM<const R: usize, const C: usize> = SMatrix<f64, R, C>;

/// 二维点/向量
pub type Real2 = SVector<f64, 2>;
/// 三维点/向量
pub type Real3 = SVector<f64, 3>;
/// 四维向量（四面体重心坐标）
pub type Real4 = SVector<f64, 4>;

/// 2x2 矩阵
pub type Matrix22 = SMatrix<f64, 2, 2>;
/// 3x3 矩阵
pub type Matrix33 = SMatrix<f64, 3, 3>;

pub use geometry::{
    barycentric_tetrahedron, barycentric_triangle, lines_intersection,
    line_with_plane_intersection, local_basis_1d, local_basis_2d, local_basis_3d,
    minimal_height_tetrahedron, minimal_height_triangle, opposite_edge_normal_2d,
    opposite_face_normal_3d, perpendicular_clockwise,
};
pub use ops::{approx_eq_matrix, clamp_between, diagonal_multiply, norm_max, sym_index};
pub use solve::{determinant, invert, solve};
