// crates/tw_physics/src/rheology/models/mod.rs

//! 波动模型
//!
//! 模型决定 PDE 向量宽度 `M`、暴露的物理量子集、以及
//! PDE 状态与特征不变量之间的公式。维度 `D`、宽度 `M`、
//! 外行特征数 `K` 走 const 泛型；顶层按运行时标签选择一次
//! 具体模型后，热路径完全单态化。

pub mod acoustic;
pub mod elastic;
mod orthotropic;

pub use acoustic::{Acoustic1d, Acoustic2d, Acoustic3d};
pub use elastic::{Elastic1d, Elastic2d, Elastic3d};

use crate::rheology::gcm_matrix::{GcmMatrices, GcmMatrix};
use crate::rheology::materials::Material;
use crate::types::{BorderKind, ContactKind, PhysicalQuantity, WaveKind};
use nalgebra::{SMatrix, SVector};
use tw_foundation::{TwError, TwResult};
use tw_linal::geometry::{local_basis_1d, local_basis_2d, local_basis_3d};

/// 边界条件的线性泛函类别
///
/// [`BorderKind`] 四个条件归并到两类泛函：
/// 面力类（FixedForce / FreeBorder）与速度类（FixedVelocity）；
/// NonReflection 在修正器里直接作用于不变量，不经过泛函矩阵。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderFunctional {
    /// 提取 σ·ν（弹性）或压力（声学）
    Traction,
    /// 提取速度（弹性全分量，声学法向分量）
    Velocity,
}

/// 波动模型
///
/// `D` 空间维度，`M` PDE 向量宽度，`K` 同号特征数
/// （即边界节点的外行特征数）。
pub trait WaveModel<const D: usize, const M: usize, const K: usize>:
    Send + Sync + 'static
{
    /// 模型名（错误信息与日志用）
    const NAME: &'static str;

    /// 正特征值不变量序号，升序
    const LEFT_INVARIANTS: [usize; K];
    /// 负特征值不变量序号，升序
    const RIGHT_INVARIANTS: [usize; K];

    /// 沿基最后一列方向构造单方向特征矩阵组
    ///
    /// `scale` 是沿波传播方向的变量变换尺度（通常为 1）。
    fn construct_gcm_matrix(
        material: &Material,
        basis: &SMatrix<f64, D, D>,
        scale: f64,
    ) -> TwResult<GcmMatrix<M>>;

    /// 给定计算基，构造 D 个方向的矩阵组
    fn construct_gcm_matrices(
        material: &Material,
        basis: &SMatrix<f64, D, D>,
    ) -> TwResult<GcmMatrices<D, M>> {
        let mut stages = Vec::with_capacity(D);
        for i in 0..D {
            let n: SVector<f64, D> = basis.column(i).clone_owned();
            let local = local_basis(&n);
            stages.push(Self::construct_gcm_matrix(material, &local, 1.0)?);
        }
        let stages: [GcmMatrix<M>; D] = stages
            .try_into()
            .map_err(|_| TwError::internal("方向矩阵组长度不等于维度"))?;
        Ok(GcmMatrices::new(*basis, stages))
    }

    /// 命名波到 `u1` 列号的映射（公共契约）
    ///
    /// 列布局随材料类别不同（正交各向异性的波速升序排列），
    /// 因此映射以材料为参数。
    fn wave_column(material: &Material, wave: WaveKind) -> Option<usize>;

    /// 局部基形式的边界条件矩阵
    fn border_matrix(
        functional: BorderFunctional,
        normal: &SVector<f64, D>,
    ) -> SMatrix<f64, K, M>;

    /// 全局基形式的边界条件矩阵
    fn border_matrix_global(
        functional: BorderFunctional,
        normal: &SVector<f64, D>,
    ) -> SMatrix<f64, K, M>;

    /// 平面边界修正：直接改写条件命名的分量
    ///
    /// 把 PDE 向量旋到法向局部基，覆盖条件给定的分量，再转回。
    /// 特征修正退化时的回退路径。
    fn plain_border_correction(
        u: &mut SVector<f64, M>,
        kind: BorderKind,
        normal: &SVector<f64, D>,
        b: &SVector<f64, K>,
    );

    /// 平面接触修正：双侧平均
    fn plain_contact_correction_avg(
        ua: &mut SVector<f64, M>,
        ub: &mut SVector<f64, M>,
        kind: ContactKind,
        normal: &SVector<f64, D>,
    );

    /// 平面接触修正：仅 A 侧取 B 侧的连续量
    fn plain_contact_correction_one_sided(
        ua: &mut SVector<f64, M>,
        ub: &SVector<f64, M>,
        kind: ContactKind,
        normal: &SVector<f64, D>,
    );

    /// 读物理量；模型不暴露该量时为 `None`
    fn get_quantity(q: PhysicalQuantity, u: &SVector<f64, M>) -> Option<f64>;

    /// 写物理量；模型不暴露该量时返回 `false`
    fn set_quantity(q: PhysicalQuantity, value: f64, u: &mut SVector<f64, M>) -> bool;

    /// 模型是否支持该接触条件
    fn supports_contact(kind: ContactKind) -> bool;
}

/// 以给定方向为最后一列的局部正交基（按维度分派）
pub fn local_basis<const D: usize>(n: &SVector<f64, D>) -> SMatrix<f64, D, D> {
    let mut out = SMatrix::<f64, D, D>::zeros();
    match D {
        1 => {
            let b = local_basis_1d(&SVector::<f64, 1>::new(n[0]));
            out[(0, 0)] = b[(0, 0)];
        }
        2 => {
            let b = local_basis_2d(&SVector::<f64, 2>::new(n[0], n[1]));
            for i in 0..2 {
                for j in 0..2 {
                    out[(i, j)] = b[(i, j)];
                }
            }
        }
        3 => {
            let b = local_basis_3d(&SVector::<f64, 3>::new(n[0], n[1], n[2]));
            for i in 0..3 {
                for j in 0..3 {
                    out[(i, j)] = b[(i, j)];
                }
            }
        }
        _ => unreachable!("模型维度只支持 1、2、3"),
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_basis_dispatch() {
        let b = local_basis(&SVector::<f64, 2>::new(0.0, 1.0));
        // 方向在最后一列
        assert!((b[(0, 1)] - 0.0).abs() < 1e-14);
        assert!((b[(1, 1)] - 1.0).abs() < 1e-14);

        let b3 = local_basis(&SVector::<f64, 3>::new(1.0, 0.0, 0.0));
        assert!((b3.column(2) - SVector::<f64, 3>::new(1.0, 0.0, 0.0)).norm() < 1e-14);
    }
}
