// crates/tw_physics/src/rheology/gcm_matrix.rs

//! 特征矩阵三元组与共享矩阵表
//!
//! 对每个 (模型, 材料, 计算基) 组合，每个主方向存一组
//! `(A, L, U1, U)`：`A = U1 · diag(L) · U`，`U1` 列是右特征向量，
//! `U` 行是左特征串。均匀区域的节点通过内容寻址表共享同一份
//! 矩阵，节点只存 `u32` 索引。

use nalgebra::{SMatrix, SVector};
use std::collections::HashMap;
use tw_foundation::{TwResult, EQUALITY_TOLERANCE};
use tw_linal::ops::norm_max;

/// 单方向特征矩阵组
#[derive(Debug, Clone)]
pub struct GcmMatrix<const M: usize> {
    /// 方向通量雅可比
    pub a: SMatrix<f64, M, M>,
    /// 特征值（对角线）
    pub l: SVector<f64, M>,
    /// 右特征向量（按列）
    pub u1: SMatrix<f64, M, M>,
    /// 左特征串（按行）
    pub u: SMatrix<f64, M, M>,
}

impl<const M: usize> GcmMatrix<M> {
    /// 最大特征值绝对值
    pub fn max_eigenvalue(&self) -> f64 {
        self.l.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
    }

    /// 分解校验：`‖U1·diag(L)·U − A‖∞` 与 `‖U·U1 − I‖∞`
    ///
    /// 返回两者较大的残差。
    pub fn decomposition_residual(&self) -> f64 {
        let reconstructed = self.u1 * SMatrix::<f64, M, M>::from_diagonal(&self.l) * self.u;
        let residual_a = norm_max(&(reconstructed - self.a));
        let residual_i = norm_max(&(self.u * self.u1 - SMatrix::<f64, M, M>::identity()));
        residual_a.max(residual_i)
    }

    /// 按契约容差（`100 ε`）校验分解
    pub fn check_decomposition(&self) -> Result<(), f64> {
        let scale = 1.0_f64.max(norm_max(&self.a));
        let residual = self.decomposition_residual();
        if residual < 100.0 * EQUALITY_TOLERANCE * scale {
            Ok(())
        } else {
            Err(residual)
        }
    }
}

/// 一个 (模型, 材料, 计算基) 组合的全部方向矩阵
#[derive(Debug, Clone)]
pub struct GcmMatrices<const D: usize, const M: usize> {
    /// 计算基（列为方向）
    pub basis: SMatrix<f64, D, D>,
    /// 每个主方向一组
    pub stages: [GcmMatrix<M>; D],
    /// 缓存的最大特征值
    max_eigenvalue: f64,
}

impl<const D: usize, const M: usize> GcmMatrices<D, M> {
    /// 从方向矩阵组创建，缓存最大特征值
    pub fn new(basis: SMatrix<f64, D, D>, stages: [GcmMatrix<M>; D]) -> Self {
        let max_eigenvalue = stages
            .iter()
            .fold(0.0_f64, |acc, m| acc.max(m.max_eigenvalue()));
        Self {
            basis,
            stages,
            max_eigenvalue,
        }
    }

    /// 指定阶段的矩阵组
    #[inline]
    pub fn stage(&self, s: usize) -> &GcmMatrix<M> {
        &self.stages[s]
    }

    /// 全方向最大特征值绝对值（缓存）
    #[inline]
    pub fn max_eigenvalue(&self) -> f64 {
        self.max_eigenvalue
    }
}

// ============================================================
// 内容寻址矩阵表
// ============================================================

/// 矩阵表键：材料索引 + 基的位模式
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MatrixKey {
    material: u32,
    basis_bits: [u64; 9],
}

impl MatrixKey {
    fn new<const D: usize>(material: u32, basis: &SMatrix<f64, D, D>) -> Self {
        let mut basis_bits = [0u64; 9];
        for (k, v) in basis.iter().enumerate() {
            basis_bits[k] = v.to_bits();
        }
        Self {
            material,
            basis_bits,
        }
    }
}

/// 内容寻址的共享矩阵表
///
/// 键为 (材料索引, 计算基)；均匀区域整体命中一个条目。
/// 构建完成后只读，可跨线程共享。
#[derive(Debug, Default)]
pub struct MatrixStore<const D: usize, const M: usize> {
    entries: Vec<GcmMatrices<D, M>>,
    index: HashMap<MatrixKey, u32>,
    max_eigenvalue: f64,
}

impl<const D: usize, const M: usize> MatrixStore<D, M> {
    /// 创建空表
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            max_eigenvalue: 0.0,
        }
    }

    /// 查找或构建条目，返回索引
    ///
    /// `construct` 只在键未命中时被调用。
    pub fn intern<F>(
        &mut self,
        material: u32,
        basis: &SMatrix<f64, D, D>,
        construct: F,
    ) -> TwResult<u32>
    where
        F: FnOnce() -> TwResult<GcmMatrices<D, M>>,
    {
        let key = MatrixKey::new(material, basis);
        if let Some(&idx) = self.index.get(&key) {
            return Ok(idx);
        }
        let entry = construct()?;
        self.max_eigenvalue = self.max_eigenvalue.max(entry.max_eigenvalue());
        let idx = self.entries.len() as u32;
        self.entries.push(entry);
        self.index.insert(key, idx);
        Ok(idx)
    }

    /// 按索引访问
    #[inline]
    pub fn get(&self, idx: u32) -> &GcmMatrices<D, M> {
        &self.entries[idx as usize]
    }

    /// 条目数量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 全表最大特征值绝对值
    #[inline]
    pub fn max_eigenvalue(&self) -> f64 {
        self.max_eigenvalue
    }
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{SMatrix, SVector};

    fn trivial_matrix() -> GcmMatrix<2> {
        // A = diag(1, -1)，自身即特征分解
        GcmMatrix {
            a: SMatrix::<f64, 2, 2>::from_diagonal(&SVector::<f64, 2>::new(1.0, -1.0)),
            l: SVector::<f64, 2>::new(1.0, -1.0),
            u1: SMatrix::<f64, 2, 2>::identity(),
            u: SMatrix::<f64, 2, 2>::identity(),
        }
    }

    #[test]
    fn test_decomposition_residual() {
        let m = trivial_matrix();
        assert!(m.check_decomposition().is_ok());

        let mut bad = trivial_matrix();
        bad.a[(0, 1)] = 0.5;
        assert!(bad.check_decomposition().is_err());
    }

    #[test]
    fn test_max_eigenvalue_cached() {
        let gm = GcmMatrices::<1, 2>::new(
            SMatrix::<f64, 1, 1>::identity(),
            [trivial_matrix()],
        );
        assert_eq!(gm.max_eigenvalue(), 1.0);
    }

    #[test]
    fn test_store_dedup() {
        let mut store = MatrixStore::<1, 2>::new();
        let basis = SMatrix::<f64, 1, 1>::identity();
        let make = || {
            Ok(GcmMatrices::new(
                SMatrix::<f64, 1, 1>::identity(),
                [trivial_matrix()],
            ))
        };
        let a = store.intern(0, &basis, make).unwrap();
        let b = store.intern(0, &basis, make).unwrap();
        assert_eq!(a, b, "同键必须命中同一条目");
        assert_eq!(store.len(), 1);

        let c = store.intern(1, &basis, make).unwrap();
        assert_ne!(a, c);
        assert_eq!(store.len(), 2);
        assert_eq!(store.max_eigenvalue(), 1.0);
    }
}
