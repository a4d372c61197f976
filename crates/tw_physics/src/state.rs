// crates/tw_physics/src/state.rs

//! 按节点的 PDE 状态容器
//!
//! SoA 布局：当前层、若干下一层、矩阵表索引、材料索引、
//! 可选的 ODE 标量。sum 分裂每个阶段一个下一层槽位，
//! product 分裂只有一个。节点间数据按索引分块，
//! 并行写入互不重叠。

use nalgebra::SVector;
use tw_foundation::{TwError, TwResult};

/// PDE 状态存储
#[derive(Debug, Clone)]
pub struct PdeStorage<const M: usize> {
    /// 当前层
    pde: Vec<SVector<f64, M>>,
    /// 下一层（层号 × 节点）
    pde_next: Vec<Vec<SVector<f64, M>>>,
    /// 特征矩阵表索引
    matrix_idx: Vec<u32>,
    /// 材料表索引
    material_idx: Vec<u32>,
    /// 可选 ODE 标量（损伤等内变量）
    ode: Option<Vec<f64>>,
    /// 外行不变量记录（阶段内有效，边界/接触节点使用）
    outer_invariants: Vec<Vec<usize>>,
}

impl<const M: usize> PdeStorage<M> {
    /// 创建存储
    ///
    /// `n_layers` 是下一层槽位数：sum 分裂取维度数，product 取 1。
    pub fn new(n_nodes: usize, n_layers: usize, with_ode: bool) -> Self {
        assert!(n_layers >= 1, "至少需要一个下一层槽位");
        Self {
            pde: vec![SVector::zeros(); n_nodes],
            pde_next: vec![vec![SVector::zeros(); n_nodes]; n_layers],
            matrix_idx: vec![0; n_nodes],
            material_idx: vec![0; n_nodes],
            ode: with_ode.then(|| vec![0.0; n_nodes]),
            outer_invariants: vec![Vec::new(); n_nodes],
        }
    }

    /// 节点数量
    #[inline]
    pub fn len(&self) -> usize {
        self.pde.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.pde.is_empty()
    }

    /// 下一层槽位数量
    #[inline]
    pub fn n_layers(&self) -> usize {
        self.pde_next.len()
    }

    /// 当前层读取
    #[inline]
    pub fn pde(&self, i: usize) -> &SVector<f64, M> {
        &self.pde[i]
    }

    /// 当前层写入
    #[inline]
    pub fn pde_mut(&mut self, i: usize) -> &mut SVector<f64, M> {
        &mut self.pde[i]
    }

    /// 当前层整体只读视图
    #[inline]
    pub fn pde_all(&self) -> &[SVector<f64, M>] {
        &self.pde
    }

    /// 下一层读取
    #[inline]
    pub fn pde_next(&self, layer: usize, i: usize) -> &SVector<f64, M> {
        &self.pde_next[layer][i]
    }

    /// 下一层写入
    #[inline]
    pub fn pde_next_mut(&mut self, layer: usize, i: usize) -> &mut SVector<f64, M> {
        &mut self.pde_next[layer][i]
    }

    /// 下一层整体可变视图（并行分块写入用）
    #[inline]
    pub fn pde_next_all_mut(&mut self, layer: usize) -> &mut [SVector<f64, M>] {
        &mut self.pde_next[layer]
    }

    /// 当前层与下一层的分离借用（时空插值要同时读两层）
    #[inline]
    pub fn current_and_next_mut(
        &mut self,
        layer: usize,
    ) -> (&[SVector<f64, M>], &mut [SVector<f64, M>]) {
        (&self.pde, &mut self.pde_next[layer])
    }

    /// 特征步需要的分离借用：当前层、下一层、矩阵索引
    #[allow(clippy::type_complexity)]
    pub fn stage_parts_mut(
        &mut self,
        layer: usize,
    ) -> (&[SVector<f64, M>], &mut [SVector<f64, M>], &[u32]) {
        (&self.pde, &mut self.pde_next[layer], &self.matrix_idx)
    }

    /// 单纯形特征步的分离借用：另含外行不变量记录
    #[allow(clippy::type_complexity)]
    pub fn simplex_stage_parts(
        &mut self,
        layer: usize,
    ) -> (
        &[SVector<f64, M>],
        &mut [SVector<f64, M>],
        &[u32],
        &mut [Vec<usize>],
    ) {
        (
            &self.pde,
            &mut self.pde_next[layer],
            &self.matrix_idx,
            &mut self.outer_invariants,
        )
    }

    /// 交换当前层与指定下一层
    pub fn swap_layer(&mut self, layer: usize) {
        std::mem::swap(&mut self.pde, &mut self.pde_next[layer]);
    }

    /// 把所有下一层的平均写入当前层（sum 分裂收尾）
    pub fn average_next_into_current(&mut self) {
        let factor = 1.0 / self.pde_next.len() as f64;
        for i in 0..self.pde.len() {
            let mut acc = SVector::<f64, M>::zeros();
            for layer in &self.pde_next {
                acc += layer[i];
            }
            self.pde[i] = acc * factor;
        }
    }

    /// 矩阵表索引
    #[inline]
    pub fn matrix_idx(&self, i: usize) -> u32 {
        self.matrix_idx[i]
    }

    /// 设置矩阵表索引
    #[inline]
    pub fn set_matrix_idx(&mut self, i: usize, idx: u32) {
        self.matrix_idx[i] = idx;
    }

    /// 材料表索引
    #[inline]
    pub fn material_idx(&self, i: usize) -> u32 {
        self.material_idx[i]
    }

    /// 设置材料表索引
    #[inline]
    pub fn set_material_idx(&mut self, i: usize, idx: u32) {
        self.material_idx[i] = idx;
    }

    /// ODE 标量读取
    pub fn ode(&self, i: usize) -> Option<f64> {
        self.ode.as_ref().map(|v| v[i])
    }

    /// ODE 标量写入；未启用 ODE 时报错
    pub fn set_ode(&mut self, i: usize, value: f64) -> TwResult<()> {
        match &mut self.ode {
            Some(v) => {
                v[i] = value;
                Ok(())
            }
            None => Err(TwError::internal("存储未启用 ODE 槽位")),
        }
    }

    /// 是否携带 ODE
    pub fn has_ode(&self) -> bool {
        self.ode.is_some()
    }

    /// 节点整体复制：所有逐节点字段一次搬运
    ///
    /// 裂缝辅助网格把物理上连续的节点复制过去时不会出现
    /// 字段间错位。
    pub fn copy_node(&mut self, from: usize, to: usize) {
        self.pde[to] = self.pde[from];
        for layer in &mut self.pde_next {
            layer[to] = layer[from];
        }
        self.matrix_idx[to] = self.matrix_idx[from];
        self.material_idx[to] = self.material_idx[from];
        if let Some(ode) = &mut self.ode {
            ode[to] = ode[from];
        }
    }

    /// 记录节点的外行不变量序号（阶段内）
    pub fn set_outer_invariants(&mut self, i: usize, outers: Vec<usize>) {
        self.outer_invariants[i] = outers;
    }

    /// 读取节点的外行不变量序号
    #[inline]
    pub fn outer_invariants(&self, i: usize) -> &[usize] {
        &self.outer_invariants[i]
    }

    /// 清空全部外行不变量记录（阶段开始时）
    pub fn clear_outer_invariants(&mut self) {
        for v in &mut self.outer_invariants {
            v.clear();
        }
    }

    /// 重分配到新的节点数
    ///
    /// 扩张补零，收缩截断；所有逐节点字段同步变化。
    pub fn resize(&mut self, n_nodes: usize) {
        self.pde.resize(n_nodes, SVector::zeros());
        for layer in &mut self.pde_next {
            layer.resize(n_nodes, SVector::zeros());
        }
        self.matrix_idx.resize(n_nodes, 0);
        self.material_idx.resize(n_nodes, 0);
        if let Some(ode) = &mut self.ode {
            ode.resize(n_nodes, 0.0);
        }
        self.outer_invariants.resize(n_nodes, Vec::new());
    }

    /// 当前层快照（时间步重试用）
    pub fn snapshot_current(&self) -> Vec<SVector<f64, M>> {
        self.pde.clone()
    }

    /// 从快照恢复当前层
    pub fn restore_current(&mut self, snapshot: &[SVector<f64, M>]) {
        self.pde.copy_from_slice(snapshot);
    }

    /// 新层全部有限性检查（CFL 监控）
    pub fn layer_is_finite(&self, layer: usize) -> bool {
        self.pde_next[layer]
            .iter()
            .all(|u| u.iter().all(|x| x.is_finite()))
    }

    /// 当前层有限性检查
    pub fn current_is_finite(&self) -> bool {
        self.pde.iter().all(|u| u.iter().all(|x| x.is_finite()))
    }
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layers_and_swap() {
        let mut s = PdeStorage::<3>::new(4, 2, false);
        s.pde_mut(1)[0] = 7.0;
        s.pde_next_mut(0, 1)[0] = 9.0;
        s.swap_layer(0);
        assert_eq!(s.pde(1)[0], 9.0);
        assert_eq!(s.pde_next(0, 1)[0], 7.0);
    }

    #[test]
    fn test_average_next() {
        let mut s = PdeStorage::<2>::new(2, 2, false);
        s.pde_next_mut(0, 0)[0] = 2.0;
        s.pde_next_mut(1, 0)[0] = 4.0;
        s.average_next_into_current();
        assert_eq!(s.pde(0)[0], 3.0);
    }

    #[test]
    fn test_copy_node_atomic() {
        let mut s = PdeStorage::<2>::new(3, 1, true);
        s.pde_mut(0)[1] = 5.0;
        s.set_matrix_idx(0, 3);
        s.set_material_idx(0, 2);
        s.set_ode(0, 0.5).unwrap();
        s.copy_node(0, 2);
        assert_eq!(s.pde(2)[1], 5.0);
        assert_eq!(s.matrix_idx(2), 3);
        assert_eq!(s.material_idx(2), 2);
        assert_eq!(s.ode(2), Some(0.5));
    }

    #[test]
    fn test_ode_disabled() {
        let mut s = PdeStorage::<2>::new(1, 1, false);
        assert!(!s.has_ode());
        assert!(s.set_ode(0, 1.0).is_err());
        assert_eq!(s.ode(0), None);
    }

    #[test]
    fn test_resize() {
        let mut s = PdeStorage::<2>::new(2, 1, true);
        s.pde_mut(1)[0] = 3.0;
        s.resize(5);
        assert_eq!(s.len(), 5);
        assert_eq!(s.pde(1)[0], 3.0);
        assert_eq!(s.pde(4)[0], 0.0);
        s.resize(1);
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_outer_invariants() {
        let mut s = PdeStorage::<2>::new(2, 1, false);
        s.set_outer_invariants(0, vec![1, 3]);
        assert_eq!(s.outer_invariants(0), &[1, 3]);
        s.clear_outer_invariants();
        assert!(s.outer_invariants(0).is_empty());
    }

    #[test]
    fn test_finite_check() {
        let mut s = PdeStorage::<2>::new(2, 1, false);
        assert!(s.layer_is_finite(0));
        s.pde_next_mut(0, 1)[0] = f64::NAN;
        assert!(!s.layer_is_finite(0));
    }
}
