// crates/tw_physics/src/grid/simplex.rs

//! 单纯形网格
//!
//! 包装全局剖分中属于本物体的那部分：顶点归属列表、
//! 节点分类、法线估计、射线行走/点定位的过滤视图。
//! 网格之间可以共享顶点（材料界面），但单元归属互斥。

use crate::types::NodeKind;
use nalgebra::SVector;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use tw_foundation::{TwError, TwResult};
use tw_mesh::{GridId, Triangulation, WalkCell, EMPTY_SPACE};

/// 单纯形网格
#[derive(Debug, Clone)]
pub struct SimplexGrid<const D: usize> {
    /// 本网格 id
    id: GridId,
    /// 全局剖分（多网格共享）
    tri: Arc<Triangulation<D>>,
    /// 本网格拥有的全局顶点（局部索引 -> 全局索引）
    vertex_handles: Vec<u32>,
    /// 全局顶点 -> 局部索引
    local_of_global: HashMap<u32, u32>,
    /// 本网格拥有的单元
    cell_handles: Vec<u32>,
    /// 节点分类
    node_kinds: Vec<NodeKind>,
    /// 体内节点局部索引
    inner_indices: Vec<u32>,
    /// 边界节点局部索引
    border_indices: Vec<u32>,
    /// 接触节点局部索引（含多体接触）
    contact_indices: Vec<u32>,
    /// 全网格单元最小高
    min_height: f64,
    /// 全网格单元平均最小高
    average_height: f64,
}

impl<const D: usize> SimplexGrid<D> {
    /// 从剖分构建 id 对应的网格
    pub fn new(id: GridId, tri: Arc<Triangulation<D>>) -> TwResult<Self> {
        if id == EMPTY_SPACE {
            return Err(TwError::bad_mesh("空域标志不能作为网格 id".to_string()));
        }

        // 收集归属单元与顶点
        let mut cell_handles = Vec::new();
        let mut vertex_handles = Vec::new();
        let mut local_of_global = HashMap::new();
        let mut height_sum = 0.0;
        let mut min_height = f64::MAX;
        for c in 0..tri.n_cells() as u32 {
            if tri.grid_id(c) != id {
                continue;
            }
            cell_handles.push(c);
            let h = tri.cell_min_height(c);
            if h < min_height {
                min_height = h;
            }
            height_sum += h;
            for &v in tri.cell_vertices(c) {
                local_of_global.entry(v).or_insert_with(|| {
                    vertex_handles.push(v);
                    (vertex_handles.len() - 1) as u32
                });
            }
        }
        if cell_handles.is_empty() {
            return Err(TwError::bad_mesh(format!("网格 {} 没有任何单元", id)));
        }
        let average_height = height_sum / cell_handles.len() as f64;

        // 节点分类
        let mut node_kinds = Vec::with_capacity(vertex_handles.len());
        let mut inner_indices = Vec::new();
        let mut border_indices = Vec::new();
        let mut contact_indices = Vec::new();
        for (local, &global) in vertex_handles.iter().enumerate() {
            let mut others = tri.grids_around_vertex(global);
            others.retain(|&g| g != id);
            let kind = if others.is_empty() {
                NodeKind::Inner
            } else if others.len() > 1 {
                NodeKind::MultiContact
            } else if others[0] == EMPTY_SPACE {
                NodeKind::Border
            } else {
                NodeKind::Contact
            };
            node_kinds.push(kind);
            match kind {
                NodeKind::Inner => inner_indices.push(local as u32),
                NodeKind::Border => border_indices.push(local as u32),
                NodeKind::Contact | NodeKind::MultiContact => {
                    contact_indices.push(local as u32)
                }
            }
        }

        info!(
            grid = id,
            vertices = vertex_handles.len(),
            cells = cell_handles.len(),
            inner = inner_indices.len(),
            border = border_indices.len(),
            contact = contact_indices.len(),
            "单纯形网格构建完成"
        );

        Ok(Self {
            id,
            tri,
            vertex_handles,
            local_of_global,
            cell_handles,
            node_kinds,
            inner_indices,
            border_indices,
            contact_indices,
            min_height,
            average_height,
        })
    }

    /// 网格 id
    #[inline]
    pub fn id(&self) -> GridId {
        self.id
    }

    /// 底层剖分
    #[inline]
    pub fn triangulation(&self) -> &Triangulation<D> {
        &self.tri
    }

    /// 顶点数量
    #[inline]
    pub fn n_vertices(&self) -> usize {
        self.vertex_handles.len()
    }

    /// 归属单元列表
    #[inline]
    pub fn cells(&self) -> &[u32] {
        &self.cell_handles
    }

    /// 局部 -> 全局顶点索引
    #[inline]
    pub fn global_vertex(&self, local: u32) -> u32 {
        self.vertex_handles[local as usize]
    }

    /// 全局 -> 局部顶点索引
    #[inline]
    pub fn local_vertex(&self, global: u32) -> Option<u32> {
        self.local_of_global.get(&global).copied()
    }

    /// 顶点坐标
    #[inline]
    pub fn coords(&self, local: u32) -> SVector<f64, D> {
        self.tri.coords(self.global_vertex(local))
    }

    /// 节点分类
    #[inline]
    pub fn node_kind(&self, local: u32) -> NodeKind {
        self.node_kinds[local as usize]
    }

    /// 体内节点
    #[inline]
    pub fn inner_vertices(&self) -> &[u32] {
        &self.inner_indices
    }

    /// 边界节点
    #[inline]
    pub fn border_vertices(&self) -> &[u32] {
        &self.border_indices
    }

    /// 接触节点（含多体接触）
    #[inline]
    pub fn contact_vertices(&self) -> &[u32] {
        &self.contact_indices
    }

    /// 最小单元高
    #[inline]
    pub fn min_height(&self) -> f64 {
        self.min_height
    }

    /// 平均单元高
    #[inline]
    pub fn average_height(&self) -> f64 {
        self.average_height
    }

    /// 单元是否归属本网格
    #[inline]
    pub fn owns_cell(&self, c: u32) -> bool {
        self.tri.grid_id(c) == self.id
    }

    /// 顶点的归属单元
    pub fn incident_cells(&self, local: u32) -> Vec<u32> {
        self.tri
            .incident_cells(self.global_vertex(local))
            .iter()
            .copied()
            .filter(|&c| self.owns_cell(c))
            .collect()
    }

    /// 与顶点共单元的本网格顶点（梯度估计的直接邻居）
    pub fn neighbor_vertices(&self, local: u32) -> Vec<u32> {
        let mut out = Vec::new();
        for c in self.incident_cells(local) {
            for &gv in self.tri.cell_vertices(c) {
                if let Some(lv) = self.local_vertex(gv) {
                    if lv != local && !out.contains(&lv) {
                        out.push(lv);
                    }
                }
            }
        }
        out
    }

    /// 按谓词聚合的外法线
    ///
    /// 对顶点所有归属单元的边界面（面外单元 id 满足谓词且面
    /// 包含该顶点）取外法线平均。无匹配面返回零向量。
    pub fn normal_by<F>(&self, local: u32, pred: F) -> SVector<f64, D>
    where
        F: Fn(GridId) -> bool,
    {
        let global = self.global_vertex(local);
        let mut acc = SVector::<f64, D>::zeros();
        let mut found = false;
        for c in self.incident_cells(local) {
            let verts = self.tri.cell_vertices(c);
            for i in 0..=D {
                if verts[i] == global {
                    continue; // 与 i 相对的面不含该顶点
                }
                let outer = self.tri.neighbor_grid_id(c, i);
                if outer != self.id && pred(outer) {
                    acc += self.tri.face_outward_normal(c, i);
                    found = true;
                }
            }
        }
        if !found || acc.norm() == 0.0 {
            return SVector::zeros();
        }
        acc.normalize()
    }

    /// 自由边界外法线
    pub fn border_normal(&self, local: u32) -> SVector<f64, D> {
        self.normal_by(local, |g| g == EMPTY_SPACE)
    }

    /// 与指定网格的接触面外法线
    pub fn contact_normal(&self, local: u32, other: GridId) -> SVector<f64, D> {
        self.normal_by(local, |g| g == other)
    }

    /// 对所有相邻网格与空域的公共外法线
    pub fn common_normal(&self, local: u32) -> SVector<f64, D> {
        self.normal_by(local, |_| true)
    }

    /// 接触顶点对面的唯一网格 id
    pub fn contact_grid_id(&self, local: u32) -> TwResult<GridId> {
        let mut others = self.tri.grids_around_vertex(self.global_vertex(local));
        others.retain(|&g| g != self.id && g != EMPTY_SPACE);
        match others.as_slice() {
            [unique] => Ok(*unique),
            [] => Err(TwError::bad_mesh(format!(
                "顶点 {} 不是接触节点",
                local
            ))),
            _ => Err(TwError::bad_mesh(format!(
                "顶点 {} 是多体接触节点，接触对不唯一",
                local
            ))),
        }
    }

    /// 射线行走定位（有序穿越）
    pub fn find_cell_crossed_by_ray(&self, local: u32, shift: &SVector<f64, D>) -> WalkCell {
        self.tri
            .walk_from_vertex(self.global_vertex(local), shift, |c| self.owns_cell(c))
    }

    /// 点定位回退（可见性行走，不保证穿越顺序）
    pub fn locate_owner_cell(&self, local: u32, shift: &SVector<f64, D>) -> Option<u32> {
        let global = self.global_vertex(local);
        let hint = *self
            .tri
            .incident_cells(global)
            .iter()
            .find(|&&c| self.owns_cell(c))?;
        let q = self.tri.coords(global) + shift;
        let found = self.tri.locate(&q, hint)?;
        self.owns_cell(found).then_some(found)
    }
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tw_mesh::generation::generate_rectangle;

    fn two_body_grid() -> (Arc<Triangulation<2>>, SimplexGrid<2>, SimplexGrid<2>) {
        // [0,1]x[0,2]，y=1 为界的两个物体
        let tri = Arc::new(generate_rectangle([1.0, 2.0], 0.25, |c| {
            if c.y < 1.0 {
                1
            } else {
                2
            }
        }));
        let a = SimplexGrid::new(1, tri.clone()).unwrap();
        let b = SimplexGrid::new(2, tri.clone()).unwrap();
        (tri, a, b)
    }

    #[test]
    fn test_classification_invariants() {
        let (tri, a, _b) = two_body_grid();
        for local in 0..a.n_vertices() as u32 {
            let kind = a.node_kind(local);
            let global = a.global_vertex(local);
            let grids = tri.grids_around_vertex(global);
            match kind {
                NodeKind::Border => {
                    // 边界节点周围必须有空域且无其它网格
                    assert!(grids.contains(&EMPTY_SPACE));
                    assert!(!grids.contains(&2));
                }
                NodeKind::Inner => {
                    assert_eq!(grids, vec![1]);
                }
                NodeKind::Contact | NodeKind::MultiContact => {
                    assert!(grids.contains(&2));
                }
            }
        }
    }

    #[test]
    fn test_contact_vertices_on_interface() {
        let (_tri, a, b) = two_body_grid();
        // 界面 y=1 上有 5 个共享顶点；角点与空域相邻属于多体接触
        assert!(!a.contact_vertices().is_empty());
        for &local in a.contact_vertices() {
            let y = a.coords(local)[1];
            assert!((y - 1.0).abs() < 1e-12, "接触节点必须在界面上");
        }
        // 两侧接触节点成对
        let pair_count = a
            .contact_vertices()
            .iter()
            .filter(|&&v| b.local_vertex(a.global_vertex(v)).is_some())
            .count();
        assert_eq!(pair_count, a.contact_vertices().len());
    }

    #[test]
    fn test_contact_grid_id() {
        let (_tri, a, _b) = two_body_grid();
        let inner_contact = a
            .contact_vertices()
            .iter()
            .copied()
            .find(|&v| a.node_kind(v) == NodeKind::Contact)
            .expect("应存在纯接触节点");
        assert_eq!(a.contact_grid_id(inner_contact).unwrap(), 2);
    }

    #[test]
    fn test_border_normal_direction() {
        let (_tri, a, _b) = two_body_grid();
        // y = 0 底边中部的边界节点：法线朝 -y
        let v = (0..a.n_vertices() as u32)
            .find(|&v| {
                let c = a.coords(v);
                c[1].abs() < 1e-12 && (c[0] - 0.5).abs() < 1e-12
            })
            .unwrap();
        let n = a.border_normal(v);
        assert!(n[1] < -0.9, "底边法线应朝外: {:?}", n);
    }

    #[test]
    fn test_contact_normal_direction() {
        let (_tri, a, b) = two_body_grid();
        let v = a
            .contact_vertices()
            .iter()
            .copied()
            .find(|&v| a.node_kind(v) == NodeKind::Contact)
            .unwrap();
        let n = a.contact_normal(v, 2);
        assert!(n[1] > 0.9, "下方物体的接触法线应朝上: {:?}", n);

        let vb = b.local_vertex(a.global_vertex(v)).unwrap();
        let nb = b.contact_normal(vb, 1);
        assert!(nb[1] < -0.9, "上方物体的接触法线应朝下");
    }

    #[test]
    fn test_heights() {
        let (_tri, a, _b) = two_body_grid();
        // 0.25 步长直角三角形最小高 = 0.25/sqrt(2)
        assert!((a.min_height() - 0.25 / 2.0_f64.sqrt()).abs() < 1e-12);
        assert!(a.average_height() >= a.min_height());
    }

    #[test]
    fn test_ray_walk_filtered_by_ownership() {
        let (_tri, a, _b) = two_body_grid();
        let v = a
            .contact_vertices()
            .iter()
            .copied()
            .find(|&v| a.node_kind(v) == NodeKind::Contact)
            .unwrap();
        // 从接触节点向对方网格走：立即离开本网格
        let up = SVector::<f64, 2>::new(0.0, 0.3);
        let res = a.find_cell_crossed_by_ray(v, &up);
        assert!(res.n < 3, "跨入对方网格不应返回完整单元");

        // 向本体内走：应找到完整单元
        let down = SVector::<f64, 2>::new(0.0, -0.3);
        let res = a.find_cell_crossed_by_ray(v, &down);
        assert_eq!(res.n, 3);
    }
}
