// crates/tw_mesh/src/triangulation.rs

//! 单纯形剖分结构
//!
//! 顶点坐标、单元顶点表、单元邻接表、顶点关联单元表全部为
//! 平坦数组，索引为 `u32`。结构构建后只读，可跨线程共享。

use nalgebra::SVector;
use tw_foundation::EQUALITY_TOLERANCE;
use tw_linal::geometry::{
    barycentric_tetrahedron, barycentric_triangle, minimal_height_tetrahedron,
    minimal_height_triangle, opposite_edge_normal_2d, opposite_face_normal_3d,
};

/// 网格属主 id
pub type GridId = u32;

/// 空域单元标志：该单元不属于任何物体
pub const EMPTY_SPACE: GridId = u32::MAX;

/// 无邻接哨兵（凸包外侧）
pub const NO_CELL: u32 = u32::MAX;

/// 单纯形剖分
///
/// `D = 2` 时单元是三角形，`D = 3` 时是四面体。
/// 统一把单元叫 cell，把单元的 `D` 顶点子面叫 face。
#[derive(Debug, Clone)]
pub struct Triangulation<const D: usize> {
    /// 顶点坐标
    pub(crate) points: Vec<SVector<f64, D>>,
    /// 单元顶点，跨度 D+1
    pub(crate) cell_vertices: Vec<u32>,
    /// 单元邻接，跨度 D+1；位置 i 是与局部顶点 i 相对的面外邻居
    pub(crate) cell_neighbors: Vec<u32>,
    /// 单元属主网格 id
    pub(crate) cell_grid_id: Vec<GridId>,
    /// 顶点 -> 关联单元 CSR 偏移
    pub(crate) incidence_offsets: Vec<u32>,
    /// 顶点 -> 关联单元 CSR 数据
    pub(crate) incidence_cells: Vec<u32>,
}

impl<const D: usize> Triangulation<D> {
    /// 单元顶点数
    pub const CELL_POINTS: usize = D + 1;

    /// 顶点数量
    #[inline]
    pub fn n_vertices(&self) -> usize {
        self.points.len()
    }

    /// 单元数量
    #[inline]
    pub fn n_cells(&self) -> usize {
        self.cell_grid_id.len()
    }

    /// 顶点坐标
    #[inline]
    pub fn coords(&self, v: u32) -> SVector<f64, D> {
        self.points[v as usize]
    }

    /// 单元的 D+1 个顶点
    #[inline]
    pub fn cell_vertices(&self, c: u32) -> &[u32] {
        let base = c as usize * (D + 1);
        &self.cell_vertices[base..base + D + 1]
    }

    /// 与局部顶点 i 相对的邻居单元
    #[inline]
    pub fn cell_neighbor(&self, c: u32, i: usize) -> Option<u32> {
        let n = self.cell_neighbors[c as usize * (D + 1) + i];
        if n == NO_CELL {
            None
        } else {
            Some(n)
        }
    }

    /// 单元属主网格 id
    #[inline]
    pub fn grid_id(&self, c: u32) -> GridId {
        self.cell_grid_id[c as usize]
    }

    /// 邻居（可能缺失）的网格 id；凸包外侧视同空域
    #[inline]
    pub fn neighbor_grid_id(&self, c: u32, i: usize) -> GridId {
        match self.cell_neighbor(c, i) {
            Some(n) => self.grid_id(n),
            None => EMPTY_SPACE,
        }
    }

    /// 顶点关联的全部单元
    #[inline]
    pub fn incident_cells(&self, v: u32) -> &[u32] {
        let lo = self.incidence_offsets[v as usize] as usize;
        let hi = self.incidence_offsets[v as usize + 1] as usize;
        &self.incidence_cells[lo..hi]
    }

    /// 顶点周围出现过的全部网格 id（含空域），升序去重
    ///
    /// 顶点位于凸包面上时补记一个空域 id。
    pub fn grids_around_vertex(&self, v: u32) -> Vec<GridId> {
        let mut ids = Vec::with_capacity(4);
        for &c in self.incident_cells(v) {
            ids.push(self.grid_id(c));
            let verts = self.cell_vertices(c);
            for i in 0..=D {
                // 与顶点 i 相对的凸包面包含除 i 外的所有顶点
                if self.cell_neighbor(c, i).is_none() && verts[i] != v {
                    ids.push(EMPTY_SPACE);
                }
            }
        }
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// 单元（带容差层）是否包含点
    pub fn contains(&self, c: u32, q: &SVector<f64, D>) -> bool {
        self.barycentric_min(c, q) > -EQUALITY_TOLERANCE
    }

    /// 点在单元重心坐标的最小分量
    pub fn barycentric_min(&self, c: u32, q: &SVector<f64, D>) -> f64 {
        let verts = self.cell_vertices(c);
        match D {
            2 => {
                let (a, b, cc, q) = (
                    two(&self.points[verts[0] as usize]),
                    two(&self.points[verts[1] as usize]),
                    two(&self.points[verts[2] as usize]),
                    two(q),
                );
                let l = barycentric_triangle(&a, &b, &cc, &q);
                finite_min(l.as_slice())
            }
            3 => {
                let l = barycentric_tetrahedron(
                    &three(&self.points[verts[0] as usize]),
                    &three(&self.points[verts[1] as usize]),
                    &three(&self.points[verts[2] as usize]),
                    &three(&self.points[verts[3] as usize]),
                    &three(q),
                );
                finite_min(l.as_slice())
            }
            _ => unreachable!("剖分维度只支持 2 和 3"),
        }
    }

    /// 单元最小高
    pub fn cell_min_height(&self, c: u32) -> f64 {
        let verts = self.cell_vertices(c);
        match D {
            2 => minimal_height_triangle(
                &two(&self.points[verts[0] as usize]),
                &two(&self.points[verts[1] as usize]),
                &two(&self.points[verts[2] as usize]),
            ),
            3 => minimal_height_tetrahedron(
                &three(&self.points[verts[0] as usize]),
                &three(&self.points[verts[1] as usize]),
                &three(&self.points[verts[2] as usize]),
                &three(&self.points[verts[3] as usize]),
            ),
            _ => unreachable!("剖分维度只支持 2 和 3"),
        }
    }

    /// 单元 c 穿过与局部顶点 i 相对的面的外法线
    pub fn face_outward_normal(&self, c: u32, i: usize) -> SVector<f64, D> {
        let verts = self.cell_vertices(c);
        match D {
            2 => {
                let mut others = [0u32; 2];
                let mut k = 0;
                for j in 0..=D {
                    if j != i {
                        others[k] = verts[j];
                        k += 1;
                    }
                }
                let n = opposite_edge_normal_2d(
                    &two(&self.points[verts[i] as usize]),
                    &two(&self.points[others[0] as usize]),
                    &two(&self.points[others[1] as usize]),
                );
                from_two(&n)
            }
            3 => {
                let mut others = [0u32; 3];
                let mut k = 0;
                for j in 0..=D {
                    if j != i {
                        others[k] = verts[j];
                        k += 1;
                    }
                }
                let n = opposite_face_normal_3d(
                    &three(&self.points[verts[i] as usize]),
                    &three(&self.points[others[0] as usize]),
                    &three(&self.points[others[1] as usize]),
                    &three(&self.points[others[2] as usize]),
                );
                from_three(&n)
            }
            _ => unreachable!("剖分维度只支持 2 和 3"),
        }
    }

    /// 带提示的点定位（可见性行走）
    ///
    /// 从 `hint` 出发沿最负重心坐标方向走，直到找到包含 `q` 的单元
    /// 或走出凸包。行走不区分属主，调用方自行过滤。
    pub fn locate(&self, q: &SVector<f64, D>, hint: u32) -> Option<u32> {
        let mut current = hint;
        // 行走步数不会超过单元数；循环保护
        for _ in 0..=self.n_cells() {
            if self.contains(current, q) {
                return Some(current);
            }
            // 向最负重心坐标对应的邻居移动
            let verts = self.cell_vertices(current);
            let mut worst = f64::INFINITY;
            let mut worst_i = usize::MAX;
            for i in 0..=D {
                let l = self.vertex_barycentric(current, q, i, verts);
                if l < worst {
                    worst = l;
                    worst_i = i;
                }
            }
            match self.cell_neighbor(current, worst_i) {
                Some(n) => current = n,
                None => return None,
            }
        }
        None
    }

    /// 点 q 在单元 c 中对应局部顶点 i 的重心坐标分量
    fn vertex_barycentric(&self, c: u32, q: &SVector<f64, D>, i: usize, verts: &[u32]) -> f64 {
        match D {
            2 => {
                let l = barycentric_triangle(
                    &two(&self.points[verts[0] as usize]),
                    &two(&self.points[verts[1] as usize]),
                    &two(&self.points[verts[2] as usize]),
                    &two(q),
                );
                l[i]
            }
            3 => {
                let l = barycentric_tetrahedron(
                    &three(&self.points[verts[0] as usize]),
                    &three(&self.points[verts[1] as usize]),
                    &three(&self.points[verts[2] as usize]),
                    &three(&self.points[verts[3] as usize]),
                    &three(q),
                );
                l[i]
            }
            _ => unreachable!("剖分维度只支持 2 和 3"),
        }
    }

    /// 局部顶点编号（顶点必须属于该单元）
    pub fn index_in_cell(&self, c: u32, v: u32) -> Option<usize> {
        self.cell_vertices(c).iter().position(|&w| w == v)
    }
}

// ============================================================
// 维度转换辅助
// ============================================================
//
// 2D/3D 分支里需要把 SVector<f64, D> 落到具体维度。
// 分支由 match D 静态选择，转换本身是零拷贝语义的逐分量搬运。

/// 最小分量；出现非有限值（退化单元）时取负无穷，让包含性判断直接失败
#[inline]
fn finite_min(values: &[f64]) -> f64 {
    let mut ans = f64::INFINITY;
    for &v in values {
        if !v.is_finite() {
            return f64::NEG_INFINITY;
        }
        ans = ans.min(v);
    }
    ans
}

#[inline]
pub(crate) fn two<const D: usize>(p: &SVector<f64, D>) -> SVector<f64, 2> {
    SVector::<f64, 2>::new(p[0], p[1])
}

#[inline]
pub(crate) fn three<const D: usize>(p: &SVector<f64, D>) -> SVector<f64, 3> {
    SVector::<f64, 3>::new(p[0], p[1], p[2])
}

#[inline]
pub(crate) fn from_two<const D: usize>(p: &SVector<f64, 2>) -> SVector<f64, D> {
    let mut out = SVector::<f64, D>::zeros();
    out[0] = p[0];
    out[1] = p[1];
    out
}

#[inline]
pub(crate) fn from_three<const D: usize>(p: &SVector<f64, 3>) -> SVector<f64, D> {
    let mut out = SVector::<f64, D>::zeros();
    out[0] = p[0];
    out[1] = p[1];
    out[2] = p[2];
    out
}

// ============================================================
// 测试
// ============================================================
