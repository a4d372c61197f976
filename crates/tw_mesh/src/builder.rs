// crates/tw_mesh/src/builder.rs

//! 剖分构建
//!
//! 从点列表与带属主 id 的单元列表构建 [`Triangulation`]：
//! 面哈希解析邻接、CSR 顶点关联表、悬挂单元修正。

use crate::error::MeshError;
use crate::triangulation::{GridId, Triangulation, EMPTY_SPACE, NO_CELL};
use nalgebra::SVector;
use std::collections::HashMap;
use tracing::{debug, info};

/// 剖分构建器
#[derive(Debug, Default)]
pub struct TriangulationBuilder<const D: usize> {
    points: Vec<SVector<f64, D>>,
    cell_vertices: Vec<u32>,
    cell_grid_id: Vec<GridId>,
}

impl<const D: usize> TriangulationBuilder<D> {
    /// 创建空构建器
    pub fn new() -> Self {
        Self {
            points: Vec::new(),
            cell_vertices: Vec::new(),
            cell_grid_id: Vec::new(),
        }
    }

    /// 添加顶点，返回其索引
    pub fn add_point(&mut self, p: SVector<f64, D>) -> u32 {
        self.points.push(p);
        (self.points.len() - 1) as u32
    }

    /// 添加单元
    ///
    /// `vertices` 长度必须为 `D+1`。
    pub fn add_cell(&mut self, vertices: &[u32], grid_id: GridId) {
        assert_eq!(vertices.len(), D + 1, "单元顶点数必须为 D+1");
        self.cell_vertices.extend_from_slice(vertices);
        self.cell_grid_id.push(grid_id);
    }

    /// 单元数量
    pub fn n_cells(&self) -> usize {
        self.cell_grid_id.len()
    }

    /// 构建剖分：解析邻接并生成顶点关联表
    pub fn build(self) -> Result<Triangulation<D>, MeshError> {
        let n_cells = self.cell_grid_id.len();
        let n_vertices = self.points.len();

        for &v in &self.cell_vertices {
            if v as usize >= n_vertices {
                return Err(MeshError::Inconsistent {
                    message: format!("单元引用了不存在的顶点 {}", v),
                });
            }
        }

        // 邻接解析：排序后的面顶点作 key，同一面最多出现两次
        let mut cell_neighbors = vec![NO_CELL; n_cells * (D + 1)];
        let mut face_map: HashMap<[u32; 3], (u32, usize)> =
            HashMap::with_capacity(n_cells * (D + 1));
        for c in 0..n_cells {
            let verts = &self.cell_vertices[c * (D + 1)..(c + 1) * (D + 1)];
            for i in 0..=D {
                let key = face_key::<D>(verts, i);
                match face_map.remove(&key) {
                    None => {
                        face_map.insert(key, (c as u32, i));
                    }
                    Some((other, other_i)) => {
                        if other == c as u32 {
                            return Err(MeshError::Inconsistent {
                                message: format!("单元 {} 含重复面", c),
                            });
                        }
                        cell_neighbors[c * (D + 1) + i] = other;
                        cell_neighbors[other as usize * (D + 1) + other_i] = c as u32;
                    }
                }
            }
        }
        // face_map 里剩下的是凸包面，保持 NO_CELL

        // 顶点关联表（CSR）
        let mut counts = vec![0u32; n_vertices + 1];
        for &v in &self.cell_vertices {
            counts[v as usize + 1] += 1;
        }
        for i in 0..n_vertices {
            counts[i + 1] += counts[i];
        }
        let incidence_offsets = counts.clone();
        let mut cursor = incidence_offsets.clone();
        let mut incidence_cells = vec![0u32; self.cell_vertices.len()];
        for c in 0..n_cells {
            for k in 0..=D {
                let v = self.cell_vertices[c * (D + 1) + k] as usize;
                incidence_cells[cursor[v] as usize] = c as u32;
                cursor[v] += 1;
            }
        }

        debug!(
            n_vertices,
            n_cells,
            hull_faces = face_map.len(),
            "剖分构建完成"
        );

        Ok(Triangulation {
            points: self.points,
            cell_vertices: self.cell_vertices,
            cell_neighbors,
            cell_grid_id: self.cell_grid_id,
            incidence_offsets,
            incidence_cells,
        })
    }
}

/// 与局部顶点 i 相对的面的排序 key（3D 面 3 个顶点，2D 面 2 个，末位补哨兵）
fn face_key<const D: usize>(verts: &[u32], i: usize) -> [u32; 3] {
    let mut key = [u32::MAX; 3];
    let mut k = 0;
    for (j, &v) in verts.iter().enumerate() {
        if j != i {
            key[k] = v;
            k += 1;
        }
    }
    key[..D].sort_unstable();
    key
}

impl<const D: usize> Triangulation<D> {
    /// 悬挂单元修正
    ///
    /// 单元的 `D+1` 个邻居材料一致且与自身不同，则改取邻居材料。
    /// 网格文件里夹在体内的孤立空单元由此被吸收；必须在把剖分
    /// 交给网格之前调用。返回 (空域悬挂数, 其它悬挂数)。
    pub fn correct_hanged_cells(&mut self) -> (usize, usize) {
        let mut empty_hangs = 0usize;
        let mut other_hangs = 0usize;

        for c in 0..self.n_cells() as u32 {
            let own = self.grid_id(c);
            let first = self.neighbor_grid_id(c, 0);
            if first == own {
                continue;
            }
            let all_same = (1..=D).all(|i| self.neighbor_grid_id(c, i) == first);
            if all_same {
                if own == EMPTY_SPACE {
                    empty_hangs += 1;
                } else {
                    other_hangs += 1;
                }
                self.cell_grid_id[c as usize] = first;
            }
        }

        if empty_hangs + other_hangs > 0 {
            info!(empty_hangs, other_hangs, "悬挂单元已重新标记");
        }
        (empty_hangs, other_hangs)
    }
}

// ============================================================
// 测试
// ============================================================
