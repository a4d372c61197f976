// crates/tw_mesh/src/walk.rs

//! 沿射线有序行走
//!
//! 从顶点出发沿位移向量穿越剖分单元，按穿越顺序前进，
//! 直到目标点落在某个单元内或射线离开属主区域。
//! 这是特征回溯的定位原语：返回结果要么是完整单元，
//! 要么是"从哪个子面离开"的截断信息。

use crate::triangulation::{two, three, Triangulation};
use nalgebra::SVector;
use tw_foundation::EQUALITY_TOLERANCE;

/// 行走结果
///
/// `n` 的语义（`N = D + 1` 为单元顶点数）：
/// - `n == N`: 目标点在体内，`cell` 与全部顶点有效
/// - `n == N - 1`: 射线从一个边界面离开，`verts[..n]` 是该面顶点
/// - `n == N - 2`: 射线恰好从边界棱/顶点离开
/// - `n == 0`: 射线从出发点立即离开体外
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkCell {
    /// 有效顶点数
    pub n: usize,
    /// 顶点索引，前 n 个有效
    pub verts: [u32; 4],
    /// n == D+1 时为包含目标点的单元
    pub cell: Option<u32>,
}

impl WalkCell {
    /// 空结果（立即离开）
    pub fn empty() -> Self {
        Self {
            n: 0,
            verts: [u32::MAX; 4],
            cell: None,
        }
    }

    fn from_slice(verts: &[u32]) -> Self {
        let mut out = [u32::MAX; 4];
        out[..verts.len()].copy_from_slice(verts);
        Self {
            n: verts.len(),
            verts: out,
            cell: None,
        }
    }
}

impl<const D: usize> Triangulation<D> {
    /// 从顶点 `v` 沿 `shift` 行走，找包含 `coords(v) + shift` 的单元
    ///
    /// `is_owned` 判定单元是否属于调用方网格；行走只在属主单元内
    /// 进行，跨出属主区域即视为从边界离开。
    pub fn walk_from_vertex<F>(&self, v: u32, shift: &SVector<f64, D>, is_owned: F) -> WalkCell
    where
        F: Fn(u32) -> bool,
    {
        let p0 = self.coords(v);
        let q = p0 + shift;
        let len = shift.norm();
        if len == 0.0 {
            return WalkCell::empty();
        }

        // 起始单元：探测点取在出发点稍内侧
        let mut current = u32::MAX;
        for &c in self.incident_cells(v) {
            if !is_owned(c) {
                continue;
            }
            let probe_step = (self.cell_min_height(c) * 1e-3).min(len);
            let probe = p0 + shift * (probe_step / len);
            if self.barycentric_min(c, &probe) > -EQUALITY_TOLERANCE {
                current = c;
                break;
            }
        }
        if current == u32::MAX {
            return WalkCell::empty();
        }

        let mut t_in = 0.0_f64;
        for _ in 0..=self.n_cells() {
            if self.contains(current, &q) {
                let mut out = WalkCell::from_slice(self.cell_vertices(current));
                out.cell = Some(current);
                return out;
            }

            // 出口面：沿前进方向最先穿过的面
            let (exit_face, t_exit) = match self.find_exit_face(current, &p0, shift, t_in) {
                Some(hit) => hit,
                // 数值退化：按立即离开处理
                None => return WalkCell::empty(),
            };

            match self.cell_neighbor(current, exit_face) {
                Some(nb) if is_owned(nb) => {
                    current = nb;
                    t_in = t_exit;
                }
                _ => {
                    // 离开属主区域：分类穿越点落在面内部还是子面上
                    let rc = p0 + shift * t_exit;
                    return self.classify_exit(current, exit_face, &rc);
                }
            }
        }
        WalkCell::empty()
    }

    /// 在单元内找射线出口面，返回 (局部面号, 射线参数)
    fn find_exit_face(
        &self,
        c: u32,
        p0: &SVector<f64, D>,
        d: &SVector<f64, D>,
        t_in: f64,
    ) -> Option<(usize, f64)> {
        let verts = self.cell_vertices(c);
        let mut best: Option<(usize, f64)> = None;
        for i in 0..=D {
            let n = self.face_outward_normal(c, i);
            let denom = n.dot(d);
            if denom <= 0.0 {
                continue; // 不朝这个面外移动
            }
            // 面上任取一点（与 i 不同的局部顶点）
            let a = self.coords(verts[(i + 1) % (D + 1)]);
            let t = n.dot(&(a - p0)) / denom;
            if t < t_in - EQUALITY_TOLERANCE {
                continue;
            }
            match best {
                Some((_, t_best)) if t >= t_best => {}
                _ => best = Some((i, t)),
            }
        }
        best
    }

    /// 分类边界穿越点：完整面、棱、顶点
    fn classify_exit(&self, c: u32, exit_face: usize, rc: &SVector<f64, D>) -> WalkCell {
        let verts = self.cell_vertices(c);
        let mut face = [0u32; 3];
        let mut k = 0;
        for j in 0..=D {
            if j != exit_face {
                face[k] = verts[j];
                k += 1;
            }
        }

        match D {
            2 => {
                let a = two(&self.coords(face[0]));
                let b = two(&self.coords(face[1]));
                let edge_len = (b - a).norm();
                let s = (two(rc) - a).norm() / edge_len;
                if s < EQUALITY_TOLERANCE {
                    WalkCell::from_slice(&[face[0]])
                } else if s > 1.0 - EQUALITY_TOLERANCE {
                    WalkCell::from_slice(&[face[1]])
                } else {
                    WalkCell::from_slice(&face[..2])
                }
            }
            3 => {
                let a = three(&self.coords(face[0]));
                let b = three(&self.coords(face[1]));
                let cc = three(&self.coords(face[2]));
                let l = triangle_barycentric_3d(&a, &b, &cc, &three(rc));
                let mut kept = [0u32; 3];
                let mut nk = 0;
                for (j, &w) in face.iter().enumerate() {
                    if l[j] > EQUALITY_TOLERANCE {
                        kept[nk] = w;
                        nk += 1;
                    }
                }
                if nk == 0 {
                    // 数值上全退化，按完整面处理
                    WalkCell::from_slice(&face)
                } else {
                    WalkCell::from_slice(&kept[..nk])
                }
            }
            _ => unreachable!("剖分维度只支持 2 和 3"),
        }
    }
}

/// 平面内三角形重心坐标（点须在三角形平面上）
fn triangle_barycentric_3d(
    a: &SVector<f64, 3>,
    b: &SVector<f64, 3>,
    c: &SVector<f64, 3>,
    q: &SVector<f64, 3>,
) -> [f64; 3] {
    let ab = b - a;
    let ac = c - a;
    let aq = q - a;
    let d00 = ab.dot(&ab);
    let d01 = ab.dot(&ac);
    let d11 = ac.dot(&ac);
    let r0 = ab.dot(&aq);
    let r1 = ac.dot(&aq);
    let det = d00 * d11 - d01 * d01;
    if det == 0.0 {
        return [f64::NAN; 3];
    }
    let s = (d11 * r0 - d01 * r1) / det;
    let t = (d00 * r1 - d01 * r0) / det;
    [1.0 - s - t, s, t]
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::generate_rectangle;
    use nalgebra::SVector;

    fn uniform_grid() -> Triangulation<2> {
        generate_rectangle([1.0, 1.0], 0.25, |_| 0)
    }

    #[test]
    fn test_walk_inside() {
        let t = uniform_grid();
        // 从原点角向体内走
        let r = t.walk_from_vertex(0, &SVector::<f64, 2>::new(0.4, 0.35), |c| {
            t.grid_id(c) == 0
        });
        assert_eq!(r.n, 3, "体内目标应返回完整单元");
        let cell = r.cell.expect("完整单元必须携带索引");
        assert!(t.contains(cell, &SVector::<f64, 2>::new(0.4, 0.35)));
    }

    #[test]
    fn test_walk_immediate_exit() {
        let t = uniform_grid();
        // 从原点角向体外走
        let r = t.walk_from_vertex(0, &SVector::<f64, 2>::new(-0.5, -0.5), |c| {
            t.grid_id(c) == 0
        });
        assert_eq!(r.n, 0);
    }

    #[test]
    fn test_walk_exit_through_face() {
        let t = uniform_grid();
        // 从内部一排的顶点斜穿出右边界
        let v = t
            .points
            .iter()
            .position(|p| (p.x - 0.75).abs() < 1e-12 && (p.y - 0.5).abs() < 1e-12)
            .unwrap() as u32;
        let r = t.walk_from_vertex(v, &SVector::<f64, 2>::new(0.6, 0.1), |c| {
            t.grid_id(c) == 0
        });
        assert_eq!(r.n, 2, "斜穿边界应报告离开边");
        for &w in &r.verts[..2] {
            assert!((t.coords(w).x - 1.0).abs() < 1e-12, "离开边应在 x = 1 边界上");
        }
    }

    #[test]
    fn test_walk_matches_locate_for_interior() {
        let t = uniform_grid();
        let owned = |c: u32| t.grid_id(c) == 0;
        // 遍历所有顶点、多方向比对行走与点定位
        for v in 0..t.n_vertices() as u32 {
            for k in 0..8 {
                let angle = k as f64 * std::f64::consts::PI / 4.0 + 0.13;
                let shift = SVector::<f64, 2>::new(angle.cos(), angle.sin()) * 0.15;
                let walked = t.walk_from_vertex(v, &shift, owned);
                if walked.n == 3 {
                    let q = t.coords(v) + shift;
                    let hint = t.incident_cells(v)[0];
                    let located = t.locate(&q, hint).expect("行走找到而定位失败");
                    assert!(
                        t.contains(located, &q),
                        "定位结果必须包含目标点 v={} k={}",
                        v,
                        k
                    );
                }
            }
        }
    }
}
