// crates/tw_mesh/src/generation.rs

//! 均匀单纯形剖分生成
//!
//! 外部网格生成器的内置替身：把矩形/长方体按目标步长切成
//! 协调的三角形/四面体剖分。物体归属由调用方给的谓词按
//! 单元重心判定，谓词返回 [`EMPTY_SPACE`] 的单元成为空域。

use crate::builder::TriangulationBuilder;
use crate::triangulation::{GridId, Triangulation};
use nalgebra::SVector;
use tracing::info;

/// 矩形域均匀三角剖分
///
/// 每个小方格沿同向对角线切成两个三角形，跨方格协调。
pub fn generate_rectangle<F>(lengths: [f64; 2], h: f64, body_of: F) -> Triangulation<2>
where
    F: Fn(SVector<f64, 2>) -> GridId,
{
    assert!(h > 0.0, "步长必须为正");
    let nx = (lengths[0] / h).round().max(1.0) as usize;
    let ny = (lengths[1] / h).round().max(1.0) as usize;
    let dx = lengths[0] / nx as f64;
    let dy = lengths[1] / ny as f64;

    let mut b = TriangulationBuilder::<2>::new();
    for j in 0..=ny {
        for i in 0..=nx {
            b.add_point(SVector::<f64, 2>::new(i as f64 * dx, j as f64 * dy));
        }
    }
    let vid = |i: usize, j: usize| (j * (nx + 1) + i) as u32;

    let corner = |i: usize, j: usize| SVector::<f64, 2>::new(i as f64 * dx, j as f64 * dy);
    for j in 0..ny {
        for i in 0..nx {
            let (v00, v10, v11, v01) = (vid(i, j), vid(i + 1, j), vid(i + 1, j + 1), vid(i, j + 1));
            let (p00, p10, p11, p01) = (corner(i, j), corner(i + 1, j), corner(i + 1, j + 1), corner(i, j + 1));
            for (tri, centroid) in [
                ([v00, v10, v11], (p00 + p10 + p11) / 3.0),
                ([v00, v11, v01], (p00 + p11 + p01) / 3.0),
            ] {
                b.add_cell(&tri, body_of(centroid));
            }
        }
    }

    let tri = b.build().expect("均匀矩形剖分构建失败");
    info!(
        n_vertices = tri.n_vertices(),
        n_cells = tri.n_cells(),
        "矩形剖分生成完成"
    );
    tri
}

/// 长方体域均匀四面体剖分（Kuhn 切分）
///
/// 每个小立方体按主对角线切成 6 个四面体，面对角线取向一致，
/// 跨立方体协调。
pub fn generate_box<F>(lengths: [f64; 3], h: f64, body_of: F) -> Triangulation<3>
where
    F: Fn(SVector<f64, 3>) -> GridId,
{
    assert!(h > 0.0, "步长必须为正");
    let n = [
        (lengths[0] / h).round().max(1.0) as usize,
        (lengths[1] / h).round().max(1.0) as usize,
        (lengths[2] / h).round().max(1.0) as usize,
    ];
    let d = [
        lengths[0] / n[0] as f64,
        lengths[1] / n[1] as f64,
        lengths[2] / n[2] as f64,
    ];

    let mut b = TriangulationBuilder::<3>::new();
    for k in 0..=n[2] {
        for j in 0..=n[1] {
            for i in 0..=n[0] {
                b.add_point(SVector::<f64, 3>::new(
                    i as f64 * d[0],
                    j as f64 * d[1],
                    k as f64 * d[2],
                ));
            }
        }
    }
    let vid =
        |i: usize, j: usize, k: usize| ((k * (n[1] + 1) + j) * (n[0] + 1) + i) as u32;

    // 轴序排列：从立方体最小角沿坐标轴走到最大角的 6 条路径
    const PERMS: [[usize; 3]; 6] = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];

    let coords = |c: [usize; 3]| {
        SVector::<f64, 3>::new(c[0] as f64 * d[0], c[1] as f64 * d[1], c[2] as f64 * d[2])
    };
    for k in 0..n[2] {
        for j in 0..n[1] {
            for i in 0..n[0] {
                for perm in PERMS {
                    let mut corner = [i, j, k];
                    let mut tet = [vid(corner[0], corner[1], corner[2]), 0, 0, 0];
                    let mut centroid = coords(corner);
                    for (step, &axis) in perm.iter().enumerate() {
                        corner[axis] += 1;
                        tet[step + 1] = vid(corner[0], corner[1], corner[2]);
                        centroid += coords(corner);
                    }
                    b.add_cell(&tet, body_of(centroid / 4.0));
                }
            }
        }
    }

    let tri = b.build().expect("均匀长方体剖分构建失败");
    info!(
        n_vertices = tri.n_vertices(),
        n_cells = tri.n_cells(),
        "长方体剖分生成完成"
    );
    tri
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triangulation::EMPTY_SPACE;

    #[test]
    fn test_rectangle_counts() {
        let t = generate_rectangle([1.0, 2.0], 0.5, |_| 0);
        assert_eq!(t.n_vertices(), 3 * 5);
        assert_eq!(t.n_cells(), 2 * 4 * 2);
    }

    #[test]
    fn test_box_conforming() {
        let t = generate_box([1.0, 1.0, 1.0], 0.5, |_| 0);
        assert_eq!(t.n_vertices(), 27);
        assert_eq!(t.n_cells(), 8 * 6);
        // 协调性：内部面都应配对，只有外表面面无邻接
        let mut hull_faces = 0;
        for c in 0..t.n_cells() as u32 {
            for i in 0..4 {
                if t.cell_neighbor(c, i).is_none() {
                    hull_faces += 1;
                }
            }
        }
        // 单位立方体表面 6 面 × 4 方格 × 2 三角 = 48
        assert_eq!(hull_faces, 48, "Kuhn 切分必须跨立方体协调");
    }

    #[test]
    fn test_two_bodies() {
        let t = generate_rectangle([1.0, 2.0], 0.25, |c| if c.y < 1.0 { 1 } else { 2 });
        let mut seen = [false; 3];
        for c in 0..t.n_cells() as u32 {
            match t.grid_id(c) {
                1 => seen[1] = true,
                2 => seen[2] = true,
                EMPTY_SPACE => seen[0] = true,
                other => panic!("意外网格 id {}", other),
            }
        }
        assert!(seen[1] && seen[2] && !seen[0]);
    }
}
