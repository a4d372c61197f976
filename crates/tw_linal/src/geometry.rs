// crates/tw_linal/src/geometry.rs

//! 单纯形几何谓词
//!
//! 重心坐标、直线与直线/平面求交、单纯形最小高、局部正交基。
//! 这些是特征回溯与时空插值的几何底座。

use crate::solve;
use crate::{Matrix22, Matrix33, Real2, Real3, Real4, RealV};
use nalgebra::SMatrix;

/// 三角形重心坐标
///
/// 退化三角形（面积为零）下返回含非有限分量的结果，
/// 由调用方的包含性判断自然排除。
pub fn barycentric_triangle(a: &Real2, b: &Real2, c: &Real2, q: &Real2) -> Real3 {
    let ab = b - a;
    let ac = c - a;
    let aq = q - a;
    let det = ab.x * ac.y - ab.y * ac.x;
    let l1 = (aq.x * ac.y - aq.y * ac.x) / det;
    let l2 = (ab.x * aq.y - ab.y * aq.x) / det;
    Real3::new(1.0 - l1 - l2, l1, l2)
}

/// 四面体重心坐标
pub fn barycentric_tetrahedron(
    a: &Real3,
    b: &Real3,
    c: &Real3,
    d: &Real3,
    q: &Real3,
) -> Real4 {
    let m = Matrix33::from_columns(&[b - a, c - a, d - a]);
    match solve::solve(&m, &(q - a)) {
        Some(l) => Real4::new(1.0 - l[0] - l[1] - l[2], l[0], l[1], l[2]),
        None => Real4::new(f64::NAN, f64::NAN, f64::NAN, f64::NAN),
    }
}

/// 两条直线 (p1, p2) 与 (p3, p4) 的交点
///
/// 平行时返回含非有限分量的点。
pub fn lines_intersection(p1: &Real2, p2: &Real2, p3: &Real2, p4: &Real2) -> Real2 {
    let d1 = p2 - p1;
    let d2 = p4 - p3;
    let det = d1.x * (-d2.y) - d1.y * (-d2.x);
    let rhs = p3 - p1;
    let t = (rhs.x * (-d2.y) - rhs.y * (-d2.x)) / det;
    p1 + d1 * t
}

/// 直线 (p, q) 与平面 (a, b, c) 的交点
///
/// 平行时返回含非有限分量的点。
pub fn line_with_plane_intersection(
    a: &Real3,
    b: &Real3,
    c: &Real3,
    p: &Real3,
    q: &Real3,
) -> Real3 {
    let n = (b - a).cross(&(c - a));
    let d = q - p;
    let t = n.dot(&(a - p)) / n.dot(&d);
    p + d * t
}

/// 顺时针旋转 90 度
#[inline]
pub fn perpendicular_clockwise(v: &Real2) -> Real2 {
    Real2::new(v.y, -v.x)
}

/// 三角形最小高
pub fn minimal_height_triangle(a: &Real2, b: &Real2, c: &Real2) -> f64 {
    let area2 = ((b - a).x * (c - a).y - (b - a).y * (c - a).x).abs();
    let longest = (b - a).norm().max((c - b).norm()).max((a - c).norm());
    if longest == 0.0 {
        return 0.0;
    }
    area2 / longest
}

/// 四面体最小高
pub fn minimal_height_tetrahedron(a: &Real3, b: &Real3, c: &Real3, d: &Real3) -> f64 {
    let volume6 = (b - a).cross(&(c - a)).dot(&(d - a)).abs();
    let face_area2 = |p: &Real3, q: &Real3, r: &Real3| (q - p).cross(&(r - p)).norm();
    let largest = face_area2(a, b, c)
        .max(face_area2(a, b, d))
        .max(face_area2(a, c, d))
        .max(face_area2(b, c, d));
    if largest == 0.0 {
        return 0.0;
    }
    volume6 / largest
}

/// 一维"局部基"：方向退化为符号
pub fn local_basis_1d(n: &RealV<1>) -> SMatrix<f64, 1, 1> {
    SMatrix::<f64, 1, 1>::new(if n[0] >= 0.0 { 1.0 } else { -1.0 })
}

/// 二维局部正交基，给定方向放在最后一列
pub fn local_basis_2d(n: &Real2) -> Matrix22 {
    let n = n.normalize();
    let t = perpendicular_clockwise(&n);
    Matrix22::from_columns(&[t, n])
}

/// 三维局部正交基，给定方向放在最后一列
pub fn local_basis_3d(n: &Real3) -> Matrix33 {
    let n = n.normalize();
    // 选与 n 夹角最大的坐标轴作种子，避免叉积退化
    let seed = if n.x.abs() <= n.y.abs() && n.x.abs() <= n.z.abs() {
        Real3::x()
    } else if n.y.abs() <= n.z.abs() {
        Real3::y()
    } else {
        Real3::z()
    };
    let t1 = seed.cross(&n).normalize();
    let t2 = n.cross(&t1);
    Matrix33::from_columns(&[t1, t2, n])
}

/// 二维：顶点 a 对边 (b, c) 的外法线（背向 a）
pub fn opposite_edge_normal_2d(a: &Real2, b: &Real2, c: &Real2) -> Real2 {
    let n = perpendicular_clockwise(&(c - b)).normalize();
    if n.dot(&(b - a)) >= 0.0 {
        n
    } else {
        -n
    }
}

/// 三维：顶点 a 对面 (b, c, d) 的外法线（背向 a）
pub fn opposite_face_normal_3d(a: &Real3, b: &Real3, c: &Real3, d: &Real3) -> Real3 {
    let n = (c - b).cross(&(d - b)).normalize();
    if n.dot(&(b - a)) >= 0.0 {
        n
    } else {
        -n
    }
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_barycentric_triangle_vertices() {
        let a = Real2::new(0.0, 0.0);
        let b = Real2::new(1.0, 0.0);
        let c = Real2::new(0.0, 1.0);
        let l = barycentric_triangle(&a, &b, &c, &a);
        assert!((l[0] - 1.0).abs() < 1e-14 && l[1].abs() < 1e-14 && l[2].abs() < 1e-14);

        let center = Real2::new(1.0 / 3.0, 1.0 / 3.0);
        let l = barycentric_triangle(&a, &b, &c, &center);
        for k in 0..3 {
            assert!((l[k] - 1.0 / 3.0).abs() < 1e-12, "重心坐标分量 {} 错误", k);
        }
    }

    #[test]
    fn test_barycentric_tetrahedron() {
        let a = Real3::new(0.0, 0.0, 0.0);
        let b = Real3::new(1.0, 0.0, 0.0);
        let c = Real3::new(0.0, 1.0, 0.0);
        let d = Real3::new(0.0, 0.0, 1.0);
        let q = Real3::new(0.25, 0.25, 0.25);
        let l = barycentric_tetrahedron(&a, &b, &c, &d, &q);
        for k in 0..4 {
            assert!((l[k] - 0.25).abs() < 1e-12);
        }
    }

    #[test]
    fn test_lines_intersection() {
        let p = lines_intersection(
            &Real2::new(0.0, 0.0),
            &Real2::new(2.0, 2.0),
            &Real2::new(0.0, 2.0),
            &Real2::new(2.0, 0.0),
        );
        assert!((p - Real2::new(1.0, 1.0)).norm() < 1e-14);
    }

    #[test]
    fn test_line_with_plane_intersection() {
        let p = line_with_plane_intersection(
            &Real3::new(0.0, 0.0, 1.0),
            &Real3::new(1.0, 0.0, 1.0),
            &Real3::new(0.0, 1.0, 1.0),
            &Real3::new(0.5, 0.5, 0.0),
            &Real3::new(0.5, 0.5, 2.0),
        );
        assert!((p - Real3::new(0.5, 0.5, 1.0)).norm() < 1e-14);
    }

    #[test]
    fn test_minimal_heights() {
        let h = minimal_height_triangle(
            &Real2::new(0.0, 0.0),
            &Real2::new(1.0, 0.0),
            &Real2::new(0.0, 1.0),
        );
        // 斜边 sqrt(2)，面积 1/2，最小高 = 1/sqrt(2)
        assert!((h - 1.0 / 2.0_f64.sqrt()).abs() < 1e-12);

        let h = minimal_height_tetrahedron(
            &Real3::new(0.0, 0.0, 0.0),
            &Real3::new(1.0, 0.0, 0.0),
            &Real3::new(0.0, 1.0, 0.0),
            &Real3::new(0.0, 0.0, 1.0),
        );
        assert!(h > 0.0 && h < 1.0);
    }

    #[test]
    fn test_local_basis_orthonormal() {
        let n = Real3::new(0.3, -0.4, 0.87).normalize();
        let basis = local_basis_3d(&n);
        let prod = basis.transpose() * basis;
        assert!((prod - Matrix33::identity()).norm() < 1e-12, "基不正交");
        assert!((basis.column(2) - n).norm() < 1e-12, "方向必须在最后一列");

        let n2 = Real2::new(0.6, 0.8);
        let basis2 = local_basis_2d(&n2);
        assert!((basis2.transpose() * basis2 - Matrix22::identity()).norm() < 1e-12);
        assert!((basis2.column(1) - n2).norm() < 1e-12);
    }

    #[test]
    fn test_outward_normals() {
        let n = opposite_edge_normal_2d(
            &Real2::new(0.0, 1.0),
            &Real2::new(0.0, 0.0),
            &Real2::new(1.0, 0.0),
        );
        assert!((n - Real2::new(0.0, -1.0)).norm() < 1e-12);

        let n = opposite_face_normal_3d(
            &Real3::new(0.0, 0.0, 1.0),
            &Real3::new(0.0, 0.0, 0.0),
            &Real3::new(1.0, 0.0, 0.0),
            &Real3::new(0.0, 1.0, 0.0),
        );
        assert!((n - Real3::new(0.0, 0.0, -1.0)).norm() < 1e-12);
    }
}
