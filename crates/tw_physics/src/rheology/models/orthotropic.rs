// crates/tw_physics/src/rheology/models/orthotropic.rs

//! 正交各向异性弹性（3D）
//!
//! 特征值来自刚度张量沿阶段方向投影的 Christoffel 矩阵：
//! 波速平方是其三个特征值（λ² 的三次方程，Cardano 求根），
//! 极化向量是对应特征向量，σ 部分回代得到。左特征串用 9×9
//! 数值求逆获得，分解校验兜底。
//!
//! 与各向同性不同，方向矩阵只支持全局坐标轴方向；
//! 带旋转角的材料先把刚度张量整体旋转再装配。
//!
//! 列布局（波列映射契约）：`(+c_s1, −c_s1, +c_s2, −c_s2, +c_p, −c_p, 0, 0, 0)`，
//! 波速升序，前行波在奇数列。

use crate::rheology::gcm_matrix::GcmMatrix;
use crate::rheology::materials::OrthotropicMaterial;
use crate::types::WaveKind;
use nalgebra::{SMatrix, SVector};
use tw_foundation::{TwError, TwResult, EQUALITY_TOLERANCE};
use tw_linal::solve::invert;
use tw_linal::{Matrix33, Real3};

use super::elastic::sig;

/// 正交各向异性波列映射
pub fn wave_column(wave: WaveKind) -> Option<usize> {
    match wave {
        WaveKind::S1Forward => Some(1),
        WaveKind::S1Backward => Some(0),
        WaveKind::S2Forward => Some(3),
        WaveKind::S2Backward => Some(2),
        WaveKind::PForward => Some(5),
        WaveKind::PBackward => Some(4),
    }
}

/// 全刚度张量（3×3×3×3），由 Voigt 矩阵展开，可选旋转
struct Stiffness {
    c: [[[[f64; 3]; 3]; 3]; 3],
}

impl Stiffness {
    fn new(material: &OrthotropicMaterial) -> Self {
        let voigt = material.stiffness_voigt();
        let mut c = [[[[0.0; 3]; 3]; 3]; 3];
        for i in 0..3 {
            for j in 0..3 {
                for k in 0..3 {
                    for l in 0..3 {
                        c[i][j][k][l] = voigt[voigt_index(i, j)][voigt_index(k, l)];
                    }
                }
            }
        }
        let mut s = Self { c };
        if let Some(angles) = material.rotation {
            s = s.rotated(&rotation_matrix(angles));
        }
        s
    }

    /// 张量旋转 c'_pqrs = R_pi R_qj R_rk R_sl c_ijkl
    fn rotated(&self, r: &Matrix33) -> Self {
        let mut out = [[[[0.0; 3]; 3]; 3]; 3];
        #[allow(clippy::needless_range_loop)]
        for p in 0..3 {
            for q in 0..3 {
                for rr in 0..3 {
                    for s in 0..3 {
                        let mut acc = 0.0;
                        for i in 0..3 {
                            for j in 0..3 {
                                for k in 0..3 {
                                    for l in 0..3 {
                                        acc += r[(p, i)]
                                            * r[(q, j)]
                                            * r[(rr, k)]
                                            * r[(s, l)]
                                            * self.c[i][j][k][l];
                                    }
                                }
                            }
                        }
                        out[p][q][rr][s] = acc;
                    }
                }
            }
        }
        Self { c: out }
    }

    #[inline]
    fn at(&self, i: usize, j: usize, k: usize, l: usize) -> f64 {
        self.c[i][j][k][l]
    }
}

#[inline]
fn voigt_index(i: usize, j: usize) -> usize {
    match (i.min(j), i.max(j)) {
        (0, 0) => 0,
        (1, 1) => 1,
        (2, 2) => 2,
        (1, 2) => 3,
        (0, 2) => 4,
        (0, 1) => 5,
        _ => unreachable!(),
    }
}

/// 绕 x、y、z 轴依次旋转的复合矩阵
fn rotation_matrix(angles: [f64; 3]) -> Matrix33 {
    let (sx, cx) = angles[0].sin_cos();
    let (sy, cy) = angles[1].sin_cos();
    let (sz, cz) = angles[2].sin_cos();
    let rx = Matrix33::new(1.0, 0.0, 0.0, 0.0, cx, -sx, 0.0, sx, cx);
    let ry = Matrix33::new(cy, 0.0, sy, 0.0, 1.0, 0.0, -sy, 0.0, cy);
    let rz = Matrix33::new(cz, -sz, 0.0, sz, cz, 0.0, 0.0, 0.0, 1.0);
    rz * ry * rx
}

/// 沿基最后一列方向构造正交各向异性特征矩阵组
pub fn gcm_matrix(
    material: &OrthotropicMaterial,
    basis: &SMatrix<f64, 3, 3>,
    scale: f64,
) -> TwResult<GcmMatrix<9>> {
    let n: Real3 = basis.column(2).clone_owned();

    // 只支持全局坐标轴方向
    let mut axis = usize::MAX;
    for i in 0..3 {
        if (n[i].abs() - 1.0).abs() < EQUALITY_TOLERANCE {
            axis = i;
        } else if n[i].abs() > EQUALITY_TOLERANCE {
            return Err(TwError::bad_config(
                "正交各向异性材料只支持全局基方向计算".to_string(),
            ));
        }
    }
    if axis == usize::MAX {
        return Err(TwError::bad_config("方向向量未归一化".to_string()));
    }
    let sign = n[axis].signum();

    let rho = material.rho;
    let stiffness = Stiffness::new(material);

    // 方向通量雅可比
    let mut a = SMatrix::<f64, 9, 9>::zeros();
    for i in 0..3 {
        a[(i, sig::<3>(i, axis))] = -scale * sign / rho;
    }
    for k in 0..3 {
        for l in k..3 {
            for i in 0..3 {
                a[(sig::<3>(k, l), i)] = -scale * sign * stiffness.at(k, l, i, axis);
            }
        }
    }

    // Christoffel 矩阵 Γ_ik = C_i s k s / ρ
    let mut gamma = Matrix33::zeros();
    for i in 0..3 {
        for k in 0..3 {
            gamma[(i, k)] = stiffness.at(i, axis, k, axis) / rho;
        }
    }
    let (speeds_sq, polarizations) = sym_eigen_3x3(&gamma);
    for (w, &g) in speeds_sq.iter().enumerate() {
        if g <= 0.0 {
            return Err(TwError::bad_config(format!(
                "正交各向异性材料的 Christoffel 矩阵非正定: 特征值 {} = {:.3e}",
                w, g
            )));
        }
    }
    let speeds = [speeds_sq[0].sqrt(), speeds_sq[1].sqrt(), speeds_sq[2].sqrt()];

    // 特征值：波速升序成对，前行波在奇数列
    let mut l = SVector::<f64, 9>::zeros();
    for w in 0..3 {
        l[2 * w] = scale * speeds[w];
        l[2 * w + 1] = -scale * speeds[w];
    }

    // 右特征向量
    let mut u1 = SMatrix::<f64, 9, 9>::zeros();
    for w in 0..3 {
        let p = polarizations[w];
        let c = speeds[w];
        let mut col = SVector::<f64, 9>::zeros();
        for i in 0..3 {
            col[i] = p[i];
        }
        for k in 0..3 {
            for ll in k..3 {
                let mut acc = 0.0;
                for i in 0..3 {
                    acc += stiffness.at(k, ll, i, axis) * p[i];
                }
                col[sig::<3>(k, ll)] = -sign * acc / c;
            }
        }
        u1.set_column(2 * w, &col);
        for slot in 3..9 {
            col[slot] = -col[slot];
        }
        u1.set_column(2 * w + 1, &col);
    }
    // 零特征值：不含 axis 指标的 σ 分量
    let mut zero_col = 6;
    for k in 0..3 {
        for ll in k..3 {
            if k != axis && ll != axis {
                let mut col = SVector::<f64, 9>::zeros();
                col[sig::<3>(k, ll)] = 1.0;
                u1.set_column(zero_col, &col);
                zero_col += 1;
            }
        }
    }
    debug_assert_eq!(zero_col, 9);

    // 左特征串：数值求逆
    let u = invert(&u1).ok_or_else(|| {
        TwError::bad_config("正交各向异性特征向量矩阵奇异".to_string())
    })?;

    let m = GcmMatrix { a, l, u1, u };
    m.check_decomposition().map_err(|residual| {
        TwError::bad_config(format!(
            "正交各向异性材料 (rho={}) 的特征分解残差过大: {:.3e}",
            material.rho, residual
        ))
    })?;
    Ok(m)
}

// ============================================================
// 对称 3x3 特征分解
// ============================================================

/// 对称 3×3 矩阵特征分解，特征值升序，特征向量正交归一
///
/// 特征值走三角化的 Cardano 闭式；特征向量取 `(M − λI)` 行间
/// 叉积中最长者，重根时用正交补完成。
pub fn sym_eigen_3x3(m: &Matrix33) -> ([f64; 3], [Real3; 3]) {
    let scale = m.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if scale == 0.0 {
        return ([0.0; 3], [Real3::x(), Real3::y(), Real3::z()]);
    }

    let p1 = m[(0, 1)].powi(2) + m[(0, 2)].powi(2) + m[(1, 2)].powi(2);
    let q = (m[(0, 0)] + m[(1, 1)] + m[(2, 2)]) / 3.0;

    let eigenvalues = if p1 == 0.0 {
        let mut d = [m[(0, 0)], m[(1, 1)], m[(2, 2)]];
        d.sort_by(|a, b| a.partial_cmp(b).unwrap());
        d
    } else {
        let p2 = (m[(0, 0)] - q).powi(2)
            + (m[(1, 1)] - q).powi(2)
            + (m[(2, 2)] - q).powi(2)
            + 2.0 * p1;
        let p = (p2 / 6.0).sqrt();
        let b = (m - Matrix33::identity() * q) / p;
        let r = (tw_linal::solve::determinant(&b) / 2.0).clamp(-1.0, 1.0);
        let phi = r.acos() / 3.0;
        let hi = q + 2.0 * p * phi.cos();
        let lo = q + 2.0 * p * (phi + 2.0 * std::f64::consts::FRAC_PI_3 * 2.0).cos();
        let mid = 3.0 * q - hi - lo;
        [lo, mid, hi]
    };

    // 特征向量：行叉积法
    let tol = 1e-7 * scale;
    let mut vectors: [Option<Real3>; 3] = [None, None, None];
    for w in 0..3 {
        let b = m - Matrix33::identity() * eigenvalues[w];
        let rows: [Real3; 3] = std::array::from_fn(|i| b.row(i).transpose());
        let candidates = [
            rows[0].cross(&rows[1]),
            rows[0].cross(&rows[2]),
            rows[1].cross(&rows[2]),
        ];
        let best = candidates
            .iter()
            .max_by(|a, b| a.norm().partial_cmp(&b.norm()).unwrap())
            .unwrap();
        if best.norm() > tol * tol {
            vectors[w] = Some(best.normalize());
        }
    }

    // 重根槽位用正交补填满
    let found: Vec<usize> = (0..3).filter(|&w| vectors[w].is_some()).collect();
    match found.len() {
        3 => {}
        2 => {
            let a = vectors[found[0]].unwrap();
            let b = vectors[found[1]].unwrap();
            let missing = (0..3).find(|w| vectors[*w].is_none()).unwrap();
            vectors[missing] = Some(a.cross(&b).normalize());
        }
        1 => {
            let a = vectors[found[0]].unwrap();
            let seed = if a.x.abs() <= a.y.abs() && a.x.abs() <= a.z.abs() {
                Real3::x()
            } else if a.y.abs() <= a.z.abs() {
                Real3::y()
            } else {
                Real3::z()
            };
            let t1 = seed.cross(&a).normalize();
            let t2 = a.cross(&t1);
            let mut iter = (0..3).filter(|w| vectors[*w].is_none());
            let m1 = iter.next().unwrap();
            let m2 = iter.next().unwrap();
            vectors[m1] = Some(t1);
            vectors[m2] = Some(t2);
        }
        _ => {
            vectors = [Some(Real3::x()), Some(Real3::y()), Some(Real3::z())];
        }
    }

    (
        eigenvalues,
        [
            vectors[0].unwrap(),
            vectors[1].unwrap(),
            vectors[2].unwrap(),
        ],
    )
}

// ============================================================
// 测试
// ============================================================
