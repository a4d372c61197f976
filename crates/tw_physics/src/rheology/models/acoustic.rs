// crates/tw_physics/src/rheology/models/acoustic.rs

//! 声学模型
//!
//! 应力张量退化为单一压力标量：PDE 向量 `[v_0..v_{D-1}, p]`，
//! 宽度 `M = D + 1`。非平凡扇区是耦合法向速度与压力的 2×2 块，
//! 特征值 `(+c_p, −c_p, 0, ..)`，`c_p = √(λ/ρ)`。

use super::{BorderFunctional, WaveModel};
use crate::rheology::gcm_matrix::GcmMatrix;
use crate::rheology::materials::{IsotropicMaterial, Material};
use crate::types::{BorderKind, ContactKind, PhysicalQuantity, WaveKind};
use nalgebra::{SMatrix, SVector};
use tw_foundation::{TwError, TwResult};

/// 一维声学模型（M = 2）
pub struct Acoustic1d;
/// 二维声学模型（M = 3）
pub struct Acoustic2d;
/// 三维声学模型（M = 4）
pub struct Acoustic3d;

/// 基列重排：波传播方向成为 n[0]
fn reordered_directions<const D: usize>(
    basis: &SMatrix<f64, D, D>,
) -> [SVector<f64, D>; D] {
    std::array::from_fn(|i| basis.column((i + D - 1) % D).clone_owned())
}

/// 沿基最后一列方向构造声学特征矩阵组
fn acoustic_gcm_matrix<const D: usize, const M: usize>(
    material: &IsotropicMaterial,
    basis: &SMatrix<f64, D, D>,
    scale: f64,
) -> TwResult<GcmMatrix<M>> {
    debug_assert_eq!(M, D + 1);
    let rho = material.rho;
    let lambda = material.lambda;
    let c1 = material.c_acoustic();
    let n: SVector<f64, D> = basis.column(D - 1).clone_owned();

    // 方向通量雅可比：压力行与压力列
    let mut a = SMatrix::<f64, M, M>::zeros();
    for j in 0..D {
        a[(D, j)] = scale * lambda * n[j];
        a[(j, D)] = scale * n[j] / rho;
    }

    // 特征值
    let mut l = SVector::<f64, M>::zeros();
    l[0] = scale * c1;
    l[1] = -scale * c1;

    let dirs = reordered_directions(basis);
    let alpha = 0.5;

    // 右特征向量
    let mut u1 = SMatrix::<f64, M, M>::zeros();
    let mut col = SVector::<f64, M>::zeros();
    for i in 0..D {
        col[i] = dirs[0][i];
    }
    col[D] = c1 * rho;
    u1.set_column(0, &col);
    col[D] = -c1 * rho;
    u1.set_column(1, &col);
    for w in 1..D {
        let mut zero_col = SVector::<f64, M>::zeros();
        for i in 0..D {
            zero_col[i] = dirs[w][i];
        }
        u1.set_column(w + 1, &zero_col);
    }

    // 左特征串
    let mut u = SMatrix::<f64, M, M>::zeros();
    let mut row = SVector::<f64, M>::zeros();
    for i in 0..D {
        row[i] = alpha * dirs[0][i];
    }
    row[D] = alpha / (c1 * rho);
    u.set_row(0, &row.transpose());
    row[D] = -alpha / (c1 * rho);
    u.set_row(1, &row.transpose());
    for w in 1..D {
        let mut zero_row = SVector::<f64, M>::zeros();
        for i in 0..D {
            zero_row[i] = dirs[w][i];
        }
        u.set_row(w + 1, &zero_row.transpose());
    }

    let m = GcmMatrix { a, l, u1, u };
    m.check_decomposition().map_err(|residual| {
        TwError::bad_config(format!(
            "声学材料 {} 的特征分解残差过大: {:.3e}",
            material.describe_short(),
            residual
        ))
    })?;
    Ok(m)
}

// ============================================================
// 边界条件矩阵与平面修正
// ============================================================

/// 固定压力矩阵（与基无关）
fn border_traction<const D: usize, const M: usize>() -> SMatrix<f64, 1, M> {
    let mut b = SMatrix::<f64, 1, M>::zeros();
    b[(0, D)] = 1.0;
    b
}

/// 固定法向速度矩阵
fn border_velocity<const D: usize, const M: usize>(
    normal: &SVector<f64, D>,
) -> SMatrix<f64, 1, M> {
    let mut b = SMatrix::<f64, 1, M>::zeros();
    for i in 0..D {
        b[(0, i)] = normal[i];
    }
    b
}

/// 平面边界修正（声学）
fn plain_border<const D: usize, const M: usize>(
    u: &mut SVector<f64, M>,
    kind: BorderKind,
    normal: &SVector<f64, D>,
    b: &SVector<f64, 1>,
) {
    match kind {
        BorderKind::FixedForce | BorderKind::FreeBorder | BorderKind::NonReflection => {
            u[D] = b[0];
        }
        BorderKind::FixedVelocity => {
            // 只改法向分量
            let mut vn = 0.0;
            for i in 0..D {
                vn += u[i] * normal[i];
            }
            for i in 0..D {
                u[i] += (b[0] - vn) * normal[i];
            }
        }
    }
}

/// 平面接触修正：双侧平均（滑移）
fn plain_contact_avg<const D: usize, const M: usize>(
    ua: &mut SVector<f64, M>,
    ub: &mut SVector<f64, M>,
    normal: &SVector<f64, D>,
) {
    let pressure = 0.5 * (ua[D] + ub[D]);
    ua[D] = pressure;
    ub[D] = pressure;

    let mut vna = 0.0;
    let mut vnb = 0.0;
    for i in 0..D {
        vna += ua[i] * normal[i];
        vnb += ub[i] * normal[i];
    }
    let vn = 0.5 * (vna + vnb);
    for i in 0..D {
        ua[i] += (vn - vna) * normal[i];
        ub[i] += (vn - vnb) * normal[i];
    }
}

/// 平面接触修正：A 侧取 B 侧的连续量（滑移）
fn plain_contact_one_sided<const D: usize, const M: usize>(
    ua: &mut SVector<f64, M>,
    ub: &SVector<f64, M>,
    normal: &SVector<f64, D>,
) {
    ua[D] = ub[D];
    let mut vna = 0.0;
    let mut vnb = 0.0;
    for i in 0..D {
        vna += ua[i] * normal[i];
        vnb += ub[i] * normal[i];
    }
    for i in 0..D {
        ua[i] += (vnb - vna) * normal[i];
    }
}

fn acoustic_get<const D: usize, const M: usize>(
    q: PhysicalQuantity,
    u: &SVector<f64, M>,
) -> Option<f64> {
    use PhysicalQuantity::*;
    match q {
        Vx => Some(u[0]),
        Vy if D >= 2 => Some(u[1]),
        Vz if D >= 3 => Some(u[2]),
        Pressure => Some(u[D]),
        _ => None,
    }
}

fn acoustic_set<const D: usize, const M: usize>(
    q: PhysicalQuantity,
    value: f64,
    u: &mut SVector<f64, M>,
) -> bool {
    use PhysicalQuantity::*;
    match q {
        Vx => u[0] = value,
        Vy if D >= 2 => u[1] = value,
        Vz if D >= 3 => u[2] = value,
        Pressure => u[D] = value,
        _ => return false,
    }
    true
}

// ============================================================
// 模型实现
// ============================================================

macro_rules! impl_acoustic {
    ($name:ident, $d:expr, $m:expr) => {
        impl WaveModel<{ $d }, { $m }, 1> for $name {
            const NAME: &'static str = concat!("acoustic_", stringify!($d), "d");
            const LEFT_INVARIANTS: [usize; 1] = [0];
            const RIGHT_INVARIANTS: [usize; 1] = [1];

            fn construct_gcm_matrix(
                material: &Material,
                basis: &SMatrix<f64, { $d }, { $d }>,
                scale: f64,
            ) -> TwResult<GcmMatrix<{ $m }>> {
                acoustic_gcm_matrix::<{ $d }, { $m }>(material.as_isotropic()?, basis, scale)
            }

            fn wave_column(material: &Material, wave: WaveKind) -> Option<usize> {
                if !matches!(material, Material::Isotropic(_)) {
                    return None;
                }
                match wave {
                    WaveKind::PForward => Some(1),
                    WaveKind::PBackward => Some(0),
                    _ => None,
                }
            }

            fn border_matrix(
                functional: BorderFunctional,
                normal: &SVector<f64, { $d }>,
            ) -> SMatrix<f64, 1, { $m }> {
                match functional {
                    BorderFunctional::Traction => border_traction::<{ $d }, { $m }>(),
                    BorderFunctional::Velocity => border_velocity::<{ $d }, { $m }>(normal),
                }
            }

            fn border_matrix_global(
                functional: BorderFunctional,
                normal: &SVector<f64, { $d }>,
            ) -> SMatrix<f64, 1, { $m }> {
                // 压力行与基无关，速度行本就以法向表达
                Self::border_matrix(functional, normal)
            }

            fn plain_border_correction(
                u: &mut SVector<f64, { $m }>,
                kind: BorderKind,
                normal: &SVector<f64, { $d }>,
                b: &SVector<f64, 1>,
            ) {
                plain_border::<{ $d }, { $m }>(u, kind, normal, b);
            }

            fn plain_contact_correction_avg(
                ua: &mut SVector<f64, { $m }>,
                ub: &mut SVector<f64, { $m }>,
                _kind: ContactKind,
                normal: &SVector<f64, { $d }>,
            ) {
                plain_contact_avg::<{ $d }, { $m }>(ua, ub, normal);
            }

            fn plain_contact_correction_one_sided(
                ua: &mut SVector<f64, { $m }>,
                ub: &SVector<f64, { $m }>,
                _kind: ContactKind,
                normal: &SVector<f64, { $d }>,
            ) {
                plain_contact_one_sided::<{ $d }, { $m }>(ua, ub, normal);
            }

            fn get_quantity(q: PhysicalQuantity, u: &SVector<f64, { $m }>) -> Option<f64> {
                acoustic_get::<{ $d }, { $m }>(q, u)
            }

            fn set_quantity(
                q: PhysicalQuantity,
                value: f64,
                u: &mut SVector<f64, { $m }>,
            ) -> bool {
                acoustic_set::<{ $d }, { $m }>(q, value, u)
            }

            fn supports_contact(kind: ContactKind) -> bool {
                kind == ContactKind::Slide
            }
        }
    };
}

impl_acoustic!(Acoustic1d, 1, 2);
impl_acoustic!(Acoustic2d, 2, 3);
impl_acoustic!(Acoustic3d, 3, 4);

// ============================================================
// 测试
// ============================================================
