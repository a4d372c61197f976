// crates/tw_physics/src/rheology/models/elastic.rs

//! 弹性模型
//!
//! PDE 向量 `[v_0..v_{D-1}, σ_00, σ_01, .., σ_{D-1,D-1}]`，
//! 对称应力按上三角行主序压缩，宽度 `M = D + D(D+1)/2`。
//!
//! 特征结构（各向同性）：特征值
//! `(+c_p, −c_p, +c_s, −c_s, +c_s, −c_s, 0, ..)`，
//! `c_p = √((λ+2μ)/ρ)`，`c_s = √(μ/ρ)`。特征向量由
//! `N(i,j) = sym(n_i ⊗ n_j)` 张成，基列按 `(i+D−1) mod D`
//! 重排使波传播方向成为 `n_0`。
//!
//! 注意 σ 在 PDE 向量里是压缩存储：左特征串的 σ 部分要乘
//! `2s − diag(s)` 修正，否则压缩点积会把非对角分量少算一半。

use super::orthotropic;
use super::{BorderFunctional, WaveModel};
use crate::rheology::gcm_matrix::GcmMatrix;
use crate::rheology::materials::{IsotropicMaterial, Material};
use crate::types::{BorderKind, ContactKind, PhysicalQuantity, WaveKind};
use nalgebra::{SMatrix, SVector};
use tw_foundation::{TwError, TwResult};
use tw_linal::ops::sym_index;

/// 一维弹性模型（M = 2）
pub struct Elastic1d;
/// 二维弹性模型（M = 5）
pub struct Elastic2d;
/// 三维弹性模型（M = 9）
pub struct Elastic3d;

// ============================================================
// 压缩存储辅助
// ============================================================

/// σ(i, j) 在 PDE 向量中的位置
#[inline]
pub(crate) fn sig<const D: usize>(i: usize, j: usize) -> usize {
    D + sym_index(D, i, j)
}

/// 写入速度部分
#[inline]
fn set_velocity<const D: usize, const M: usize>(
    out: &mut SVector<f64, M>,
    v: &SVector<f64, D>,
) {
    for i in 0..D {
        out[i] = v[i];
    }
}

/// 以张量语义写入 σ 部分（压缩槽位 = 张量分量）
fn set_sigma_tensor<const D: usize, const M: usize>(
    out: &mut SVector<f64, M>,
    s: &SMatrix<f64, D, D>,
) {
    for i in 0..D {
        for j in i..D {
            out[sig::<D>(i, j)] = s[(i, j)];
        }
    }
}

/// 以特征串语义写入 σ 部分：非对角乘 2（压缩点积修正）
fn set_sigma_string<const D: usize, const M: usize>(
    out: &mut SVector<f64, M>,
    s: &SMatrix<f64, D, D>,
) {
    for i in 0..D {
        for j in i..D {
            let factor = if i == j { 1.0 } else { 2.0 };
            out[sig::<D>(i, j)] = factor * s[(i, j)];
        }
    }
}

/// 对称化外积 `sym(a ⊗ b)`
fn symm_product<const D: usize>(
    a: &SVector<f64, D>,
    b: &SVector<f64, D>,
) -> SMatrix<f64, D, D> {
    (a * b.transpose() + b * a.transpose()) * 0.5
}

/// 从 PDE 向量取出 σ 张量
fn sigma_of<const D: usize, const M: usize>(u: &SVector<f64, M>) -> SMatrix<f64, D, D> {
    let mut s = SMatrix::<f64, D, D>::zeros();
    for i in 0..D {
        for j in 0..D {
            s[(i, j)] = u[sig::<D>(i, j)];
        }
    }
    s
}

/// 从 PDE 向量取出速度
fn velocity_of<const D: usize, const M: usize>(u: &SVector<f64, M>) -> SVector<f64, D> {
    let mut v = SVector::<f64, D>::zeros();
    for i in 0..D {
        v[i] = u[i];
    }
    v
}

// ============================================================
// 各向同性构造
// ============================================================

/// 基列重排：波传播方向（基最后一列）成为 n[0]
fn reordered_directions<const D: usize>(
    basis: &SMatrix<f64, D, D>,
) -> [SVector<f64, D>; D] {
    std::array::from_fn(|i| basis.column((i + D - 1) % D).clone_owned())
}

/// 沿基最后一列方向构造各向同性弹性特征矩阵组
fn isotropic_gcm_matrix<const D: usize, const M: usize>(
    material: &IsotropicMaterial,
    basis: &SMatrix<f64, D, D>,
    scale: f64,
) -> TwResult<GcmMatrix<M>> {
    debug_assert_eq!(M, D + D * (D + 1) / 2);
    if D >= 2 && material.mu <= 0.0 {
        return Err(TwError::bad_config(format!(
            "弹性模型要求 mu > 0: {}",
            material.describe_short()
        )));
    }

    let rho = material.rho;
    let lambda = material.lambda;
    let mu = material.mu;
    let c1 = material.c_p();
    let c2 = material.c_s();
    let n: SVector<f64, D> = basis.column(D - 1).clone_owned();

    // 方向通量雅可比
    let mut a = SMatrix::<f64, M, M>::zeros();
    for i in 0..D {
        // 速度行：σ(i, j) 槽位
        for j in 0..D {
            a[(i, sig::<D>(i, j))] = -scale * n[j] / rho;
        }
    }
    for i in 0..D {
        // 速度列：σ 方程对 v_i 的系数
        let mut col = SVector::<f64, M>::zeros();
        for j in 0..D {
            col[sig::<D>(i, j)] += -scale * mu * n[j];
        }
        for j in 0..D {
            let extra = if i == j { mu } else { 0.0 };
            col[sig::<D>(j, j)] += -scale * (lambda + extra) * n[i];
        }
        for r in D..M {
            a[(r, i)] = col[r];
        }
    }

    // 特征值
    let mut l = SVector::<f64, M>::zeros();
    l[0] = scale * c1;
    l[1] = -scale * c1;
    for i in 1..D {
        l[2 * i] = scale * c2;
        l[2 * i + 1] = -scale * c2;
    }

    let u1 = isotropic_eigenvectors::<D, M>(material, basis);
    let u = isotropic_eigenstrings::<D, M>(material, basis);

    let m = GcmMatrix { a, l, u1, u };
    m.check_decomposition().map_err(|residual| {
        TwError::bad_config(format!(
            "材料 {} 的特征分解残差过大: {:.3e}",
            material.describe_short(),
            residual
        ))
    })?;
    Ok(m)
}

/// 右特征向量（按列）
fn isotropic_eigenvectors<const D: usize, const M: usize>(
    material: &IsotropicMaterial,
    basis: &SMatrix<f64, D, D>,
) -> SMatrix<f64, M, M> {
    let lambda = material.lambda;
    let mu = material.mu;
    let c1 = material.c_p();
    let c2 = material.c_s();
    let n = reordered_directions(basis);
    let identity = SMatrix::<f64, D, D>::identity();
    let nn = |i: usize, j: usize| symm_product(&n[i], &n[j]);

    // U·U1 = I 的归一化因子
    let alpha = 0.5;

    let mut u1 = SMatrix::<f64, M, M>::zeros();
    let mut col = SVector::<f64, M>::zeros();

    // 纵波
    set_velocity(&mut col, &(n[0] * alpha));
    set_sigma_tensor(&mut col, &((identity * lambda + nn(0, 0) * 2.0 * mu) * (-alpha / c1)));
    u1.set_column(0, &col);
    set_sigma_tensor(&mut col, &((identity * lambda + nn(0, 0) * 2.0 * mu) * (alpha / c1)));
    u1.set_column(1, &col);

    // 横波
    for i in 1..D {
        set_velocity(&mut col, &(n[i] * alpha));
        set_sigma_tensor(&mut col, &(nn(0, i) * (-2.0 * alpha * mu / c2)));
        u1.set_column(2 * i, &col);
        set_sigma_tensor(&mut col, &(nn(0, i) * (2.0 * alpha * mu / c2)));
        u1.set_column(2 * i + 1, &col);
    }

    // 零特征值
    col = SVector::<f64, M>::zeros();
    match D {
        3 => {
            set_sigma_tensor(&mut col, &(nn(1, 2) * 2.0));
            u1.set_column(6, &col);
            set_sigma_tensor(&mut col, &((nn(1, 1) - nn(2, 2)) * 0.5));
            u1.set_column(7, &col);
            set_sigma_tensor(&mut col, &((nn(1, 1) + nn(2, 2)) * 0.5));
            u1.set_column(8, &col);
        }
        2 => {
            set_sigma_tensor(&mut col, &(identity - nn(0, 0)));
            u1.set_column(4, &col);
        }
        _ => {}
    }

    u1
}

/// 左特征串（按行）
fn isotropic_eigenstrings<const D: usize, const M: usize>(
    material: &IsotropicMaterial,
    basis: &SMatrix<f64, D, D>,
) -> SMatrix<f64, M, M> {
    let lambda = material.lambda;
    let mu = material.mu;
    let rho = material.rho;
    let c1 = material.c_p();
    let c2 = material.c_s();
    let n = reordered_directions(basis);
    let nn = |i: usize, j: usize| symm_product(&n[i], &n[j]);
    let lame_ratio = lambda / (lambda + 2.0 * mu);

    let mut u = SMatrix::<f64, M, M>::zeros();
    let mut row = SVector::<f64, M>::zeros();

    // 纵波
    set_velocity(&mut row, &n[0]);
    set_sigma_string(&mut row, &(nn(0, 0) / (-c1 * rho)));
    u.set_row(0, &row.transpose());
    set_sigma_string(&mut row, &(nn(0, 0) / (c1 * rho)));
    u.set_row(1, &row.transpose());

    // 横波
    for i in 1..D {
        set_velocity(&mut row, &n[i]);
        set_sigma_string(&mut row, &(nn(0, i) / (-c2 * rho)));
        u.set_row(2 * i, &row.transpose());
        set_sigma_string(&mut row, &(nn(0, i) / (c2 * rho)));
        u.set_row(2 * i + 1, &row.transpose());
    }

    // 零特征值
    row = SVector::<f64, M>::zeros();
    match D {
        3 => {
            set_sigma_string(&mut row, &nn(1, 2));
            u.set_row(6, &row.transpose());
            set_sigma_string(&mut row, &(nn(1, 1) - nn(2, 2)));
            u.set_row(7, &row.transpose());
            set_sigma_string(
                &mut row,
                &(nn(1, 1) + nn(2, 2) - nn(0, 0) * 2.0 * lame_ratio),
            );
            u.set_row(8, &row.transpose());
        }
        2 => {
            set_sigma_string(&mut row, &(nn(1, 1) - nn(0, 0) * lame_ratio));
            u.set_row(4, &row.transpose());
        }
        _ => {}
    }

    u
}

// ============================================================
// 边界条件矩阵
// ============================================================

/// 局部基固定面力矩阵：行 k 提取局部基第 k 方向的面力分量
fn border_traction_local<const D: usize, const M: usize>(
    normal: &SVector<f64, D>,
) -> SMatrix<f64, D, M> {
    let s = super::local_basis(normal);
    let mut b = SMatrix::<f64, D, M>::zeros();
    for k in 0..D {
        let mut row = SVector::<f64, M>::zeros();
        // 压缩槽位累加 S(i,k)·ν(j)，对称槽位自然合并
        for i in 0..D {
            for j in 0..D {
                row[sig::<D>(i, j)] += s[(i, k)] * normal[j];
            }
        }
        b.set_row(k, &row.transpose());
    }
    b
}

/// 局部基固定速度矩阵：行 i 提取局部基第 i 方向的速度分量
fn border_velocity_local<const D: usize, const M: usize>(
    normal: &SVector<f64, D>,
) -> SMatrix<f64, D, M> {
    let s = super::local_basis(normal);
    let mut b = SMatrix::<f64, D, M>::zeros();
    for i in 0..D {
        let mut row = SVector::<f64, M>::zeros();
        set_velocity(&mut row, &s.column(i).clone_owned());
        b.set_row(i, &row.transpose());
    }
    b
}

/// 全局基固定面力矩阵：行 i 提取 (σ·ν)_i
fn border_traction_global<const D: usize, const M: usize>(
    normal: &SVector<f64, D>,
) -> SMatrix<f64, D, M> {
    let mut b = SMatrix::<f64, D, M>::zeros();
    for i in 0..D {
        let mut row = SVector::<f64, M>::zeros();
        for j in 0..D {
            row[sig::<D>(i, j)] = normal[j];
        }
        b.set_row(i, &row.transpose());
    }
    b
}

/// 全局基固定速度矩阵：行 i 提取 v_i
fn border_velocity_global<const D: usize, const M: usize>() -> SMatrix<f64, D, M> {
    let mut b = SMatrix::<f64, D, M>::zeros();
    for i in 0..D {
        b[(i, i)] = 1.0;
    }
    b
}

// ============================================================
// 平面修正
// ============================================================

/// 平面边界修正（弹性）
fn plain_border<const D: usize, const M: usize>(
    u: &mut SVector<f64, M>,
    kind: BorderKind,
    normal: &SVector<f64, D>,
    b: &SVector<f64, D>,
) {
    let s = super::local_basis(normal);
    match kind {
        BorderKind::FixedForce | BorderKind::FreeBorder | BorderKind::NonReflection => {
            let sigma_global = sigma_of::<D, M>(u);
            let mut sigma_local = s.transpose() * sigma_global * s;
            for i in 0..D {
                sigma_local[(i, D - 1)] = b[i];
                sigma_local[(D - 1, i)] = b[i];
            }
            let back = s * sigma_local * s.transpose();
            set_sigma_tensor(u, &back);
        }
        BorderKind::FixedVelocity => {
            let v_global = s * b;
            set_velocity(u, &v_global);
        }
    }
}

/// 平面接触修正：双侧平均（粘接）
fn plain_contact_avg<const D: usize, const M: usize>(
    ua: &mut SVector<f64, M>,
    ub: &mut SVector<f64, M>,
    normal: &SVector<f64, D>,
) {
    let v = (velocity_of::<D, M>(ua) + velocity_of::<D, M>(ub)) * 0.5;
    set_velocity(ua, &v);
    set_velocity(ub, &v);

    let s = super::local_basis(normal);
    let mut la = s.transpose() * sigma_of::<D, M>(ua) * s;
    let mut lb = s.transpose() * sigma_of::<D, M>(ub) * s;
    for i in 0..D {
        let avg = 0.5 * (la[(i, D - 1)] + lb[(i, D - 1)]);
        la[(i, D - 1)] = avg;
        la[(D - 1, i)] = avg;
        lb[(i, D - 1)] = avg;
        lb[(D - 1, i)] = avg;
    }
    set_sigma_tensor(ua, &(s * la * s.transpose()));
    set_sigma_tensor(ub, &(s * lb * s.transpose()));
}

/// 平面接触修正：A 侧取 B 侧的连续量（粘接）
fn plain_contact_one_sided<const D: usize, const M: usize>(
    ua: &mut SVector<f64, M>,
    ub: &SVector<f64, M>,
    normal: &SVector<f64, D>,
) {
    set_velocity(ua, &velocity_of::<D, M>(ub));

    let s = super::local_basis(normal);
    let mut la = s.transpose() * sigma_of::<D, M>(ua) * s;
    let lb = s.transpose() * sigma_of::<D, M>(ub) * s;
    for i in 0..D {
        la[(i, D - 1)] = lb[(i, D - 1)];
        la[(D - 1, i)] = lb[(i, D - 1)];
    }
    set_sigma_tensor(ua, &(s * la * s.transpose()));
}

// ============================================================
// 物理量读写
// ============================================================

fn elastic_get<const D: usize, const M: usize>(
    q: PhysicalQuantity,
    u: &SVector<f64, M>,
) -> Option<f64> {
    use PhysicalQuantity::*;
    match q {
        Vx => Some(u[0]),
        Vy if D >= 2 => Some(u[1]),
        Vz if D >= 3 => Some(u[2]),
        Sxx => Some(u[sig::<D>(0, 0)]),
        Sxy if D >= 2 => Some(u[sig::<D>(0, 1)]),
        Sxz if D >= 3 => Some(u[sig::<D>(0, 2)]),
        Syy if D >= 2 => Some(u[sig::<D>(1, 1)]),
        Syz if D >= 3 => Some(u[sig::<D>(1, 2)]),
        Szz if D >= 3 => Some(u[sig::<D>(2, 2)]),
        Pressure => {
            let mut trace = 0.0;
            for i in 0..D {
                trace += u[sig::<D>(i, i)];
            }
            Some(-trace / D as f64)
        }
        _ => None,
    }
}

fn elastic_set<const D: usize, const M: usize>(
    q: PhysicalQuantity,
    value: f64,
    u: &mut SVector<f64, M>,
) -> bool {
    use PhysicalQuantity::*;
    match q {
        Vx => u[0] = value,
        Vy if D >= 2 => u[1] = value,
        Vz if D >= 3 => u[2] = value,
        Sxx => u[sig::<D>(0, 0)] = value,
        Sxy if D >= 2 => u[sig::<D>(0, 1)] = value,
        Sxz if D >= 3 => u[sig::<D>(0, 2)] = value,
        Syy if D >= 2 => u[sig::<D>(1, 1)] = value,
        Syz if D >= 3 => u[sig::<D>(1, 2)] = value,
        Szz if D >= 3 => u[sig::<D>(2, 2)] = value,
        Pressure => {
            for i in 0..D {
                u[sig::<D>(i, i)] = -value;
            }
        }
        _ => return false,
    }
    true
}

// ============================================================
// 模型实现
// ============================================================

macro_rules! impl_elastic_common {
    ($d:expr, $m:expr, $k:expr) => {
        fn border_matrix(
            functional: BorderFunctional,
            normal: &SVector<f64, {$d}>,
        ) -> SMatrix<f64, {$k}, {$m}> {
            match functional {
                BorderFunctional::Traction => border_traction_local::<{$d}, {$m}>(normal),
                BorderFunctional::Velocity => border_velocity_local::<{$d}, {$m}>(normal),
            }
        }

        fn border_matrix_global(
            functional: BorderFunctional,
            normal: &SVector<f64, {$d}>,
        ) -> SMatrix<f64, {$k}, {$m}> {
            match functional {
                BorderFunctional::Traction => border_traction_global::<{$d}, {$m}>(normal),
                BorderFunctional::Velocity => border_velocity_global::<{$d}, {$m}>(),
            }
        }

        fn plain_border_correction(
            u: &mut SVector<f64, {$m}>,
            kind: BorderKind,
            normal: &SVector<f64, {$d}>,
            b: &SVector<f64, {$k}>,
        ) {
            plain_border::<{$d}, {$m}>(u, kind, normal, b);
        }

        fn plain_contact_correction_avg(
            ua: &mut SVector<f64, {$m}>,
            ub: &mut SVector<f64, {$m}>,
            _kind: ContactKind,
            normal: &SVector<f64, {$d}>,
        ) {
            plain_contact_avg::<{$d}, {$m}>(ua, ub, normal);
        }

        fn plain_contact_correction_one_sided(
            ua: &mut SVector<f64, {$m}>,
            ub: &SVector<f64, {$m}>,
            _kind: ContactKind,
            normal: &SVector<f64, {$d}>,
        ) {
            plain_contact_one_sided::<{$d}, {$m}>(ua, ub, normal);
        }

        fn get_quantity(q: PhysicalQuantity, u: &SVector<f64, {$m}>) -> Option<f64> {
            elastic_get::<{$d}, {$m}>(q, u)
        }

        fn set_quantity(q: PhysicalQuantity, value: f64, u: &mut SVector<f64, {$m}>) -> bool {
            elastic_set::<{$d}, {$m}>(q, value, u)
        }

        fn supports_contact(kind: ContactKind) -> bool {
            kind == ContactKind::Adhesion
        }
    };
}

impl WaveModel<1, 2, 1> for Elastic1d {
    const NAME: &'static str = "elastic_1d";
    const LEFT_INVARIANTS: [usize; 1] = [0];
    const RIGHT_INVARIANTS: [usize; 1] = [1];

    fn construct_gcm_matrix(
        material: &Material,
        basis: &SMatrix<f64, 1, 1>,
        scale: f64,
    ) -> TwResult<GcmMatrix<2>> {
        isotropic_gcm_matrix::<1, 2>(material.as_isotropic()?, basis, scale)
    }

    fn wave_column(material: &Material, wave: WaveKind) -> Option<usize> {
        if !matches!(material, Material::Isotropic(_)) {
            return None;
        }
        match wave {
            WaveKind::PForward => Some(0),
            WaveKind::PBackward => Some(1),
            _ => None,
        }
    }

    impl_elastic_common!(1, 2, 1);
}

impl WaveModel<2, 5, 2> for Elastic2d {
    const NAME: &'static str = "elastic_2d";
    const LEFT_INVARIANTS: [usize; 2] = [0, 2];
    const RIGHT_INVARIANTS: [usize; 2] = [1, 3];

    fn construct_gcm_matrix(
        material: &Material,
        basis: &SMatrix<f64, 2, 2>,
        scale: f64,
    ) -> TwResult<GcmMatrix<5>> {
        isotropic_gcm_matrix::<2, 5>(material.as_isotropic()?, basis, scale)
    }

    fn wave_column(material: &Material, wave: WaveKind) -> Option<usize> {
        if !matches!(material, Material::Isotropic(_)) {
            return None;
        }
        match wave {
            WaveKind::PForward => Some(1),
            WaveKind::PBackward => Some(0),
            WaveKind::S1Forward => Some(3),
            WaveKind::S1Backward => Some(2),
            _ => None,
        }
    }

    impl_elastic_common!(2, 5, 2);
}

impl WaveModel<3, 9, 3> for Elastic3d {
    const NAME: &'static str = "elastic_3d";
    const LEFT_INVARIANTS: [usize; 3] = [0, 2, 4];
    const RIGHT_INVARIANTS: [usize; 3] = [1, 3, 5];

    fn construct_gcm_matrix(
        material: &Material,
        basis: &SMatrix<f64, 3, 3>,
        scale: f64,
    ) -> TwResult<GcmMatrix<9>> {
        match material {
            Material::Isotropic(m) => isotropic_gcm_matrix::<3, 9>(m, basis, scale),
            Material::Orthotropic(m) => orthotropic::gcm_matrix(m, basis, scale),
        }
    }

    fn wave_column(material: &Material, wave: WaveKind) -> Option<usize> {
        match material {
            Material::Isotropic(_) => Some(match wave {
                WaveKind::PForward => 1,
                WaveKind::PBackward => 0,
                WaveKind::S1Forward => 4,
                WaveKind::S1Backward => 2,
                WaveKind::S2Forward => 5,
                WaveKind::S2Backward => 3,
            }),
            Material::Orthotropic(_) => orthotropic::wave_column(wave),
        }
    }

    impl_elastic_common!(3, 9, 3);
}

impl IsotropicMaterial {
    /// 简短描述（错误信息用）
    pub(crate) fn describe_short(&self) -> String {
        format!("(rho={}, lambda={}, mu={})", self.rho, self.lambda, self.mu)
    }
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::SMatrix;
    use tw_foundation::EQUALITY_TOLERANCE;
    use tw_linal::ops::norm_max;

    fn material() -> Material {
        Material::Isotropic(IsotropicMaterial::new(4.0, 2.0, 0.5).unwrap())
    }

    #[test]
    fn test_2d_x_stage_matches_closed_form() {
        // 与按分量写出的二维 x 方向雅可比逐项比对
        let m = Elastic2d::construct_gcm_matrices(&material(), &SMatrix::<f64, 2, 2>::identity())
            .unwrap();
        let ax = &m.stage(0).a;
        let (rho, lambda, mu) = (4.0, 2.0, 0.5);
        let mut expected = SMatrix::<f64, 5, 5>::zeros();
        expected[(0, 2)] = -1.0 / rho;
        expected[(1, 3)] = -1.0 / rho;
        expected[(2, 0)] = -(lambda + 2.0 * mu);
        expected[(3, 1)] = -mu;
        expected[(4, 0)] = -lambda;
        assert!(
            norm_max(&(ax - expected)) < 1e-12,
            "x 方向雅可比与闭式不符: {:?}",
            ax
        );
    }

    #[test]
    fn test_decomposition_all_dims() {
        let basis1 = SMatrix::<f64, 1, 1>::identity();
        let m1 = Elastic1d::construct_gcm_matrices(&material(), &basis1).unwrap();
        assert!(m1.stage(0).check_decomposition().is_ok());

        let basis2 = SMatrix::<f64, 2, 2>::identity();
        let m2 = Elastic2d::construct_gcm_matrices(&material(), &basis2).unwrap();
        for s in 0..2 {
            assert!(m2.stage(s).check_decomposition().is_ok(), "阶段 {} 分解失败", s);
        }

        let basis3 = SMatrix::<f64, 3, 3>::identity();
        let m3 = Elastic3d::construct_gcm_matrices(&material(), &basis3).unwrap();
        for s in 0..3 {
            assert!(m3.stage(s).check_decomposition().is_ok(), "阶段 {} 分解失败", s);
        }
    }

    #[test]
    fn test_decomposition_rotated_basis() {
        // 非轴对齐基下同样成立
        let angle = 0.37_f64;
        let basis = SMatrix::<f64, 2, 2>::new(
            angle.cos(),
            -angle.sin(),
            angle.sin(),
            angle.cos(),
        );
        let m = Elastic2d::construct_gcm_matrices(&material(), &basis).unwrap();
        for s in 0..2 {
            assert!(m.stage(s).check_decomposition().is_ok());
        }
    }

    #[test]
    fn test_eigenvalues_layout() {
        let m = Elastic2d::construct_gcm_matrices(&material(), &SMatrix::<f64, 2, 2>::identity())
            .unwrap();
        let l = &m.stage(0).l;
        let c_p = (3.0_f64 / 4.0).sqrt();
        let c_s = (0.5_f64 / 4.0).sqrt();
        assert!((l[0] - c_p).abs() < 1e-12);
        assert!((l[1] + c_p).abs() < 1e-12);
        assert!((l[2] - c_s).abs() < 1e-12);
        assert!((l[3] + c_s).abs() < 1e-12);
        assert!(l[4].abs() < 1e-14);
        assert!((m.max_eigenvalue() - c_p).abs() < 1e-12);
    }

    #[test]
    fn test_wave_columns_sign_convention() {
        // 前行波列对应负特征值（特征沿 dx/dt = -λ 传播）
        let m = Elastic2d::construct_gcm_matrices(&material(), &SMatrix::<f64, 2, 2>::identity())
            .unwrap();
        let col = Elastic2d::wave_column(&material(), WaveKind::PForward).unwrap();
        assert!(m.stage(0).l[col] < 0.0);
        let col = Elastic2d::wave_column(&material(), WaveKind::PBackward).unwrap();
        assert!(m.stage(0).l[col] > 0.0);
    }

    #[test]
    fn test_quantity_round_trip() {
        let mut u = SVector::<f64, 5>::zeros();
        assert!(elastic_set::<2, 5>(PhysicalQuantity::Sxy, 3.5, &mut u));
        assert_eq!(elastic_get::<2, 5>(PhysicalQuantity::Sxy, &u), Some(3.5));
        assert_eq!(elastic_get::<2, 5>(PhysicalQuantity::Szz, &u), None);

        // 压力 = -tr(σ)/D
        elastic_set::<2, 5>(PhysicalQuantity::Sxx, -2.0, &mut u);
        elastic_set::<2, 5>(PhysicalQuantity::Syy, -4.0, &mut u);
        assert_eq!(elastic_get::<2, 5>(PhysicalQuantity::Pressure, &u), Some(3.0));
    }

    #[test]
    fn test_plain_border_fixed_velocity() {
        let mut u = SVector::<f64, 5>::zeros();
        u[0] = 1.0;
        u[1] = 2.0;
        let normal = SVector::<f64, 2>::new(0.0, 1.0);
        let b = SVector::<f64, 2>::new(0.0, 0.0);
        plain_border::<2, 5>(&mut u, BorderKind::FixedVelocity, &normal, &b);
        assert!(u[0].abs() < EQUALITY_TOLERANCE && u[1].abs() < EQUALITY_TOLERANCE);
    }

    #[test]
    fn test_plain_border_free_surface() {
        let mut u = SVector::<f64, 5>::zeros();
        elastic_set::<2, 5>(PhysicalQuantity::Syy, 5.0, &mut u);
        elastic_set::<2, 5>(PhysicalQuantity::Sxy, 1.0, &mut u);
        elastic_set::<2, 5>(PhysicalQuantity::Sxx, 2.0, &mut u);
        let normal = SVector::<f64, 2>::new(0.0, 1.0);
        plain_border::<2, 5>(
            &mut u,
            BorderKind::FreeBorder,
            &normal,
            &SVector::<f64, 2>::zeros(),
        );
        // σ·ν 分量清零，σ_xx 保留
        assert!(elastic_get::<2, 5>(PhysicalQuantity::Syy, &u).unwrap().abs() < 1e-12);
        assert!(elastic_get::<2, 5>(PhysicalQuantity::Sxy, &u).unwrap().abs() < 1e-12);
        assert!((elastic_get::<2, 5>(PhysicalQuantity::Sxx, &u).unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_border_matrix_traction_extracts_sigma_nu() {
        // B·u 在全局基下应恰好等于 σ·ν
        let normal = SVector::<f64, 2>::new(0.6, 0.8);
        let b = border_traction_global::<2, 5>(&normal);
        let mut u = SVector::<f64, 5>::zeros();
        elastic_set::<2, 5>(PhysicalQuantity::Sxx, 1.0, &mut u);
        elastic_set::<2, 5>(PhysicalQuantity::Sxy, 2.0, &mut u);
        elastic_set::<2, 5>(PhysicalQuantity::Syy, 3.0, &mut u);
        let t = b * u;
        // σ·ν = (1*0.6 + 2*0.8, 2*0.6 + 3*0.8)
        assert!((t[0] - 2.2).abs() < 1e-12);
        assert!((t[1] - 3.6).abs() < 1e-12);
    }
}
