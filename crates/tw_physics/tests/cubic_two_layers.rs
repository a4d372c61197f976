// crates/tw_physics/tests/cubic_two_layers.rs

//! 分层介质的反射/透射验证
//!
//! 法向入射的纵波打在密度突变界面上，反射与透射幅值
//! 应满足声阻抗公式：
//!
//! ```text
//! σ_r/σ_0 = (Z−Z0)/(Z+Z0)    v_r/v_0 = (Z0−Z)/(Z+Z0)
//! σ_t/σ_0 = 2Z/(Z+Z0)        v_t/v_0 = 2Z0/(Z+Z0)
//! ```
//!
//! Courant 数按密度比选取，使两层的回溯位移都是整格，
//! 误差集中在界面两排节点上。

use tw_physics::rheology::models::{Elastic2d, WaveModel};
use tw_physics::types::{Area, PhysicalQuantity, SplittingKind, WaveKind};
use tw_physics::{
    CubicBorderCondition, CubicEngine, IsotropicMaterial, Material, Simulation,
};

const RHO0: f64 = 1.0;
const LAMBDA: f64 = 2.0;
const MU: f64 = 0.8;

struct Measured {
    syy: f64,
    vy: f64,
}

/// 在指定行区间内找 |σ_yy| 峰并读取该行的 (σ_yy, V_y)
fn peak_in_rows(e: &CubicEngine<Elastic2d, 2, 5, 2>, rows: std::ops::Range<isize>) -> Measured {
    let mut best_row = rows.start;
    let mut best = 0.0_f64;
    for y in rows {
        let syy = Elastic2d::get_quantity(PhysicalQuantity::Syy, e.pde_at([25, y])).unwrap();
        if syy.abs() > best.abs() {
            best = syy;
            best_row = y;
        }
    }
    Measured {
        syy: best,
        vy: Elastic2d::get_quantity(PhysicalQuantity::Vy, e.pde_at([25, best_row])).unwrap(),
    }
}

fn run_two_layer(rho_ratio: f64, courant: f64, n_steps: usize) -> (Measured, Measured, Measured) {
    let material_0 =
        Material::Isotropic(IsotropicMaterial::new(RHO0, LAMBDA, MU).unwrap());
    let material_1 =
        Material::Isotropic(IsotropicMaterial::new(RHO0 * rho_ratio, LAMBDA, MU).unwrap());

    let mut e = CubicEngine::<Elastic2d, 2, 5, 2>::new(
        [50, 100],
        [2.0, 1.0],
        material_0,
        3,
        courant,
        SplittingKind::Product,
        1,
    )
    .unwrap();

    // 上半域换材料
    e.set_material_in_area(
        material_1,
        &Area::Slab {
            axis: 1,
            from: 0.4999,
            to: 10.0,
        },
    )
    .unwrap();

    // 侧边镜像，保持平面波
    e.add_border_condition(CubicBorderCondition {
        area: Area::Slab {
            axis: 0,
            from: -1.0,
            to: 0.001,
        },
        values: Vec::new(),
    });
    e.add_border_condition(CubicBorderCondition {
        area: Area::Slab {
            axis: 0,
            from: 1.999,
            to: 10.0,
        },
        values: Vec::new(),
    });

    // 向 +y 的纵波，V_y = -2
    e.seed_wave(
        WaveKind::PBackward,
        1,
        PhysicalQuantity::Vy,
        -2.0,
        &Area::Slab {
            axis: 1,
            from: 0.195,
            to: 0.265,
        },
    )
    .unwrap();

    let init = Measured {
        syy: Elastic2d::get_quantity(PhysicalQuantity::Syy, e.pde_at([25, 23])).unwrap(),
        vy: Elastic2d::get_quantity(PhysicalQuantity::Vy, e.pde_at([25, 23])).unwrap(),
    };
    assert!((init.vy + 2.0).abs() < 1e-12);

    for _ in 0..n_steps {
        e.step().unwrap();
    }

    let reflected = peak_in_rows(&e, 10..45);
    let transmitted = peak_in_rows(&e, 53..95);
    (init, reflected, transmitted)
}

fn impedances(rho_ratio: f64) -> (f64, f64) {
    let z0 = IsotropicMaterial::new(RHO0, LAMBDA, MU)
        .unwrap()
        .acoustic_impedance();
    let z = IsotropicMaterial::new(RHO0 * rho_ratio, LAMBDA, MU)
        .unwrap()
        .acoustic_impedance();
    (z0, z)
}

const TOL: f64 = 0.02;

#[test]
fn lighter_second_layer() {
    // ρ2/ρ1 = 0.25：λmax = 2 c_p1，C = 2 时两层位移分别为 1、2 格
    let (init, reflected, transmitted) = run_two_layer(0.25, 2.0, 40);
    let (z0, z) = impedances(0.25);

    assert!(
        (reflected.syy / init.syy - (z - z0) / (z + z0)).abs() < TOL,
        "反射应力比 {} vs {}",
        reflected.syy / init.syy,
        (z - z0) / (z + z0)
    );
    assert!(
        (reflected.vy / init.vy - (z0 - z) / (z + z0)).abs() < TOL,
        "反射速度比 {} vs {}",
        reflected.vy / init.vy,
        (z0 - z) / (z + z0)
    );
    assert!(
        (transmitted.syy / init.syy - 2.0 * z / (z + z0)).abs() < TOL,
        "透射应力比 {} vs {}",
        transmitted.syy / init.syy,
        2.0 * z / (z + z0)
    );
    assert!(
        (transmitted.vy / init.vy - 2.0 * z0 / (z + z0)).abs() < TOL,
        "透射速度比 {} vs {}",
        transmitted.vy / init.vy,
        2.0 * z0 / (z + z0)
    );
}

#[test]
fn heavier_second_layer() {
    // ρ2/ρ1 = 4：λmax = c_p1，C = 2 时两层位移分别为 2、1 格
    let (init, reflected, transmitted) = run_two_layer(4.0, 2.0, 24);
    let (z0, z) = impedances(4.0);

    assert!((reflected.syy / init.syy - (z - z0) / (z + z0)).abs() < TOL);
    assert!((reflected.vy / init.vy - (z0 - z) / (z + z0)).abs() < TOL);
    assert!((transmitted.syy / init.syy - 2.0 * z / (z + z0)).abs() < TOL);
    assert!((transmitted.vy / init.vy - 2.0 * z0 / (z + z0)).abs() < TOL);
}

#[test]
fn matched_layers_do_not_reflect() {
    // 同材料：反射区应接近零，透射比为 1
    let (init, reflected, transmitted) = run_two_layer(1.0, 2.0, 24);

    assert!(
        (reflected.syy / init.syy).abs() < TOL,
        "无界面却有反射: {}",
        reflected.syy / init.syy
    );
    assert!((transmitted.syy / init.syy - 1.0).abs() < TOL);
    assert!((transmitted.vy / init.vy - 1.0).abs() < TOL);
}
