// crates/tw_physics/tests/cubic_waves.rs

//! 立方网格上的波传播端到端验证
//!
//! 整数回溯位移下特征步应精确平移波形；自由表面镜像反射
//! 翻转应力符号而保持速度；无条件边界吸收出射波。

use tw_physics::rheology::models::{Elastic2d, WaveModel};
use tw_physics::types::{Area, PhysicalQuantity, SplittingKind, TimeDependency, WaveKind};
use tw_physics::{
    CubicBorderCondition, CubicEngine, IsotropicMaterial, Material, Simulation,
};

fn material() -> Material {
    Material::Isotropic(IsotropicMaterial::new(4.0, 2.0, 0.5).unwrap())
}

fn c_p() -> f64 {
    (3.0_f64 / 4.0).sqrt()
}

/// 纵波沿 x 轴逐格平移：每个阶段恰好一格，其余节点保持零
#[test]
fn p_wave_translates_one_cell_per_stage() {
    for order in 1..=4 {
        let mut e = CubicEngine::<Elastic2d, 2, 5, 2>::new(
            [10, 10],
            [2.0, 3.0],
            material(),
            order,
            1.0,
            SplittingKind::Product,
            1,
        )
        .unwrap();

        // P_BACKWARD 列是正特征值，波形向 +x 平移
        e.seed_wave(
            WaveKind::PBackward,
            0,
            PhysicalQuantity::Vx,
            1.0,
            &Area::Slab {
                axis: 0,
                from: 0.3,
                to: 0.7,
            },
        )
        .unwrap();

        let tau = 1.0 * (2.0 / 9.0) / c_p();
        let wave = *e.pde_at([2, 0]);
        assert!(wave.norm() > 0.0, "播种失败");

        for i in 0..7 {
            for y in 0..10 {
                for x in 0..10 {
                    let u = e.pde_at([x, y]);
                    let expected = if x == 2 + i || x == 3 + i {
                        wave
                    } else {
                        nalgebra::SVector::<f64, 5>::zeros()
                    };
                    assert!(
                        (u - expected).norm() < 1e-9,
                        "order={} i={} x={} y={}: {:?}",
                        order,
                        i,
                        x,
                        y,
                        u
                    );
                }
            }
            e.run_stage(0, tau);
        }
    }
}

/// 前行波列与后行波列平移方向相反
#[test]
fn forward_and_backward_waves_move_oppositely() {
    let mut forward = CubicEngine::<Elastic2d, 2, 5, 2>::new(
        [10, 10],
        [2.0, 3.0],
        material(),
        1,
        1.0,
        SplittingKind::Product,
        1,
    )
    .unwrap();
    forward
        .seed_wave(
            WaveKind::PForward,
            0,
            PhysicalQuantity::Vx,
            1.0,
            &Area::Slab {
                axis: 0,
                from: 0.8,
                to: 1.2,
            },
        )
        .unwrap();
    let tau = 1.0 * (2.0 / 9.0) / c_p();
    let before = *forward.pde_at([4, 5]);
    assert!(before.norm() > 0.0);
    forward.run_stage(0, tau);
    // 节点 4 的波形移去了节点 3
    assert!((forward.pde_at([3, 5]) - before).norm() < 1e-9);
}

/// 横波沿 y 轴平移：Courant 4，每阶段两格，9 步后第 3 行到第 21 行
#[test]
fn s_wave_translation_wide_stencil() {
    // λ = 2μ 使 c_p = 2 c_s，Courant 4 时横波每阶段恰好 2 格
    let material = Material::Isotropic(IsotropicMaterial::new(4.0, 2.0, 1.0).unwrap());
    let mut e = CubicEngine::<Elastic2d, 2, 5, 2>::new(
        [20, 40],
        [7.0, 3.0],
        material,
        5,
        4.0,
        SplittingKind::Product,
        1,
    )
    .unwrap();

    let h_y = 3.0 / 39.0;
    let c_p = 1.0; // sqrt((2 + 2)/4)
    let tau = 4.0 * h_y / c_p;

    // 第 3 行播种后行横波（正特征值，向 +y）
    e.seed_wave(
        WaveKind::S1Backward,
        1,
        PhysicalQuantity::Vx,
        1.0,
        &Area::Slab {
            axis: 1,
            from: 3.0 * h_y - 0.4 * h_y,
            to: 3.0 * h_y + 0.4 * h_y,
        },
    )
    .unwrap();

    let reference: Vec<_> = (0..20).map(|x| *e.pde_at([x, 3])).collect();
    assert!(reference.iter().any(|u| u.norm() > 0.0), "播种失败");

    for _ in 0..9 {
        e.run_stage(1, tau);
    }

    // 2 格/阶段 × 9 = 18：第 3 行的波形原样出现在第 21 行
    for x in 0..20 {
        let now = e.pde_at([x, 21]);
        assert!(
            (now - reference[x as usize]).norm() < 1e-8,
            "x={} 平移后波形失真: {:?} vs {:?}",
            x,
            now,
            reference[x as usize]
        );
    }
    // 原行已空
    for x in 0..20 {
        assert!(e.pde_at([x, 3]).norm() < 1e-8);
    }
}

fn probe(e: &CubicEngine<Elastic2d, 2, 5, 2>, x: isize, y: isize, q: PhysicalQuantity) -> f64 {
    Elastic2d::get_quantity(q, e.pde_at([x, y])).unwrap()
}

/// 自由表面反射：应力翻号，速度保幅
#[test]
fn free_surface_reflection() {
    let mut e = CubicEngine::<Elastic2d, 2, 5, 2>::new(
        [10, 60],
        [0.9, 5.9],
        material(),
        3,
        1.0,
        SplittingKind::Product,
        1,
    )
    .unwrap();

    // 侧边镜像，保持平面波沿 x 均匀
    e.add_border_condition(CubicBorderCondition {
        area: Area::Slab {
            axis: 0,
            from: -1.0,
            to: 0.01,
        },
        values: Vec::new(),
    });
    e.add_border_condition(CubicBorderCondition {
        area: Area::Slab {
            axis: 0,
            from: 0.89,
            to: 10.0,
        },
        values: Vec::new(),
    });
    // 顶面自由表面：σ·ν 分量镜像反号
    e.add_border_condition(CubicBorderCondition {
        area: Area::Slab {
            axis: 1,
            from: 5.85,
            to: 10.0,
        },
        values: vec![
            (PhysicalQuantity::Syy, TimeDependency::zero()),
            (PhysicalQuantity::Sxy, TimeDependency::zero()),
        ],
    });

    // 向 +y 的纵波包
    e.seed_wave(
        WaveKind::PBackward,
        1,
        PhysicalQuantity::Vy,
        1.0,
        &Area::Slab {
            axis: 1,
            from: 4.0,
            to: 4.4,
        },
    )
    .unwrap();

    let syy_in = probe(&e, 5, 42, PhysicalQuantity::Syy);
    let vy_in = probe(&e, 5, 42, PhysicalQuantity::Vy);
    assert!(syy_in < 0.0 && (vy_in - 1.0).abs() < 1e-12);

    for _ in 0..30 {
        e.step().unwrap();
    }

    // 反射包：扫描中柱找 |Vy| 峰
    let mut peak_row = 0;
    let mut peak_vy = 0.0_f64;
    for y in 0..60 {
        let vy = probe(&e, 5, y, PhysicalQuantity::Vy);
        if vy.abs() > peak_vy.abs() {
            peak_vy = vy;
            peak_row = y;
        }
    }
    let peak_syy = probe(&e, 5, peak_row, PhysicalQuantity::Syy);

    assert!(
        (peak_vy - vy_in).abs() < 0.01 * vy_in.abs(),
        "速度幅值未保持: {} vs {}",
        peak_vy,
        vy_in
    );
    assert!(
        (peak_syy + syy_in).abs() < 0.01 * syy_in.abs(),
        "应力未翻号: {} vs {}",
        peak_syy,
        syy_in
    );
}

/// 无条件边界吸收：出射波离开后残余能量低于 5%
#[test]
fn absorbing_border_drains_energy() {
    let mut e = CubicEngine::<Elastic2d, 2, 5, 2>::new(
        [10, 60],
        [0.9, 5.9],
        material(),
        3,
        1.0,
        SplittingKind::Product,
        1,
    )
    .unwrap();
    // 只保侧边镜像；顶/底不加条件（halo 为零，入射不变量为零）
    e.add_border_condition(CubicBorderCondition {
        area: Area::Slab {
            axis: 0,
            from: -1.0,
            to: 0.01,
        },
        values: Vec::new(),
    });
    e.add_border_condition(CubicBorderCondition {
        area: Area::Slab {
            axis: 0,
            from: 0.89,
            to: 10.0,
        },
        values: Vec::new(),
    });

    e.seed_wave(
        WaveKind::PBackward,
        1,
        PhysicalQuantity::Vy,
        1.0,
        &Area::Slab {
            axis: 1,
            from: 4.0,
            to: 4.4,
        },
    )
    .unwrap();

    let energy = |e: &CubicEngine<Elastic2d, 2, 5, 2>| -> f64 {
        [
            PhysicalQuantity::Vx,
            PhysicalQuantity::Vy,
            PhysicalQuantity::Sxx,
            PhysicalQuantity::Sxy,
            PhysicalQuantity::Syy,
        ]
        .iter()
        .map(|&q| e.sample(q).iter().map(|v| v * v).sum::<f64>())
        .sum()
    };

    let initial = energy(&e);
    assert!(initial > 0.0);
    for _ in 0..30 {
        e.step().unwrap();
    }
    let residual = energy(&e);
    assert!(
        residual < 0.05 * initial,
        "残余能量 {:.3e} 超过入射能量 {:.3e} 的 5%",
        residual,
        initial
    );
}
