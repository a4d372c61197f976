// crates/tw_config/src/builder.rs

//! 引擎装配
//!
//! 语句里的 (模型, 维度, 网格) 标签在这里被一次性解析成
//! 单态化引擎，之后步进循环只经过 [`Simulation`] 接口。
//! 实际用到的组合才会被实例化。

use crate::statement::{GridConfig, ModelKind, Statement};
use std::sync::Arc;
use tracing::info;
use tw_foundation::{TwError, TwResult};
use tw_mesh::generation::{generate_box, generate_rectangle};
use tw_mesh::inm::load_inm;
use tw_mesh::{GridId, Triangulation, EMPTY_SPACE};
use tw_physics::engine::cubic_engine::{CubicBorderCondition, CubicFracture};
use tw_physics::engine::simplex_engine::BorderPatchSpec;
use tw_physics::rheology::models::{
    Acoustic1d, Acoustic2d, Acoustic3d, Elastic1d, Elastic2d, Elastic3d, WaveModel,
};
use tw_physics::{CubicEngine, Material, SimplexEngine, Simulation};

/// 把语句装配成可步进的模拟
pub fn build_simulation(statement: &Statement) -> TwResult<Box<dyn Simulation>> {
    statement.validate().map_err(TwError::from)?;
    info!(
        name = %statement.name,
        model = ?statement.model,
        dimension = statement.dimension,
        "装配模拟"
    );

    match (&statement.grid, statement.model, statement.dimension) {
        (GridConfig::Cubic { .. }, ModelKind::Elastic, 1) => {
            build_cubic::<Elastic1d, 1, 2, 1>(statement)
        }
        (GridConfig::Cubic { .. }, ModelKind::Elastic, 2) => {
            build_cubic::<Elastic2d, 2, 5, 2>(statement)
        }
        (GridConfig::Cubic { .. }, ModelKind::Elastic, 3) => {
            build_cubic::<Elastic3d, 3, 9, 3>(statement)
        }
        (GridConfig::Cubic { .. }, ModelKind::Acoustic, 1) => {
            build_cubic::<Acoustic1d, 1, 2, 1>(statement)
        }
        (GridConfig::Cubic { .. }, ModelKind::Acoustic, 2) => {
            build_cubic::<Acoustic2d, 2, 3, 1>(statement)
        }
        (GridConfig::Cubic { .. }, ModelKind::Acoustic, 3) => {
            build_cubic::<Acoustic3d, 3, 4, 1>(statement)
        }
        (GridConfig::Simplex { .. }, ModelKind::Elastic, 2) => {
            build_simplex_2d::<Elastic2d, 5, 2>(statement)
        }
        (GridConfig::Simplex { .. }, ModelKind::Elastic, 3) => {
            build_simplex_3d::<Elastic3d, 9, 3>(statement)
        }
        (GridConfig::Simplex { .. }, ModelKind::Acoustic, 2) => {
            build_simplex_2d::<Acoustic2d, 3, 1>(statement)
        }
        (GridConfig::Simplex { .. }, ModelKind::Acoustic, 3) => {
            build_simplex_3d::<Acoustic3d, 4, 1>(statement)
        }
        _ => Err(TwError::not_implemented(format!(
            "模型 {:?} / 维度 {} / 该网格类型的组合",
            statement.model, statement.dimension
        ))),
    }
}

/// 立方网格装配
fn build_cubic<Mdl, const D: usize, const M: usize, const K: usize>(
    statement: &Statement,
) -> TwResult<Box<dyn Simulation>>
where
    Mdl: WaveModel<D, M, K>,
{
    let GridConfig::Cubic { sizes, lengths } = &statement.grid else {
        return Err(TwError::internal("网格类型分派错误"));
    };
    let sizes_arr: [usize; D] = sizes
        .as_slice()
        .try_into()
        .map_err(|_| TwError::bad_config("grid.sizes 长度不等于维度".to_string()))?;
    let lengths_arr: [f64; D] = lengths
        .as_slice()
        .try_into()
        .map_err(|_| TwError::bad_config("grid.lengths 长度不等于维度".to_string()))?;

    let mut engine = CubicEngine::<Mdl, D, M, K>::new(
        sizes_arr,
        lengths_arr,
        statement.bodies[0].material,
        statement.accuracy_order,
        statement.courant_number,
        statement.splitting.kind,
        statement.splitting.order,
    )?;

    // 附加物体作为材料覆盖区域（分层介质）
    for body in statement.bodies.iter().skip(1) {
        engine.set_material_in_area(body.material, &body.area)?;
    }
    for bc in &statement.border_conditions {
        engine.add_border_condition(CubicBorderCondition {
            area: bc.area.clone(),
            values: bc.quantities.clone(),
        });
    }
    for fracture in &statement.fractures {
        engine.add_fracture(CubicFracture {
            axis: fracture.direction,
            coordinate: fracture.coordinate,
            area: fracture.area.clone(),
            values: fracture.values.clone(),
        })?;
    }
    apply_cubic_initial(&mut engine, statement)?;
    Ok(Box::new(engine))
}

fn apply_cubic_initial<Mdl, const D: usize, const M: usize, const K: usize>(
    engine: &mut CubicEngine<Mdl, D, M, K>,
    statement: &Statement,
) -> TwResult<()>
where
    Mdl: WaveModel<D, M, K>,
{
    for fill in &statement.initial.quantities {
        engine.fill_quantity(fill.quantity, fill.value, &fill.area)?;
    }
    for seed in &statement.initial.waves {
        engine.seed_wave(
            seed.wave,
            seed.direction,
            seed.quantity,
            seed.amplitude,
            &seed.area,
        )?;
    }
    Ok(())
}

/// 生成器归属判定：最后一个包含该点的物体胜出
fn body_of_point(statement: &Statement, p: &[f64]) -> GridId {
    let mut chosen = EMPTY_SPACE;
    for body in &statement.bodies {
        if body.area.contains(p) {
            chosen = body.id;
        }
    }
    chosen
}

/// 二维单纯形装配（内置矩形生成器）
fn build_simplex_2d<Mdl, const M: usize, const K: usize>(
    statement: &Statement,
) -> TwResult<Box<dyn Simulation>>
where
    Mdl: WaveModel<2, M, K>,
{
    let GridConfig::Simplex {
        spatial_step,
        lengths,
        ..
    } = &statement.grid
    else {
        return Err(TwError::internal("网格类型分派错误"));
    };
    let tri = generate_rectangle(
        [lengths[0], lengths[1]],
        *spatial_step,
        |c| body_of_point(statement, &[c.x, c.y]),
    );
    finish_simplex::<Mdl, 2, M, K>(statement, Arc::new(tri))
}

/// 三维单纯形装配（INM 文件或内置长方体生成器）
fn build_simplex_3d<Mdl, const M: usize, const K: usize>(
    statement: &Statement,
) -> TwResult<Box<dyn Simulation>>
where
    Mdl: WaveModel<3, M, K>,
{
    let GridConfig::Simplex {
        mesh_file,
        spatial_step,
        lengths,
    } = &statement.grid
    else {
        return Err(TwError::internal("网格类型分派错误"));
    };
    let tri = match mesh_file {
        Some(path) => load_inm(path).map_err(TwError::from)?,
        None => generate_box(
            [lengths[0], lengths[1], lengths[2]],
            *spatial_step,
            |c| body_of_point(statement, &[c.x, c.y, c.z]),
        ),
    };
    finish_simplex::<Mdl, 3, M, K>(statement, Arc::new(tri))
}

/// 单纯形引擎收尾：边界/接触/初值
fn finish_simplex<Mdl, const D: usize, const M: usize, const K: usize>(
    statement: &Statement,
    tri: Arc<Triangulation<D>>,
) -> TwResult<Box<dyn Simulation>>
where
    Mdl: WaveModel<D, M, K>,
{
    let bodies: Vec<(GridId, Material)> = statement
        .bodies
        .iter()
        .map(|b| (b.id, b.material))
        .collect();

    let mut borders: Vec<(GridId, BorderPatchSpec)> = Vec::new();
    for bc in &statement.border_conditions {
        let spec = BorderPatchSpec {
            kind: bc.kind,
            area: bc.area.clone(),
            values: bc.values.clone(),
            use_for_multicontact: bc.use_for_multicontact,
        };
        match bc.grid {
            Some(id) => borders.push((id, spec)),
            None => {
                for body in &statement.bodies {
                    borders.push((body.id, spec.clone()));
                }
            }
        }
    }

    let overrides: Vec<((GridId, GridId), _)> = statement
        .contact_conditions
        .pairs
        .iter()
        .map(|p| (p.grids, p.kind))
        .collect();

    let mut engine = SimplexEngine::<Mdl, D, M, K>::new(
        tri,
        &bodies,
        &borders,
        statement.contact_conditions.default,
        &overrides,
        statement.courant_number,
        statement.splitting.kind,
        statement.splitting.order,
        statement.gcm.mode,
    )?;

    for fill in &statement.initial.quantities {
        for body in &statement.bodies {
            engine.fill_quantity(body.id, fill.quantity, fill.value, &fill.area)?;
        }
    }
    for seed in &statement.initial.waves {
        for body in &statement.bodies {
            engine.seed_wave(
                body.id,
                seed.wave,
                seed.direction,
                seed.quantity,
                seed.amplitude,
                &seed.area,
            )?;
        }
    }
    Ok(Box::new(engine))
}

// ============================================================
// 测试
// ============================================================
