// apps/tw_cli/src/commands/run.rs

//! run 子命令：执行任务的全部语句

use anyhow::Context;
use clap::Args;
use std::path::PathBuf;
use tracing::info;
use tw_config::{build_simulation, SnapshotterConfig, Statement, Task};
use tw_io::{CsvSnapshotter, Snapshotter, VtkSnapshotter};

/// run 参数
#[derive(Args)]
pub struct RunArgs {
    /// 任务文件路径（JSON）
    pub task: PathBuf,

    /// 最大步数上限（0 表示不限）
    #[arg(long, default_value_t = 0)]
    pub max_steps: usize,
}

/// 执行 run
pub fn execute(args: RunArgs) -> anyhow::Result<()> {
    let task = Task::from_file(&args.task)
        .with_context(|| format!("加载任务 {} 失败", args.task.display()))?;

    for statement in &task.statements {
        run_statement(statement, args.max_steps)
            .with_context(|| format!("语句 {} 执行失败", statement.name))?;
    }
    Ok(())
}

fn run_statement(statement: &Statement, max_steps: usize) -> anyhow::Result<()> {
    let mut sim = build_simulation(statement)?;
    let mut snapshotters = make_snapshotters(statement);

    info!(name = %statement.name, nodes = sim.n_nodes(), "开始推进");
    for snapshotter in &mut snapshotters {
        snapshotter.snapshot(sim.as_ref(), 0)?;
    }

    let mut snaps_written = 0usize;
    loop {
        sim.step()?;

        if sim.step_index() % statement.steps_per_snap == 0 {
            for snapshotter in &mut snapshotters {
                snapshotter.snapshot(sim.as_ref(), sim.step_index())?;
            }
            snaps_written += 1;
        }

        if sim.time() >= statement.final_time {
            info!(steps = sim.step_index(), time = sim.time(), "到达终止时刻");
            break;
        }
        if statement.number_of_snaps > 0 && snaps_written >= statement.number_of_snaps {
            info!(snaps = snaps_written, "达到快照数量上限");
            break;
        }
        if max_steps > 0 && sim.step_index() >= max_steps {
            info!(steps = sim.step_index(), "达到步数上限");
            break;
        }
    }
    Ok(())
}

fn make_snapshotters(statement: &Statement) -> Vec<Box<dyn Snapshotter>> {
    statement
        .snapshotters
        .iter()
        .filter_map(|cfg: &SnapshotterConfig| match cfg.format.as_str() {
            "vtk" => Some(Box::new(VtkSnapshotter::new(
                cfg.directory.clone(),
                statement.name.clone(),
                cfg.quantities.clone(),
            )) as Box<dyn Snapshotter>),
            "csv" => Some(Box::new(CsvSnapshotter::new(
                cfg.directory.clone(),
                statement.name.clone(),
                cfg.quantities.clone(),
            )) as Box<dyn Snapshotter>),
            other => {
                tracing::warn!(format = other, "未知快照格式，跳过");
                None
            }
        })
        .collect()
}
