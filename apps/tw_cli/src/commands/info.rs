// apps/tw_cli/src/commands/info.rs

//! info 子命令：打印语句摘要

use anyhow::Context;
use clap::Args;
use std::path::PathBuf;
use tw_config::{GridConfig, Task};

/// info 参数
#[derive(Args)]
pub struct InfoArgs {
    /// 任务文件路径（JSON）
    pub task: PathBuf,
}

/// 执行 info
pub fn execute(args: InfoArgs) -> anyhow::Result<()> {
    let task = Task::from_file(&args.task)
        .with_context(|| format!("加载任务 {} 失败", args.task.display()))?;

    for statement in &task.statements {
        println!("语句: {}", statement.name);
        println!("  模型: {:?} / {} 维", statement.model, statement.dimension);
        match &statement.grid {
            GridConfig::Cubic { sizes, lengths } => {
                println!("  网格: 立方 sizes={:?} lengths={:?}", sizes, lengths);
            }
            GridConfig::Simplex {
                mesh_file,
                spatial_step,
                lengths,
            } => match mesh_file {
                Some(path) => println!("  网格: 单纯形 文件={}", path.display()),
                None => println!(
                    "  网格: 单纯形 生成器 step={} lengths={:?}",
                    spatial_step, lengths
                ),
            },
        }
        println!("  物体数: {}", statement.bodies.len());
        println!(
            "  Courant: {}  分裂: {:?}/{} 阶",
            statement.courant_number, statement.splitting.kind, statement.splitting.order
        );
        println!("  终止时刻: {}", statement.final_time);
    }
    Ok(())
}
