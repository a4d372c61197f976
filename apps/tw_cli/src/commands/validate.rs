// apps/tw_cli/src/commands/validate.rs

//! validate 子命令：只做加载与校验

use anyhow::Context;
use clap::Args;
use std::path::PathBuf;
use tw_config::Task;

/// validate 参数
#[derive(Args)]
pub struct ValidateArgs {
    /// 任务文件路径（JSON）
    pub task: PathBuf,
}

/// 执行 validate
pub fn execute(args: ValidateArgs) -> anyhow::Result<()> {
    let task = Task::from_file(&args.task)
        .with_context(|| format!("加载任务 {} 失败", args.task.display()))?;
    println!("任务合法: {} 条语句", task.statements.len());
    Ok(())
}
