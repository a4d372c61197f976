// apps/tw_cli/src/main.rs

//! TerraWave 命令行界面
//!
//! 弹性/声学波动方程网格特征法求解器的命令行工具。
//! 顶层只使用 `Task` 与 `Box<dyn Simulation>`，不出现泛型参数；
//! 模型 × 网格组合在装配阶段解析。
//!
//! 进程退出码：成功为 0，致命核心错误非零。

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// TerraWave 波动方程求解器命令行工具
#[derive(Parser)]
#[command(name = "tw_cli")]
#[command(author = "TerraWave Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "TerraWave grid-characteristic wave solver", long_about = None)]
struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 运行任务
    Run(commands::run::RunArgs),
    /// 校验任务文件
    Validate(commands::validate::ValidateArgs),
    /// 显示任务信息
    Info(commands::info::InfoArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 初始化日志
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // 执行命令
    match cli.command {
        Commands::Run(args) => commands::run::execute(args),
        Commands::Validate(args) => commands::validate::execute(args),
        Commands::Info(args) => commands::info::execute(args),
    }
}
