// crates/tw_config/src/lib.rs

//! TerraWave 配置层
//!
//! 任务是一组语句，每条语句完整描述一次模拟：模型与维度、
//! 网格来源、物体与材料、初值、边界与接触条件、停止与输出
//! 节拍。配置用 JSON 序列化，装配阶段把 (模型, 维度, 网格)
//! 标签解析成一个单态化引擎。

#![warn(clippy::all)]

pub mod builder;
pub mod error;
pub mod statement;

pub use builder::build_simulation;
pub use error::ConfigError;
pub use statement::{
    BodyConfig, BorderConditionConfig, ContactConditionsConfig, FractureConfig, GridConfig,
    InitialConfig, ModelKind, QuantityFill, SnapshotterConfig, Statement, Task, WaveSeed,
};
