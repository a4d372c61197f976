// crates/tw_io/src/lib.rs

//! TerraWave 输出层
//!
//! 快照契约：快照器收到 `(模拟, 步号)`，把逐顶点的向量值场
//! 落盘。序列化格式由具体快照器决定，核心不做约定。

#![warn(clippy::all)]

pub mod snapshot;

pub use snapshot::{CsvSnapshotter, Snapshotter, VtkSnapshotter};

use thiserror::Error;
use tw_foundation::TwError;

/// 输出层错误
#[derive(Debug, Error)]
pub enum IoError {
    /// 文件写入失败
    #[error("快照写入失败: {0}")]
    Write(#[from] std::io::Error),
}

impl From<IoError> for TwError {
    fn from(err: IoError) -> Self {
        match err {
            IoError::Write(e) => TwError::from(e),
        }
    }
}
