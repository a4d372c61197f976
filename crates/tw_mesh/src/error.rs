// crates/tw_mesh/src/error.rs

//! 网格层错误类型

use std::path::PathBuf;
use thiserror::Error;
use tw_foundation::TwError;

/// 网格层错误
#[derive(Debug, Error)]
pub enum MeshError {
    /// 剖分拓扑不一致
    #[error("剖分不一致: {message}")]
    Inconsistent {
        /// 不一致之处
        message: String,
    },

    /// 网格文件格式错误
    #[error("网格文件格式错误 ({path}): 第 {line} 行: {message}")]
    BadFormat {
        /// 文件路径
        path: PathBuf,
        /// 出错行号（1 起）
        line: usize,
        /// 说明
        message: String,
    },

    /// 文件读取失败
    #[error("网格文件读取失败: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MeshError> for TwError {
    fn from(err: MeshError) -> Self {
        match err {
            MeshError::Io(e) => TwError::from(e),
            other => TwError::bad_mesh(other.to_string()),
        }
    }
}
