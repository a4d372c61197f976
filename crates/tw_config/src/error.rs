// crates/tw_config/src/error.rs

//! 配置层错误类型

use thiserror::Error;
use tw_foundation::TwError;

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 文件读写失败
    #[error("配置文件读写失败: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 解析失败
    #[error("配置解析失败: {message}")]
    Parse {
        /// 解析器给出的原因
        message: String,
    },

    /// 配置值非法
    #[error("配置值非法: {key} = {value} ({reason})")]
    InvalidValue {
        /// 配置键
        key: String,
        /// 给定值
        value: String,
        /// 原因
        reason: String,
    },

    /// 功能组合未实现
    #[error("功能未实现: {feature}")]
    NotImplemented {
        /// 功能描述
        feature: String,
    },
}

impl ConfigError {
    /// 便捷构造
    pub fn invalid(key: &str, value: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse {
            message: err.to_string(),
        }
    }
}

impl From<ConfigError> for TwError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io(e) => TwError::from(e),
            ConfigError::NotImplemented { feature } => TwError::NotImplemented { feature },
            other => TwError::bad_config(other.to_string()),
        }
    }
}
