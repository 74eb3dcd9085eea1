//! 错误定义模块

use thiserror::Error;

/// LifeLink系统统一错误类型
#[derive(Error, Debug)]
pub enum LifelinkError {
    #[error("存储错误: {0}")]
    Storage(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("记录损坏: 键 {key}: {reason}")]
    CorruptRecord { key: String, reason: String },

    #[error("并发冲突: {0}")]
    Conflict(String),

    #[error("数据校验失败: {0}")]
    Validation(String),
}

impl LifelinkError {
    /// 构造记录损坏错误
    pub fn corrupt(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CorruptRecord {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// LifeLink系统统一结果类型
pub type Result<T> = std::result::Result<T, LifelinkError>;
