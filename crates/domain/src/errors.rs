//! 领域模型错误定义
//!
//! 协议解析失败的分类。这些错误只用于日志，不会回传给对端。

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// 不是合法 JSON
    #[error("帧格式错误: {reason}")]
    MalformedFrame { reason: String },

    /// JSON 不是对象
    #[error("帧不是 JSON 对象")]
    NotAnObject,

    /// 缺少 `type` / `kind` 字段
    #[error("缺少消息类型字段")]
    MissingKind,
}

impl DomainError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedFrame {
            reason: reason.into(),
        }
    }
}

/// 领域模型结果类型
pub type DomainResult<T> = Result<T, DomainError>;
