//! WebSocket 文本帧协议
//!
//! 每一帧都是带有 `type`（或 `kind`）判别字段的 JSON 对象。
//! 未知字段忽略，未知类型解析为 [`ClientMessage::Unknown`]。
//! 只有无法解析的帧和缺少类型的帧被视为格式错误；其余字段按原样转发，
//! 类型不符的昵称按缺失处理。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{DomainError, DomainResult};
use crate::user::UserSummary;
use crate::value_objects::UserId;

/// 文件负载，各字段原样转发。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilePayload {
    pub name: Option<Value>,
    pub mime: Option<Value>,
    pub data: Option<Value>,
}

/// 客户端发往中继的消息
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    AdminInit,
    /// 非字符串的 `name` 记为 `None`
    UserInit {
        name: Option<String>,
    },
    Rename {
        name: Option<String>,
    },
    /// `to` 只对管理员有意义；无法解析的目标按缺失处理
    Message {
        to: Option<UserId>,
        text: Option<Value>,
    },
    File {
        to: Option<UserId>,
        file: FilePayload,
    },
    Ping,
    Unknown(String),
}

impl ClientMessage {
    /// 解析一帧原始文本
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let value: Value =
            serde_json::from_str(raw).map_err(|err| DomainError::malformed(err.to_string()))?;

        let Value::Object(mut fields) = value else {
            return Err(DomainError::NotAnObject);
        };

        let kind = match fields.remove("type").or_else(|| fields.remove("kind")) {
            Some(Value::String(kind)) => kind,
            _ => return Err(DomainError::MissingKind),
        };

        let message = match kind.as_str() {
            "admin-init" => Self::AdminInit,
            "user-init" => Self::UserInit {
                name: name_field(&mut fields),
            },
            "rename" => Self::Rename {
                name: name_field(&mut fields),
            },
            "message" => Self::Message {
                to: target(fields.remove("to")),
                text: fields.remove("text"),
            },
            "file" => Self::File {
                to: target(fields.remove("to")),
                file: FilePayload {
                    name: fields.remove("name"),
                    mime: fields.remove("mime"),
                    data: fields.remove("data"),
                },
            },
            "ping" => Self::Ping,
            _ => Self::Unknown(kind),
        };

        Ok(message)
    }

    /// 日志用的类型名
    pub fn kind(&self) -> &str {
        match self {
            Self::AdminInit => "admin-init",
            Self::UserInit { .. } => "user-init",
            Self::Rename { .. } => "rename",
            Self::Message { .. } => "message",
            Self::File { .. } => "file",
            Self::Ping => "ping",
            Self::Unknown(kind) => kind,
        }
    }
}

fn name_field(fields: &mut Map<String, Value>) -> Option<String> {
    match fields.remove("name") {
        Some(Value::String(name)) => Some(name),
        _ => None,
    }
}

fn target(to: Option<Value>) -> Option<UserId> {
    match to {
        Some(Value::String(id)) => id.parse().ok(),
        _ => None,
    }
}

/// 中继发往客户端的消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// 管理员登记后的在线用户快照
    AllUsers { users: Vec<UserSummary> },
    UserConnected {
        id: UserId,
        name: String,
        #[serde(rename = "ip")]
        address: String,
    },
    /// 用户登记成功后回给用户自己
    UserId { id: UserId },
    UserRenamed { id: UserId, name: String },
    UserDisconnected { id: UserId },
    /// 发往管理员时带 `from`，发往用户时不带
    Message {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<UserId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<Value>,
    },
    File {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<UserId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    Pong,
}

impl ServerMessage {
    pub fn user_connected(summary: UserSummary) -> Self {
        Self::UserConnected {
            id: summary.id,
            name: summary.name,
            address: summary.address,
        }
    }

    pub fn file(from: Option<UserId>, file: FilePayload) -> Self {
        Self::File {
            from,
            name: file.name,
            mime: file.mime,
            data: file.data,
        }
    }

    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
