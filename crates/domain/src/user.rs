use serde::{Deserialize, Serialize};

use crate::value_objects::{ConnectionId, UserId};

/// 连接在会话协议中的身份。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Role {
    #[default]
    Unidentified,
    Admin,
    User,
}

impl Role {
    pub fn is_identified(&self) -> bool {
        !matches!(self, Role::Unidentified)
    }
}

/// 在线用户记录。
///
/// `connection` 只保存连接标识，不持有连接本身；连接关闭时记录随之移除。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
    pub address: String,
    pub connection: ConnectionId,
}

impl UserRecord {
    pub fn new(
        id: UserId,
        name: impl Into<String>,
        address: impl Into<String>,
        connection: ConnectionId,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            address: address.into(),
            connection,
        }
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            address: self.address.clone(),
        }
    }
}

/// 发给管理员的用户概要（`all-users` 列表项）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    #[serde(rename = "ip")]
    pub address: String,
}
