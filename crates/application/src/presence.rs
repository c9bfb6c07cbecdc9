//! 在线状态登记表
//!
//! 保存唯一的管理员槽位和在线用户表。只修改自身状态，从不发送消息。

use std::collections::HashMap;

use domain::{ConnectionId, UserId, UserRecord};

#[derive(Debug, Default)]
pub struct PresenceRegistry {
    admin: Option<ConnectionId>,
    users: HashMap<UserId, UserRecord>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 无条件设置管理员，返回被替换的旧管理员
    pub fn set_admin(&mut self, connection: ConnectionId) -> Option<ConnectionId> {
        self.admin.replace(connection)
    }

    /// 仅当槽位仍指向 `connection` 时清空，避免旧连接的关闭事件清掉新管理员
    pub fn clear_admin(&mut self, connection: ConnectionId) -> bool {
        if self.admin == Some(connection) {
            self.admin = None;
            true
        } else {
            false
        }
    }

    pub fn admin(&self) -> Option<ConnectionId> {
        self.admin
    }

    pub fn is_admin(&self, connection: ConnectionId) -> bool {
        self.admin == Some(connection)
    }

    /// 登记用户。未提供昵称时使用 `User-<id 前 8 位>`
    pub fn register_user(
        &mut self,
        connection: ConnectionId,
        name: Option<String>,
        address: impl Into<String>,
    ) -> UserId {
        let id = UserId::generate();
        let name = name.unwrap_or_else(|| format!("User-{}", id.short()));
        self.users
            .insert(id, UserRecord::new(id, name, address, connection));
        id
    }

    pub fn rename_user(&mut self, id: UserId, name: impl Into<String>) -> bool {
        match self.users.get_mut(&id) {
            Some(record) => {
                record.rename(name);
                true
            }
            None => false,
        }
    }

    pub fn remove_user(&mut self, id: UserId) -> Option<UserRecord> {
        self.users.remove(&id)
    }

    pub fn lookup_user(&self, id: UserId) -> Option<&UserRecord> {
        self.users.get(&id)
    }

    pub fn list_users(&self) -> Vec<UserRecord> {
        self.users.values().cloned().collect()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}
