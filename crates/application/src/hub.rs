//! 消息中继
//!
//! 每个连接的会话状态机（未识别 / 管理员 / 用户）以及各类消息的路由规则。
//! 所有事件都在同一把锁内处理，登记表的读写彼此之间是原子的。

use std::collections::HashMap;
use std::fmt;

use domain::{ClientMessage, ConnectionId, Role, ServerMessage, UserId};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::connection::ConnectionHandle;
use crate::presence::PresenceRegistry;

/// 附着在连接上的会话状态
#[derive(Debug)]
struct Session {
    handle: ConnectionHandle,
    role: Role,
    user_id: Option<UserId>,
    name: Option<String>,
}

impl Session {
    fn new(handle: ConnectionHandle) -> Self {
        Self {
            handle,
            role: Role::Unidentified,
            user_id: None,
            name: None,
        }
    }
}

/// 消息发送方在路由意义上的身份
enum Sender {
    Admin,
    User(UserId),
    Other,
}

/// 运行时快照，用于诊断和测试
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HubSnapshot {
    pub connections: usize,
    pub users: usize,
    pub admin_connected: bool,
}

/// 一轮心跳检测的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub probed: usize,
    pub terminated: Vec<ConnectionId>,
}

#[derive(Default)]
pub struct Hub {
    state: Mutex<HubState>,
}

#[derive(Default)]
struct HubState {
    sessions: HashMap<ConnectionId, Session>,
    registry: PresenceRegistry,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// 传输层建立连接
    pub async fn connect(&self, handle: ConnectionHandle) {
        info!(
            connection_id = %handle.id(),
            address = %handle.address(),
            "Client connected"
        );
        let mut state = self.state.lock().await;
        state.sessions.insert(handle.id(), Session::new(handle));
    }

    /// 处理一帧入站文本。格式错误的帧直接丢弃
    pub async fn handle_frame(&self, connection: ConnectionId, raw: &str) {
        let message = match ClientMessage::parse(raw) {
            Ok(message) => message,
            Err(err) => {
                warn!(connection_id = %connection, error = %err, "Invalid frame received");
                return;
            }
        };

        let mut state = self.state.lock().await;
        state.dispatch(connection, message);
    }

    /// 传输层连接关闭。重复调用是安全的
    pub async fn disconnect(&self, connection: ConnectionId) {
        let mut state = self.state.lock().await;
        state.close_session(connection);
    }

    /// 传输层错误只记录日志，清理由随后的关闭事件完成
    pub fn error(&self, connection: ConnectionId, err: &dyn fmt::Display) {
        warn!(connection_id = %connection, error = %err, "WebSocket error");
    }

    /// 强制断开连接，走与正常关闭相同的清理流程
    pub async fn terminate(&self, connection: ConnectionId) {
        let mut state = self.state.lock().await;
        state.terminate(connection);
    }

    /// 心跳检测：上一轮未应答的连接被终止，其余连接清零标记并重新探测
    pub async fn sweep(&self) -> SweepReport {
        let mut state = self.state.lock().await;
        let mut report = SweepReport::default();

        let connections: Vec<ConnectionId> = state.sessions.keys().copied().collect();
        for connection in connections {
            let alive = match state.sessions.get(&connection) {
                Some(session) => session.handle.take_alive(),
                None => continue,
            };

            if alive {
                state.probe(connection);
                report.probed += 1;
            } else {
                info!(connection_id = %connection, "Liveness probe unanswered, terminating");
                state.terminate(connection);
                report.terminated.push(connection);
            }
        }

        debug!(
            probed = report.probed,
            terminated = report.terminated.len(),
            "Liveness sweep finished"
        );
        report
    }

    pub async fn snapshot(&self) -> HubSnapshot {
        let state = self.state.lock().await;
        HubSnapshot {
            connections: state.sessions.len(),
            users: state.registry.user_count(),
            admin_connected: state.registry.admin().is_some(),
        }
    }
}

impl HubState {
    fn dispatch(&mut self, connection: ConnectionId, message: ClientMessage) {
        if !self.sessions.contains_key(&connection) {
            debug!(connection_id = %connection, kind = message.kind(), "Frame for closed connection ignored");
            return;
        }

        match message {
            ClientMessage::AdminInit => self.admin_init(connection),
            ClientMessage::UserInit { name } => self.user_init(connection, name),
            ClientMessage::Rename { name } => self.rename(connection, name),
            ClientMessage::Message { to, text } => {
                self.route(connection, to, |from| ServerMessage::Message { from, text })
            }
            ClientMessage::File { to, file } => {
                self.route(connection, to, |from| ServerMessage::file(from, file))
            }
            ClientMessage::Ping => {
                debug!(connection_id = %connection, "Received ping");
                self.send_to(connection, &ServerMessage::Pong);
            }
            ClientMessage::Unknown(kind) => {
                debug!(connection_id = %connection, kind = %kind, "Unknown message type");
            }
        }
    }

    fn admin_init(&mut self, connection: ConnectionId) {
        let Some(session) = self.sessions.get_mut(&connection) else {
            return;
        };
        if session.role == Role::User {
            warn!(connection_id = %connection, "admin-init from a registered user ignored");
            return;
        }
        session.role = Role::Admin;

        if let Some(previous) = self.registry.set_admin(connection) {
            if previous != connection {
                info!(
                    connection_id = %connection,
                    previous = %previous,
                    "Admin replaced by a new connection"
                );
            }
        }
        info!(connection_id = %connection, "Admin has connected");

        let users = self
            .registry
            .list_users()
            .iter()
            .map(|record| record.summary())
            .collect();
        self.send_to(connection, &ServerMessage::AllUsers { users });
    }

    fn user_init(&mut self, connection: ConnectionId, name: Option<String>) {
        let Some(session) = self.sessions.get_mut(&connection) else {
            return;
        };
        if session.role.is_identified() {
            warn!(
                connection_id = %connection,
                role = ?session.role,
                "user-init from an identified connection ignored"
            );
            return;
        }

        let id = self
            .registry
            .register_user(connection, non_empty(name), session.handle.address());
        let Some(record) = self.registry.lookup_user(id) else {
            return;
        };
        let summary = record.summary();

        session.role = Role::User;
        session.user_id = Some(id);
        session.name = Some(summary.name.clone());

        info!(
            connection_id = %connection,
            user_id = %id,
            name = %summary.name,
            address = %summary.address,
            "User connected"
        );

        self.notify_admin(&ServerMessage::user_connected(summary));
        self.send_to(connection, &ServerMessage::UserId { id });
    }

    fn rename(&mut self, connection: ConnectionId, name: Option<String>) {
        let Some(session) = self.sessions.get_mut(&connection) else {
            return;
        };
        let (Role::User, Some(id)) = (session.role, session.user_id) else {
            debug!(connection_id = %connection, "rename before user-init ignored");
            return;
        };

        let Some(name) = non_empty(name).or_else(|| session.name.clone()) else {
            return;
        };
        if !self.registry.rename_user(id, name.as_str()) {
            return;
        }
        session.name = Some(name.clone());

        info!(user_id = %id, name = %name, "User renamed");
        self.notify_admin(&ServerMessage::UserRenamed { id, name });
    }

    /// 管理员 -> 指定用户；用户 -> 管理员（附带 `from`）；其余情况丢弃
    fn route(
        &self,
        connection: ConnectionId,
        to: Option<UserId>,
        build: impl FnOnce(Option<UserId>) -> ServerMessage,
    ) {
        match self.classify(connection) {
            Sender::Admin => {
                let Some(recipient) = to
                    .and_then(|id| self.registry.lookup_user(id))
                    .map(|record| record.connection)
                else {
                    debug!(to = ?to, "Recipient not connected, message dropped");
                    return;
                };
                self.send_to(recipient, &build(None));
            }
            Sender::User(id) => {
                let Some(admin) = self.registry.admin() else {
                    debug!(user_id = %id, "No admin connected, message dropped");
                    return;
                };
                self.send_to(admin, &build(Some(id)));
            }
            Sender::Other => {
                debug!(connection_id = %connection, "Message from unregistered connection dropped");
            }
        }
    }

    fn classify(&self, connection: ConnectionId) -> Sender {
        if self.registry.is_admin(connection) {
            return Sender::Admin;
        }
        match self.sessions.get(&connection) {
            Some(Session {
                role: Role::User,
                user_id: Some(id),
                ..
            }) if self.registry.lookup_user(*id).is_some() => Sender::User(*id),
            Some(Session {
                role: Role::Admin, ..
            }) => {
                warn!(connection_id = %connection, "Message from displaced admin ignored");
                Sender::Other
            }
            _ => Sender::Other,
        }
    }

    fn notify_admin(&self, message: &ServerMessage) {
        if let Some(admin) = self.registry.admin() {
            self.send_to(admin, message);
        }
    }

    /// 尽力投递：目标不存在或已关闭时静默丢弃
    fn send_to(&self, connection: ConnectionId, message: &ServerMessage) {
        let Some(session) = self.sessions.get(&connection) else {
            debug!(connection_id = %connection, "Target connection gone, message dropped");
            return;
        };
        if let Err(err) = session.handle.send(message) {
            debug!(connection_id = %connection, error = %err, "Failed to deliver message");
        }
    }

    fn probe(&self, connection: ConnectionId) {
        if let Some(session) = self.sessions.get(&connection) {
            if let Err(err) = session.handle.probe() {
                debug!(connection_id = %connection, error = %err, "Failed to send probe");
            }
        }
    }

    fn terminate(&mut self, connection: ConnectionId) {
        if let Some(session) = self.sessions.get(&connection) {
            if let Err(err) = session.handle.terminate() {
                debug!(connection_id = %connection, error = %err, "Connection already closed");
            }
        }
        self.close_session(connection);
    }

    fn close_session(&mut self, connection: ConnectionId) {
        let Some(session) = self.sessions.remove(&connection) else {
            return;
        };

        if self.registry.clear_admin(connection) {
            info!(connection_id = %connection, "Admin disconnected");
            return;
        }

        match (session.role, session.user_id) {
            (Role::User, Some(id)) => {
                if self.registry.remove_user(id).is_some() {
                    info!(user_id = %id, "User disconnected");
                    self.notify_admin(&ServerMessage::UserDisconnected { id });
                }
            }
            (Role::Admin, _) => {
                info!(connection_id = %connection, "Displaced admin disconnected");
            }
            _ => {
                info!(connection_id = %connection, "An unidentified client disconnected");
            }
        }
    }
}

fn non_empty(name: Option<String>) -> Option<String> {
    name.filter(|name| !name.is_empty())
}
