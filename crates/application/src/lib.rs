//! 应用层实现。
//!
//! 中继核心：在线状态登记表、会话协议与消息路由、连接句柄以及心跳检测。
//! 传输层（WebSocket）只通过 [`Hub`] 的 connect / handle_frame / disconnect
//! 与核心交互。

pub mod connection;
pub mod error;
pub mod hub;
pub mod liveness;
pub mod presence;

pub use connection::{CommandStream, ConnectionCommand, ConnectionHandle};
pub use error::ApplicationError;
pub use hub::{Hub, HubSnapshot, SweepReport};
pub use liveness::LivenessMonitor;
pub use presence::PresenceRegistry;
