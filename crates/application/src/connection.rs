//! 连接句柄
//!
//! 中继核心不持有传输层连接，只持有一个命令通道的发送端。
//! 传输层的写任务消费 [`CommandStream`]，把命令转换成真正的 WebSocket 帧。

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use domain::{ConnectionId, ServerMessage};
use tokio::sync::mpsc;

use crate::error::ApplicationError;

/// 写操作命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionCommand {
    /// 发送一帧 JSON 文本
    SendText(String),
    /// 发送传输层 ping（心跳探测）
    SendPing,
    /// 关闭连接
    Close,
}

/// 单个连接在中继中的句柄，可廉价克隆
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    address: String,
    sender: mpsc::UnboundedSender<ConnectionCommand>,
    alive: Arc<AtomicBool>,
}

impl ConnectionHandle {
    /// 为一个新连接创建句柄和对应的命令流
    pub fn channel(address: impl Into<String>) -> (Self, CommandStream) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = Self {
            id: ConnectionId::generate(),
            address: address.into(),
            sender,
            alive: Arc::new(AtomicBool::new(true)),
        };
        (handle, CommandStream { receiver })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// 对端来源地址
    pub fn address(&self) -> &str {
        &self.address
    }

    /// 序列化并投递一条消息，不等待写出
    pub fn send(&self, message: &ServerMessage) -> Result<(), ApplicationError> {
        let frame = message.to_frame()?;
        self.command(ConnectionCommand::SendText(frame))
    }

    pub fn probe(&self) -> Result<(), ApplicationError> {
        self.command(ConnectionCommand::SendPing)
    }

    pub fn terminate(&self) -> Result<(), ApplicationError> {
        self.command(ConnectionCommand::Close)
    }

    /// 收到 pong 时调用
    pub fn mark_alive(&self) {
        self.alive.store(true, Ordering::Release);
    }

    /// 取出存活标记并清零，返回清零前的值
    pub fn take_alive(&self) -> bool {
        self.alive.swap(false, Ordering::AcqRel)
    }

    fn command(&self, command: ConnectionCommand) -> Result<(), ApplicationError> {
        self.sender
            .send(command)
            .map_err(|_| ApplicationError::ConnectionClosed(self.id))
    }
}

/// 连接的命令流，由传输层写任务独占
pub struct CommandStream {
    receiver: mpsc::UnboundedReceiver<ConnectionCommand>,
}

impl CommandStream {
    pub async fn recv(&mut self) -> Option<ConnectionCommand> {
        self.receiver.recv().await
    }

    /// 非阻塞读取，队列为空或已关闭时返回 `None`
    pub fn try_recv(&mut self) -> Option<ConnectionCommand> {
        self.receiver.try_recv().ok()
    }
}
