use std::ops::ControlFlow;

use application::{CommandStream, ConnectionCommand, ConnectionHandle, Hub};
use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::{SinkExt, StreamExt};

use crate::state::AppState;

/// WebSocket 连接管理器
///
/// 把单个 WebSocket 连接接到中继核心上：
/// - 写任务消费中继下发的命令（文本帧、心跳 ping、关闭）
/// - 读任务把文本帧交给中继，把 pong 记为存活
/// - 任一任务结束后执行与关闭相同的清理
pub struct WebSocketConnection {
    socket: WebSocket,
    state: AppState,
    handle: ConnectionHandle,
    commands: CommandStream,
}

impl WebSocketConnection {
    pub fn new(socket: WebSocket, state: AppState, address: String) -> Self {
        let (handle, commands) = ConnectionHandle::channel(address);
        Self {
            socket,
            state,
            handle,
            commands,
        }
    }

    /// 运行 WebSocket 连接的主循环
    pub async fn run(self) {
        let Self {
            socket,
            state,
            handle,
            mut commands,
        } = self;
        let connection_id = handle.id();

        state.hub.connect(handle.clone()).await;

        let (mut sender, mut incoming) = socket.split();

        // 发送任务：统一处理所有对 WebSocket sender 的写操作
        let mut send_task = tokio::spawn(async move {
            while let Some(command) = commands.recv().await {
                let message = match command {
                    ConnectionCommand::SendText(text) => WsMessage::Text(text.into()),
                    ConnectionCommand::SendPing => WsMessage::Ping(Default::default()),
                    ConnectionCommand::Close => {
                        let _ = sender.send(WsMessage::Close(None)).await;
                        break;
                    }
                };
                if sender.send(message).await.is_err() {
                    tracing::warn!(connection_id = %connection_id, "Failed to write websocket frame");
                    break;
                }
            }
        });

        // 接收任务：处理来自客户端的消息
        let hub = state.hub.clone();
        let mut recv_task = tokio::spawn(async move {
            while let Some(result) = incoming.next().await {
                match result {
                    Ok(message) => {
                        if Self::handle_incoming(&hub, &handle, message)
                            .await
                            .is_break()
                        {
                            break;
                        }
                    }
                    Err(err) => {
                        hub.error(connection_id, &err);
                        break;
                    }
                }
            }
        });

        // 等待任意一个任务完成（连接断开或被终止）
        tokio::select! {
            _ = &mut send_task => recv_task.abort(),
            _ = &mut recv_task => send_task.abort(),
        }

        state.hub.disconnect(connection_id).await;
        tracing::debug!(connection_id = %connection_id, "WebSocket connection cleaned up");
    }

    /// 客户端 ping 由 tungstenite 自动回复 pong
    async fn handle_incoming(
        hub: &Hub,
        handle: &ConnectionHandle,
        message: WsMessage,
    ) -> ControlFlow<()> {
        match message {
            WsMessage::Text(text) => hub.handle_frame(handle.id(), text.as_str()).await,
            WsMessage::Binary(data) => match std::str::from_utf8(&data) {
                Ok(text) => hub.handle_frame(handle.id(), text).await,
                Err(_) => {
                    tracing::debug!(connection_id = %handle.id(), "Non UTF-8 binary frame ignored");
                }
            },
            WsMessage::Pong(_) => handle.mark_alive(),
            WsMessage::Ping(_) => {
                tracing::debug!(connection_id = %handle.id(), "Transport ping received");
            }
            WsMessage::Close(frame) => {
                tracing::info!(connection_id = %handle.id(), reason = ?frame, "Client initiated close");
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }
}
