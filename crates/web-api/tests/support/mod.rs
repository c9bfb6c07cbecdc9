#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use application::{Hub, LivenessMonitor};
use config::HubConfig;
use domain::ServerMessage;
use futures_util::{SinkExt, StreamExt};
use tokio::{net::TcpListener, net::TcpStream, sync::oneshot, time::timeout};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, Message as TungsteniteMessage},
    MaybeTlsStream, WebSocketStream,
};
use web_api::{router, AppState};

/// 在随机端口上运行的测试服务器，drop 时关闭
pub struct TestServer {
    pub addr: SocketAddr,
    pub hub: Arc<Hub>,
    ws_path: String,
    server_shutdown: Option<oneshot::Sender<()>>,
    monitor_shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn start(config: HubConfig) -> Self {
        let hub = Arc::new(Hub::new());
        let app = router(AppState::new(hub.clone(), config.clone()));

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");

        let (server_tx, server_rx) = oneshot::channel::<()>();
        let (monitor_tx, monitor_rx) = oneshot::channel::<()>();

        let monitor = LivenessMonitor::from_config(hub.clone(), &config);
        tokio::spawn(monitor.run(async {
            let _ = monitor_rx.await;
        }));

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async {
                let _ = server_rx.await;
            })
            .await
            .ok();
        });

        Self {
            addr,
            hub,
            ws_path: config.ws_path,
            server_shutdown: Some(server_tx),
            monitor_shutdown: Some(monitor_tx),
        }
    }

    pub async fn start_default() -> Self {
        Self::start(HubConfig::default()).await
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}{}", self.addr, self.ws_path)
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn connect(&self) -> WsClient {
        let (stream, _) = connect_async(self.ws_url()).await.expect("ws connect");
        WsClient { stream }
    }

    pub async fn connect_forwarded(&self, forwarded_for: &str) -> WsClient {
        let mut request = self.ws_url().into_client_request().expect("ws request");
        request.headers_mut().insert(
            "x-forwarded-for",
            forwarded_for.parse().expect("header value"),
        );
        let (stream, _) = connect_async(request).await.expect("ws connect");
        WsClient { stream }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.server_shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(tx) = self.monitor_shutdown.take() {
            let _ = tx.send(());
        }
    }
}

pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    pub async fn send_json(&mut self, value: serde_json::Value) {
        self.send_raw(&value.to_string()).await;
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.stream
            .send(TungsteniteMessage::Text(text.to_owned().into()))
            .await
            .expect("ws send");
    }

    pub async fn send_transport_ping(&mut self) {
        self.stream
            .send(TungsteniteMessage::Ping(b"hb".to_vec().into()))
            .await
            .expect("ws ping");
    }

    /// 读取下一条应用消息，跳过心跳帧；超时或连接关闭返回 `None`
    pub async fn recv_within(&mut self, wait: Duration) -> Option<ServerMessage> {
        let read = async {
            while let Some(frame) = self.stream.next().await {
                match frame {
                    Ok(TungsteniteMessage::Text(text)) => {
                        return Some(serde_json::from_str(text.as_str()).expect("server frame"));
                    }
                    Ok(TungsteniteMessage::Ping(_)) | Ok(TungsteniteMessage::Pong(_)) => continue,
                    Ok(_) | Err(_) => return None,
                }
            }
            None
        };
        timeout(wait, read).await.ok().flatten()
    }

    pub async fn recv(&mut self) -> ServerMessage {
        self.recv_within(Duration::from_secs(2))
            .await
            .expect("expected a server message")
    }

    pub async fn expect_silence(&mut self) {
        assert_eq!(self.recv_within(Duration::from_millis(200)).await, None);
    }

    pub async fn close(mut self) {
        self.stream.close(None).await.ok();
    }
}
