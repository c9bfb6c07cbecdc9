//! 主应用程序入口
//!
//! 加载配置，启动心跳检测和 Axum 服务，Ctrl-C 时优雅退出。

use std::{net::SocketAddr, sync::Arc};

use application::{Hub, LivenessMonitor};
use config::AppConfig;
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志，未设置 RUST_LOG 时默认 info
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        ws_path = %config.hub.ws_path,
        static_dir = %config.hub.static_dir,
        heartbeat_secs = config.hub.heartbeat_interval_secs,
        "Configuration loaded"
    );

    let hub = Arc::new(Hub::new());

    let (monitor_tx, monitor_rx) = oneshot::channel::<()>();
    let monitor = LivenessMonitor::from_config(hub.clone(), &config.hub);
    let monitor_task = tokio::spawn(monitor.run(async {
        let _ = monitor_rx.await;
    }));

    let app = router(AppState::new(hub.clone(), config.hub.clone()));
    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!("Live chat hub listening on http://{}", address);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    let _ = monitor_tx.send(());
    let _ = monitor_task.await;

    let snapshot = hub.snapshot().await;
    tracing::info!(
        connections = snapshot.connections,
        users = snapshot.users,
        admin_connected = snapshot.admin_connected,
        "Server stopped"
    );

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
