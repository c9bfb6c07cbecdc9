use std::net::SocketAddr;
use std::path::PathBuf;

use axum::{
    extract::{ConnectInfo, State, WebSocketUpgrade},
    handler::HandlerWithoutStateExt,
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::{state::AppState, ws_connection::WebSocketConnection};

/// 构建路由。服务时需要使用
/// `into_make_service_with_connect_info::<SocketAddr>()` 以获得对端地址。
pub fn router(state: AppState) -> Router {
    let static_dir = PathBuf::from(&state.config.static_dir);
    let pages = ServeDir::new(&static_dir).not_found_service(not_found.into_service());

    // ServeFile 的 404 没有响应体，统一成 `Not found`
    let entry_pages = Router::new()
        .route_service("/admin", ServeFile::new(static_dir.join("admin.html")))
        .route_service("/user", ServeFile::new(static_dir.join("user.html")))
        .layer(middleware::map_response(not_found_body));

    Router::new()
        .route("/", get(health))
        .route("/healthz", get(health))
        .route(&state.config.ws_path, get(websocket_upgrade))
        .merge(entry_pages)
        .fallback_service(pages)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    tracing::info!("Received keep-alive ping");
    "OK"
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not found")
}

async fn not_found_body(response: Response) -> Response {
    if response.status() == StatusCode::NOT_FOUND {
        not_found().await.into_response()
    } else {
        response
    }
}

async fn websocket_upgrade(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let address = client_address(&headers, peer);
    ws.on_upgrade(move |socket| WebSocketConnection::new(socket, state, address).run())
}

/// 反向代理后取 `X-Forwarded-For` 的第一个地址，否则用套接字对端地址
fn client_address(headers: &HeaderMap, peer: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| peer.ip().to_string())
}
