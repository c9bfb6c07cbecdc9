//! Web API 层。
//!
//! 提供 Axum 路由：WebSocket 中继入口、健康检查和静态页面。
//! WebSocket 连接的事件被转交给应用层的 [`application::Hub`]。

mod routes;
mod state;
mod ws_connection;

pub use routes::router;
pub use state::AppState;
