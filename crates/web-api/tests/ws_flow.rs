mod support;

use std::time::Duration;

use config::HubConfig;
use domain::ServerMessage;
use serde_json::json;

use support::TestServer;

#[tokio::test]
async fn admin_and_user_relay_flow() {
    let server = TestServer::start_default().await;

    let mut admin = server.connect().await;
    admin.send_json(json!({"type": "admin-init"})).await;
    assert_eq!(admin.recv().await, ServerMessage::AllUsers { users: vec![] });

    let mut user = server.connect_forwarded("203.0.113.5, 10.0.0.1").await;
    user.send_json(json!({"type": "user-init", "name": "alice"})).await;

    let ServerMessage::UserConnected { id, name, address } = admin.recv().await else {
        panic!("expected user-connected");
    };
    assert_eq!(name, "alice");
    assert_eq!(address, "203.0.113.5");
    assert_eq!(user.recv().await, ServerMessage::UserId { id });

    // 管理员 -> 用户
    admin
        .send_json(json!({"type": "message", "to": id.to_string(), "text": "welcome"}))
        .await;
    assert_eq!(
        user.recv().await,
        ServerMessage::Message {
            from: None,
            text: Some("welcome".into())
        }
    );

    // 用户 -> 管理员
    user.send_json(json!({"type": "message", "text": "thanks"})).await;
    assert_eq!(
        admin.recv().await,
        ServerMessage::Message {
            from: Some(id),
            text: Some("thanks".into())
        }
    );

    user.send_json(json!({"type": "rename", "name": "alice2"})).await;
    assert_eq!(
        admin.recv().await,
        ServerMessage::UserRenamed {
            id,
            name: "alice2".into()
        }
    );

    user.close().await;
    assert_eq!(admin.recv().await, ServerMessage::UserDisconnected { id });
    assert_eq!(server.hub.snapshot().await.users, 0);
}

#[tokio::test]
async fn peer_address_used_without_forwarded_header() {
    let server = TestServer::start_default().await;

    let mut admin = server.connect().await;
    admin.send_json(json!({"type": "admin-init"})).await;
    admin.recv().await;

    let mut user = server.connect().await;
    user.send_json(json!({"type": "user-init"})).await;

    let ServerMessage::UserConnected { id, name, address } = admin.recv().await else {
        panic!("expected user-connected");
    };
    assert_eq!(address, "127.0.0.1");
    assert_eq!(name, format!("User-{}", id.short()));
}

#[tokio::test]
async fn ping_is_answered_and_garbage_ignored() {
    let server = TestServer::start_default().await;
    let mut client = server.connect().await;

    client.send_raw("this is not json").await;
    client.send_json(json!({"hello": "world"})).await;
    client.send_json(json!({"type": "does-not-exist"})).await;
    client.send_json(json!({"type": "ping"})).await;

    assert_eq!(client.recv().await, ServerMessage::Pong);
    client.expect_silence().await;
    assert_eq!(server.hub.snapshot().await.connections, 1);
}

#[tokio::test]
async fn transport_ping_keeps_connection_open() {
    let server = TestServer::start_default().await;
    let mut client = server.connect().await;

    client.send_transport_ping().await;
    client.send_json(json!({"type": "ping"})).await;

    assert_eq!(client.recv().await, ServerMessage::Pong);
    assert_eq!(server.hub.snapshot().await.connections, 1);
}

#[tokio::test]
async fn file_is_relayed_to_admin() {
    let server = TestServer::start_default().await;

    let mut admin = server.connect().await;
    admin.send_json(json!({"type": "admin-init"})).await;
    admin.recv().await;

    let mut user = server.connect().await;
    user.send_json(json!({"type": "user-init", "name": "bob"})).await;
    admin.recv().await;
    let ServerMessage::UserId { id } = user.recv().await else {
        panic!("expected user-id");
    };

    user.send_json(json!({
        "type": "file",
        "name": "photo.jpg",
        "mime": "image/jpeg",
        "data": "/9j/4AAQ"
    }))
    .await;

    assert_eq!(
        admin.recv().await,
        ServerMessage::File {
            from: Some(id),
            name: Some("photo.jpg".into()),
            mime: Some("image/jpeg".into()),
            data: Some(json!("/9j/4AAQ")),
        }
    );
}

#[tokio::test]
async fn silent_client_is_reaped_by_heartbeat() {
    let server = TestServer::start(HubConfig {
        heartbeat_interval_secs: 1,
        ..HubConfig::default()
    })
    .await;

    let mut admin = server.connect().await;
    admin.send_json(json!({"type": "admin-init"})).await;
    admin.recv().await;

    // 注册后不再读取，因此不会回复服务端的 ping
    let mut user = server.connect().await;
    user.send_json(json!({"type": "user-init", "name": "idle"})).await;
    let ServerMessage::UserConnected { id, .. } = admin.recv().await else {
        panic!("expected user-connected");
    };

    assert_eq!(
        admin.recv_within(Duration::from_secs(5)).await,
        Some(ServerMessage::UserDisconnected { id })
    );

    let snapshot = server.hub.snapshot().await;
    assert_eq!(snapshot.users, 0);
    assert!(snapshot.admin_connected);
    drop(user);
}

#[tokio::test]
async fn keep_alive_endpoint_over_tcp() {
    let server = TestServer::start_default().await;
    let response = reqwest::get(server.http_url("/healthz")).await.unwrap();
    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "OK");
}
