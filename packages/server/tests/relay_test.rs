//! End-to-end tests against an in-process relay bound to an ephemeral port.

use std::{error::Error, net::SocketAddr, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use hiroba_server::{
    hub::{Hub, HubConfig},
    ui::Server,
};
use hiroba_shared::time::SystemClock;
use serde_json::{Value, json};
use tokio::{net::TcpStream, sync::oneshot, task::JoinHandle};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{self, Message, http::StatusCode},
};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Relay running in the background; stops when dropped
struct TestServer {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    serving: JoinHandle<Result<(), Box<dyn Error + Send + Sync>>>,
}

impl TestServer {
    async fn start(config: HubConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().unwrap();

        let (hub, _hub_task) = Hub::spawn(config, Arc::new(SystemClock));
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let serving = tokio::spawn(Server::new(hub).serve(listener, async {
            let _ = shutdown_rx.await;
        }));

        Self {
            addr,
            shutdown: shutdown_tx,
            serving,
        }
    }

    /// Trigger graceful shutdown and wait until `serve` returns
    async fn stop(self) {
        let _ = self.shutdown.send(());
        tokio::time::timeout(Duration::from_secs(10), self.serving)
            .await
            .expect("server did not stop")
            .expect("server task panicked")
            .expect("server failed");
    }

    fn http(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn connect(&self, path: &str) -> Client {
        let (client, _response) = connect_async(format!("ws://{}{}", self.addr, path))
            .await
            .expect("Failed to connect");
        client
    }

    async fn rooms(&self) -> Vec<Value> {
        reqwest::get(self.http("/api/rooms"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    /// Wait until the hub reports `count` members in `room`
    async fn wait_for_members(&self, room: &str, count: usize) {
        for _ in 0..100 {
            let current = self
                .rooms()
                .await
                .iter()
                .find(|summary| summary["room"] == room)
                .map(|summary| summary["member_count"].as_u64().unwrap_or(0) as usize)
                .unwrap_or(0);
            if current == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("room '{room}' never reached {count} member(s)");
    }
}

async fn next_json(client: &mut Client) -> Value {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .expect("timed out waiting for a message")
            .expect("stream ended")
            .expect("read failed");
        if let Message::Text(text) = message {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn assert_silent(client: &mut Client) {
    let result = tokio::time::timeout(Duration::from_millis(200), client.next()).await;
    assert!(result.is_err(), "unexpected message: {result:?}");
}

async fn send(client: &mut Client, text: &str) {
    client
        .send(Message::Text(text.to_string().into()))
        .await
        .expect("Failed to send");
}

#[tokio::test]
async fn test_health_check() {
    // テスト項目: ヘルスチェックが ok を返す
    // given (前提条件):
    let server = TestServer::start(HubConfig::default()).await;

    // when (操作):
    let body: Value = reqwest::get(server.http("/api/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_connection_without_room_is_rejected() {
    // テスト項目: ルームを指定しない接続は 400 で拒否される
    // given (前提条件):
    let server = TestServer::start(HubConfig::default()).await;

    // when (操作):
    let result = connect_async(format!("ws://{}/ws", server.addr)).await;

    // then (期待する結果):
    match result {
        Err(tungstenite::Error::Http(response)) => {
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
        other => panic!("expected HTTP 400, got {other:?}"),
    }
}

#[tokio::test]
async fn test_messages_stay_within_room() {
    // テスト項目: lobby 内のメッセージは送信者を含む lobby のメンバーにだけ届く
    // given (前提条件):
    let server = TestServer::start(HubConfig::default()).await;
    let mut alice = server.connect("/ws?room=lobby").await;
    server.wait_for_members("lobby", 1).await;
    let mut bob = server.connect("/ws?room=lobby").await;
    server.wait_for_members("lobby", 2).await;
    let mut carol = server.connect("/ws/kitchen").await;
    server.wait_for_members("kitchen", 1).await;

    let joined = next_json(&mut alice).await;
    assert_eq!(joined["sender"], "Server");
    let bob_id = joined["payload"]["client_id"].as_str().unwrap().to_string();

    // when (操作):
    send(&mut bob, r#"{"text":"hi"}"#).await;

    // then (期待する結果):
    for client in [&mut alice, &mut bob] {
        let message = next_json(client).await;
        assert_eq!(message["sender"], bob_id.as_str());
        assert_eq!(message["payload"], json!({"text": "hi"}));
        assert!(message.get("serverIP").is_some());
        assert!(message.get("senderIP").is_some());
        assert!(message.get("roomID").is_none());
    }
    assert_silent(&mut carol).await;
}

#[tokio::test]
async fn test_sender_is_skipped_without_echo() {
    // テスト項目: echo を無効にすると送信者には自分のメッセージが届かない
    // given (前提条件):
    let server = TestServer::start(HubConfig {
        echo_to_sender: false,
        ..HubConfig::default()
    })
    .await;
    let mut alice = server.connect("/ws?room=lobby").await;
    server.wait_for_members("lobby", 1).await;
    let mut bob = server.connect("/ws?room=lobby").await;
    server.wait_for_members("lobby", 2).await;
    next_json(&mut alice).await;

    // when (操作):
    send(&mut bob, "plain text").await;

    // then (期待する結果):
    assert_eq!(next_json(&mut alice).await["payload"], "plain text");
    assert_silent(&mut bob).await;
}

#[tokio::test]
async fn test_disconnect_is_announced_once() {
    // テスト項目: 切断したクライアントの退出通知が残りのメンバーに1回だけ届く
    // given (前提条件):
    let server = TestServer::start(HubConfig::default()).await;
    let mut alice = server.connect("/ws?room=lobby").await;
    server.wait_for_members("lobby", 1).await;
    let mut dave = server.connect("/ws?room=lobby").await;
    server.wait_for_members("lobby", 2).await;
    let joined = next_json(&mut alice).await;
    let dave_id = joined["payload"]["client_id"].as_str().unwrap().to_string();

    // when (操作):
    dave.close(None).await.unwrap();
    server.wait_for_members("lobby", 1).await;

    // then (期待する結果):
    let left = next_json(&mut alice).await;
    assert_eq!(left["sender"], "Server");
    assert_eq!(
        left["payload"]["message"],
        format!("Client {dave_id} disconnected")
    );
    assert_silent(&mut alice).await;

    let rooms = server.rooms().await;
    let members = rooms[0]["members"].as_array().unwrap();
    assert!(members.iter().all(|member| member["id"] != dave_id.as_str()));
}

#[tokio::test]
async fn test_binary_frames_are_relayed_and_pings_skipped() {
    // テスト項目: バイナリフレームはテキストとして中継され、ping はメッセージにならない
    // given (前提条件):
    let server = TestServer::start(HubConfig::default()).await;
    let mut alice = server.connect("/ws/lobby").await;
    server.wait_for_members("lobby", 1).await;

    // when (操作):
    alice
        .send(Message::Ping(vec![1u8, 2, 3].into()))
        .await
        .expect("Failed to ping");
    alice
        .send(Message::Binary(br#"{"text":"bin"}"#.to_vec().into()))
        .await
        .expect("Failed to send");
    send(&mut alice, "after ping").await;

    // then (期待する結果):
    assert_eq!(next_json(&mut alice).await["payload"], json!({"text": "bin"}));
    assert_eq!(next_json(&mut alice).await["payload"], "after ping");
}

#[tokio::test]
async fn test_shutdown_sends_close_frame_to_open_connections() {
    // テスト項目: サーバー停止時に接続中のクライアントへ close フレームが届いてから serve が終了する
    // given (前提条件):
    let server = TestServer::start(HubConfig::default()).await;
    let mut alice = server.connect("/ws?room=lobby").await;
    let mut bob = server.connect("/ws/kitchen").await;
    server.wait_for_members("lobby", 1).await;
    server.wait_for_members("kitchen", 1).await;

    // when (操作):
    server.stop().await;

    // then (期待する結果):
    for client in [&mut alice, &mut bob] {
        let message = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .expect("timed out waiting for close")
            .expect("stream ended without a close frame")
            .expect("read failed");
        assert!(matches!(message, Message::Close(_)), "got {message:?}");
    }
}
