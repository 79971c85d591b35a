//! HTTP and WebSocket front ends over real sockets.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use tab::core::clock::SystemClock;
use tab::network::http::create_router;
use tab::network::protocol::{Reply, ServerMessage};
use tab::network::session::{SessionStore, StoreConfig};
use tab::network::ws::run_gateway;
use tab::network::ErrorKind;

async fn http_server() -> (SocketAddr, Arc<SessionStore>) {
    let store = SessionStore::new(StoreConfig::default(), Arc::new(SystemClock));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = create_router(Arc::clone(&store));
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (addr, store)
}

/// Minimal HTTP/1.1 POST; returns (status, body).
async fn post(addr: SocketAddr, path: &str, body: &str) -> (u16, serde_json::Value) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "POST {} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        path,
        body.len(),
        body
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();

    let status: u16 = raw.split_whitespace().nth(1).unwrap().parse().unwrap();
    let payload = raw.split("\r\n\r\n").nth(1).unwrap_or("");
    let json = serde_json::from_str(payload).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn http_commands_and_status_codes() {
    let (addr, _store) = http_server().await;

    let (status, body) = post(addr, "/register", r#"{"nick":"ana","password":"pw"}"#).await;
    assert_eq!(status, 200);
    assert_eq!(body, serde_json::json!({}));

    let (status, body) = post(addr, "/register", r#"{"nick":"ana","password":"other"}"#).await;
    assert_eq!(status, 401);
    assert_eq!(body["kind"], "auth");

    let (status, _) = post(addr, "/join", r#"{"group":1,"size":6,"nick":"ana","password":"pw"}"#).await;
    assert_eq!(status, 400);

    let (status, _) = post(addr, "/join", r#"{"size":9,"nick":"ana","password":"pw"}"#).await;
    assert_eq!(status, 400);

    let (status, body) = post(addr, "/join", r#"{"group":1,"size":9,"nick":"ana","password":"pw"}"#).await;
    assert_eq!(status, 200);
    let game = body["game"].as_str().unwrap().to_string();

    let (status, _) = post(addr, "/roll", r#"{"nick":"ana","password":"pw","game":"nope"}"#).await;
    assert_eq!(status, 404);

    let roll = format!(r#"{{"nick":"ana","password":"pw","game":"{}"}}"#, game);
    let (status, body) = post(addr, "/roll", &roll).await;
    assert_eq!(status, 409);
    assert_eq!(body["kind"], "state_conflict");

    let (status, body) = post(addr, "/ranking", r#"{"group":1,"size":9}"#).await;
    assert_eq!(status, 200);
    assert_eq!(body["ranking"], serde_json::json!([]));
}

#[tokio::test]
async fn websocket_gateway_runs_the_command_table() {
    let store = SessionStore::new(StoreConfig::default(), Arc::new(SystemClock));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, _) = broadcast::channel(1);
    let gateway = tokio::spawn(run_gateway(listener, Arc::clone(&store), shutdown_tx.clone()));

    let (mut ws, _) = connect_async(format!("ws://{}", addr)).await.unwrap();

    ws.send(Message::Text(r#"{"command":"register","nick":"ana","password":"pw"}"#.into()))
        .await
        .unwrap();

    let reply = next_message(&mut ws).await;
    assert!(matches!(reply, ServerMessage::Reply { ref command, body: Reply::Ack {} } if command == "register"));

    ws.send(Message::Text(r#"{"command":"ping"}"#.into())).await.unwrap();
    assert_eq!(next_message(&mut ws).await, ServerMessage::Pong);

    ws.send(Message::Text(r#"{"command":"roll","nick":"ana","password":"pw","game":"g"}"#.into()))
        .await
        .unwrap();
    match next_message(&mut ws).await {
        ServerMessage::Error(body) => assert_eq!(body.kind, ErrorKind::Reference),
        other => panic!("expected error, got {:?}", other),
    }

    ws.send(Message::Text(r#"{"command":"join","group":2,"size":5,"nick":"ana","password":"pw"}"#.into()))
        .await
        .unwrap();
    let game = match next_message(&mut ws).await {
        ServerMessage::Reply { body: Reply::Game { game }, .. } => game,
        other => panic!("expected game id, got {:?}", other),
    };

    let subscribe = format!(r#"{{"command":"subscribe","nick":"ana","game":"{}"}}"#, game);
    ws.send(Message::Text(subscribe)).await.unwrap();
    // Frames are handled in order, so the pong means the stream is attached.
    ws.send(Message::Text(r#"{"command":"ping"}"#.into())).await.unwrap();
    assert_eq!(next_message(&mut ws).await, ServerMessage::Pong);

    store.register("rui", "pw").await.unwrap();
    store
        .join(2, 5, tab::game::state::FirstPlayer::Blue, "rui", "pw")
        .await
        .unwrap();

    match next_message(&mut ws).await {
        ServerMessage::Update { update } => {
            assert_eq!(update.game, game);
            assert_eq!(update.event.map(|e| e.kind()), Some("started"));
            assert_eq!(update.pieces.len(), 20);
        }
        other => panic!("expected update, got {:?}", other),
    }

    let _ = shutdown_tx.send(());
    match next_message(&mut ws).await {
        ServerMessage::Shutdown { .. } => {}
        other => panic!("expected shutdown, got {:?}", other),
    }
    gateway.await.unwrap();
}

async fn next_message<S>(ws: &mut S) -> ServerMessage
where
    S: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return ServerMessage::from_json(&text).unwrap(),
            Some(Ok(_)) => continue,
            other => panic!("stream ended: {:?}", other),
        }
    }
}
