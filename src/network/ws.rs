//! WebSocket Gateway
//!
//! Same command table as the HTTP front end, one JSON frame per command.
//! A `subscribe` frame attaches the socket to a session's delta stream; it
//! keeps accepting commands while deltas flow.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::network::error::CommandError;
use crate::network::protocol::{ClientMessage, ServerMessage, StateUpdate};
use crate::network::session::SessionStore;

/// Accept WebSocket clients until shutdown.
pub async fn run_gateway(
    listener: TcpListener,
    store: Arc<SessionStore>,
    shutdown_tx: broadcast::Sender<()>,
) {
    let mut shutdown_rx = shutdown_tx.subscribe();
    if let Ok(addr) = listener.local_addr() {
        info!("WebSocket gateway listening on {}", addr);
    }

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        debug!("New WebSocket connection from {}", addr);
                        handle_connection(stream, addr, Arc::clone(&store), shutdown_tx.subscribe());
                    }
                    Err(e) => {
                        error!("Accept error: {}", e);
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("WebSocket gateway stopping");
                break;
            }
        }
    }
}

/// Serve one socket.
fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    store: Arc<SessionStore>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    tokio::spawn(async move {
        let ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                warn!("WebSocket handshake failed for {}: {}", addr, e);
                return;
            }
        };

        let (mut ws_sender, mut ws_receiver) = ws_stream.split();
        let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(64);

        let sender_task = tokio::spawn(async move {
            while let Some(msg) = msg_rx.recv().await {
                let text = match msg.to_json() {
                    Ok(t) => t,
                    Err(e) => {
                        error!("Failed to serialize message: {}", e);
                        continue;
                    }
                };
                if ws_sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        });

        let mut forwarder: Option<JoinHandle<()>> = None;

        loop {
            tokio::select! {
                msg = ws_receiver.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            let reply = match ClientMessage::from_json(&text) {
                                Ok(ClientMessage::Command(command)) => {
                                    let name = command.name();
                                    match store.execute(command).await {
                                        Ok(body) => ServerMessage::Reply { command: name.to_string(), body },
                                        Err(e) => ServerMessage::Error(e.body()),
                                    }
                                }
                                Ok(ClientMessage::Subscribe(req)) => {
                                    match store.subscribe(&req.nick, &req.game).await {
                                        Ok(rx) => {
                                            if let Some(previous) = forwarder.take() {
                                                previous.abort();
                                            }
                                            forwarder = Some(forward_updates(rx, msg_tx.clone()));
                                            continue;
                                        }
                                        Err(e) => ServerMessage::Error(e.body()),
                                    }
                                }
                                Ok(ClientMessage::Ping) => ServerMessage::Pong,
                                Err(e) => {
                                    debug!("Invalid message from {}: {}", addr, e);
                                    ServerMessage::Error(CommandError::validation(format!("invalid frame: {}", e)).body())
                                }
                            };
                            if msg_tx.send(reply).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            debug!("Client {} disconnected", addr);
                            break;
                        }
                        Some(Err(e)) => {
                            warn!("WebSocket error for {}: {}", addr, e);
                            break;
                        }
                        _ => {}
                    }
                }
                _ = shutdown_rx.recv() => {
                    let _ = msg_tx.send(ServerMessage::Shutdown {
                        reason: "server shutting down".to_string(),
                    }).await;
                    break;
                }
            }
        }

        if let Some(task) = forwarder {
            task.abort();
        }
        drop(msg_tx);
        let _ = sender_task.await;
        debug!("Client {} cleaned up", addr);
    });
}

/// Relay broadcaster payloads onto the socket as `update` frames.
fn forward_updates(
    mut rx: crate::network::broadcast::Subscription,
    tx: mpsc::Sender<ServerMessage>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            let update: StateUpdate = match serde_json::from_str(&payload) {
                Ok(u) => u,
                Err(e) => {
                    error!("Undecodable state update: {}", e);
                    continue;
                }
            };
            if tx.send(ServerMessage::Update { update }).await.is_err() {
                break;
            }
        }
    })
}
