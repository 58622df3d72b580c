//! End-to-end over a real WebSocket on loopback.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use sockvisor::{Client, ClientConfig, ConnectionState, Envelope, protocol};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

const TIMEOUT: Duration = Duration::from_secs(5);

/// Accepts one socket, answers `ping` with `pong` and echoes every other
/// command type back to the harness.
async fn serve_once(listener: TcpListener, seen: mpsc::UnboundedSender<Value>) {
    let (stream, _) = listener.accept().await.expect("accept");
    let mut ws = tokio_tungstenite::accept_async(stream)
        .await
        .expect("handshake");

    while let Some(Ok(msg)) = ws.next().await {
        let Message::Text(text) = msg else {
            continue;
        };
        let value: Value = serde_json::from_str(text.as_str()).expect("client sent json");
        if value["type"] == "ping" {
            let pong = json!({"type": "pong", "data": {"timestamp": 1}}).to_string();
            if ws.send(Message::text(pong)).await.is_err() {
                break;
            }
        }
        let _ = seen.send(value);
    }
}

#[tokio::test]
async fn loopback_round_trip() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (seen_tx, mut seen) = mpsc::unbounded_channel();
    let server = tokio::spawn(serve_once(listener, seen_tx));

    let cfg = ClientConfig {
        connect_timeout: TIMEOUT,
        close_timeout: Duration::from_secs(1),
        ..ClientConfig::new(format!("http://127.0.0.1:{port}/ws/chat/"))
    };
    let client = Client::builder(cfg).build().unwrap();
    assert_eq!(client.endpoint().url().scheme(), "ws");

    let (pong_tx, mut pongs) = mpsc::unbounded_channel();
    client
        .subscribe(protocol::PONG, move |env: &Envelope| {
            let _ = pong_tx.send(env.payload().clone());
        })
        .unwrap();

    client
        .send_envelope(protocol::chat_message("status of rack 7?").unwrap())
        .unwrap();
    client.start().unwrap();

    let first = timeout(TIMEOUT, seen.recv()).await.unwrap().unwrap();
    assert_eq!(
        first,
        json!({"type": "chat_message", "data": {"text": "status of rack 7?"}})
    );

    client.send_envelope(protocol::ping()).unwrap();
    let pong = timeout(TIMEOUT, pongs.recv()).await.unwrap().unwrap();
    assert_eq!(pong, json!({"timestamp": 1}));
    assert_eq!(client.state(), ConnectionState::Open);

    client.stop().unwrap();
    let mut state = client.state_watch();
    timeout(TIMEOUT, state.wait_for(|s| *s == ConnectionState::Idle))
        .await
        .unwrap()
        .unwrap();

    // The close handshake ends the server loop.
    timeout(TIMEOUT, server).await.unwrap().unwrap();
}

#[tokio::test]
async fn refused_endpoint_reports_a_connect_failure() {
    // Bind then drop to get a port nobody listens on.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let cfg = ClientConfig {
        max_attempts: sockvisor::AttemptLimit::Max(1),
        connect_timeout: TIMEOUT,
        ..ClientConfig::new(format!("ws://127.0.0.1:{port}/ws/chat/"))
    };
    let client = Client::builder(cfg).build().unwrap();
    let mut events = client.events();
    client.start().unwrap();

    let failed = timeout(TIMEOUT, async {
        loop {
            let ev = events.recv().await.unwrap();
            if ev.kind == sockvisor::EventKind::AttemptFailed {
                return ev;
            }
        }
    })
    .await
    .unwrap();
    assert!(matches!(
        failed.fault,
        Some(sockvisor::Fault::Transport(sockvisor::TransportError::Connect { .. }))
    ));

    let mut state = client.state_watch();
    timeout(TIMEOUT, state.wait_for(|s| *s == ConnectionState::ClosedTerminal))
        .await
        .unwrap()
        .unwrap();
}
