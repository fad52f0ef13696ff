//! Integration tests for the bridge client.
//!
//! These spin up a real in-process WebSocket "access service" and drive
//! the client against it over loopback, so the whole stack — dialing,
//! framing, correlation, timeouts, the subscription loop — is exercised
//! together rather than in isolation.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use verge_bridge::{BridgeClient, BridgeConfig, BridgeError};
use verge_protocol::{
    AccessStatus, BridgeRequest, BridgeResponse, Envelope, EventPayload,
    Payload, ServerEvent,
};

// =========================================================================
// Helpers: a scriptable in-process access service
// =========================================================================

type Responder =
    Arc<dyn Fn(BridgeRequest) -> BridgeResponse + Send + Sync>;

/// Binds the mock service on a random loopback port.
async fn bind_backend() -> (SocketAddr, TcpListener) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind");
    let addr = listener.local_addr().expect("should have local addr");
    (addr, listener)
}

fn endpoint(addr: SocketAddr) -> String {
    format!("ws://{addr}")
}

/// Serves request/response traffic on one connection: every request is
/// answered by `responder`, echoing the request's sequence number.
async fn serve_calls(stream: TcpStream, responder: Responder) {
    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };
    while let Some(Ok(msg)) = ws.next().await {
        let data = match msg {
            Message::Binary(data) => data.to_vec(),
            Message::Text(text) => text.as_bytes().to_vec(),
            _ => continue,
        };
        let envelope: Envelope =
            serde_json::from_slice(&data).expect("client sends valid JSON");
        let Payload::Request(request) = envelope.payload else {
            continue;
        };
        let reply = Envelope {
            seq: envelope.seq,
            payload: Payload::Response(responder(request)),
        };
        let bytes = serde_json::to_vec(&reply).expect("encodable reply");
        if ws.send(Message::Binary(bytes.into())).await.is_err() {
            return;
        }
    }
}

/// Accept loop: every connection is served by `serve_calls`.
fn spawn_call_backend(listener: TcpListener, responder: Responder) {
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(serve_calls(stream, Arc::clone(&responder)));
        }
    });
}

/// Serves one subscription: ack the subscribe request, push a single
/// player-update event, then drop the connection (simulating a stream
/// outage).
async fn serve_stream_once(stream: TcpStream, player: &str) {
    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };
    let Some(Ok(msg)) = ws.next().await else { return };
    let data = match msg {
        Message::Binary(data) => data.to_vec(),
        Message::Text(text) => text.as_bytes().to_vec(),
        _ => return,
    };
    let envelope: Envelope =
        serde_json::from_slice(&data).expect("client sends valid JSON");
    assert!(
        matches!(
            envelope.payload,
            Payload::Request(BridgeRequest::Subscribe { .. })
        ),
        "first frame on the stream connection must be Subscribe"
    );

    let ack = Envelope {
        seq: envelope.seq,
        payload: Payload::Response(BridgeResponse::SubscribeAck),
    };
    let bytes = serde_json::to_vec(&ack).expect("encodable ack");
    if ws.send(Message::Binary(bytes.into())).await.is_err() {
        return;
    }

    let event = Envelope {
        seq: 0,
        payload: Payload::Event(ServerEvent {
            payload: EventPayload::PlayerUpdate {
                player_name: player.to_string(),
                player_ipv4: "1.2.3.4".to_string(),
            },
        }),
    };
    let bytes = serde_json::to_vec(&event).expect("encodable event");
    let _ = ws.send(Message::Binary(bytes.into())).await;
    let _ = ws.close(None).await;
}

/// A config with test-friendly timings.
fn fast_config(addr: SocketAddr) -> BridgeConfig {
    let mut config = BridgeConfig::new(endpoint(addr));
    config.call_timeout = Duration::from_secs(2);
    config.resubscribe_delay = Duration::from_millis(50);
    config.shutdown_grace = Duration::from_millis(200);
    config.shutdown_force_grace = Duration::from_millis(100);
    config
}

// =========================================================================
// Calls
// =========================================================================

#[tokio::test]
async fn test_register_round_trip_reports_success() {
    let (addr, listener) = bind_backend().await;
    spawn_call_backend(
        listener,
        Arc::new(|request| match request {
            BridgeRequest::RegisterProxy { proxy_id, servers } => {
                assert_eq!(proxy_id, "p-1");
                assert_eq!(servers, vec!["survival", "creative"]);
                BridgeResponse::RegisterAck { success: true }
            }
            other => panic!("unexpected request: {other:?}"),
        }),
    );

    let client = BridgeClient::new(fast_config(addr));
    let success = client
        .register("p-1", &["survival".into(), "creative".into()])
        .await
        .expect("register should succeed");

    assert!(success);
    assert!(client.is_registered());
}

#[tokio::test]
async fn test_register_refusal_is_ok_false_not_error() {
    let (addr, listener) = bind_backend().await;
    spawn_call_backend(
        listener,
        Arc::new(|_| BridgeResponse::RegisterAck { success: false }),
    );

    let client = BridgeClient::new(fast_config(addr));
    let success = client.register("p-1", &[]).await.expect("call succeeds");

    assert!(!success);
    assert!(!client.is_registered());
}

#[tokio::test]
async fn test_check_access_round_trip_carries_url() {
    let (addr, listener) = bind_backend().await;
    spawn_call_backend(
        listener,
        Arc::new(|request| match request {
            BridgeRequest::CheckAccess {
                player_name,
                server_name,
                ..
            } => {
                assert_eq!(player_name, "alice");
                assert_eq!(server_name, "survival");
                BridgeResponse::AccessResult {
                    status: AccessStatus::RequiresVerification,
                    verification_url: Some("https://auth/x".into()),
                }
            }
            other => panic!("unexpected request: {other:?}"),
        }),
    );

    let client = BridgeClient::new(fast_config(addr));
    let reply = client
        .check_access(verge_bridge::AccessQuery {
            username: "alice".into(),
            ip: "1.2.3.4".into(),
            server: "survival".into(),
            proxy_id: "p-1".into(),
        })
        .await
        .expect("check should succeed");

    assert_eq!(reply.status, AccessStatus::RequiresVerification);
    assert_eq!(reply.verification_url.as_deref(), Some("https://auth/x"));
}

#[tokio::test]
async fn test_call_against_dead_endpoint_fails() {
    // Bind then immediately drop the listener: the port is closed.
    let (addr, listener) = bind_backend().await;
    drop(listener);

    let client = BridgeClient::new(fast_config(addr));
    let result = client.register("p-1", &[]).await;

    assert!(result.is_err(), "call against a dead endpoint must fail");
    assert!(!client.is_registered());
}

#[tokio::test]
async fn test_call_deadline_expiry_is_timeout_error() {
    // The service accepts the connection but never answers.
    let (addr, listener) = bind_backend().await;
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let Ok(mut ws) =
                    tokio_tungstenite::accept_async(stream).await
                else {
                    return;
                };
                while let Some(Ok(_)) = ws.next().await {}
            });
        }
    });

    let mut config = fast_config(addr);
    config.call_timeout = Duration::from_millis(100);
    let client = BridgeClient::new(config);

    let result = client.register("p-1", &[]).await;
    assert!(matches!(result, Err(BridgeError::Timeout(_))));
}

// =========================================================================
// Subscription
// =========================================================================

#[tokio::test]
async fn test_subscribe_streams_events_and_reconnects() {
    let (addr, listener) = bind_backend().await;
    let connections = Arc::new(AtomicUsize::new(0));
    let connections_server = Arc::clone(&connections);
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            connections_server.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                serve_stream_once(stream, "alice").await;
            });
        }
    });

    let client = Arc::new(BridgeClient::new(fast_config(addr)));
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let reconnects = Arc::new(AtomicUsize::new(0));
    let reconnects_cb = Arc::clone(&reconnects);

    let task = Arc::clone(&client)
        .subscribe(
            "p-1",
            move |event| {
                let _ = event_tx.send(event);
            },
            move || {
                reconnects_cb.fetch_add(1, Ordering::SeqCst);
            },
        )
        .expect("first subscribe should be accepted");

    // First event arrives on the first stream — no reconnection yet.
    let first = tokio::time::timeout(Duration::from_secs(5), event_rx.recv())
        .await
        .expect("first event should arrive")
        .expect("channel open");
    assert_eq!(
        first.payload,
        EventPayload::PlayerUpdate {
            player_name: "alice".into(),
            player_ipv4: "1.2.3.4".into(),
        }
    );
    assert_eq!(
        reconnects.load(Ordering::SeqCst),
        0,
        "a first-try success is not a reconnection"
    );

    // The server dropped the stream after the event; the client must
    // resubscribe on its own and fire the reconnect hook exactly once
    // per recovery.
    let _second = tokio::time::timeout(
        Duration::from_secs(5),
        event_rx.recv(),
    )
    .await
    .expect("event after resubscription should arrive")
    .expect("channel open");

    assert!(reconnects.load(Ordering::SeqCst) >= 1);
    assert!(connections.load(Ordering::SeqCst) >= 2);

    client.shutdown().await;
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("subscription task should stop on shutdown")
        .expect("task should not panic");
}

#[tokio::test]
async fn test_subscribe_twice_is_rejected() {
    let (addr, listener) = bind_backend().await;
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                serve_stream_once(stream, "alice").await;
            });
        }
    });

    let client = Arc::new(BridgeClient::new(fast_config(addr)));
    let _task = Arc::clone(&client)
        .subscribe("p-1", |_| {}, || {})
        .expect("first subscribe accepted");

    let second = Arc::clone(&client).subscribe("p-1", |_| {}, || {});
    assert!(matches!(second, Err(BridgeError::AlreadySubscribed)));

    client.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_ends_subscription_loop_during_backoff() {
    // No backend at all: the loop lives in its connect-fail/delay
    // cycle. Shutdown must still end it promptly.
    let (addr, listener) = bind_backend().await;
    drop(listener);

    let client = Arc::new(BridgeClient::new(fast_config(addr)));
    let task = Arc::clone(&client)
        .subscribe("p-1", |_| {}, || {})
        .expect("subscribe accepted");

    client.shutdown().await;
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("subscription task should stop on shutdown")
        .expect("task should not panic");
}
