//! The bridge client: calls and the push stream.
//!
//! Two WebSocket connections to the access service, with different
//! lifecycles:
//!
//! - The **call connection** is dialed lazily on the first call and
//!   redialed after any failure. Calls are serialized over it, each
//!   carrying a sequence number the service echoes back, and each
//!   bounded by `call_timeout`.
//! - The **stream connection** is opened by [`BridgeClient::subscribe`]
//!   and owned by a single background task that resubscribes after any
//!   failure, forever, with a fixed delay — until shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use verge_protocol::{
    AccessReply, BridgeRequest, BridgeResponse, Codec, Envelope,
    EventType, JsonCodec, Payload, ProtocolError, ServerEvent,
};

use crate::BridgeError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Connection settings for the bridge client.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// WebSocket endpoint of the access service, e.g. `ws://127.0.0.1:50051`.
    pub endpoint: String,
    /// Deadline for each call (register, check-access, subscribe
    /// handshake). Expiry fails the call; access checks then fail closed.
    pub call_timeout: Duration,
    /// How long to wait before reopening a failed push stream.
    pub resubscribe_delay: Duration,
    /// How long shutdown waits for in-flight calls before forcing the
    /// transport closed.
    pub shutdown_grace: Duration,
    /// How long shutdown waits again after forcing closure.
    pub shutdown_force_grace: Duration,
}

impl BridgeConfig {
    /// Creates a config for the given endpoint with default timings.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            call_timeout: Duration::from_secs(10),
            resubscribe_delay: Duration::from_secs(5),
            shutdown_grace: Duration::from_secs(5),
            shutdown_force_grace: Duration::from_secs(2),
        }
    }
}

// ---------------------------------------------------------------------------
// States
// ---------------------------------------------------------------------------

/// Where the client stands with proxy registration.
///
/// Monotonic: once `Registered`, only shutdown reverts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    Unregistered,
    Registering,
    Registered,
}

const REG_UNREGISTERED: u8 = 0;
const REG_REGISTERING: u8 = 1;
const REG_REGISTERED: u8 = 2;

/// Where the client stands with the push subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// No subscription has been started (or it has fully stopped).
    Idle,
    /// The stream is live and delivering events.
    Subscribed,
    /// The stream broke; the client is waiting to resubscribe.
    Reconnecting,
}

const SUB_IDLE: u8 = 0;
const SUB_SUBSCRIBED: u8 = 1;
const SUB_RECONNECTING: u8 = 2;

// ---------------------------------------------------------------------------
// Query type and trait seam
// ---------------------------------------------------------------------------

/// The parameters of one access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessQuery {
    pub username: String,
    pub ip: String,
    pub server: String,
    pub proxy_id: String,
}

/// The call surface the decision layers program against.
///
/// [`BridgeClient`] is the production implementation; tests implement
/// this with a scripted backend so gating logic can be exercised
/// without a network.
pub trait AccessBridge: Send + Sync + 'static {
    /// Announces this proxy and the servers it fronts.
    ///
    /// `Ok(false)` means the service answered but refused; callers
    /// retry it like a failure.
    fn register(
        &self,
        proxy_id: &str,
        servers: &[String],
    ) -> impl Future<Output = Result<bool, BridgeError>> + Send;

    /// Asks whether a player may reach a server.
    fn check_access(
        &self,
        query: AccessQuery,
    ) -> impl Future<Output = Result<AccessReply, BridgeError>> + Send;
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// RPC client for the backend access service.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct BridgeClient {
    config: BridgeConfig,
    codec: JsonCodec,
    /// The call connection. `None` until the first call dials it, and
    /// again after any failure (the next call redials).
    call_conn: Mutex<Option<WsStream>>,
    seq: AtomicU64,
    in_flight: AtomicUsize,
    registration: AtomicU8,
    subscription: AtomicU8,
    shutdown_tx: watch::Sender<bool>,
}

impl BridgeClient {
    /// Creates a client. No I/O happens until the first call.
    pub fn new(config: BridgeConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            config,
            codec: JsonCodec,
            call_conn: Mutex::new(None),
            seq: AtomicU64::new(1),
            in_flight: AtomicUsize::new(0),
            registration: AtomicU8::new(REG_UNREGISTERED),
            subscription: AtomicU8::new(SUB_IDLE),
            shutdown_tx,
        }
    }

    /// A receiver that flips to `true` when shutdown begins. Backoff
    /// sleeps and the subscription loop select against this.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Whether shutdown has begun.
    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Current registration state.
    pub fn registration_state(&self) -> RegistrationState {
        match self.registration.load(Ordering::SeqCst) {
            REG_REGISTERING => RegistrationState::Registering,
            REG_REGISTERED => RegistrationState::Registered,
            _ => RegistrationState::Unregistered,
        }
    }

    /// Whether registration has succeeded.
    pub fn is_registered(&self) -> bool {
        self.registration_state() == RegistrationState::Registered
    }

    /// Current push-subscription state.
    pub fn subscription_state(&self) -> SubscriptionState {
        match self.subscription.load(Ordering::SeqCst) {
            SUB_SUBSCRIBED => SubscriptionState::Subscribed,
            SUB_RECONNECTING => SubscriptionState::Reconnecting,
            _ => SubscriptionState::Idle,
        }
    }

    /// Registers this proxy with the access service.
    ///
    /// # Errors
    /// Returns [`BridgeError`] on transport failure or a contract
    /// violation; the registrar retries either way.
    pub async fn register(
        &self,
        proxy_id: &str,
        servers: &[String],
    ) -> Result<bool, BridgeError> {
        let _ = self.registration.compare_exchange(
            REG_UNREGISTERED,
            REG_REGISTERING,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );

        let response = self
            .call(BridgeRequest::RegisterProxy {
                proxy_id: proxy_id.to_string(),
                servers: servers.to_vec(),
            })
            .await?;

        match response {
            BridgeResponse::RegisterAck { success } => {
                if success {
                    self.registration
                        .store(REG_REGISTERED, Ordering::SeqCst);
                    tracing::info!(
                        servers = servers.len(),
                        "proxy registered with access service"
                    );
                } else {
                    tracing::warn!(
                        "access service refused proxy registration"
                    );
                }
                Ok(success)
            }
            BridgeResponse::Error { message } => {
                Err(BridgeError::Rejected(message))
            }
            other => Err(BridgeError::Protocol(
                ProtocolError::InvalidMessage(format!(
                    "unexpected reply to RegisterProxy: {other:?}"
                )),
            )),
        }
    }

    /// Asks whether a player may reach a server.
    ///
    /// # Errors
    /// Returns [`BridgeError`] on transport failure or deadline expiry.
    /// Callers on the admission path must fail closed.
    pub async fn check_access(
        &self,
        query: AccessQuery,
    ) -> Result<AccessReply, BridgeError> {
        let response = self
            .call(BridgeRequest::CheckAccess {
                player_name: query.username,
                player_ipv4: query.ip,
                server_name: query.server,
                proxy_id: query.proxy_id,
            })
            .await?;

        match response {
            BridgeResponse::AccessResult {
                status,
                verification_url,
            } => Ok(AccessReply {
                status,
                verification_url,
            }),
            BridgeResponse::Error { message } => {
                Err(BridgeError::Rejected(message))
            }
            other => Err(BridgeError::Protocol(
                ProtocolError::InvalidMessage(format!(
                    "unexpected reply to CheckAccess: {other:?}"
                )),
            )),
        }
    }

    // -- Call plumbing ----------------------------------------------------

    async fn call(
        &self,
        request: BridgeRequest,
    ) -> Result<BridgeResponse, BridgeError> {
        if self.is_shutdown() {
            return Err(BridgeError::Shutdown);
        }

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let result = tokio::time::timeout(
            self.config.call_timeout,
            self.call_inner(request),
        )
        .await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match result {
            Ok(outcome) => outcome,
            Err(_) => {
                // The connection's state is unknown after a deadline
                // expiry; drop it so the next call redials.
                *self.call_conn.lock().await = None;
                Err(BridgeError::Timeout(self.config.call_timeout))
            }
        }
    }

    async fn call_inner(
        &self,
        request: BridgeRequest,
    ) -> Result<BridgeResponse, BridgeError> {
        let mut conn = self.call_conn.lock().await;
        if conn.is_none() {
            *conn = Some(self.dial().await?);
        }
        // Safe: established on the line above if it was missing.
        let stream = conn.as_mut().expect("connection just established");

        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let envelope = Envelope {
            seq,
            payload: Payload::Request(request),
        };
        let frame = self.codec.encode(&envelope)?;

        if let Err(e) = stream.send(Message::Binary(frame.into())).await {
            *conn = None;
            return Err(BridgeError::Call(io_error(
                std::io::ErrorKind::BrokenPipe,
                e,
            )));
        }

        loop {
            let msg = match stream.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    *conn = None;
                    return Err(BridgeError::Call(io_error(
                        std::io::ErrorKind::ConnectionReset,
                        e,
                    )));
                }
                None => {
                    *conn = None;
                    return Err(BridgeError::Closed);
                }
            };

            let data = match msg {
                Message::Binary(data) => data.to_vec(),
                Message::Text(text) => text.as_bytes().to_vec(),
                Message::Close(_) => {
                    *conn = None;
                    return Err(BridgeError::Closed);
                }
                _ => continue, // ping/pong/frame
            };

            let reply: Envelope = self.codec.decode(&data)?;
            match reply.payload {
                Payload::Response(response) if reply.seq == seq => {
                    return Ok(response);
                }
                _ => {
                    tracing::debug!(
                        seq = reply.seq,
                        expected = seq,
                        "discarding frame that answers no outstanding call"
                    );
                }
            }
        }
    }

    async fn dial(&self) -> Result<WsStream, BridgeError> {
        let (stream, _) = connect_async(self.config.endpoint.as_str())
            .await
            .map_err(|e| {
                BridgeError::Connect(io_error(
                    std::io::ErrorKind::ConnectionRefused,
                    e,
                ))
            })?;
        tracing::debug!(
            endpoint = %self.config.endpoint,
            "bridge call connection established"
        );
        Ok(stream)
    }

    // -- Subscription -----------------------------------------------------

    /// Opens the push stream and spawns the task that keeps it alive.
    ///
    /// `on_event` runs for every inbound event. `on_reconnected` runs
    /// after each resubscription that follows a failure — never on
    /// intermediate failures, never on a first-try success.
    ///
    /// # Errors
    /// Returns [`BridgeError::AlreadySubscribed`] if a subscription is
    /// already running (at most one per process), or
    /// [`BridgeError::Shutdown`] after shutdown.
    pub fn subscribe<F, R>(
        self: Arc<Self>,
        proxy_id: impl Into<String>,
        on_event: F,
        on_reconnected: R,
    ) -> Result<tokio::task::JoinHandle<()>, BridgeError>
    where
        F: Fn(ServerEvent) + Send + Sync + 'static,
        R: Fn() + Send + Sync + 'static,
    {
        if self.is_shutdown() {
            return Err(BridgeError::Shutdown);
        }
        if self
            .subscription
            .compare_exchange(
                SUB_IDLE,
                SUB_RECONNECTING,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            return Err(BridgeError::AlreadySubscribed);
        }

        let proxy_id = proxy_id.into();
        Ok(tokio::spawn(async move {
            self.run_subscription(proxy_id, on_event, on_reconnected)
                .await;
        }))
    }

    /// The subscription loop: connect, drain events, and on any failure
    /// wait out the delay and try again. Exits only on shutdown.
    async fn run_subscription<F, R>(
        &self,
        proxy_id: String,
        on_event: F,
        on_reconnected: R,
    ) where
        F: Fn(ServerEvent) + Send + Sync + 'static,
        R: Fn() + Send + Sync + 'static,
    {
        let mut shutdown = self.shutdown_signal();
        // True once any failure has occurred; gates `on_reconnected`.
        let mut recovering = false;

        'outer: loop {
            if *shutdown.borrow() {
                break;
            }

            let opened = tokio::time::timeout(
                self.config.call_timeout,
                self.open_stream(&proxy_id),
            )
            .await;

            match opened {
                Ok(Ok(mut stream)) => {
                    self.subscription
                        .store(SUB_SUBSCRIBED, Ordering::SeqCst);
                    if recovering {
                        recovering = false;
                        tracing::info!("push stream re-established");
                        on_reconnected();
                    } else {
                        tracing::info!("push stream established");
                    }

                    loop {
                        tokio::select! {
                            changed = shutdown.changed() => {
                                if changed.is_err() || *shutdown.borrow() {
                                    break 'outer;
                                }
                            }
                            frame = stream.next() => match frame {
                                Some(Ok(Message::Binary(data))) => {
                                    self.dispatch_event(&data, &on_event);
                                }
                                Some(Ok(Message::Text(text))) => {
                                    self.dispatch_event(
                                        text.as_bytes(),
                                        &on_event,
                                    );
                                }
                                Some(Ok(Message::Close(_))) | None => {
                                    tracing::warn!(
                                        "push stream closed by access service"
                                    );
                                    break;
                                }
                                Some(Ok(_)) => {} // ping/pong/frame
                                Some(Err(e)) => {
                                    tracing::error!(
                                        error = %e,
                                        "push stream error"
                                    );
                                    break;
                                }
                            },
                        }
                    }
                }
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "failed to open push stream");
                }
                Err(_) => {
                    tracing::error!(
                        "push stream handshake timed out"
                    );
                }
            }

            if *shutdown.borrow() {
                break;
            }

            // Anything that lands here was a failure; the next
            // successful open is a reconnection.
            recovering = true;
            self.subscription
                .store(SUB_RECONNECTING, Ordering::SeqCst);
            tracing::info!(
                delay_secs = self.config.resubscribe_delay.as_secs(),
                "resubscribing to push stream after delay"
            );
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(self.config.resubscribe_delay) => {}
            }
        }

        self.subscription.store(SUB_IDLE, Ordering::SeqCst);
        tracing::info!("push subscription stopped");
    }

    /// Connects the stream, sends the subscribe request, and waits for
    /// the ack. Only an acked stream counts as subscribed.
    async fn open_stream(
        &self,
        proxy_id: &str,
    ) -> Result<WsStream, BridgeError> {
        let (mut stream, _) =
            connect_async(self.config.endpoint.as_str())
                .await
                .map_err(|e| {
                    BridgeError::Connect(io_error(
                        std::io::ErrorKind::ConnectionRefused,
                        e,
                    ))
                })?;

        let envelope = Envelope {
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            payload: Payload::Request(BridgeRequest::Subscribe {
                proxy_id: proxy_id.to_string(),
                event_types: vec![EventType::PlayerAccessChanged],
            }),
        };
        let frame = self.codec.encode(&envelope)?;
        stream
            .send(Message::Binary(frame.into()))
            .await
            .map_err(|e| {
                BridgeError::Call(io_error(
                    std::io::ErrorKind::BrokenPipe,
                    e,
                ))
            })?;

        loop {
            let msg = match stream.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    return Err(BridgeError::Call(io_error(
                        std::io::ErrorKind::ConnectionReset,
                        e,
                    )));
                }
                None => return Err(BridgeError::Closed),
            };

            let data = match msg {
                Message::Binary(data) => data.to_vec(),
                Message::Text(text) => text.as_bytes().to_vec(),
                Message::Close(_) => return Err(BridgeError::Closed),
                _ => continue,
            };

            let reply: Envelope = self.codec.decode(&data)?;
            match reply.payload {
                Payload::Response(BridgeResponse::SubscribeAck) => {
                    return Ok(stream);
                }
                Payload::Response(BridgeResponse::Error { message }) => {
                    return Err(BridgeError::Rejected(message));
                }
                _ => {
                    tracing::debug!(
                        "ignoring frame while awaiting subscribe ack"
                    );
                }
            }
        }
    }

    fn dispatch_event<F>(&self, data: &[u8], on_event: &F)
    where
        F: Fn(ServerEvent),
    {
        match self.codec.decode::<Envelope>(data) {
            Ok(Envelope {
                payload: Payload::Event(event),
                ..
            }) => on_event(event),
            Ok(_) => {
                tracing::debug!(
                    "ignoring non-event frame on push stream"
                );
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "undecodable frame on push stream"
                );
            }
        }
    }

    // -- Shutdown ---------------------------------------------------------

    /// Shuts the client down: stops accepting calls, ends the
    /// registration/subscription loops, then closes the transport with
    /// a two-stage grace period. Idempotent.
    pub async fn shutdown(&self) {
        // Only the first caller runs the teardown.
        if self.shutdown_tx.send_replace(true) {
            return;
        }
        self.registration.store(REG_UNREGISTERED, Ordering::SeqCst);
        tracing::info!("shutting down bridge client");

        if self.await_quiesce(self.config.shutdown_grace).await {
            self.close_call_conn().await;
            return;
        }

        tracing::warn!(
            "bridge calls still in flight after grace period, \
             forcing closure"
        );
        self.close_call_conn().await;
        if !self.await_quiesce(self.config.shutdown_force_grace).await {
            tracing::error!(
                in_flight = self.in_flight.load(Ordering::SeqCst),
                "bridge calls still in flight after forced closure"
            );
        }
    }

    /// Waits up to `grace` for in-flight calls to finish.
    async fn await_quiesce(&self, grace: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + grace;
        while self.in_flight.load(Ordering::SeqCst) > 0 {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        true
    }

    async fn close_call_conn(&self) {
        // An in-flight call holds the lock; it will drop the stream
        // itself when its deadline fires.
        if let Ok(mut conn) = self.call_conn.try_lock() {
            if let Some(mut stream) = conn.take() {
                let _ = stream.close(None).await;
            }
        } else {
            tracing::debug!(
                "call connection busy at closure; owner will drop it"
            );
        }
    }
}

impl AccessBridge for BridgeClient {
    async fn register(
        &self,
        proxy_id: &str,
        servers: &[String],
    ) -> Result<bool, BridgeError> {
        BridgeClient::register(self, proxy_id, servers).await
    }

    async fn check_access(
        &self,
        query: AccessQuery,
    ) -> Result<AccessReply, BridgeError> {
        BridgeClient::check_access(self, query).await
    }
}

/// Wraps a tungstenite error as `std::io::Error` for the error enum.
fn io_error(
    kind: std::io::ErrorKind,
    e: tokio_tungstenite::tungstenite::Error,
) -> std::io::Error {
    std::io::Error::new(kind, e)
}
