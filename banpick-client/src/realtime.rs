// Realtime session client: one logical connection per room, with automatic
// reconnection and a best-effort reconnect-then-send guarantee.
//
// The connection lifecycle is a three-state machine
// (disconnected -> connecting -> connected -> disconnected) owned by a single
// event loop. Reconnect scheduling after an abnormal close lives inside the
// client as a deadline, so a deliberate teardown cannot leave a stray timer
// that resurrects the connection.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use thiserror::Error;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, info, warn};

use crate::protocol::{self, ClientAction, ServerFrame, StatusUpdate};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_RECONNECT_BASE_DELAY: Duration = Duration::from_secs(3);
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;
pub const DEFAULT_WATCHDOG_INTERVAL: Duration = Duration::from_secs(3);

/// Close code seen when the peer vanished without a close frame.
const CODE_ABNORMAL: u16 = 1006;
/// Close code recorded when a close frame carried no status code.
const CODE_NO_STATUS: u16 = 1005;

pub type WsSink = Pin<Box<dyn Sink<Message, Error = WsError> + Send>>;
pub type WsSource = Pin<Box<dyn Stream<Item = Result<Message, WsError>> + Send>>;

/// Transport seam: dials a WebSocket endpoint and hands back the split
/// halves. Injected so the session state machine is testable without
/// sockets.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<(WsSink, WsSource), WsError>;
}

/// Production connector backed by tokio-tungstenite.
pub struct TungsteniteConnector;

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &str) -> Result<(WsSink, WsSource), WsError> {
        let (stream, _response) = tokio_tungstenite::connect_async(url).await?;
        let (sink, source) = stream.split();
        Ok((Box::pin(sink), Box::pin(source)))
    }
}

/// Observable connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Reconnect policy: linear backoff, capped attempt budget, and the
/// close-code filter deciding whether a reconnect is warranted at all.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            base_delay: DEFAULT_RECONNECT_BASE_DELAY,
            max_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    /// Normal and going-away closes are deliberate; they never trigger a
    /// reconnect.
    pub fn is_normal_close(code: u16) -> bool {
        matches!(code, 1000 | 1001)
    }

    /// The delay before the next reconnect attempt, or `None` when no
    /// reconnect should happen (normal closure or exhausted budget).
    /// `attempts` counts failed attempts since the last successful
    /// connection.
    pub fn next_delay(&self, close_code: u16, attempts: u32) -> Option<Duration> {
        if Self::is_normal_close(close_code) {
            return None;
        }
        if attempts >= self.max_attempts {
            return None;
        }
        Some(self.base_delay * (attempts + 1))
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("connection attempt timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("websocket transport error: {0}")]
    Transport(#[from] WsError),

    #[error("gave up after {0} failed reconnect attempts")]
    RetriesExhausted(u32),
}

/// Events surfaced to the owning event loop.
#[derive(Debug)]
pub enum SessionEvent {
    /// A `status_update` frame arrived.
    StatusUpdate(StatusUpdate),
    /// The server closed the connection cleanly; no reconnect is scheduled.
    Closed,
    /// A reconnect backoff elapsed; the owner should call
    /// [`SessionClient::reconnect_now`].
    RetryDue,
}

/// Connection parameters for one room-scoped session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ws_base_url: String,
    pub game_code: String,
    /// Actor identity carried in the endpoint query; spectators connect
    /// with the spectator flag instead of a seat.
    pub user_id: Option<String>,
    pub spectator: bool,
    pub connect_timeout: Duration,
    pub retry: RetryPolicy,
}

impl SessionConfig {
    pub fn new(ws_base_url: impl Into<String>, game_code: impl Into<String>) -> Self {
        SessionConfig {
            ws_base_url: ws_base_url.into(),
            game_code: game_code.into(),
            user_id: None,
            spectator: false,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    /// The room-scoped realtime endpoint.
    pub fn endpoint(&self) -> String {
        let base = self.ws_base_url.trim_end_matches('/');
        let mut url = format!("{base}/game/{}/ws", self.game_code);
        if let Some(id) = &self.user_id {
            url.push_str(&format!("?userId={id}&spectator={}", self.spectator));
        }
        url
    }
}

/// The reconnecting realtime client. Owned by a single event loop; all state
/// transitions happen on that loop.
pub struct SessionClient {
    config: SessionConfig,
    connector: Arc<dyn Connector>,
    state: ConnectionState,
    /// Failed (re)connect attempts since the last successful connection.
    attempts: u32,
    /// Deadline of the scheduled reconnect, if one is pending.
    retry_at: Option<Instant>,
    /// Set by deliberate teardown or a clean server close; suppresses the
    /// watchdog until the owner explicitly reconnects.
    closed: bool,
    sink: Option<WsSink>,
    source: Option<WsSource>,
}

impl SessionClient {
    pub fn new(config: SessionConfig, connector: Arc<dyn Connector>) -> Self {
        SessionClient {
            config,
            connector,
            state: ConnectionState::Disconnected,
            attempts: 0,
            retry_at: None,
            closed: false,
            sink: None,
            source: None,
        }
    }

    /// Production constructor using the tokio-tungstenite transport.
    pub fn with_tungstenite(config: SessionConfig) -> Self {
        Self::new(config, Arc::new(TungsteniteConnector))
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn retry_scheduled(&self) -> bool {
        self.retry_at.is_some()
    }

    /// Open the connection. No-op when an attempt is already in flight or a
    /// connection is open. An attempt that does not reach the open state
    /// within the configured timeout is a failure: the half-open dial is
    /// dropped and the client is free to retry.
    pub async fn connect(&mut self) -> Result<(), SessionError> {
        if self.state != ConnectionState::Disconnected {
            return Ok(());
        }
        self.state = ConnectionState::Connecting;
        self.closed = false;
        let url = self.config.endpoint();
        info!(%url, "opening realtime connection");

        let dial = self.connector.connect(&url);
        match tokio::time::timeout(self.config.connect_timeout, dial).await {
            Ok(Ok((sink, source))) => {
                self.sink = Some(sink);
                self.source = Some(source);
                self.state = ConnectionState::Connected;
                self.attempts = 0;
                self.retry_at = None;
                info!("realtime connection established");
                Ok(())
            }
            Ok(Err(e)) => {
                self.state = ConnectionState::Disconnected;
                warn!(error = %e, "realtime connection failed");
                Err(SessionError::Transport(e))
            }
            Err(_) => {
                self.state = ConnectionState::Disconnected;
                warn!(
                    timeout = ?self.config.connect_timeout,
                    "connection attempt timed out"
                );
                Err(SessionError::ConnectTimeout(self.config.connect_timeout))
            }
        }
    }

    /// Serialize and transmit `action`. When the connection is not open,
    /// attempt exactly one (re-)connection and await its outcome before
    /// either transmitting or giving up. Returns whether the frame was
    /// handed to the transport.
    pub async fn send(&mut self, action: &ClientAction) -> bool {
        if self.state != ConnectionState::Connected && self.connect().await.is_err() {
            warn!("dropping outbound frame: reconnect attempt failed");
            return false;
        }

        let json = match serde_json::to_string(action) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialize outbound frame");
                return false;
            }
        };
        let Some(sink) = self.sink.as_mut() else {
            return false;
        };
        match sink.send(Message::Text(json.into())).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "outbound send failed");
                self.drop_connection();
                false
            }
        }
    }

    /// Wait for the next session event.
    ///
    /// Dispatches `status_update` frames, drops everything else, and turns
    /// abnormal closure into a scheduled [`SessionEvent::RetryDue`] per the
    /// retry policy. Cancellation-safe: no state is mutated across an await
    /// point that a caller's `select!` might drop.
    pub async fn recv(&mut self) -> Result<SessionEvent, SessionError> {
        loop {
            if let Some(deadline) = self.retry_at {
                tokio::time::sleep_until(deadline).await;
                self.retry_at = None;
                return Ok(SessionEvent::RetryDue);
            }

            let item = match self.source.as_mut() {
                Some(source) => source.next().await,
                None => {
                    // Nothing connected, nothing scheduled: stay quiet until
                    // the owner (or its watchdog) reconnects.
                    std::future::pending().await
                }
            };

            match item {
                Some(Ok(Message::Text(text))) => {
                    if let Some(update) = parse_status_update(text.as_str()) {
                        return Ok(SessionEvent::StatusUpdate(update));
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    let code = frame
                        .map(|f| u16::from(f.code))
                        .unwrap_or(CODE_NO_STATUS);
                    info!(code, "server closed the connection");
                    if let Some(event) = self.handle_close(code)? {
                        return Ok(event);
                    }
                }
                Some(Ok(_)) => {
                    // Binary, Ping, Pong, Frame: ignore.
                }
                Some(Err(e)) => {
                    warn!(error = %e, "realtime transport error");
                    if let Some(event) = self.handle_close(CODE_ABNORMAL)? {
                        return Ok(event);
                    }
                }
                None => {
                    // Stream ended without a close frame: abnormal closure.
                    if let Some(event) = self.handle_close(CODE_ABNORMAL)? {
                        return Ok(event);
                    }
                }
            }
        }
    }

    /// Perform the reconnect attempt whose backoff just elapsed. On failure,
    /// schedules the next attempt or reports the budget exhausted.
    pub async fn reconnect_now(&mut self) -> Result<(), SessionError> {
        match self.connect().await {
            Ok(()) => Ok(()),
            Err(_) => self.record_failed_attempt(),
        }
    }

    /// Watchdog hook: proactively reconnect when the session is down with no
    /// attempt in flight, no retry scheduled, and budget remaining. Guards
    /// against a dropped retry timer silently leaving the session dead.
    pub async fn maintain(&mut self) -> Result<(), SessionError> {
        if self.closed
            || self.state != ConnectionState::Disconnected
            || self.retry_at.is_some()
            || self.attempts >= self.config.retry.max_attempts
        {
            return Ok(());
        }
        debug!("watchdog reconnecting idle session");
        self.reconnect_now().await
    }

    /// Deliberate teardown (the owning view unmounting): detach the read
    /// side, transmit a normal close, cancel any scheduled retry, and
    /// suppress all future reconnection. Distinct from failure-triggered
    /// teardown, which drives the retry policy instead.
    pub async fn shutdown(&mut self) {
        self.retry_at = None;
        self.closed = true;
        self.state = ConnectionState::Disconnected;
        self.source = None;
        if let Some(mut sink) = self.sink.take() {
            let frame = CloseFrame {
                code: CloseCode::Normal,
                reason: "client shutdown".into(),
            };
            if let Err(e) = sink.send(Message::Close(Some(frame))).await {
                debug!(error = %e, "close frame not delivered");
            }
        }
        info!("realtime session shut down");
    }

    fn handle_close(&mut self, code: u16) -> Result<Option<SessionEvent>, SessionError> {
        self.drop_connection();
        if RetryPolicy::is_normal_close(code) {
            self.closed = true;
            return Ok(Some(SessionEvent::Closed));
        }
        match self.config.retry.next_delay(code, self.attempts) {
            Some(delay) => {
                info!(
                    code,
                    attempt = self.attempts + 1,
                    max = self.config.retry.max_attempts,
                    ?delay,
                    "scheduling reconnect"
                );
                self.retry_at = Some(Instant::now() + delay);
                Ok(None)
            }
            None => Err(SessionError::RetriesExhausted(self.attempts)),
        }
    }

    fn record_failed_attempt(&mut self) -> Result<(), SessionError> {
        self.attempts += 1;
        match self
            .config
            .retry
            .next_delay(CODE_ABNORMAL, self.attempts)
        {
            Some(delay) => {
                info!(
                    attempt = self.attempts,
                    max = self.config.retry.max_attempts,
                    ?delay,
                    "reconnect failed; scheduling next attempt"
                );
                self.retry_at = Some(Instant::now() + delay);
                Ok(())
            }
            None => Err(SessionError::RetriesExhausted(self.attempts)),
        }
    }

    fn drop_connection(&mut self) {
        self.sink = None;
        self.source = None;
        self.state = ConnectionState::Disconnected;
    }
}

/// Decode one inbound text frame. Only well-formed `status_update` frames
/// yield a payload; everything else is logged and dropped.
fn parse_status_update(raw: &str) -> Option<StatusUpdate> {
    let frame: ServerFrame = match serde_json::from_str(raw) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(error = %e, "dropping malformed frame");
            return None;
        }
    };
    if frame.kind != protocol::STATUS_UPDATE {
        debug!(kind = %frame.kind, "ignoring unhandled frame type");
        return None;
    }
    match serde_json::from_value(frame.data) {
        Ok(update) => Some(update),
        Err(e) => {
            warn!(error = %e, "dropping status_update with malformed payload");
            None
        }
    }
}
