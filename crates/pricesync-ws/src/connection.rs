//! WebSocket connection manager.
//!
//! Handles the connection lifecycle, automatic reconnection with exponential
//! backoff up to a retry ceiling, and re-sending the tracked subscription
//! set after every successful (re)connection.

use crate::backoff::{ReconnectBackoff, DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_ATTEMPTS};
use crate::error::{WsError, WsResult};
use crate::message::{ClientMessage, WsMessage};
use crate::subscription::SubscriptionTracker;
use crate::ws_write_handle::WsWriteHandle;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use pricesync_core::Symbol;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex as TokioMutex, Notify};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{
    connect_async_tls_with_config, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Intentional close; never triggers a reconnect.
pub const NORMAL_CLOSE_CODE: u16 = 1000;
/// Close frame without a status code.
pub const NO_STATUS_CLOSE_CODE: u16 = 1005;
/// Connection lost without a close frame.
pub const ABNORMAL_CLOSE_CODE: u16 = 1006;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Feed URL (see [`crate::endpoint::stream_url`]).
    pub url: String,
    /// Reconnect ceiling.
    pub max_reconnect_attempts: u32,
    /// Base delay for exponential backoff.
    pub reconnect_base_delay_ms: u64,
    /// Symbols to subscribe to on every open.
    pub symbols: Vec<Symbol>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_reconnect_attempts: DEFAULT_MAX_ATTEMPTS,
            reconnect_base_delay_ms: DEFAULT_BASE_DELAY_MS,
            symbols: Vec::new(),
        }
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Lifecycle and data events published by the connection manager.
#[derive(Debug, Clone, PartialEq)]
pub enum WsEvent {
    /// Connection established; counter reset, subscriptions re-sent.
    Opened,
    /// Well-formed inbound frame.
    Message(WsMessage),
    /// Connection closed with the given code.
    Closed { code: u16, reason: String },
    /// Transport-level failure (recoverable).
    Error(String),
    /// Reconnect scheduled after `delay`.
    ReconnectScheduled { attempt: u32, delay: Duration },
    /// Retry ceiling reached; no further attempts.
    Exhausted { attempts: u32 },
}

/// WebSocket connection manager.
///
/// Owns at most one live connection and at most one pending reconnect.
pub struct ConnectionManager {
    config: ConnectionConfig,
    state: Arc<RwLock<ConnectionState>>,
    subscriptions: Arc<SubscriptionTracker>,
    backoff: Mutex<ReconnectBackoff>,
    event_tx: mpsc::Sender<WsEvent>,
    /// Outbound control frame sender (for WsWriteHandle).
    outbound_tx: mpsc::Sender<ClientMessage>,
    /// Outbound control frame receiver (consumed by message loop).
    outbound_rx: TokioMutex<mpsc::Receiver<ClientMessage>>,
    /// Set while a connect loop is running.
    running: AtomicBool,
    /// Cuts a pending backoff sleep short.
    reconnect_now: Notify,
    /// Cancellation token for graceful shutdown.
    shutdown_token: CancellationToken,
}

impl ConnectionManager {
    /// Create a new connection manager.
    pub fn new(config: ConnectionConfig, event_tx: mpsc::Sender<WsEvent>) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::channel(100);
        let subscriptions = Arc::new(SubscriptionTracker::with_symbols(
            config.symbols.iter().cloned(),
        ));
        let backoff =
            ReconnectBackoff::new(config.max_reconnect_attempts, config.reconnect_base_delay_ms);

        Self {
            config,
            state: Arc::new(RwLock::new(ConnectionState::Idle)),
            subscriptions,
            backoff: Mutex::new(backoff),
            event_tx,
            outbound_tx,
            outbound_rx: TokioMutex::new(outbound_rx),
            running: AtomicBool::new(false),
            reconnect_now: Notify::new(),
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Get a write handle for subscription control.
    pub fn write_handle(&self) -> WsWriteHandle {
        WsWriteHandle::new(
            self.outbound_tx.clone(),
            self.state.clone(),
            self.subscriptions.clone(),
        )
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Get current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Shared subscription tracker.
    pub fn subscriptions(&self) -> Arc<SubscriptionTracker> {
        self.subscriptions.clone()
    }

    /// Reconnects scheduled since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.backoff.lock().attempt()
    }

    /// Signal graceful shutdown.
    ///
    /// The message loop sends `unsubscribe` for all tracked symbols and a
    /// normal close frame; a pending backoff sleep is abandoned.
    pub fn shutdown(&self) {
        info!("ConnectionManager shutdown requested");
        self.shutdown_token.cancel();
    }

    /// Check if shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Connect and run the message loop until shutdown, normal close or
    /// retry exhaustion.
    ///
    /// No-op while another connect loop is already running on this manager.
    /// If that loop is waiting out a backoff delay, the delay is cut short.
    pub async fn connect(&self) -> WsResult<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            if self.state() == ConnectionState::Closed {
                info!("Clearing pending reconnect delay");
                self.reconnect_now.notify_one();
            } else {
                debug!(state = %self.state(), "Connect loop already running, ignoring");
            }
            return Ok(());
        }

        let result = self.connect_with_retry().await;
        self.running.store(false, Ordering::SeqCst);
        result
    }

    async fn connect_with_retry(&self) -> WsResult<()> {
        // Only a new manager resets a counter that hit the ceiling
        let exhausted = {
            let backoff = self.backoff.lock();
            backoff.is_exhausted().then(|| backoff.attempt())
        };
        if let Some(attempts) = exhausted {
            return Err(self.give_up(attempts).await);
        }

        loop {
            if self.is_shutdown() {
                info!("Shutdown requested, exiting connect loop");
                self.set_state(ConnectionState::Closed);
                return Ok(());
            }

            self.set_state(ConnectionState::Connecting);

            let (code, reason) = match self.try_connect().await {
                Ok(close) => close,
                Err(e) => {
                    error!(?e, "WebSocket connection error");
                    self.emit(WsEvent::Error(e.to_string())).await;
                    (ABNORMAL_CLOSE_CODE, e.to_string())
                }
            };

            self.set_state(ConnectionState::Closed);

            if self.is_shutdown() {
                info!("Shutdown requested after disconnect, not reconnecting");
                return Ok(());
            }

            self.emit(WsEvent::Closed {
                code,
                reason: reason.clone(),
            })
            .await;

            if code == NORMAL_CLOSE_CODE {
                info!(%reason, "WebSocket closed normally, not reconnecting");
                return Ok(());
            }

            let scheduled = {
                let mut backoff = self.backoff.lock();
                backoff.next_delay().map(|delay| (backoff.attempt(), delay))
            };
            let Some((attempt, delay)) = scheduled else {
                let attempts = self.reconnect_attempts();
                return Err(self.give_up(attempts).await);
            };

            warn!(code, attempt, delay_ms = delay.as_millis() as u64, "Reconnecting");
            self.emit(WsEvent::ReconnectScheduled { attempt, delay }).await;

            // Wait for delay OR an explicit connect() OR shutdown
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.reconnect_now.notified() => {}
                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown requested during backoff, exiting");
                    return Ok(());
                }
            }
        }
    }

    async fn try_connect(&self) -> WsResult<(u16, String)> {
        info!(url = %self.config.url, "Connecting to price feed");

        let (ws_stream, _response) = tokio::select! {
            connected = connect_async_tls_with_config(&self.config.url, None, true, None) => connected?,
            () = self.shutdown_token.cancelled() => {
                return Ok((NORMAL_CLOSE_CODE, "shutdown during connect".to_string()));
            }
        };
        let (mut write, mut read) = ws_stream.split();

        self.set_state(ConnectionState::Open);
        self.backoff.lock().reset();
        info!("Price feed connected");

        // Frames queued before this connection opened are stale
        {
            let mut outbound_rx = self.outbound_rx.lock().await;
            while outbound_rx.try_recv().is_ok() {}
        }

        self.emit(WsEvent::Opened).await;

        let symbols = self.subscriptions.symbols();
        if !symbols.is_empty() {
            let count = symbols.len();
            let text = ClientMessage::subscribe(symbols).to_text()?;
            write.send(Message::Text(text)).await?;
            info!(count, "Subscribed to tracked symbols");
        }

        loop {
            let outbound_recv = async { self.outbound_rx.lock().await.recv().await };

            tokio::select! {
                biased;

                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received in message loop");
                    self.close_gracefully(&mut write).await;
                    return Ok((NORMAL_CLOSE_CODE, "client disconnect".to_string()));
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_text_message(&text).await;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            debug!("Received ping, sending pong");
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (u16::from(f.code), f.reason.to_string()))
                                .unwrap_or((NO_STATUS_CLOSE_CODE, String::new()));
                            warn!(code, %reason, "WebSocket closed by server");
                            return Ok((code, reason));
                        }
                        Some(Err(e)) => {
                            error!(?e, "WebSocket read error");
                            return Err(e.into());
                        }
                        None => {
                            warn!("WebSocket stream ended");
                            return Ok((ABNORMAL_CLOSE_CODE, "stream ended".to_string()));
                        }
                        _ => {}
                    }
                }

                outbound = outbound_recv => {
                    if let Some(msg) = outbound {
                        let text = msg.to_text()?;
                        write.send(Message::Text(text)).await?;
                        debug!(?msg, "Control frame sent");
                    }
                }
            }
        }
    }

    /// Malformed frames are logged and dropped; the connection stays up.
    async fn handle_text_message(&self, text: &str) {
        match WsMessage::from_text(text) {
            Ok(msg) => self.emit(WsEvent::Message(msg)).await,
            Err(e) => warn!(error = %e, len = text.len(), "Dropping malformed frame"),
        }
    }

    async fn close_gracefully(&self, write: &mut WsSink) {
        let symbols = self.subscriptions.symbols();
        if !symbols.is_empty() {
            match ClientMessage::unsubscribe(symbols).to_text() {
                Ok(text) => {
                    if let Err(e) = write.send(Message::Text(text)).await {
                        warn!(?e, "Failed to send unsubscribe during shutdown");
                    }
                }
                Err(e) => warn!(?e, "Failed to encode unsubscribe frame"),
            }
        }

        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "client disconnect".into(),
        };
        if let Err(e) = write.send(Message::Close(Some(frame))).await {
            warn!(?e, "Failed to send Close frame during shutdown");
        }
    }

    async fn give_up(&self, attempts: u32) -> WsError {
        error!(attempts, "Max reconnection attempts reached");
        self.set_state(ConnectionState::Closed);
        self.emit(WsEvent::Exhausted { attempts }).await;
        WsError::RetriesExhausted { attempts }
    }

    fn set_state(&self, state: ConnectionState) {
        let mut current = self.state.write();
        if *current != state {
            debug!(from = %*current, to = %state, "Connection state change");
            *current = state;
        }
    }

    async fn emit(&self, event: WsEvent) {
        if self.event_tx.send(event).await.is_err() {
            debug!("Event receiver dropped");
        }
    }
}
