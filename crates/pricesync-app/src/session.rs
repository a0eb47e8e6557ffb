//! Price synchronization session.
//!
//! A `PriceSync` owns one price store, one alert evaluator and, while
//! running, one connection manager plus the event loop that routes its
//! events. Stream samples and fallback samples take the same path into the
//! store and the evaluator.
//!
//! Fallback polling runs whenever the connection is not open: one poll as
//! soon as fallback mode begins, then one per interval. It stops the moment
//! the connection opens, and a poll that completes after that is discarded.

use crate::config::AppConfig;
use crate::error::AppResult;
use parking_lot::{Mutex, RwLock};
use pricesync_alerts::{AlertEvaluator, Notifier};
use pricesync_core::{Alert, AlertCondition, PriceSample, Symbol};
use pricesync_fallback::{FallbackPoller, PollOutcome, QuoteSource, DEFAULT_POLL_INTERVAL};
use pricesync_feed::{MessageParser, PriceStore};
use pricesync_telemetry::Metrics;
use pricesync_ws::{ConnectionConfig, ConnectionManager, ConnectionState, WsEvent};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// How long teardown waits for each task before aborting it.
const DEFAULT_TEARDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Session settings.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub ws_url: String,
    pub max_reconnect_attempts: u32,
    pub reconnect_base_delay_ms: u64,
    pub poll_interval: Duration,
    pub teardown_timeout: Duration,
}

impl SyncSettings {
    pub fn new(ws_url: impl Into<String>) -> Self {
        let defaults = ConnectionConfig::default();
        Self {
            ws_url: ws_url.into(),
            max_reconnect_attempts: defaults.max_reconnect_attempts,
            reconnect_base_delay_ms: defaults.reconnect_base_delay_ms,
            poll_interval: DEFAULT_POLL_INTERVAL,
            teardown_timeout: DEFAULT_TEARDOWN_TIMEOUT,
        }
    }

    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        Ok(Self {
            ws_url: config.stream_url()?,
            max_reconnect_attempts: config.websocket.max_reconnect_attempts,
            reconnect_base_delay_ms: config.websocket.reconnect_base_delay_ms,
            poll_interval: config.poll_interval(),
            teardown_timeout: DEFAULT_TEARDOWN_TIMEOUT,
        })
    }
}

/// Point-in-time view of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatus {
    pub state: ConnectionState,
    pub is_connected: bool,
    pub connection_error: Option<String>,
    pub fallback_error: Option<String>,
    /// Timestamp of the most recently applied sample.
    pub last_update: Option<i64>,
}

#[derive(Debug, Default)]
struct StatusRecord {
    connection_error: Option<String>,
    fallback_error: Option<String>,
    last_update: Option<i64>,
}

/// State shared between the session handle and its event loop.
struct Shared {
    store: PriceStore,
    alerts: AlertEvaluator,
    status: RwLock<StatusRecord>,
}

impl Shared {
    /// Store a sample and run it through the alert evaluator.
    fn apply(&self, sample: PriceSample) {
        Metrics::sample_applied(
            sample.source.as_str(),
            sample.symbol.as_str(),
            sample.price.to_f64().unwrap_or_default(),
        );
        self.status.write().last_update = Some(sample.timestamp);
        self.store.update(sample.clone());

        for alert in self.alerts.on_sample(&sample) {
            Metrics::alert_triggered(alert.condition.as_str());
        }
    }

    fn set_connection_error(&self, error: Option<String>) {
        self.status.write().connection_error = error;
    }

    fn set_fallback_error(&self, error: Option<String>) {
        self.status.write().fallback_error = error;
    }
}

/// Tasks and handles of a started session.
struct Running {
    manager: Arc<ConnectionManager>,
    cancel: CancellationToken,
    ws_task: JoinHandle<()>,
    event_task: JoinHandle<()>,
}

impl Running {
    fn abort(self) {
        self.manager.shutdown();
        self.cancel.cancel();
        self.ws_task.abort();
        self.event_task.abort();
    }
}

/// Real-time price synchronization session.
pub struct PriceSync {
    settings: SyncSettings,
    shared: Arc<Shared>,
    poller: Arc<FallbackPoller>,
    running: Mutex<Option<Running>>,
}

impl PriceSync {
    pub fn new(
        settings: SyncSettings,
        quote_source: Arc<dyn QuoteSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::with_poller(settings, Arc::new(FallbackPoller::new(quote_source)), notifier)
    }

    /// Create a session around an existing poller.
    pub fn with_poller(
        settings: SyncSettings,
        poller: Arc<FallbackPoller>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            settings,
            shared: Arc::new(Shared {
                store: PriceStore::new(),
                alerts: AlertEvaluator::new(notifier),
                status: RwLock::new(StatusRecord::default()),
            }),
            poller,
            running: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Start the connection and event loop for `symbols`.
    ///
    /// Returns `false` if the session is already running. Fallback polling
    /// starts right away since the connection is not open yet.
    pub fn start(&self, symbols: Vec<Symbol>) -> bool {
        let mut running = self.running.lock();
        if running.is_some() {
            debug!("Session already running, ignoring start");
            return false;
        }

        info!(
            url = %self.settings.ws_url,
            symbols = ?symbols.iter().map(Symbol::as_str).collect::<Vec<_>>(),
            "Starting price sync session"
        );

        // A fresh manager starts with a fresh attempt counter
        self.shared.set_connection_error(None);

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let config = ConnectionConfig {
            url: self.settings.ws_url.clone(),
            max_reconnect_attempts: self.settings.max_reconnect_attempts,
            reconnect_base_delay_ms: self.settings.reconnect_base_delay_ms,
            symbols,
        };
        let manager = Arc::new(ConnectionManager::new(config, event_tx));

        let ws_task = {
            let manager = manager.clone();
            tokio::spawn(async move {
                if let Err(e) = manager.connect().await {
                    error!(?e, "Price feed connection stopped");
                }
            })
        };

        let cancel = CancellationToken::new();
        let event_loop = EventLoop {
            shared: self.shared.clone(),
            poller: self.poller.clone(),
            manager: manager.clone(),
            parser: MessageParser::new(),
            poll_interval: self.settings.poll_interval,
            cancel: cancel.clone(),
        };
        let event_task = tokio::spawn(event_loop.run(event_rx));

        *running = Some(Running {
            manager,
            cancel,
            ws_task,
            event_task,
        });
        true
    }

    /// Tear down and start again with a new symbol set.
    ///
    /// Prices and alerts are kept.
    pub async fn reconfigure(&self, symbols: Vec<Symbol>) {
        info!("Reconfiguring price sync session");
        self.teardown().await;
        self.start(symbols);
    }

    /// Stop the session.
    ///
    /// The connection is closed with the normal code after unsubscribing,
    /// pending reconnects and polls are cancelled. Each task gets a bounded
    /// time to stop before it is aborted. Safe to call repeatedly.
    pub async fn teardown(&self) {
        let running = self.running.lock().take();
        let Some(running) = running else {
            debug!("Session not running, nothing to tear down");
            return;
        };

        info!("Tearing down price sync session");
        running.manager.shutdown();
        running.cancel.cancel();

        let timeout = self.settings.teardown_timeout;
        for (task, mut handle) in [
            ("connection", running.ws_task),
            ("event_loop", running.event_task),
        ] {
            if tokio::time::timeout(timeout, &mut handle).await.is_err() {
                warn!(task, "Task did not stop in time, aborting");
                handle.abort();
            }
        }

        Metrics::ws_disconnected();
        info!("Price sync session stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn get_price(&self, symbol: &str) -> Decimal {
        self.shared.store.get_price(symbol)
    }

    pub fn get_change(&self, symbol: &str) -> Decimal {
        self.shared.store.get_change(symbol)
    }

    pub fn get_volume(&self, symbol: &str) -> Decimal {
        self.shared.store.get_volume(symbol)
    }

    pub fn get_high(&self, symbol: &str) -> Decimal {
        self.shared.store.get_high(symbol)
    }

    pub fn get_low(&self, symbol: &str) -> Decimal {
        self.shared.store.get_low(symbol)
    }

    pub fn get_market_cap(&self, symbol: &str) -> Decimal {
        self.shared.store.get_market_cap(symbol)
    }

    /// Full latest sample, including its source.
    pub fn sample(&self, symbol: &str) -> Option<PriceSample> {
        self.shared.store.get(symbol)
    }

    pub fn store(&self) -> &PriceStore {
        &self.shared.store
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.running
            .lock()
            .as_ref()
            .map(|r| r.manager.state())
            .unwrap_or(ConnectionState::Idle)
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Open
    }

    pub fn connection_error(&self) -> Option<String> {
        self.shared.status.read().connection_error.clone()
    }

    pub fn fallback_error(&self) -> Option<String> {
        self.shared.status.read().fallback_error.clone()
    }

    pub fn status(&self) -> SyncStatus {
        let state = self.connection_state();
        let record = self.shared.status.read();
        SyncStatus {
            state,
            is_connected: state == ConnectionState::Open,
            connection_error: record.connection_error.clone(),
            fallback_error: record.fallback_error.clone(),
            last_update: record.last_update,
        }
    }

    /// Tracked symbols of the running connection.
    pub fn symbols(&self) -> Vec<Symbol> {
        self.running
            .lock()
            .as_ref()
            .map(|r| r.manager.subscriptions().symbols())
            .unwrap_or_default()
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Subscribe to more symbols on the open connection.
    ///
    /// Returns `false` (and changes nothing) unless the connection is open.
    pub async fn subscribe(&self, symbols: &[Symbol]) -> bool {
        match self.write_handle() {
            Some(handle) => handle.subscribe(symbols).await,
            None => {
                warn!("Session not running, subscribe skipped");
                false
            }
        }
    }

    /// Unsubscribe on the open connection. Same rules as [`Self::subscribe`].
    pub async fn unsubscribe(&self, symbols: &[Symbol]) -> bool {
        match self.write_handle() {
            Some(handle) => handle.unsubscribe(symbols).await,
            None => {
                warn!("Session not running, unsubscribe skipped");
                false
            }
        }
    }

    fn write_handle(&self) -> Option<pricesync_ws::WsWriteHandle> {
        self.running.lock().as_ref().map(|r| r.manager.write_handle())
    }

    // =========================================================================
    // Alerts
    // =========================================================================

    /// Add an alert. Fails for a non-positive target.
    pub fn add_alert(
        &self,
        symbol: Symbol,
        target_price: Decimal,
        condition: AlertCondition,
    ) -> AppResult<()> {
        self.shared.alerts.add_alert(symbol, target_price, condition)?;
        Ok(())
    }

    pub fn remove_alert(&self, symbol: &Symbol, condition: AlertCondition) -> usize {
        self.shared.alerts.remove_alert(symbol, condition)
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.shared.alerts.alerts()
    }

    pub fn triggered_alerts(&self) -> Vec<Alert> {
        self.shared.alerts.triggered()
    }

    pub fn clear_triggered(&self) {
        self.shared.alerts.clear_triggered();
    }
}

impl Drop for PriceSync {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            debug!("Session dropped while running, aborting tasks");
            running.abort();
        }
    }
}

/// Routes connection events and drives fallback polling.
struct EventLoop {
    shared: Arc<Shared>,
    poller: Arc<FallbackPoller>,
    manager: Arc<ConnectionManager>,
    parser: MessageParser,
    poll_interval: Duration,
    cancel: CancellationToken,
}

impl EventLoop {
    async fn run(self, mut events: mpsc::Receiver<WsEvent>) {
        let (poll_tx, mut poll_rx) = mpsc::channel::<PollOutcome>(4);
        let mut fallback = Some(self.fallback_interval());
        let mut poll_task: Option<JoinHandle<()>> = None;
        let mut events_open = true;
        let mut last_disconnect = "abnormal_close";

        info!("Fallback polling active until the feed connects");

        loop {
            tokio::select! {
                biased;

                () = self.cancel.cancelled() => break,

                event = events.recv(), if events_open => {
                    let Some(event) = event else {
                        debug!("Connection event channel closed");
                        events_open = false;
                        continue;
                    };

                    match event {
                        WsEvent::Opened => {
                            info!("Price feed open, stopping fallback polling");
                            Metrics::ws_connected();
                            self.shared.set_connection_error(None);
                            fallback = None;
                            if let Some(task) = poll_task.take() {
                                task.abort();
                            }
                        }
                        WsEvent::Message(msg) => match self.parser.parse(&msg) {
                            Ok(Some(sample)) => self.shared.apply(sample),
                            Ok(None) => {}
                            Err(e) => warn!(error = %e, "Dropping malformed price update"),
                        },
                        WsEvent::Closed { code, reason } => {
                            info!(code, %reason, "Price feed closed");
                            Metrics::ws_disconnected();
                            self.enter_fallback(&mut fallback);
                        }
                        WsEvent::Error(e) => {
                            last_disconnect = "transport_error";
                            self.shared
                                .set_connection_error(Some(format!("WebSocket connection error: {e}")));
                            self.enter_fallback(&mut fallback);
                        }
                        WsEvent::ReconnectScheduled { attempt, delay } => {
                            debug!(attempt, delay_ms = delay.as_millis() as u64, "Reconnect scheduled");
                            Metrics::ws_reconnect(last_disconnect);
                            last_disconnect = "abnormal_close";
                        }
                        WsEvent::Exhausted { attempts } => {
                            error!(attempts, "Real-time price service unavailable");
                            self.shared.set_connection_error(Some(format!(
                                "Real-time price service unavailable after {attempts} reconnection attempts. Using fallback data."
                            )));
                            self.enter_fallback(&mut fallback);
                        }
                    }
                }

                () = tick(&mut fallback) => {
                    if poll_task.as_ref().is_some_and(|t| !t.is_finished()) {
                        debug!("Fallback poll still in flight, skipping tick");
                        continue;
                    }
                    let symbols = self.manager.subscriptions().symbols();
                    let poller = self.poller.clone();
                    let tx = poll_tx.clone();
                    poll_task = Some(tokio::spawn(async move {
                        let outcome = poller.poll(&symbols).await;
                        let _ = tx.send(outcome).await;
                    }));
                }

                Some(outcome) = poll_rx.recv() => self.apply_poll(outcome),
            }
        }

        if let Some(task) = poll_task.take() {
            task.abort();
        }
        debug!("Event loop stopped");
    }

    fn fallback_interval(&self) -> Interval {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    }

    /// Start polling unless already polling. The first tick fires at once.
    fn enter_fallback(&self, fallback: &mut Option<Interval>) {
        if fallback.is_none() {
            info!(
                interval_ms = self.poll_interval.as_millis() as u64,
                "Entering fallback polling"
            );
            *fallback = Some(self.fallback_interval());
        }
    }

    fn apply_poll(&self, outcome: PollOutcome) {
        if self.manager.state() == ConnectionState::Open {
            debug!("Feed is open, discarding fallback poll result");
            return;
        }

        Metrics::fallback_poll(outcome.is_ok());
        match &outcome.error {
            Some(e) => {
                warn!(error = %e, "Fallback data fetch failed");
                self.shared
                    .set_fallback_error(Some(format!("Fallback data fetch failed: {e}")));
            }
            None => self.shared.set_fallback_error(None),
        }

        debug!(
            samples = outcome.samples.len(),
            synthetic = outcome.synthetic_count(),
            "Applying fallback samples"
        );
        for sample in outcome.samples {
            self.shared.apply(sample);
        }
    }
}

/// Tick the fallback interval, or never resolve while not polling.
async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
