//! Session integration tests.
//!
//! Drives a full `PriceSync` session against the mock server:
//! - Stream samples into the store and alerts
//! - Fallback polling while the stream is down
//! - Terminal error after the retry ceiling
//! - Teardown and reconfiguration

mod integration;
use integration::common::eventually;
use integration::common::mock_ws::MockWsServer;
use integration::common::quotes::StaticQuoteSource;

use mockall::mock;
use pricesync_alerts::{NoopNotifier, Notification, NotificationPermission, Notifier};
use pricesync_app::{AppError, PriceSync, SyncSettings};
use pricesync_core::{AlertCondition, CoreError, SampleSource, Symbol};
use pricesync_fallback::QuoteSource;
use pricesync_ws::ConnectionState;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

mock! {
    pub HostNotifier {}

    impl Notifier for HostNotifier {
        fn permission(&self) -> NotificationPermission;
        fn show(&self, notification: &Notification);
    }
}

fn settings(url: String) -> SyncSettings {
    SyncSettings {
        // Slow reconnects keep the session in fallback for the test window
        reconnect_base_delay_ms: 10_000,
        poll_interval: Duration::from_millis(200),
        teardown_timeout: Duration::from_secs(1),
        ..SyncSettings::new(url)
    }
}

fn session(url: String, quotes: Arc<dyn QuoteSource>) -> PriceSync {
    PriceSync::new(settings(url), quotes, Arc::new(NoopNotifier))
}

fn price_update(symbol: &str, price: u64) -> String {
    json!({
        "type": "price_update",
        "symbol": symbol,
        "price": price,
        "change_24h": 2.5,
        "timestamp": 1_699_999_999_000i64,
    })
    .to_string()
}

/// Wait until the server has seen `frame`.
async fn server_received(server: &MockWsServer, frame: serde_json::Value) -> bool {
    eventually(Duration::from_secs(3), || {
        let frame = frame.clone();
        async move { server.received_json().await.contains(&frame) }
    })
    .await
}

/// Open, subscribe, stream a price, fire an alert, then lose the socket and
/// keep getting prices from the fallback.
#[tokio::test]
async fn test_stream_then_fallback_end_to_end() {
    let server = MockWsServer::start().await;

    let mut notifier = MockHostNotifier::new();
    notifier
        .expect_permission()
        .return_const(NotificationPermission::Granted);
    notifier
        .expect_show()
        .withf(|n| n.title == "Price Alert: BTC" && n.body == "BTC is now above 49000. Current price: 50000")
        .times(1)
        .return_const(());

    let quotes = Arc::new(StaticQuoteSource::empty().with_price("btc", dec!(48000)));
    let sync = PriceSync::new(settings(server.url()), quotes.clone(), Arc::new(notifier));
    sync.add_alert(Symbol::new("btc"), dec!(49000), AlertCondition::Above)
        .unwrap();

    assert!(sync.start(vec![Symbol::new("btc")]));
    assert!(server_received(&server, json!({"type": "subscribe", "symbols": ["btc"]})).await);

    let s = &sync;
    assert!(eventually(Duration::from_secs(2), || async move { s.is_connected() }).await);

    server.push(price_update("btc", 50000));
    let streamed = eventually(Duration::from_secs(2), || async move {
        s.get_price("btc") == dec!(50000)
    })
    .await;
    assert!(streamed, "stream price should reach the store");
    assert_eq!(sync.get_change("BTC"), dec!(2.5));
    assert_eq!(sync.get_high("btc"), Decimal::ZERO);
    assert_eq!(sync.sample("btc").unwrap().source, SampleSource::Stream);

    let triggered = sync.triggered_alerts();
    assert_eq!(triggered.len(), 1);
    assert!(triggered[0].triggered);
    assert_eq!(triggered[0].triggered_at, Some(1_699_999_999_000));

    // Abnormal closure: fallback takes over without the socket
    server.drop_all();
    let fell_back = eventually(Duration::from_secs(2), || async move {
        s.sample("btc").is_some_and(|sample| sample.source == SampleSource::Rest)
    })
    .await;
    assert!(fell_back, "fallback should produce a btc price");
    assert_eq!(sync.get_price("btc"), dec!(48000));
    assert!(!sync.is_connected());
    assert!(sync.fallback_error().is_none());

    // Still one notification: the alert never re-fires
    assert_eq!(sync.triggered_alerts().len(), 1);

    sync.teardown().await;
    server.shutdown().await;
}

/// A poll that finishes after the stream is open is not applied.
#[tokio::test]
async fn test_fallback_stops_when_stream_opens() {
    let server = MockWsServer::start().await;
    let quotes = Arc::new(StaticQuoteSource::empty());
    let sync = session(server.url(), quotes.clone());

    sync.start(vec![Symbol::new("eth")]);
    let s = &sync;
    assert!(eventually(Duration::from_secs(2), || async move { s.is_connected() }).await);

    // Let the event loop observe the open before sampling the counter
    tokio::time::sleep(Duration::from_millis(50)).await;
    let calls = quotes.calls();
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(quotes.calls(), calls, "no polling while open");

    server.push(price_update("eth", 2600));
    assert!(
        eventually(Duration::from_secs(2), || async move {
            s.get_price("eth") == dec!(2600)
        })
        .await
    );

    sync.teardown().await;
    server.shutdown().await;
}

/// Unreachable feed: fallback data right away, terminal error at the ceiling.
#[tokio::test]
async fn test_unreachable_feed_uses_fallback_and_gives_up() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/ws", listener.local_addr().unwrap());
    drop(listener);

    let quotes = Arc::new(StaticQuoteSource::empty());
    let sync = PriceSync::new(
        SyncSettings {
            max_reconnect_attempts: 2,
            reconnect_base_delay_ms: 1,
            poll_interval: Duration::from_millis(100),
            ..SyncSettings::new(url)
        },
        quotes,
        Arc::new(NoopNotifier),
    );
    sync.start(vec![Symbol::new("bitcoin"), Symbol::new("solana")]);

    let s = &sync;
    let gave_up = eventually(Duration::from_secs(3), || async move {
        s.connection_error()
            .is_some_and(|e| e.starts_with("Real-time price service unavailable"))
    })
    .await;
    assert!(gave_up, "terminal error expected, got {:?}", sync.connection_error());

    let priced = eventually(Duration::from_secs(2), || async move {
        s.get_price("bitcoin") > Decimal::ZERO && s.get_price("solana") > Decimal::ZERO
    })
    .await;
    assert!(priced);

    let btc = sync.sample("bitcoin").unwrap();
    assert!(btc.is_synthetic());
    assert!(btc.price >= dec!(44100) && btc.price <= dec!(45900));
    assert_eq!(sync.get_high("bitcoin"), dec!(47250));
    assert_eq!(sync.get_low("bitcoin"), dec!(42750));

    let status = sync.status();
    assert_eq!(status.state, ConnectionState::Closed);
    assert!(!status.is_connected);
    assert!(status.last_update.is_some());

    sync.teardown().await;
}

/// A failed REST fetch is reported and still yields synthetic prices.
#[tokio::test]
async fn test_fallback_fetch_failure_is_reported() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/ws", listener.local_addr().unwrap());
    drop(listener);

    let sync = session(url, Arc::new(StaticQuoteSource::failing()));
    sync.start(vec![Symbol::new("eth")]);

    let s = &sync;
    let reported = eventually(Duration::from_secs(2), || async move {
        s.fallback_error()
            .is_some_and(|e| e.starts_with("Fallback data fetch failed: "))
    })
    .await;
    assert!(reported);
    assert!(sync.sample("eth").is_some_and(|sample| sample.is_synthetic()));
    assert!(sync
        .connection_error()
        .is_some_and(|e| e.starts_with("WebSocket connection error: ")));

    sync.teardown().await;
}

/// Teardown unsubscribes, closes normally and can be repeated.
#[tokio::test]
async fn test_teardown_is_idempotent() {
    let server = MockWsServer::start().await;
    let sync = session(server.url(), Arc::new(StaticQuoteSource::empty()));

    sync.start(vec![Symbol::new("btc")]);
    assert!(!sync.start(vec![Symbol::new("eth")]), "second start is a no-op");

    let s = &sync;
    assert!(eventually(Duration::from_secs(2), || async move { s.is_connected() }).await);

    sync.teardown().await;
    sync.teardown().await;

    assert!(!sync.is_running());
    assert_eq!(sync.connection_state(), ConnectionState::Idle);
    assert!(server_received(&server, json!({"type": "unsubscribe", "symbols": ["btc"]})).await);

    let srv = &server;
    assert!(
        eventually(Duration::from_secs(2), || async move {
            srv.active_connections().await == 0
        })
        .await
    );

    // Nothing reconnects after teardown
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(server.connection_count().await, 1);

    server.shutdown().await;
}

/// Reconfiguring swaps the connection and keeps prices and alerts.
#[tokio::test]
async fn test_reconfigure_resubscribes_new_set() {
    let server = MockWsServer::start().await;
    let sync = session(server.url(), Arc::new(StaticQuoteSource::empty()));
    sync.add_alert(Symbol::new("btc"), dec!(1), AlertCondition::Below)
        .unwrap();

    sync.start(vec![Symbol::new("btc")]);
    assert!(server_received(&server, json!({"type": "subscribe", "symbols": ["btc"]})).await);

    server.push(price_update("btc", 50000));
    let s = &sync;
    assert!(
        eventually(Duration::from_secs(2), || async move {
            s.get_price("btc") == dec!(50000)
        })
        .await
    );

    sync.reconfigure(vec![Symbol::new("eth"), Symbol::new("sol")]).await;

    assert!(server_received(&server, json!({"type": "unsubscribe", "symbols": ["btc"]})).await);
    assert!(
        server_received(&server, json!({"type": "subscribe", "symbols": ["eth", "sol"]})).await
    );
    assert_eq!(server.connection_count().await, 2);
    assert_eq!(sync.symbols(), vec![Symbol::new("eth"), Symbol::new("sol")]);

    assert_eq!(sync.get_price("btc"), dec!(50000), "store survives reconfigure");
    assert_eq!(sync.alerts().len(), 1);

    sync.teardown().await;
    server.shutdown().await;
}

/// Subscription changes are no-ops while not open.
#[tokio::test]
async fn test_subscribe_requires_open_connection() {
    let server = MockWsServer::start().await;
    let sync = session(server.url(), Arc::new(StaticQuoteSource::empty()));

    assert!(!sync.subscribe(&[Symbol::new("btc")]).await);

    sync.start(vec![Symbol::new("btc")]);
    let s = &sync;
    assert!(eventually(Duration::from_secs(2), || async move { s.is_connected() }).await);

    assert!(sync.subscribe(&[Symbol::new("xau")]).await);
    assert!(server_received(&server, json!({"type": "subscribe", "symbols": ["xau"]})).await);
    assert_eq!(sync.symbols(), vec![Symbol::new("btc"), Symbol::new("xau")]);

    sync.teardown().await;
    server.shutdown().await;
}

/// Non-positive alert targets are rejected before they reach the evaluator.
#[tokio::test]
async fn test_add_alert_rejects_non_positive_target() {
    let sync = session("ws://127.0.0.1:1/ws".to_string(), Arc::new(StaticQuoteSource::empty()));

    let result = sync.add_alert(Symbol::new("btc"), Decimal::ZERO, AlertCondition::Above);
    assert!(matches!(
        result,
        Err(AppError::Core(CoreError::InvalidPrice(_)))
    ));
    assert!(sync.alerts().is_empty());
}
