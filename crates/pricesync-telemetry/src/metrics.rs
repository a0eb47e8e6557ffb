//! Prometheus metrics for pricesync.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use crate::error::{TelemetryError, TelemetryResult};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_gauge_vec, CounterVec, Encoder, Gauge,
    GaugeVec, TextEncoder,
};

/// WebSocket connection state (1 = connected, 0 = disconnected).
pub static WS_CONNECTED: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "pricesync_ws_connected",
        "WebSocket connection state (1=connected)"
    )
    .unwrap()
});

/// Total reconnects scheduled.
/// Labels: reason (abnormal_close/transport_error)
pub static WS_RECONNECT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pricesync_ws_reconnect_total",
        "Total WebSocket reconnection attempts",
        &["reason"]
    )
    .unwrap()
});

/// Samples written to the price store.
/// Labels: source (stream/rest/synthetic)
pub static SAMPLES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pricesync_samples_total",
        "Total price samples applied",
        &["source"]
    )
    .unwrap()
});

/// Latest price per symbol.
pub static PRICE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!("pricesync_price", "Latest price per symbol", &["symbol"]).unwrap()
});

/// Alerts fired.
/// Labels: condition (above/below)
pub static ALERTS_TRIGGERED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pricesync_alerts_triggered_total",
        "Total price alerts triggered",
        &["condition"]
    )
    .unwrap()
});

/// Fallback polls completed.
/// Labels: outcome (ok/error)
pub static FALLBACK_POLLS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pricesync_fallback_polls_total",
        "Total fallback REST polls",
        &["outcome"]
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record WebSocket connected.
    pub fn ws_connected() {
        WS_CONNECTED.set(1.0);
    }

    /// Record WebSocket disconnected.
    pub fn ws_disconnected() {
        WS_CONNECTED.set(0.0);
    }

    /// Record a scheduled reconnect.
    pub fn ws_reconnect(reason: &str) {
        WS_RECONNECT_TOTAL.with_label_values(&[reason]).inc();
    }

    /// Record an applied sample and its price.
    pub fn sample_applied(source: &str, symbol: &str, price: f64) {
        SAMPLES_TOTAL.with_label_values(&[source]).inc();
        PRICE.with_label_values(&[symbol]).set(price);
    }

    pub fn alert_triggered(condition: &str) {
        ALERTS_TRIGGERED_TOTAL.with_label_values(&[condition]).inc();
    }

    pub fn fallback_poll(ok: bool) {
        let outcome = if ok { "ok" } else { "error" };
        FALLBACK_POLLS_TOTAL.with_label_values(&[outcome]).inc();
    }

    /// Render all registered metrics in the text exposition format.
    pub fn encode() -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&prometheus::gather(), &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}
