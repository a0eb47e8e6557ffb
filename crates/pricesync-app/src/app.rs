//! Application orchestration for the CLI.
//!
//! Starts a session for the configured symbols, registers the configured
//! alerts, logs a status line periodically and tears down on Ctrl-C.

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::session::{PriceSync, SyncSettings};
use pricesync_alerts::{LogNotifier, NoopNotifier, Notifier};
use pricesync_fallback::{QuoteSource, RestQuoteClient};
use pricesync_telemetry::Metrics;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Main application.
pub struct Application {
    config: AppConfig,
    session: PriceSync,
}

impl Application {
    /// Create a new application.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let settings = SyncSettings::from_config(&config)?;
        let quote_source: Arc<dyn QuoteSource> = Arc::new(RestQuoteClient::with_timeout(
            &config.rest_url,
            config.request_timeout(),
        )?);
        let notifier: Arc<dyn Notifier> = if config.notifications.enabled {
            Arc::new(LogNotifier)
        } else {
            Arc::new(NoopNotifier)
        };

        Ok(Self {
            session: PriceSync::new(settings, quote_source, notifier),
            config,
        })
    }

    pub fn session(&self) -> &PriceSync {
        &self.session
    }

    /// Run until Ctrl-C.
    pub async fn run(self) -> AppResult<()> {
        info!(
            url = %self.session.settings().ws_url,
            rest_url = %self.config.rest_url,
            "Starting application"
        );

        for alert in &self.config.alerts {
            self.session
                .add_alert(alert.symbol.clone(), alert.target_price, alert.condition)?;
        }
        self.session.start(self.config.symbols.clone());

        let mut status_interval = tokio::time::interval(self.config.status_interval());
        status_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = status_interval.tick() => {
                    self.report();
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        self.session.teardown().await;
        self.report();

        match Metrics::encode() {
            Ok(text) => debug!(metrics = %text, "Final metrics"),
            Err(e) => warn!(error = %e, "Failed to encode metrics"),
        }

        info!("Shutdown complete");
        Ok(())
    }

    /// Log fired alerts and one status line.
    fn report(&self) {
        for alert in self.session.triggered_alerts() {
            info!(
                symbol = %alert.symbol,
                condition = %alert.condition,
                target = %alert.target_price,
                triggered_at = ?alert.triggered_at,
                "Alert fired"
            );
        }
        self.session.clear_triggered();

        let status = self.session.status();
        let prices = self
            .config
            .symbols
            .iter()
            .map(|s| {
                let synthetic = self
                    .session
                    .sample(s.as_str())
                    .is_some_and(|sample| sample.is_synthetic());
                format!(
                    "{}={}{}",
                    s.display_upper(),
                    self.session.get_price(s.as_str()),
                    if synthetic { "*" } else { "" }
                )
            })
            .collect::<Vec<_>>()
            .join(" ");

        info!(
            state = %status.state,
            connected = status.is_connected,
            connection_error = ?status.connection_error,
            fallback_error = ?status.fallback_error,
            last_update = ?status.last_update,
            %prices,
            "Status"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_from_default_config() {
        let app = Application::new(AppConfig::default()).unwrap();
        assert_eq!(app.session().settings().ws_url, "ws://localhost:3000/ws");
        assert!(!app.session().is_running());
    }

    #[test]
    fn test_new_rejects_bad_origin() {
        let config = AppConfig {
            origin: "mailto:someone@example.com".to_string(),
            ..Default::default()
        };
        assert!(Application::new(config).is_err());
    }
}
