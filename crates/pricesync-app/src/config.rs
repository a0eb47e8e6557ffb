//! Application configuration.

use crate::error::{AppError, AppResult};
use pricesync_core::{AlertCondition, Symbol};
use pricesync_ws::endpoint;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reconnect settings for the streaming connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketConfig {
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    /// Backoff base; attempt `n` waits `base * 2^n`.
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
}

fn default_max_reconnect_attempts() -> u32 {
    10
}

fn default_reconnect_base_delay_ms() -> u64 {
    1_000
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
        }
    }
}

/// REST fallback settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Poll period while the stream is down (ms). Default: 30,000.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Quote request timeout (ms). Default: 10,000.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    30_000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Show alert notifications (as log events).
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

/// Alert registered at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    pub symbol: Symbol,
    pub target_price: Decimal,
    pub condition: AlertCondition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Base log level when `RUST_LOG` is unset. The telemetry default
    /// filter applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    /// Status line period (ms). Default: 5,000.
    #[serde(default = "default_status_interval_ms")]
    pub status_interval_ms: u64,
}

fn default_status_interval_ms() -> u64 {
    5_000
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: None,
            status_interval_ms: default_status_interval_ms(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Page origin the stream URL is derived from.
    #[serde(default = "default_origin")]
    pub origin: String,
    /// Explicit stream URL, overrides derivation from `origin`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_url: Option<String>,
    /// REST quote endpoint.
    #[serde(default = "default_rest_url")]
    pub rest_url: String,
    #[serde(default = "default_symbols")]
    pub symbols: Vec<Symbol>,
    #[serde(default)]
    pub websocket: WebSocketConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub alerts: Vec<AlertConfig>,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_rest_url() -> String {
    "https://api.coingecko.com/api/v3/simple/price".to_string()
}

fn default_symbols() -> Vec<Symbol> {
    vec![Symbol::new("btc"), Symbol::new("eth")]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            ws_url: None,
            rest_url: default_rest_url(),
            symbols: default_symbols(),
            websocket: WebSocketConfig::default(),
            fallback: FallbackConfig::default(),
            notifications: NotificationsConfig::default(),
            alerts: Vec::new(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load and validate configuration from a TOML file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.symbols.iter().any(|s| s.as_str().is_empty()) {
            return Err(AppError::Config("symbols must not be empty strings".to_string()));
        }
        if self.fallback.poll_interval_ms == 0 {
            return Err(AppError::Config("fallback.poll_interval_ms must be > 0".to_string()));
        }
        if self.telemetry.status_interval_ms == 0 {
            return Err(AppError::Config(
                "telemetry.status_interval_ms must be > 0".to_string(),
            ));
        }
        for alert in &self.alerts {
            if alert.target_price <= Decimal::ZERO {
                return Err(AppError::Config(format!(
                    "alert target for {} must be positive, got {}",
                    alert.symbol, alert.target_price
                )));
            }
        }
        Ok(())
    }

    /// Stream URL: the explicit override, else derived from `origin`.
    pub fn stream_url(&self) -> AppResult<String> {
        match &self.ws_url {
            Some(url) => Ok(url.clone()),
            None => Ok(endpoint::stream_url(&self.origin)?),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.fallback.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.fallback.request_timeout_ms)
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.telemetry.status_interval_ms)
    }
}
