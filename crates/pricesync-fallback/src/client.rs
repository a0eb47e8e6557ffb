//! HTTP client for REST price quotes.
//!
//! Talks to a CoinGecko-style `simple/price` endpoint: symbols are passed as
//! `ids`, quotes come back keyed by id in USD.

use crate::error::{FallbackError, FallbackResult};
use pricesync_core::Symbol;
use reqwest::{Client, Url};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, info};

/// Default timeout for quote requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One entry of the quote response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RestQuote {
    #[serde(default)]
    pub usd: Option<Decimal>,
    #[serde(default)]
    pub usd_24h_change: Option<Decimal>,
    #[serde(default)]
    pub usd_24h_vol: Option<Decimal>,
    #[serde(default)]
    pub usd_24h_high: Option<Decimal>,
    #[serde(default)]
    pub usd_24h_low: Option<Decimal>,
    #[serde(default)]
    pub usd_market_cap: Option<Decimal>,
}

/// Source of real quotes for the fallback poller.
///
/// Implementations return what they have; symbols missing from the map
/// are synthesized by the caller.
pub trait QuoteSource: Send + Sync {
    fn fetch_quotes<'a>(
        &'a self,
        symbols: &'a [Symbol],
    ) -> BoxFuture<'a, FallbackResult<HashMap<String, RestQuote>>>;
}

/// Client for the REST quote endpoint.
pub struct RestQuoteClient {
    client: Client,
    rest_url: String,
}

impl RestQuoteClient {
    /// Create a client with the default request timeout.
    pub fn new(rest_url: impl Into<String>) -> FallbackResult<Self> {
        Self::with_timeout(rest_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(rest_url: impl Into<String>, timeout: Duration) -> FallbackResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FallbackError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            rest_url: rest_url.into(),
        })
    }

    pub fn rest_url(&self) -> &str {
        &self.rest_url
    }

    /// Build the request URL for a symbol list.
    pub fn quote_url(&self, symbols: &[Symbol]) -> FallbackResult<Url> {
        let ids = symbols
            .iter()
            .map(Symbol::as_str)
            .collect::<Vec<_>>()
            .join(",");

        Url::parse_with_params(
            &self.rest_url,
            &[
                ("ids", ids.as_str()),
                ("vs_currencies", "usd"),
                ("include_24hr_change", "true"),
                ("include_24hr_vol", "true"),
                ("include_market_cap", "true"),
            ],
        )
        .map_err(|e| FallbackError::HttpClient(format!("Invalid quote URL {}: {e}", self.rest_url)))
    }

    /// Fetch quotes for the given symbols.
    pub async fn fetch(&self, symbols: &[Symbol]) -> FallbackResult<HashMap<String, RestQuote>> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }

        let url = self.quote_url(symbols)?;
        info!(count = symbols.len(), "Fetching fallback quotes");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FallbackError::HttpClient(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FallbackError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FallbackError::HttpClient(format!("Failed to read response: {e}")))?;

        let quotes = parse_quotes(&body)?;
        debug!(received = quotes.len(), "Fallback quotes received");
        Ok(quotes)
    }
}

impl QuoteSource for RestQuoteClient {
    fn fetch_quotes<'a>(
        &'a self,
        symbols: &'a [Symbol],
    ) -> BoxFuture<'a, FallbackResult<HashMap<String, RestQuote>>> {
        Box::pin(self.fetch(symbols))
    }
}

/// Parse a quote response body.
pub fn parse_quotes(body: &str) -> FallbackResult<HashMap<String, RestQuote>> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    if !value.is_object() {
        return Err(FallbackError::InvalidResponse(
            "quote response is not an object".to_string(),
        ));
    }
    Ok(serde_json::from_value(value)?)
}
