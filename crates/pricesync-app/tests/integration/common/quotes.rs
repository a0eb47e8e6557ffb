//! Quote sources for integration tests.

use pricesync_core::Symbol;
use pricesync_fallback::{BoxFuture, FallbackError, FallbackResult, QuoteSource, RestQuote};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Quote source returning a fixed quote map, or failing every fetch.
#[derive(Default)]
pub struct StaticQuoteSource {
    quotes: HashMap<String, RestQuote>,
    fail: bool,
    calls: AtomicUsize,
}

impl StaticQuoteSource {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn with_price(mut self, id: &str, usd: Decimal) -> Self {
        self.quotes.insert(
            id.to_string(),
            RestQuote {
                usd: Some(usd),
                ..Default::default()
            },
        );
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl QuoteSource for StaticQuoteSource {
    fn fetch_quotes<'a>(
        &'a self,
        _symbols: &'a [Symbol],
    ) -> BoxFuture<'a, FallbackResult<HashMap<String, RestQuote>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = if self.fail {
            Err(FallbackError::HttpClient("HTTP request failed: connection refused".to_string()))
        } else {
            Ok(self.quotes.clone())
        };
        Box::pin(async move { result })
    }
}
