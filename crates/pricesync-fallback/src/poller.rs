//! Fallback poller.
//!
//! One `poll` produces a sample for every tracked symbol: a real REST quote
//! when the source has one, a synthetic approximation otherwise. A failed
//! fetch still yields a full synthetic set and reports the error.

use crate::client::{QuoteSource, RestQuote};
use crate::error::FallbackError;
use crate::synthetic::SyntheticQuote;
use parking_lot::Mutex;
use pricesync_core::{now_ms, PriceSample, SampleSource, Symbol};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Poll period while the stream is down.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Result of one poll.
#[derive(Debug)]
pub struct PollOutcome {
    /// One sample per requested symbol, in request order.
    pub samples: Vec<PriceSample>,
    /// Set when the REST fetch failed and every sample is synthetic.
    pub error: Option<FallbackError>,
}

impl PollOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn synthetic_count(&self) -> usize {
        self.samples.iter().filter(|s| s.is_synthetic()).count()
    }
}

/// REST-backed fallback poller.
pub struct FallbackPoller {
    source: Arc<dyn QuoteSource>,
    rng: Mutex<StdRng>,
}

impl FallbackPoller {
    pub fn new(source: Arc<dyn QuoteSource>) -> Self {
        Self::with_rng(source, StdRng::from_entropy())
    }

    /// Create a poller with a fixed RNG (reproducible synthetic quotes).
    pub fn with_rng(source: Arc<dyn QuoteSource>, rng: StdRng) -> Self {
        Self {
            source,
            rng: Mutex::new(rng),
        }
    }

    /// Fetch quotes and build one sample per symbol.
    pub async fn poll(&self, symbols: &[Symbol]) -> PollOutcome {
        if symbols.is_empty() {
            return PollOutcome {
                samples: Vec::new(),
                error: None,
            };
        }

        let (quotes, error) = match self.source.fetch_quotes(symbols).await {
            Ok(quotes) => (quotes, None),
            Err(e) => {
                warn!(error = %e, "Fallback fetch failed, synthesizing all symbols");
                (HashMap::new(), Some(e))
            }
        };

        let timestamp = now_ms();
        let mut rng = self.rng.lock();
        let samples: Vec<PriceSample> = symbols
            .iter()
            .map(|symbol| {
                quotes
                    .get(symbol.as_str())
                    .and_then(|quote| sample_from_quote(symbol, quote, timestamp))
                    .unwrap_or_else(|| {
                        debug!(%symbol, "No REST quote, using synthetic sample");
                        SyntheticQuote::generate(symbol, &mut *rng, timestamp).sample
                    })
            })
            .collect();

        PollOutcome { samples, error }
    }
}

/// Convert a REST quote; quotes without a USD price count as missing.
fn sample_from_quote(symbol: &Symbol, quote: &RestQuote, timestamp: i64) -> Option<PriceSample> {
    let price = quote.usd?;
    let mut sample = PriceSample::new(symbol.clone(), price, timestamp, SampleSource::Rest);
    sample.change_24h = quote.usd_24h_change.unwrap_or(Decimal::ZERO);
    sample.volume_24h = quote.usd_24h_vol.unwrap_or(Decimal::ZERO);
    sample.high_24h = quote.usd_24h_high;
    sample.low_24h = quote.usd_24h_low;
    sample.market_cap = quote.usd_market_cap;
    Some(sample)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::BoxFuture;
    use crate::error::FallbackResult;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mock quote source for testing.
    #[derive(Default)]
    struct MockQuoteSource {
        quotes: HashMap<String, RestQuote>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl MockQuoteSource {
        fn with_quote(mut self, id: &str, usd: Decimal) -> Self {
            self.quotes.insert(
                id.to_string(),
                RestQuote {
                    usd: Some(usd),
                    usd_24h_change: Some(dec!(1.5)),
                    usd_24h_vol: Some(dec!(1000)),
                    usd_24h_high: Some(usd),
                    usd_market_cap: Some(dec!(99)),
                    ..Default::default()
                },
            );
            self
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }
    }

    impl QuoteSource for MockQuoteSource {
        fn fetch_quotes<'a>(
            &'a self,
            _symbols: &'a [Symbol],
        ) -> BoxFuture<'a, FallbackResult<HashMap<String, RestQuote>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = if self.fail {
                Err(FallbackError::HttpClient("connection refused".to_string()))
            } else {
                Ok(self.quotes.clone())
            };
            Box::pin(async move { result })
        }
    }

    fn poller(source: MockQuoteSource) -> FallbackPoller {
        FallbackPoller::with_rng(Arc::new(source), StdRng::seed_from_u64(1))
    }

    #[tokio::test]
    async fn test_real_quote_is_used_when_available() {
        let poller = poller(MockQuoteSource::default().with_quote("bitcoin", dec!(43000)));

        let outcome = poller.poll(&[Symbol::new("bitcoin")]).await;
        assert!(outcome.is_ok());
        let sample = &outcome.samples[0];
        assert_eq!(sample.price, dec!(43000));
        assert_eq!(sample.change_24h, dec!(1.5));
        assert_eq!(sample.volume_24h, dec!(1000));
        assert_eq!(sample.market_cap, Some(dec!(99)));
        assert_eq!(sample.high_24h, Some(sample.price));
        assert_eq!(sample.low_24h, None);
        assert_eq!(sample.source, SampleSource::Rest);
    }

    #[tokio::test]
    async fn test_missing_quote_is_synthesized() {
        let poller = poller(MockQuoteSource::default().with_quote("bitcoin", dec!(43000)));

        let outcome = poller
            .poll(&[Symbol::new("bitcoin"), Symbol::new("ethereum")])
            .await;
        assert_eq!(outcome.samples.len(), 2);
        assert_eq!(outcome.synthetic_count(), 1);

        let eth = &outcome.samples[1];
        assert_eq!(eth.symbol, Symbol::new("ethereum"));
        assert!(eth.is_synthetic());
        assert!(eth.price >= dec!(2450) && eth.price <= dec!(2550));
    }

    #[tokio::test]
    async fn test_fetch_failure_still_yields_samples() {
        let poller = poller(MockQuoteSource::failing());

        let outcome = poller.poll(&[Symbol::new("btc"), Symbol::new("sol")]).await;
        assert!(matches!(outcome.error, Some(FallbackError::HttpClient(_))));
        assert_eq!(outcome.samples.len(), 2);
        assert_eq!(outcome.synthetic_count(), 2);
    }

    #[tokio::test]
    async fn test_quote_without_price_counts_as_missing() {
        let mut source = MockQuoteSource::default();
        source.quotes.insert("bitcoin".to_string(), RestQuote::default());
        let poller = poller(source);

        let outcome = poller.poll(&[Symbol::new("bitcoin")]).await;
        assert!(outcome.samples[0].is_synthetic());
    }

    #[tokio::test]
    async fn test_empty_symbols_skip_fetch() {
        let source = Arc::new(MockQuoteSource::default());
        let poller = FallbackPoller::with_rng(source.clone(), StdRng::seed_from_u64(1));

        let outcome = poller.poll(&[]).await;
        assert!(outcome.samples.is_empty());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }
}
