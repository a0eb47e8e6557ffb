//! Latest price sample per symbol.
//!
//! Every update overwrites the previous entry for its symbol regardless of
//! timestamps. Accessors default to zero so numeric displays never see a
//! missing value.

use dashmap::DashMap;
use pricesync_core::{PriceSample, Symbol};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::trace;

/// In-memory price store.
#[derive(Debug, Default)]
pub struct PriceStore {
    samples: DashMap<Symbol, PriceSample>,
}

impl PriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a sample, replacing whatever was held for its symbol.
    pub fn update(&self, sample: PriceSample) {
        trace!(
            symbol = %sample.symbol,
            price = %sample.price,
            source = %sample.source,
            "Price store update"
        );
        self.samples.insert(sample.symbol.clone(), sample);
    }

    /// Latest sample for a symbol (case-insensitive).
    pub fn get(&self, symbol: &str) -> Option<PriceSample> {
        self.samples
            .get(&Symbol::new(symbol))
            .map(|entry| entry.value().clone())
    }

    fn field(&self, symbol: &str, f: impl FnOnce(&PriceSample) -> Option<Decimal>) -> Decimal {
        self.samples
            .get(&Symbol::new(symbol))
            .and_then(|entry| f(entry.value()))
            .unwrap_or(Decimal::ZERO)
    }

    pub fn get_price(&self, symbol: &str) -> Decimal {
        self.field(symbol, |s| Some(s.price))
    }

    pub fn get_change(&self, symbol: &str) -> Decimal {
        self.field(symbol, |s| Some(s.change_24h))
    }

    pub fn get_volume(&self, symbol: &str) -> Decimal {
        self.field(symbol, |s| Some(s.volume_24h))
    }

    pub fn get_high(&self, symbol: &str) -> Decimal {
        self.field(symbol, |s| s.high_24h)
    }

    pub fn get_low(&self, symbol: &str) -> Decimal {
        self.field(symbol, |s| s.low_24h)
    }

    pub fn get_market_cap(&self, symbol: &str) -> Decimal {
        self.field(symbol, |s| s.market_cap)
    }

    /// Symbols with at least one sample, sorted.
    pub fn symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = self.samples.iter().map(|e| e.key().clone()).collect();
        symbols.sort();
        symbols
    }

    /// Copy of every stored sample, keyed by symbol.
    pub fn snapshot(&self) -> BTreeMap<Symbol, PriceSample> {
        self.samples
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    /// Newest sample timestamp across all symbols.
    pub fn last_update(&self) -> Option<i64> {
        self.samples.iter().map(|e| e.value().timestamp).max()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
