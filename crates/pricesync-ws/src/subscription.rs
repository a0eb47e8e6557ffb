//! Subscription tracking for the price feed.
//!
//! Holds the symbol set the caller wants updates for. The full set is sent
//! on every successful (re)connection; individual subscribe/unsubscribe
//! calls are never queued while disconnected.

use parking_lot::RwLock;
use pricesync_core::Symbol;
use std::collections::BTreeSet;
use tracing::debug;

/// Tracked symbol set.
#[derive(Debug, Default)]
pub struct SubscriptionTracker {
    symbols: RwLock<BTreeSet<Symbol>>,
}

impl SubscriptionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tracker pre-populated with the declared symbols.
    pub fn with_symbols(symbols: impl IntoIterator<Item = Symbol>) -> Self {
        Self {
            symbols: RwLock::new(symbols.into_iter().collect()),
        }
    }

    /// Record symbols as tracked.
    pub fn add(&self, symbols: &[Symbol]) {
        let mut tracked = self.symbols.write();
        for symbol in symbols {
            if tracked.insert(symbol.clone()) {
                debug!(%symbol, "Tracking symbol");
            }
        }
    }

    /// Stop tracking symbols.
    pub fn remove(&self, symbols: &[Symbol]) {
        let mut tracked = self.symbols.write();
        for symbol in symbols {
            if tracked.remove(symbol) {
                debug!(%symbol, "No longer tracking symbol");
            }
        }
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.symbols.read().contains(symbol)
    }

    /// Tracked symbols in sorted order.
    pub fn symbols(&self) -> Vec<Symbol> {
        self.symbols.read().iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.read().is_empty()
    }

    pub fn len(&self) -> usize {
        self.symbols.read().len()
    }
}
