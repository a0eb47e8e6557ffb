//! Market data types.
//!
//! Contains the canonical `Symbol` identifier and `PriceSample`, the
//! latest observed market state of one symbol.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

use crate::error::{CoreError, Result};

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Canonical market identifier (e.g. `"btc"`).
///
/// Always trimmed and lower-cased, so two symbols compare equal
/// regardless of the case they were written in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Create a symbol, normalizing case and surrounding whitespace.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_lowercase())
    }

    /// Create a symbol, rejecting empty input.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self> {
        let symbol = Self::new(raw.as_ref());
        if symbol.0.is_empty() {
            return Err(CoreError::InvalidSymbol(raw.as_ref().to_string()));
        }
        Ok(symbol)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Upper-cased form for display (e.g. notification titles).
    pub fn display_upper(&self) -> String {
        self.0.to_uppercase()
    }
}

impl From<String> for Symbol {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&str> for Symbol {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a price sample came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleSource {
    /// Delivered by the streaming price feed.
    Stream,
    /// Real quote from the REST fallback endpoint.
    Rest,
    /// Generated locally because no real quote was available.
    Synthetic,
}

impl SampleSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stream => "stream",
            Self::Rest => "rest",
            Self::Synthetic => "synthetic",
        }
    }
}

impl fmt::Display for SampleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One symbol's latest known market state.
///
/// `low_24h <= price <= high_24h` is expected but not enforced; upstream
/// data may violate it momentarily.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    pub symbol: Symbol,
    /// Price in quote currency units.
    pub price: Decimal,
    /// Signed 24h change in percent.
    pub change_24h: Decimal,
    pub volume_24h: Decimal,
    pub high_24h: Option<Decimal>,
    pub low_24h: Option<Decimal>,
    pub market_cap: Option<Decimal>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub source: SampleSource,
}

impl PriceSample {
    /// Create a sample with zero 24h stats and no optional fields.
    pub fn new(symbol: Symbol, price: Decimal, timestamp: i64, source: SampleSource) -> Self {
        Self {
            symbol,
            price,
            change_24h: Decimal::ZERO,
            volume_24h: Decimal::ZERO,
            high_24h: None,
            low_24h: None,
            market_cap: None,
            timestamp,
            source,
        }
    }

    /// True when the sample is a local approximation, not a market quote.
    pub fn is_synthetic(&self) -> bool {
        self.source == SampleSource::Synthetic
    }
}
