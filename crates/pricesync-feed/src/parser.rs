//! Message parsing for price data.
//!
//! Converts `price_update` frames into `PriceSample`s. Frames of any other
//! type belong to other consumers and are skipped.

use crate::error::{FeedError, FeedResult};
use pricesync_core::{now_ms, PriceSample, SampleSource, Symbol};
use pricesync_ws::WsMessage;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, trace};

/// Payload of a `price_update` frame.
///
/// `change_24h` and `volume_24h` default to zero when missing or null; the
/// remaining 24h fields stay absent when the feed omits them.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceUpdatePayload {
    pub symbol: String,
    pub price: Decimal,
    #[serde(default)]
    pub change_24h: Option<Decimal>,
    #[serde(default)]
    pub volume_24h: Option<Decimal>,
    /// Receive time is used when the feed omits it.
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub high_24h: Option<Decimal>,
    #[serde(default)]
    pub low_24h: Option<Decimal>,
    #[serde(default)]
    pub market_cap: Option<Decimal>,
}

impl PriceUpdatePayload {
    /// Validate and convert into a stream sample.
    pub fn into_sample(self) -> FeedResult<PriceSample> {
        let symbol = Symbol::parse(&self.symbol)
            .map_err(|e| FeedError::InvalidData(e.to_string()))?;

        if self.price.is_sign_negative() {
            return Err(FeedError::InvalidData(format!(
                "negative price {} for {symbol}",
                self.price
            )));
        }

        let mut sample = PriceSample::new(
            symbol,
            self.price,
            self.timestamp.unwrap_or_else(now_ms),
            SampleSource::Stream,
        );
        sample.change_24h = self.change_24h.unwrap_or(Decimal::ZERO);
        sample.volume_24h = self.volume_24h.unwrap_or(Decimal::ZERO);
        sample.high_24h = self.high_24h;
        sample.low_24h = self.low_24h;
        sample.market_cap = self.market_cap;
        Ok(sample)
    }
}

/// Parser for inbound feed frames.
#[derive(Debug, Default)]
pub struct MessageParser;

impl MessageParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a frame.
    ///
    /// Returns `Ok(None)` for frames that are not price updates and an
    /// error for price updates with a malformed payload.
    pub fn parse(&self, msg: &WsMessage) -> FeedResult<Option<PriceSample>> {
        if !msg.is_price_update() {
            trace!(msg_type = %msg.msg_type, "Ignoring non price_update frame");
            return Ok(None);
        }

        let payload: PriceUpdatePayload =
            serde_json::from_value(serde_json::Value::Object(msg.data.clone()))?;
        let sample = payload.into_sample()?;

        debug!(
            symbol = %sample.symbol,
            price = %sample.price,
            timestamp = sample.timestamp,
            "Price update parsed"
        );
        Ok(Some(sample))
    }

    /// Parse a raw JSON text frame.
    pub fn parse_text(&self, text: &str) -> FeedResult<Option<PriceSample>> {
        let msg = WsMessage::from_text(text)?;
        self.parse(&msg)
    }
}
