//! Synthetic quotes for symbols the REST source cannot price.
//!
//! These are approximations, not market data. Every sample produced here
//! carries `SampleSource::Synthetic`.

use pricesync_core::{PriceSample, SampleSource, Symbol};
use rand::Rng;
use rust_decimal::Decimal;

/// Known anchor price for a symbol.
pub fn anchor_price(symbol: &Symbol) -> Option<Decimal> {
    match symbol.as_str() {
        "bitcoin" | "btc" => Some(Decimal::from(45_000)),
        "ethereum" | "eth" => Some(Decimal::from(2_500)),
        _ => None,
    }
}

/// A synthetic sample together with the base it was derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticQuote {
    pub base: Decimal,
    pub sample: PriceSample,
}

impl SyntheticQuote {
    /// Generate a quote.
    ///
    /// - base: anchor, or uniform in [100, 1100) at cent resolution
    /// - price: base perturbed by up to ±2% (basis point steps)
    /// - change_24h: [-5%, +5%]
    /// - volume_24h: integer in [1e6, 1e9)
    /// - high/low: base ±5%
    pub fn generate<R: Rng + ?Sized>(symbol: &Symbol, rng: &mut R, timestamp: i64) -> Self {
        let base = anchor_price(symbol)
            .unwrap_or_else(|| Decimal::new(rng.gen_range(10_000..110_000), 2));

        let perturbation_bp: i64 = rng.gen_range(-200..=200);
        let price = base * (Decimal::ONE + Decimal::new(perturbation_bp, 4));

        let mut sample = PriceSample::new(symbol.clone(), price, timestamp, SampleSource::Synthetic);
        sample.change_24h = Decimal::new(rng.gen_range(-500..=500), 2);
        sample.volume_24h = Decimal::from(rng.gen_range(1_000_000i64..1_000_000_000));
        sample.high_24h = Some(base * Decimal::new(105, 2));
        sample.low_24h = Some(base * Decimal::new(95, 2));

        Self { base, sample }
    }
}
