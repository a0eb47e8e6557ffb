//! Price data for tracked symbols.
//!
//! Turns inbound `price_update` frames into `PriceSample`s and keeps the
//! latest sample per symbol in a `PriceStore`.

pub mod error;
pub mod parser;
pub mod price_store;

pub use error::{FeedError, FeedResult};
pub use parser::{MessageParser, PriceUpdatePayload};
pub use price_store::PriceStore;
