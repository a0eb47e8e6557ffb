//! Fallback price source.
//!
//! While the stream is down, tracked symbols are polled from a REST quote
//! endpoint. Symbols the endpoint has no quote for get a synthetic,
//! clearly marked approximation instead.

pub mod client;
pub mod error;
pub mod poller;
pub mod synthetic;

pub use client::{BoxFuture, QuoteSource, RestQuote, RestQuoteClient};
pub use error::{FallbackError, FallbackResult};
pub use poller::{FallbackPoller, PollOutcome, DEFAULT_POLL_INTERVAL};
pub use synthetic::{anchor_price, SyntheticQuote};
