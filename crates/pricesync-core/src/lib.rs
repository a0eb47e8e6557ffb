//! Core domain types for real-time price synchronization.
//!
//! This crate provides the types shared by every other component:
//! - `Symbol`: lower-cased canonical market identifier
//! - `PriceSample`: latest known market state for one symbol
//! - `Alert`, `AlertCondition`: user-defined price threshold rules

pub mod alert;
pub mod error;
pub mod types;

pub use alert::{Alert, AlertCondition};
pub use error::{CoreError, Result};
pub use types::{now_ms, PriceSample, SampleSource, Symbol};
