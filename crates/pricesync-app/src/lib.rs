//! Real-time price synchronization.
//!
//! Ties the components together into one session:
//! - Streaming connection with bounded reconnect
//! - REST fallback polling while the stream is down
//! - Latest-price store with zero defaults
//! - Threshold alerts with local notifications

pub mod app;
pub mod config;
pub mod error;
pub mod session;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use session::{PriceSync, SyncSettings, SyncStatus};
