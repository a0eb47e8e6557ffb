//! Price threshold alerts.
//!
//! `AlertEvaluator` keeps at most one active alert per (symbol, condition),
//! checks every incoming sample against them and fires each alert once.
//! Firing is reported through an injected `Notifier`.

pub mod evaluator;
pub mod notifier;

pub use evaluator::AlertEvaluator;
pub use notifier::{LogNotifier, NoopNotifier, Notification, NotificationPermission, Notifier};
