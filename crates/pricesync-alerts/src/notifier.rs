//! Local notification capability.

use pricesync_core::Alert;
use rust_decimal::Decimal;
use tracing::{debug, info};

/// Whether the host allows notifications to be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationPermission {
    Granted,
    Denied,
    /// Never asked.
    Default,
}

/// A notification ready to be shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    /// Notification for an alert fired at `price`.
    pub fn for_alert(alert: &Alert, price: Decimal) -> Self {
        let symbol = alert.symbol.display_upper();
        Self {
            title: format!("Price Alert: {symbol}"),
            body: format!(
                "{symbol} is now {} {}. Current price: {price}",
                alert.condition, alert.target_price
            ),
        }
    }
}

/// Host notification surface.
///
/// Implementations must not block; `show` is best-effort.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    fn permission(&self) -> NotificationPermission;

    fn show(&self, notification: &Notification);
}

/// Notifier for hosts without a notification surface.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn permission(&self) -> NotificationPermission {
        NotificationPermission::Denied
    }

    fn show(&self, notification: &Notification) {
        debug!(title = %notification.title, "Notification suppressed");
    }
}

/// Notifier that emits notifications as log events.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn permission(&self) -> NotificationPermission {
        NotificationPermission::Granted
    }

    fn show(&self, notification: &Notification) {
        info!(title = %notification.title, body = %notification.body, "Notification");
    }
}
