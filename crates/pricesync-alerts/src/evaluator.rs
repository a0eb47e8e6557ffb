//! Alert evaluation.
//!
//! Alerts move from active to triggered exactly once. Triggered alerts stay
//! in place until removed explicitly; further price movement never resets
//! them.

use crate::notifier::{Notification, NotificationPermission, Notifier};
use parking_lot::Mutex;
use pricesync_core::{Alert, AlertCondition, CoreError, PriceSample, Symbol};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Default)]
struct EvaluatorState {
    alerts: Vec<Alert>,
    /// Recently triggered, oldest first. Cleared by the caller.
    triggered: Vec<Alert>,
}

/// Threshold alert evaluator.
pub struct AlertEvaluator {
    state: Mutex<EvaluatorState>,
    notifier: Arc<dyn Notifier>,
}

impl AlertEvaluator {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            state: Mutex::new(EvaluatorState::default()),
            notifier,
        }
    }

    /// Add an alert, replacing the active one for the same (symbol, condition).
    ///
    /// Triggered alerts for the pair are kept. The target must be positive.
    pub fn add_alert(
        &self,
        symbol: Symbol,
        target_price: Decimal,
        condition: AlertCondition,
    ) -> pricesync_core::Result<()> {
        if target_price <= Decimal::ZERO {
            return Err(CoreError::InvalidPrice(format!(
                "alert target for {symbol} must be positive, got {target_price}"
            )));
        }

        let mut state = self.state.lock();
        let before = state.alerts.len();
        state
            .alerts
            .retain(|a| !(a.is_active() && a.is_for(&symbol, condition)));
        if state.alerts.len() != before {
            debug!(%symbol, %condition, "Replacing active alert");
        }

        info!(%symbol, %condition, target = %target_price, "Alert added");
        state.alerts.push(Alert::new(symbol, target_price, condition));
        Ok(())
    }

    /// Remove every alert for (symbol, condition), triggered or not.
    pub fn remove_alert(&self, symbol: &Symbol, condition: AlertCondition) -> usize {
        let mut state = self.state.lock();
        let before = state.alerts.len();
        state.alerts.retain(|a| !a.is_for(symbol, condition));
        let removed = before - state.alerts.len();
        if removed > 0 {
            info!(%symbol, %condition, removed, "Alert removed");
        }
        removed
    }

    /// Check a sample against active alerts for its symbol.
    ///
    /// Returns the alerts fired by this sample.
    pub fn on_sample(&self, sample: &PriceSample) -> Vec<Alert> {
        let fired: Vec<Alert> = {
            let mut state = self.state.lock();
            let fired: Vec<Alert> = state
                .alerts
                .iter_mut()
                .filter(|a| {
                    a.is_active() && a.symbol == sample.symbol && a.is_crossed_by(sample.price)
                })
                .map(|a| {
                    a.triggered = true;
                    a.triggered_at = Some(sample.timestamp);
                    a.clone()
                })
                .collect();
            state.triggered.extend(fired.iter().cloned());
            fired
        };

        for alert in &fired {
            info!(
                symbol = %alert.symbol,
                condition = %alert.condition,
                target = %alert.target_price,
                price = %sample.price,
                "Alert triggered"
            );
            self.notify(alert, sample.price);
        }

        fired
    }

    fn notify(&self, alert: &Alert, price: Decimal) {
        match self.notifier.permission() {
            NotificationPermission::Granted => {
                self.notifier.show(&Notification::for_alert(alert, price));
            }
            permission => {
                debug!(?permission, "Notifications not permitted, skipping");
            }
        }
    }

    /// Recently triggered alerts, oldest first.
    pub fn triggered(&self) -> Vec<Alert> {
        self.state.lock().triggered.clone()
    }

    /// Empty the recently triggered list; alerts stay triggered.
    pub fn clear_triggered(&self) {
        self.state.lock().triggered.clear();
    }

    /// All alerts in insertion order.
    pub fn alerts(&self) -> Vec<Alert> {
        self.state.lock().alerts.clone()
    }

    /// The active alert for (symbol, condition), if any.
    pub fn active_alert(&self, symbol: &Symbol, condition: AlertCondition) -> Option<Alert> {
        self.state
            .lock()
            .alerts
            .iter()
            .find(|a| a.is_active() && a.is_for(symbol, condition))
            .cloned()
    }
}
