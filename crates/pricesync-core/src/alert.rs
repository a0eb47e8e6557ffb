//! Price alert rules.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::types::Symbol;

/// Direction of a threshold crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCondition {
    /// Fires when price >= target.
    Above,
    /// Fires when price <= target.
    Below,
}

impl AlertCondition {
    /// Check whether `price` satisfies this condition against `target`.
    pub fn is_met(&self, price: Decimal, target: Decimal) -> bool {
        match self {
            Self::Above => price >= target,
            Self::Below => price <= target,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Above => "above",
            Self::Below => "below",
        }
    }
}

impl fmt::Display for AlertCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertCondition {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "above" => Ok(Self::Above),
            "below" => Ok(Self::Below),
            other => Err(CoreError::InvalidCondition(other.to_string())),
        }
    }
}

/// A standing rule that fires once when the price crosses a threshold.
///
/// `triggered` only ever moves from false to true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub symbol: Symbol,
    pub target_price: Decimal,
    pub condition: AlertCondition,
    pub triggered: bool,
    /// Timestamp of the sample that fired the alert.
    pub triggered_at: Option<i64>,
}

impl Alert {
    /// Create an untriggered alert.
    pub fn new(symbol: Symbol, target_price: Decimal, condition: AlertCondition) -> Self {
        Self {
            symbol,
            target_price,
            condition,
            triggered: false,
            triggered_at: None,
        }
    }

    /// Untriggered alerts are the only ones checked against new samples.
    pub fn is_active(&self) -> bool {
        !self.triggered
    }

    /// Check whether a price would fire this alert, ignoring triggered state.
    pub fn is_crossed_by(&self, price: Decimal) -> bool {
        self.condition.is_met(price, self.target_price)
    }

    /// Check whether this alert is keyed by `(symbol, condition)`.
    pub fn is_for(&self, symbol: &Symbol, condition: AlertCondition) -> bool {
        self.symbol == *symbol && self.condition == condition
    }
}
