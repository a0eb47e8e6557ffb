//! WebSocket message types.

use pricesync_core::Symbol;
use serde::{Deserialize, Serialize};

/// `type` value of inbound price ticks.
pub const PRICE_UPDATE_TYPE: &str = "price_update";

// ============================================================================
// Outbound (client -> feed)
// ============================================================================

/// Control frame sent to the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Subscribe { symbols: Vec<Symbol> },
    Unsubscribe { symbols: Vec<Symbol> },
}

impl ClientMessage {
    pub fn subscribe(symbols: impl IntoIterator<Item = Symbol>) -> Self {
        Self::Subscribe {
            symbols: symbols.into_iter().collect(),
        }
    }

    pub fn unsubscribe(symbols: impl IntoIterator<Item = Symbol>) -> Self {
        Self::Unsubscribe {
            symbols: symbols.into_iter().collect(),
        }
    }

    /// Serialize to a JSON text frame.
    pub fn to_text(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// ============================================================================
// Inbound (feed -> client)
// ============================================================================

/// Inbound frame with its `type` split from the remaining fields.
///
/// Payload interpretation is left to the consumer; other features may
/// consume other message types.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WsMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(flatten)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl WsMessage {
    /// Parse a JSON text frame.
    pub fn from_text(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn is_price_update(&self) -> bool {
        self.msg_type == PRICE_UPDATE_TYPE
    }
}
