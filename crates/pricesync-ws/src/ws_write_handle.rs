//! WebSocket write handle for subscription control.
//!
//! Frames are queued on the connection's outbound channel and written by
//! the message loop. Nothing is queued while the connection is not open.

use crate::connection::ConnectionState;
use crate::message::ClientMessage;
use crate::subscription::SubscriptionTracker;
use parking_lot::RwLock;
use pricesync_core::Symbol;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Write handle for sending control frames to the feed.
///
/// Cheap to clone and safe to share across tasks.
#[derive(Clone)]
pub struct WsWriteHandle {
    tx: mpsc::Sender<ClientMessage>,
    state: Arc<RwLock<ConnectionState>>,
    subscriptions: Arc<SubscriptionTracker>,
}

impl WsWriteHandle {
    /// Create a new write handle.
    pub fn new(
        tx: mpsc::Sender<ClientMessage>,
        state: Arc<RwLock<ConnectionState>>,
        subscriptions: Arc<SubscriptionTracker>,
    ) -> Self {
        Self {
            tx,
            state,
            subscriptions,
        }
    }

    /// Subscribe to additional symbols.
    ///
    /// Returns `true` if a frame was queued. When the connection is not
    /// open this only logs a warning; the full tracked set is sent again
    /// on the next successful connection.
    pub async fn subscribe(&self, symbols: &[Symbol]) -> bool {
        if !self.send(ClientMessage::subscribe(symbols.iter().cloned()), symbols).await {
            return false;
        }
        self.subscriptions.add(symbols);
        true
    }

    /// Unsubscribe from symbols. Same delivery rules as [`Self::subscribe`].
    pub async fn unsubscribe(&self, symbols: &[Symbol]) -> bool {
        if !self.send(ClientMessage::unsubscribe(symbols.iter().cloned()), symbols).await {
            return false;
        }
        self.subscriptions.remove(symbols);
        true
    }

    /// Check if the connection is open.
    pub fn is_connected(&self) -> bool {
        *self.state.read() == ConnectionState::Open
    }

    async fn send(&self, msg: ClientMessage, symbols: &[Symbol]) -> bool {
        if symbols.is_empty() {
            debug!("No symbols given, nothing to send");
            return false;
        }

        if !self.is_connected() {
            warn!(?msg, "Connection not open, skipping control frame");
            return false;
        }

        if self.tx.send(msg).await.is_err() {
            warn!("Outbound channel closed, control frame dropped");
            return false;
        }

        true
    }
}
