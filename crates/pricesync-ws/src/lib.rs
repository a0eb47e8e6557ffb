//! Streaming price feed client.
//!
//! Provides WebSocket connectivity with:
//! - Automatic reconnection with exponential backoff, bounded by a retry ceiling
//! - Subscription tracking, re-sent wholesale on every (re)connection
//! - Channel-based event routing (open/message/close/error)
//! - Endpoint derivation from a page origin

pub mod backoff;
pub mod connection;
pub mod endpoint;
pub mod error;
pub mod message;
pub mod subscription;
pub mod ws_write_handle;

pub use backoff::ReconnectBackoff;
pub use connection::{
    ConnectionConfig, ConnectionManager, ConnectionState, WsEvent, ABNORMAL_CLOSE_CODE,
    NORMAL_CLOSE_CODE, NO_STATUS_CLOSE_CODE,
};
pub use endpoint::stream_url;
pub use error::{WsError, WsResult};
pub use message::{ClientMessage, WsMessage, PRICE_UPDATE_TYPE};
pub use subscription::SubscriptionTracker;
pub use ws_write_handle::WsWriteHandle;

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any secure WebSocket connections are made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
