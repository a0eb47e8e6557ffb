//! Stream endpoint derivation.
//!
//! The feed lives on the same host as the page, at a fixed path, using the
//! streaming scheme that matches the page's own security.

use crate::error::{WsError, WsResult};
use tokio_tungstenite::tungstenite::http::Uri;

/// Fixed path of the price feed.
pub const STREAM_PATH: &str = "/ws";

/// Derive the feed URL from a page origin.
///
/// `https` maps to `wss`, `http` maps to `ws`. Origins that already use a
/// streaming scheme are kept as-is. Path and query of the origin are ignored.
pub fn stream_url(origin: &str) -> WsResult<String> {
    let uri: Uri = origin
        .trim()
        .parse()
        .map_err(|e| WsError::InvalidEndpoint(format!("{origin}: {e}")))?;

    let scheme = match uri.scheme_str().map(str::to_ascii_lowercase).as_deref() {
        Some("https") | Some("wss") => "wss",
        Some("http") | Some("ws") => "ws",
        Some(other) => {
            return Err(WsError::InvalidEndpoint(format!(
                "unsupported scheme {other:?} in {origin}"
            )))
        }
        None => return Err(WsError::InvalidEndpoint(format!("missing scheme in {origin}"))),
    };

    let authority = uri
        .authority()
        .ok_or_else(|| WsError::InvalidEndpoint(format!("missing host in {origin}")))?;

    Ok(format!("{scheme}://{authority}{STREAM_PATH}"))
}
