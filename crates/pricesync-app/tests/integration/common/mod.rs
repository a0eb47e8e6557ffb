//! Shared test fixtures.

#![allow(dead_code)]

pub mod mock_ws;
pub mod quotes;

use std::future::Future;
use std::time::Duration;

/// Poll `check` until it returns true or `limit` elapses.
pub async fn eventually<F, Fut>(limit: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    tokio::time::timeout(limit, async {
        loop {
            if check().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .is_ok()
}
