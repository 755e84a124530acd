//! The browser-control port and its bounded-retry helper.

use std::future::Future;
use std::time::Duration;

use adframe_core_types::{IframeElement, RequestView};
use async_trait::async_trait;
use tokio::time::sleep;
use tracing::warn;

use crate::error::DriverError;

/// Everything the monitoring core needs from a live browser session.
///
/// The intercepted-traffic view is append-only within one visit: indices
/// handed out by [`request_count`](Self::request_count) stay valid until
/// [`clear_requests`](Self::clear_requests).
#[async_trait]
pub trait BrowserControl: Send + Sync {
    /// Blocking navigation, bounded by the driver's page-load timeout.
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    /// Snapshot of iframes whose `id` or `data-id` contains `marker`.
    async fn iframe_snapshot(&self, marker: &str) -> Result<Vec<IframeElement>, DriverError>;

    /// Scroll the page down by `pixels`.
    async fn scroll_by(&self, pixels: i64) -> Result<(), DriverError>;

    /// Total number of intercepted exchanges observed so far.
    async fn request_count(&self) -> Result<usize, DriverError>;

    /// Read one intercepted exchange; `None` when the index is out of range.
    /// A fault here is scoped to the single index, callers may skip it.
    async fn request_at(&self, index: usize) -> Result<Option<RequestView>, DriverError>;

    /// Drop all intercepted exchanges, resetting indices to zero.
    async fn clear_requests(&self) -> Result<(), DriverError>;
}

/// Run `op` up to `attempts` times, sleeping `backoff` between tries.
///
/// Only transient faults are retried; anything else propagates immediately.
pub async fn with_retry<T, F, Fut>(
    what: &str,
    attempts: u32,
    backoff: Duration,
    mut op: F,
) -> Result<T, DriverError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DriverError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < attempts => {
                warn!(what, attempt, max_attempts = attempts, %err, "transient driver fault, retrying");
                sleep(backoff).await;
            }
            Err(err) => return Err(err),
        }
    }
}
