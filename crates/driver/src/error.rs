use thiserror::Error;

/// Error taxonomy surfaced by browser-control implementations.
///
/// Retry decisions at call sites match on the kind via
/// [`DriverError::is_transient`], never on message text.
#[derive(Clone, Debug, Error)]
pub enum DriverError {
    /// A known-retriable fault in the interception layer, e.g. the traffic
    /// collection mutating while an index is being read.
    #[error("transient driver fault: {0}")]
    Transient(String),
    /// The page did not finish loading within the configured bound.
    #[error("navigation timed out")]
    NavTimeout,
    /// In-page script execution failed or returned an undecodable value.
    #[error("script execution failed: {0}")]
    Script(String),
    /// A protocol-level failure talking to the browser.
    #[error("driver protocol failure: {0}")]
    Protocol(String),
    /// The browser process could not be started or prepared.
    #[error("browser launch failed: {0}")]
    Launch(String),
}

impl DriverError {
    /// Whether the fault is worth retrying in place at the same call site.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
