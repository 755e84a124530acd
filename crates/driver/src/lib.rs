//! Browser-control port for the adframe monitor.
//!
//! The monitoring core talks to the browser exclusively through the
//! [`BrowserControl`] trait: navigation, a DOM iframe snapshot, a scroll
//! stimulus and an append-only view of the intercepted traffic. The concrete
//! [`CdpDriver`] drives a Chromium instance over the DevTools protocol and
//! feeds the traffic log from `Network.*` events.

pub mod cdp;
pub mod config;
pub mod control;
pub mod error;
pub mod traffic;

pub use cdp::CdpDriver;
pub use config::DriverConfig;
pub use control::{with_retry, BrowserControl};
pub use error::DriverError;
pub use traffic::TrafficLog;
