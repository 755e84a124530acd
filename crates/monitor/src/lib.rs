//! The adframe monitoring core.
//!
//! Drives one site visit at a time: polls the DOM for SDK-injected iframes,
//! tracks their lifecycle, attributes intercepted requests to the iframe
//! that caused them, buffers the attributed records per iframe and flushes
//! them to the persistence queue when an iframe disappears or the visit
//! ends.

pub mod attribution;
pub mod buffer;
pub mod config;
pub mod error;
pub mod monitor;
pub mod payload;
pub mod session;
pub mod tracker;

pub use config::{MonitorConfig, OutputPaths};
pub use error::MonitorError;
pub use monitor::{PollingMonitor, VisitPhase, VisitReport};
pub use session::{AggregationBucket, SessionState};
