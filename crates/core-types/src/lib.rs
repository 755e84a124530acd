//! Shared primitives for the adframe monitor crates.
//!
//! Hosts the record models that flow between the browser driver, the
//! attribution engine and the persistence pipeline, plus the domain utility
//! everything else leans on.

pub mod domain;
pub mod records;

pub use domain::extract_domain;
pub use records::{
    AttributedRecord, IframeElement, IframeMetadataRecord, IframeRecord, RequestRecord,
    RequestView, ResponseMeta, ResponseView,
};
