//! Per-visit mutable state, constructed fresh for every site.

use std::collections::{HashMap, HashSet};

use adframe_core_types::{extract_domain, IframeRecord, RequestRecord};

/// Buffered attributed requests for one iframe, pending flush.
#[derive(Clone, Debug, Default)]
pub struct AggregationBucket {
    pub domain: String,
    pub requests: Vec<RequestRecord>,
}

/// All state scoped to one site visit. Nothing here survives into the next
/// visit; only the output files and the payload counter are cumulative.
#[derive(Debug, Default)]
pub struct SessionState {
    /// Domains of every iframe tracked this visit, for the relevance test.
    pub tracked_domains: HashSet<String>,
    /// `src` values visible as of the last applied snapshot.
    pub currently_visible: HashSet<String>,
    /// High-water mark into the intercepted-request list; non-decreasing.
    pub last_processed_request_index: usize,
    /// Lifecycle metadata per iframe `src`; never pruned mid-visit.
    pub iframe_metadata: HashMap<String, IframeRecord>,
    /// Pending attributed requests keyed by iframe `src`.
    pub buckets: HashMap<String, AggregationBucket>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attributed request to the bucket for `src`, creating the
    /// bucket lazily.
    pub fn push_attributed(&mut self, src: &str, record: RequestRecord) {
        let bucket = self
            .buckets
            .entry(src.to_string())
            .or_insert_with(|| AggregationBucket {
                domain: extract_domain(src),
                requests: Vec::new(),
            });
        bucket.requests.push(record);
    }

    /// Replace the visible set. Kept separate from snapshot observation so
    /// that a disappearing iframe can still receive its final requests
    /// against the previous tick's set.
    pub fn apply_visibility(&mut self, visible: HashSet<String>) {
        self.currently_visible = visible;
    }

    /// Total buffered records across all buckets.
    pub fn buffered_total(&self) -> usize {
        self.buckets.values().map(|bucket| bucket.requests.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adframe_core_types::RequestView;

    fn record(url: &str) -> RequestRecord {
        let view = RequestView {
            url: url.into(),
            method: "GET".into(),
            headers: Vec::new(),
            response: None,
            body: None,
        };
        RequestRecord::from_view(&view, "https://site.test/")
    }

    #[test]
    fn buckets_are_created_lazily_with_the_iframe_domain() {
        let mut session = SessionState::new();
        session.push_attributed("https://ads.example.com/frame", record("https://ads.example.com/a"));
        session.push_attributed("https://ads.example.com/frame", record("https://ads.example.com/b"));

        assert_eq!(session.buckets.len(), 1);
        let bucket = &session.buckets["https://ads.example.com/frame"];
        assert_eq!(bucket.domain, "ads.example.com");
        assert_eq!(bucket.requests.len(), 2);
        assert_eq!(session.buffered_total(), 2);
    }
}
