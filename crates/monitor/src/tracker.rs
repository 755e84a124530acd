//! Iframe lifecycle tracking: snapshot diffing and metadata upkeep.

use std::collections::HashSet;

use adframe_core_types::{IframeElement, IframeRecord};
use tracing::info;

use crate::session::SessionState;

/// Result of diffing one DOM snapshot against the previous tick.
#[derive(Debug)]
pub struct SnapshotDiff {
    pub appeared: Vec<String>,
    pub disappeared: Vec<String>,
    /// The visible set this snapshot represents; applied to the session by
    /// the caller once the disappearance flush has run.
    pub visible: HashSet<String>,
}

/// Fold one marker-filtered DOM snapshot into the session.
///
/// New iframes get a fresh [`IframeRecord`] (and their domain joins the
/// tracked set); known ones get `last_seen` refreshed. Metadata for iframes
/// missing from the snapshot is retained for the end-of-visit save; the
/// session's visible set is deliberately left untouched here (see
/// [`SessionState::apply_visibility`]).
pub fn observe_snapshot(
    session: &mut SessionState,
    snapshot: &[IframeElement],
    now_rel: f64,
) -> SnapshotDiff {
    let mut visible = HashSet::new();
    for element in snapshot {
        if element.src.is_empty() {
            continue;
        }
        visible.insert(element.src.clone());
        if let Some(record) = session.iframe_metadata.get_mut(&element.src) {
            record.touch(now_rel);
            continue;
        }
        let record = IframeRecord::new(element, now_rel);
        if !record.domain.is_empty() && session.tracked_domains.insert(record.domain.clone()) {
            info!(domain = %record.domain, "tracking new domain");
        }
        session.iframe_metadata.insert(element.src.clone(), record);
    }

    let appeared = visible
        .difference(&session.currently_visible)
        .cloned()
        .collect();
    let disappeared = session
        .currently_visible
        .difference(&visible)
        .cloned()
        .collect();
    SnapshotDiff {
        appeared,
        disappeared,
        visible,
    }
}
