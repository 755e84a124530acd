//! In-process append-only log of intercepted exchanges.

use std::collections::HashMap;

use adframe_core_types::{RequestView, ResponseView};
use parking_lot::Mutex;

/// Append-only traffic log fed by the CDP event listeners.
///
/// Entries are appended when the request goes on the wire; the matching
/// response is patched in later by request id. Indices are stable until
/// [`TrafficLog::clear`].
#[derive(Default)]
pub struct TrafficLog {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    entries: Vec<RequestView>,
    by_request_id: HashMap<String, usize>,
}

impl TrafficLog {
    pub fn record_request(&self, request_id: String, view: RequestView) {
        let mut inner = self.inner.lock();
        let index = inner.entries.len();
        inner.entries.push(view);
        inner.by_request_id.insert(request_id, index);
    }

    /// Attach response metadata to a previously recorded request. Responses
    /// for ids cleared in the meantime are dropped.
    pub fn record_response(&self, request_id: &str, response: ResponseView) {
        let mut inner = self.inner.lock();
        if let Some(index) = inner.by_request_id.get(request_id).copied() {
            if let Some(entry) = inner.entries.get_mut(index) {
                entry.response = Some(response);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<RequestView> {
        self.inner.lock().entries.get(index).cloned()
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.by_request_id.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(url: &str) -> RequestView {
        RequestView {
            url: url.into(),
            method: "GET".into(),
            headers: Vec::new(),
            response: None,
            body: None,
        }
    }

    #[test]
    fn responses_patch_their_request_entry() {
        let log = TrafficLog::default();
        log.record_request("a".into(), view("https://one.test/"));
        log.record_request("b".into(), view("https://two.test/"));
        log.record_response(
            "a",
            ResponseView {
                status: 204,
                reason: "No Content".into(),
                headers: Vec::new(),
            },
        );

        assert_eq!(log.len(), 2);
        let first = log.get(0).unwrap();
        assert_eq!(first.response.as_ref().unwrap().status, 204);
        assert!(log.get(1).unwrap().response.is_none());
    }

    #[test]
    fn late_responses_after_clear_are_dropped() {
        let log = TrafficLog::default();
        log.record_request("a".into(), view("https://one.test/"));
        log.clear();
        log.record_request("b".into(), view("https://two.test/"));
        log.record_response(
            "a",
            ResponseView {
                status: 200,
                reason: "OK".into(),
                headers: Vec::new(),
            },
        );
        assert!(log.get(0).unwrap().response.is_none());
    }
}
