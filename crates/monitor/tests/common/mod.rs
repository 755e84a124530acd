#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};

use adframe_core_types::{IframeElement, RequestView};
use adframe_driver::{BrowserControl, DriverError};
use async_trait::async_trait;
use parking_lot::Mutex;

/// One scripted poll tick: the iframes the snapshot reports, plus requests
/// that land in the traffic log at the same time.
pub struct Tick {
    pub iframes: Vec<IframeElement>,
    pub new_requests: Vec<RequestView>,
}

/// Scripted in-memory browser driver for tests.
#[derive(Default)]
pub struct FakeDriver {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    ticks: VecDeque<Tick>,
    traffic: Vec<RequestView>,
    faulty_indices: HashSet<usize>,
    navigations: u32,
    scrolls: u32,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_tick(&self, iframes: Vec<IframeElement>, new_requests: Vec<RequestView>) {
        self.inner.lock().ticks.push_back(Tick {
            iframes,
            new_requests,
        });
    }

    pub fn push_request(&self, view: RequestView) {
        self.inner.lock().traffic.push(view);
    }

    /// Make `request_at(index)` fail with a transient fault.
    pub fn fail_index(&self, index: usize) {
        self.inner.lock().faulty_indices.insert(index);
    }

    pub fn navigations(&self) -> u32 {
        self.inner.lock().navigations
    }

    pub fn scrolls(&self) -> u32 {
        self.inner.lock().scrolls
    }
}

#[async_trait]
impl BrowserControl for FakeDriver {
    async fn navigate(&self, _url: &str) -> Result<(), DriverError> {
        self.inner.lock().navigations += 1;
        Ok(())
    }

    async fn iframe_snapshot(&self, _marker: &str) -> Result<Vec<IframeElement>, DriverError> {
        let mut inner = self.inner.lock();
        match inner.ticks.pop_front() {
            Some(tick) => {
                inner.traffic.extend(tick.new_requests);
                Ok(tick.iframes)
            }
            None => Ok(Vec::new()),
        }
    }

    async fn scroll_by(&self, _pixels: i64) -> Result<(), DriverError> {
        self.inner.lock().scrolls += 1;
        Ok(())
    }

    async fn request_count(&self) -> Result<usize, DriverError> {
        Ok(self.inner.lock().traffic.len())
    }

    async fn request_at(&self, index: usize) -> Result<Option<RequestView>, DriverError> {
        let inner = self.inner.lock();
        if inner.faulty_indices.contains(&index) {
            return Err(DriverError::Transient("collection mutated during read".into()));
        }
        Ok(inner.traffic.get(index).cloned())
    }

    async fn clear_requests(&self) -> Result<(), DriverError> {
        let mut inner = self.inner.lock();
        inner.traffic.clear();
        inner.faulty_indices.clear();
        Ok(())
    }
}

pub fn frame(src: &str) -> IframeElement {
    IframeElement {
        src: src.into(),
        id: format!("mllwtl-{}", src.len()),
        data_id: String::new(),
    }
}

pub fn get_request(url: &str) -> RequestView {
    RequestView {
        url: url.into(),
        method: "GET".into(),
        headers: Vec::new(),
        response: None,
        body: None,
    }
}

pub fn relay_request(referer: Option<&str>) -> RequestView {
    let mut headers = vec![("Accept".to_string(), "*/*".to_string())];
    if let Some(referer) = referer {
        headers.push(("Referer".to_string(), referer.to_string()));
    }
    RequestView {
        url: "https://request.mellow.tel/api/task".into(),
        method: "GET".into(),
        headers,
        response: None,
        body: None,
    }
}

pub fn relay_post(content_type: &str, body: Option<&[u8]>) -> RequestView {
    RequestView {
        url: "https://request.mellow.tel/api/submit".into(),
        method: "POST".into(),
        headers: vec![("Content-Type".to_string(), content_type.to_string())],
        response: None,
        body: body.map(|bytes| bytes.to_vec()),
    }
}
