//! Record models for intercepted traffic and tracked iframes.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::domain::extract_domain;

/// One iframe element as reported by the DOM snapshot script.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct IframeElement {
    pub src: String,
    #[serde(default)]
    pub id: String,
    #[serde(rename = "dataId", default)]
    pub data_id: String,
}

/// Response metadata as observed on the wire; absent while the response is
/// still in flight.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseView {
    pub status: i64,
    pub reason: String,
    pub headers: Vec<(String, String)>,
}

/// One intercepted network exchange, as exposed by the browser driver.
///
/// Headers keep their observed order; duplicate names resolve last-wins when
/// looked up or collapsed into a map.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestView {
    pub url: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub response: Option<ResponseView>,
    pub body: Option<Vec<u8>>,
}

impl RequestView {
    /// Case-insensitive header lookup, last occurrence wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Collapse the ordered header list into a map, last occurrence wins.
    pub fn headers_map(&self) -> BTreeMap<String, String> {
        self.headers
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// Response metadata as serialized into the network log.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseMeta {
    pub status_code: i64,
    pub reason: String,
    pub headers: BTreeMap<String, String>,
}

/// One captured request, immutable once built; attribution is stamped in at
/// flush time via [`AttributedRecord`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestRecord {
    pub timestamp: i64,
    pub url: String,
    pub method: String,
    pub request_headers: BTreeMap<String, String>,
    pub response: Option<ResponseMeta>,
    pub visited_site: String,
}

impl RequestRecord {
    pub fn from_view(view: &RequestView, visited_site: &str) -> Self {
        let response = view.response.as_ref().map(|resp| ResponseMeta {
            status_code: resp.status,
            reason: resp.reason.clone(),
            headers: resp
                .headers
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        });
        Self {
            timestamp: Utc::now().timestamp(),
            url: view.url.clone(),
            method: view.method.clone(),
            request_headers: view.headers_map(),
            response,
            visited_site: visited_site.to_string(),
        }
    }
}

/// A request record with its iframe attribution, as written to the network
/// log (one JSON object per line).
#[derive(Serialize)]
pub struct AttributedRecord<'a> {
    #[serde(flatten)]
    pub record: &'a RequestRecord,
    pub iframe_src: &'a str,
    pub iframe_domain: &'a str,
}

/// Lifecycle metadata for one tracked iframe within a site visit.
///
/// `first_seen`/`last_seen` are seconds relative to the monitoring epoch;
/// `first_seen <= last_seen` holds at every observation point.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct IframeRecord {
    pub src: String,
    pub id: String,
    pub data_id: String,
    pub domain: String,
    pub first_seen: f64,
    pub last_seen: f64,
}

impl IframeRecord {
    pub fn new(element: &IframeElement, now_rel: f64) -> Self {
        Self {
            src: element.src.clone(),
            id: element.id.clone(),
            data_id: element.data_id.clone(),
            domain: extract_domain(&element.src),
            first_seen: now_rel,
            last_seen: now_rel,
        }
    }

    /// Refresh `last_seen` for a tick where the iframe is still visible.
    pub fn touch(&mut self, now_rel: f64) {
        if now_rel >= self.last_seen {
            self.last_seen = now_rel;
        }
    }

    pub fn duration_seconds(&self) -> f64 {
        self.last_seen - self.first_seen
    }
}

/// The per-visit iframe record as serialized into the metadata log.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct IframeMetadataRecord {
    pub visited_site: String,
    pub src: String,
    pub id: String,
    pub data_id: String,
    pub domain: String,
    pub first_seen: f64,
    pub last_seen: f64,
    pub duration_seconds: f64,
}

impl IframeMetadataRecord {
    pub fn from_record(record: &IframeRecord, visited_site: &str) -> Self {
        Self {
            visited_site: visited_site.to_string(),
            src: record.src.clone(),
            id: record.id.clone(),
            data_id: record.data_id.clone(),
            domain: record.domain.clone(),
            first_seen: record.first_seen,
            last_seen: record.last_seen,
            duration_seconds: record.duration_seconds(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view_with_headers(headers: Vec<(&str, &str)>) -> RequestView {
        RequestView {
            url: "https://ads.example.com/pixel".into(),
            method: "GET".into(),
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            response: None,
            body: None,
        }
    }

    #[test]
    fn header_lookup_is_case_insensitive_last_wins() {
        let view = view_with_headers(vec![
            ("Referer", "https://a.example.com/"),
            ("referer", "https://b.example.com/"),
        ]);
        assert_eq!(view.header("REFERER"), Some("https://b.example.com/"));
    }

    #[test]
    fn headers_map_collapses_duplicates_last_wins() {
        let view = view_with_headers(vec![("X-Foo", "1"), ("X-Foo", "2")]);
        assert_eq!(view.headers_map().get("X-Foo").map(String::as_str), Some("2"));
    }

    #[test]
    fn attributed_record_flattens_into_one_object() {
        let view = view_with_headers(vec![("Accept", "*/*")]);
        let record = RequestRecord::from_view(&view, "https://site.test/");
        let line = serde_json::to_value(AttributedRecord {
            record: &record,
            iframe_src: "https://ads.example.com/frame",
            iframe_domain: "ads.example.com",
        })
        .unwrap();
        assert_eq!(line["url"], "https://ads.example.com/pixel");
        assert_eq!(line["visited_site"], "https://site.test/");
        assert_eq!(line["iframe_domain"], "ads.example.com");
        assert!(line["response"].is_null());
    }

    #[test]
    fn iframe_record_duration_never_negative() {
        let element = IframeElement {
            src: "https://ads.example.com/frame".into(),
            id: "mllwtl-1".into(),
            data_id: String::new(),
        };
        let mut record = IframeRecord::new(&element, 2.0);
        record.touch(4.0);
        record.touch(3.0); // stale tick must not move last_seen backwards
        assert_eq!(record.first_seen, 2.0);
        assert_eq!(record.last_seen, 4.0);
        assert_eq!(record.duration_seconds(), 2.0);
        assert_eq!(record.domain, "ads.example.com");
    }
}
