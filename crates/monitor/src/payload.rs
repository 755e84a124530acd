//! POST payload extraction for relay-host requests with textual bodies.

use std::path::PathBuf;

use adframe_core_types::RequestView;
use adframe_persist::{FileSink, WriteTask};
use chrono::Utc;
use tracing::{error, info, warn};

/// Saves qualifying POST bodies to individual files under the run's
/// `post_payloads/` directory. The counter is per-session and survives
/// across site visits.
pub struct PayloadExtractor {
    dir: PathBuf,
    relay_marker: String,
    counter: u64,
    sink: FileSink,
}

impl PayloadExtractor {
    pub fn new(dir: PathBuf, relay_marker: String, sink: FileSink) -> Self {
        Self {
            dir,
            relay_marker,
            counter: 0,
            sink,
        }
    }

    pub fn saved(&self) -> u64 {
        self.counter
    }

    /// Inspect one observed request; writes a payload file when the request
    /// is a relay-host POST with a textual content type and a non-empty
    /// body.
    pub fn inspect(&mut self, view: &RequestView, site_url: &str) {
        if !view.method.eq_ignore_ascii_case("POST") || !view.url.contains(&self.relay_marker) {
            return;
        }
        let Some(content_type) = view.header("content-type") else {
            return;
        };
        if !content_type.to_ascii_lowercase().contains("text") {
            return;
        }
        let body = match &view.body {
            Some(bytes) if !bytes.is_empty() => bytes,
            _ => {
                warn!(url = %view.url, "relay POST carries no body, skipping payload");
                return;
            }
        };

        self.counter += 1;
        let filename = format!(
            "post_payload_{:04}_{}_{}.txt",
            self.counter,
            Utc::now().format("%Y%m%d_%H%M%S_%6f"),
            site_slug(site_url),
        );
        let content = render_payload(view, site_url, content_type, body);
        let path = self.dir.join(&filename);
        match self.sink.enqueue(WriteTask::replace(path, content)) {
            Ok(()) => info!(%filename, bytes = body.len(), "queued POST payload"),
            Err(err) => error!(%err, "failed to queue POST payload"),
        }
    }
}

fn render_payload(view: &RequestView, site_url: &str, content_type: &str, body: &[u8]) -> String {
    let rule = "=".repeat(70);
    format!(
        "POST Payload Capture\n{rule}\nTimestamp: {}\nVisited Site: {}\nURL: {}\nContent-Type: {}\nContent-Length: {} bytes\n{rule}\n\n{}",
        Utc::now().to_rfc3339(),
        site_url,
        view.url,
        content_type,
        body.len(),
        decode_body(body),
    )
}

/// Decode fallback chain: UTF-8, then Latin-1, then a marked hex dump.
///
/// Latin-1 is treated as failing when the bytes include C1 control codes
/// (0x80..=0x9F), which have no printable Latin-1 mapping.
pub fn decode_body(bytes: &[u8]) -> String {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }
    if bytes.iter().all(|byte| !(0x80..=0x9f).contains(byte)) {
        return bytes.iter().map(|byte| char::from(*byte)).collect();
    }
    let hex: String = bytes.iter().map(|byte| format!("{byte:02x}")).collect();
    format!("[Binary data, hex dump]:\n{hex}")
}

fn site_slug(site_url: &str) -> String {
    site_url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .replace('/', "_")
        .chars()
        .take(50)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_bodies_pass_through() {
        assert_eq!(decode_body("hello world".as_bytes()), "hello world");
    }

    #[test]
    fn latin1_fallback_maps_high_bytes() {
        // "café" in Latin-1: the 0xE9 byte is invalid UTF-8 on its own.
        let bytes = [0x63, 0x61, 0x66, 0xe9];
        assert_eq!(decode_body(&bytes), "café");
    }

    #[test]
    fn undecodable_bodies_become_a_marked_hex_dump() {
        // 0x85 is a C1 control code: invalid UTF-8 here, unprintable Latin-1.
        let bytes = [0xff, 0x85, 0x00];
        let decoded = decode_body(&bytes);
        assert!(decoded.starts_with("[Binary data, hex dump]:\n"));
        assert!(decoded.ends_with("ff8500"));
    }

    #[test]
    fn site_slug_strips_scheme_and_truncates() {
        let slug = site_slug("https://news.example.com/some/long/path");
        assert_eq!(slug, "news.example.com_some_long_path");
        let long = format!("https://{}/", "a".repeat(100));
        assert_eq!(site_slug(&long).len(), 50);
    }
}
