mod common;

use adframe_monitor::payload::PayloadExtractor;
use adframe_persist::{FileSink, PersistConfig};

const SITE: &str = "https://news.example.org/story";

fn extractor(dir: &std::path::Path, sink: FileSink) -> PayloadExtractor {
    PayloadExtractor::new(dir.to_path_buf(), "request.mellow.tel".into(), sink)
}

#[tokio::test]
async fn textual_relay_post_is_written_with_a_header_block() {
    let dir = tempfile::tempdir().unwrap();
    let payload_dir = dir.path().join("post_payloads");
    let (sink, handle) = FileSink::spawn(PersistConfig::default());
    let mut payloads = extractor(&payload_dir, sink.clone());

    payloads.inspect(
        &common::relay_post("text/plain; charset=utf-8", Some(b"hello payload")),
        SITE,
    );
    assert_eq!(payloads.saved(), 1);

    drop(payloads);
    handle.shutdown(sink).await;

    let entries: Vec<_> = std::fs::read_dir(&payload_dir)
        .unwrap()
        .map(|entry| entry.unwrap())
        .collect();
    assert_eq!(entries.len(), 1);
    let name = entries[0].file_name().into_string().unwrap();
    assert!(name.starts_with("post_payload_0001_"));
    assert!(name.ends_with("_news.example.org_story.txt"));

    let content = std::fs::read_to_string(entries[0].path()).unwrap();
    assert!(content.starts_with("POST Payload Capture\n"));
    assert!(content.contains("Visited Site: https://news.example.org/story"));
    assert!(content.contains("URL: https://request.mellow.tel/api/submit"));
    assert!(content.contains("Content-Length: 13 bytes"));
    assert!(content.ends_with("hello payload"));
}

// Scenario D: a qualifying POST with an empty body writes nothing.
#[tokio::test]
async fn empty_body_is_skipped_with_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let payload_dir = dir.path().join("post_payloads");
    let (sink, handle) = FileSink::spawn(PersistConfig::default());
    let mut payloads = extractor(&payload_dir, sink.clone());

    payloads.inspect(&common::relay_post("text/plain", Some(b"")), SITE);
    payloads.inspect(&common::relay_post("text/plain", None), SITE);
    assert_eq!(payloads.saved(), 0);

    drop(payloads);
    handle.shutdown(sink).await;
    assert!(!payload_dir.exists());
}

#[tokio::test]
async fn non_textual_or_non_relay_posts_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let payload_dir = dir.path().join("post_payloads");
    let (sink, handle) = FileSink::spawn(PersistConfig::default());
    let mut payloads = extractor(&payload_dir, sink.clone());

    payloads.inspect(&common::relay_post("application/octet-stream", Some(b"xx")), SITE);

    let mut elsewhere = common::relay_post("text/plain", Some(b"xx"));
    elsewhere.url = "https://elsewhere.example.com/api".into();
    payloads.inspect(&elsewhere, SITE);

    let mut get = common::relay_post("text/plain", Some(b"xx"));
    get.method = "GET".into();
    payloads.inspect(&get, SITE);

    assert_eq!(payloads.saved(), 0);
    drop(payloads);
    handle.shutdown(sink).await;
    assert!(!payload_dir.exists());
}

#[tokio::test]
async fn counter_increments_across_inspections() {
    let dir = tempfile::tempdir().unwrap();
    let payload_dir = dir.path().join("post_payloads");
    let (sink, handle) = FileSink::spawn(PersistConfig::default());
    let mut payloads = extractor(&payload_dir, sink.clone());

    payloads.inspect(&common::relay_post("text/plain", Some(b"first")), SITE);
    payloads.inspect(&common::relay_post("text/html", Some(b"second")), SITE);
    assert_eq!(payloads.saved(), 2);

    drop(payloads);
    handle.shutdown(sink).await;

    let mut names: Vec<_> = std::fs::read_dir(&payload_dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    assert!(names[0].starts_with("post_payload_0001_"));
    assert!(names[1].starts_with("post_payload_0002_"));
}
