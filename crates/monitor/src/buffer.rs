//! Bucket flush and metadata save: serializing buffered state into write
//! tasks.

use std::path::Path;

use adframe_core_types::{AttributedRecord, IframeMetadataRecord};
use adframe_persist::{FileSink, PersistError, WriteTask};
use tracing::{error, info};

use crate::session::{AggregationBucket, SessionState};

/// Flush the bucket for one iframe, removing it from the aggregation map.
///
/// Produces at most one write task: the bucket's records as JSONL, in
/// attribution order, each line stamped with the iframe attribution.
pub fn flush_bucket(
    session: &mut SessionState,
    src: &str,
    network_logs: &Path,
    sink: &FileSink,
) -> Result<usize, PersistError> {
    let Some(bucket) = session.buckets.remove(src) else {
        return Ok(0);
    };
    let count = bucket.requests.len();
    if count == 0 {
        return Ok(0);
    }
    sink.enqueue(WriteTask::append(network_logs, render_bucket(src, &bucket)))?;
    info!(count, domain = %bucket.domain, "queued bucket flush");
    Ok(count)
}

/// End-of-visit flush: every remaining bucket, then the buffer is empty.
pub fn flush_all(
    session: &mut SessionState,
    network_logs: &Path,
    sink: &FileSink,
) -> Result<usize, PersistError> {
    let srcs: Vec<String> = session.buckets.keys().cloned().collect();
    let mut total = 0;
    for src in srcs {
        total += flush_bucket(session, &src, network_logs, sink)?;
    }
    Ok(total)
}

/// Append one metadata line per tracked iframe to the metadata log.
pub fn save_iframe_metadata(
    session: &SessionState,
    site_url: &str,
    metadata_path: &Path,
    sink: &FileSink,
) -> Result<usize, PersistError> {
    if session.iframe_metadata.is_empty() {
        return Ok(0);
    }
    let mut content = String::new();
    let mut count = 0;
    for record in session.iframe_metadata.values() {
        let line = IframeMetadataRecord::from_record(record, site_url);
        match serde_json::to_string(&line) {
            Ok(json) => {
                content.push_str(&json);
                content.push('\n');
                count += 1;
            }
            Err(err) => error!(src = %record.src, %err, "failed to serialize iframe metadata"),
        }
    }
    sink.enqueue(WriteTask::append(metadata_path, content))?;
    info!(count, "queued iframe metadata save");
    Ok(count)
}

fn render_bucket(src: &str, bucket: &AggregationBucket) -> String {
    let mut content = String::new();
    for record in &bucket.requests {
        let attributed = AttributedRecord {
            record,
            iframe_src: src,
            iframe_domain: &bucket.domain,
        };
        match serde_json::to_string(&attributed) {
            Ok(json) => {
                content.push_str(&json);
                content.push('\n');
            }
            Err(err) => error!(url = %record.url, %err, "failed to serialize request record"),
        }
    }
    content
}
