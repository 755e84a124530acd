//! Monitoring parameters and per-run output locations.

use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct MonitorConfig {
    /// Interval between DOM polls.
    pub poll_interval: Duration,
    /// Full window during which iframe injection is watched for, regardless
    /// of how early the first iframe appears.
    pub max_iframe_wait: Duration,
    /// Fallback wait when no tracked iframe ever becomes visible.
    pub dwell_time: Duration,
    /// Wall-clock interval between scroll stimuli, independent of the poll
    /// interval.
    pub scroll_interval: Duration,
    pub scroll_step_px: i64,
    /// Token expected in an SDK-injected iframe's `id`/`data-id` attribute.
    pub marker: String,
    /// Fixed relay host substring; requests matching it attribute by
    /// `Referer` instead of domain equality.
    pub relay_marker: String,
    pub nav_attempts: u32,
    pub nav_backoff: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            max_iframe_wait: Duration::from_secs(300),
            dwell_time: Duration::from_secs(30),
            scroll_interval: Duration::from_secs(60),
            scroll_step_px: 500,
            marker: "mllwtl".into(),
            relay_marker: "request.mellow.tel".into(),
            nav_attempts: 3,
            nav_backoff: Duration::from_millis(500),
        }
    }
}

/// Output files for one experiment run.
#[derive(Clone, Debug)]
pub struct OutputPaths {
    pub network_logs: PathBuf,
    pub iframe_metadata: PathBuf,
    pub post_payloads_dir: PathBuf,
}

impl OutputPaths {
    pub fn for_run_dir(run_dir: &Path) -> Self {
        Self {
            network_logs: run_dir.join("network_logs.jsonl"),
            iframe_metadata: run_dir.join("iframe_metadata.jsonl"),
            post_payloads_dir: run_dir.join("post_payloads"),
        }
    }
}
