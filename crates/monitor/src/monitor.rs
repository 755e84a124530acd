//! The polling monitor: per-visit state machine tying tracker, attribution
//! and flush together.

use std::sync::Arc;
use std::time::Duration;

use adframe_core_types::extract_domain;
use adframe_driver::{with_retry, BrowserControl};
use adframe_persist::FileSink;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::attribution;
use crate::buffer;
use crate::config::{MonitorConfig, OutputPaths};
use crate::error::MonitorError;
use crate::payload::PayloadExtractor;
use crate::session::SessionState;
use crate::tracker;

/// Visit phases, in order. Tracking continues for the whole wait window even
/// after the first iframe appears; `Flushing` runs on every path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisitPhase {
    Navigating,
    Monitoring,
    IframeFound,
    TimedOutNoIframe,
    Flushing,
    Done,
}

/// Summary of one completed (or salvaged) site visit.
#[derive(Clone, Debug)]
pub struct VisitReport {
    pub site: String,
    pub iframes_tracked: usize,
    pub requests_attributed: usize,
    pub found_iframes: bool,
}

/// Drives site visits one at a time against a browser-control port.
///
/// All attribution and aggregation state lives on the monitor's task; the
/// only structure shared with the persistence worker is the write queue.
pub struct PollingMonitor {
    driver: Arc<dyn BrowserControl>,
    sink: FileSink,
    config: MonitorConfig,
    paths: OutputPaths,
    payloads: PayloadExtractor,
}

impl PollingMonitor {
    pub fn new(
        driver: Arc<dyn BrowserControl>,
        sink: FileSink,
        config: MonitorConfig,
        paths: OutputPaths,
    ) -> Self {
        let payloads = PayloadExtractor::new(
            paths.post_payloads_dir.clone(),
            config.relay_marker.clone(),
            sink.clone(),
        );
        Self {
            driver,
            sink,
            config,
            paths,
            payloads,
        }
    }

    /// Swap in a relaunched driver after a page-load timeout teardown.
    pub fn set_driver(&mut self, driver: Arc<dyn BrowserControl>) {
        self.driver = driver;
    }

    pub fn payloads_saved(&self) -> u64 {
        self.payloads.saved()
    }

    /// Run one full site visit.
    ///
    /// A navigation timeout propagates without a flush (nothing is buffered
    /// yet and the runner will relaunch and retry); any later failure still
    /// gets a best-effort flush of whatever was buffered.
    pub async fn visit(&mut self, site_url: &str) -> Result<VisitReport, MonitorError> {
        let mut session = SessionState::new();
        let mut attributed = 0usize;

        debug!(phase = ?VisitPhase::Navigating, site = %site_url);
        if let Err(err) = self.driver.clear_requests().await {
            warn!(%err, "failed to clear intercepted requests");
        }
        let driver = Arc::clone(&self.driver);
        with_retry(
            "navigate",
            self.config.nav_attempts,
            self.config.nav_backoff,
            || driver.navigate(site_url),
        )
        .await?;
        info!(site = %site_url, "page loaded");

        let loop_result = self.monitor_loop(&mut session, site_url, &mut attributed).await;

        debug!(phase = ?VisitPhase::Flushing, site = %site_url);
        let flush_result = self.finalize(&mut session, site_url, &mut attributed).await;
        loop_result?;
        flush_result?;

        debug!(phase = ?VisitPhase::Done, site = %site_url);
        Ok(VisitReport {
            site: site_url.to_string(),
            iframes_tracked: session.iframe_metadata.len(),
            requests_attributed: attributed,
            found_iframes: !session.iframe_metadata.is_empty(),
        })
    }

    async fn monitor_loop(
        &mut self,
        session: &mut SessionState,
        site_url: &str,
        attributed: &mut usize,
    ) -> Result<(), MonitorError> {
        let epoch = Instant::now();
        let mut last_scroll = Duration::ZERO;
        debug!(phase = ?VisitPhase::Monitoring, max_wait = ?self.config.max_iframe_wait);

        while epoch.elapsed() < self.config.max_iframe_wait {
            let snapshot = match self.driver.iframe_snapshot(&self.config.marker).await {
                Ok(snapshot) => snapshot,
                Err(err) if err.is_transient() => {
                    warn!(%err, "iframe snapshot failed this tick");
                    Vec::new()
                }
                Err(err) => return Err(err.into()),
            };
            let now_rel = epoch.elapsed().as_secs_f64();
            let diff = tracker::observe_snapshot(session, &snapshot, now_rel);
            if !diff.appeared.is_empty() {
                info!(
                    appeared = diff.appeared.len(),
                    tracked = session.iframe_metadata.len(),
                    domains = session.tracked_domains.len(),
                    "new tracked iframe(s) detected"
                );
            }

            if !diff.disappeared.is_empty() {
                // Attribute this tick's pending requests against the old
                // visible set first, so a disappearing iframe still collects
                // its final requests.
                *attributed += self.attribution_pass(session, site_url).await;
                for src in &diff.disappeared {
                    info!(domain = %extract_domain(src), "iframe disappeared");
                    buffer::flush_bucket(session, src, &self.paths.network_logs, &self.sink)?;
                }
            }
            session.apply_visibility(diff.visible);

            *attributed += self.attribution_pass(session, site_url).await;

            if epoch.elapsed().saturating_sub(last_scroll) >= self.config.scroll_interval {
                if let Err(err) = self.driver.scroll_by(self.config.scroll_step_px).await {
                    warn!(%err, "scroll stimulus failed");
                }
                last_scroll = epoch.elapsed();
            }

            sleep(self.config.poll_interval).await;
        }

        if session.iframe_metadata.is_empty() {
            debug!(phase = ?VisitPhase::TimedOutNoIframe);
            warn!(
                waited = ?self.config.max_iframe_wait,
                "no tracked iframes detected within the wait window"
            );
            info!(dwell = ?self.config.dwell_time, "dwelling for delayed passive activity");
            self.dwell().await;
        } else {
            debug!(phase = ?VisitPhase::IframeFound, tracked = session.iframe_metadata.len());
            info!(
                tracked = session.iframe_metadata.len(),
                "monitoring window complete"
            );
        }
        Ok(())
    }

    /// Fallback wait with periodic scrolling but no DOM polling; whatever
    /// passive traffic arrives is picked up by the final attribution pass.
    async fn dwell(&self) {
        let start = Instant::now();
        let mut last_scroll = Duration::ZERO;
        while start.elapsed() < self.config.dwell_time {
            let remaining = self.config.dwell_time.saturating_sub(start.elapsed());
            sleep(remaining.min(self.config.poll_interval)).await;
            if start.elapsed().saturating_sub(last_scroll) >= self.config.scroll_interval {
                if let Err(err) = self.driver.scroll_by(self.config.scroll_step_px).await {
                    warn!(%err, "scroll stimulus failed");
                }
                last_scroll = start.elapsed();
            }
        }
    }

    /// One attribution pass; pass-level faults end the pass, not the visit.
    async fn attribution_pass(&mut self, session: &mut SessionState, site_url: &str) -> usize {
        match attribution::process_new_requests(
            self.driver.as_ref(),
            session,
            &self.config,
            site_url,
            &mut self.payloads,
        )
        .await
        {
            Ok(count) => count,
            Err(err) => {
                warn!(%err, "attribution pass failed");
                0
            }
        }
    }

    async fn finalize(
        &mut self,
        session: &mut SessionState,
        site_url: &str,
        attributed: &mut usize,
    ) -> Result<(), MonitorError> {
        *attributed += self.attribution_pass(session, site_url).await;
        let flushed = buffer::flush_all(session, &self.paths.network_logs, &self.sink)?;
        let iframes =
            buffer::save_iframe_metadata(session, site_url, &self.paths.iframe_metadata, &self.sink)?;
        info!(flushed, iframes, "visit flushed");
        Ok(())
    }
}
