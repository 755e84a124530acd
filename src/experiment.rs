use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tokio::time::{sleep, Instant};
use tracing::{error, info, warn};

use adframe_driver::{BrowserControl, CdpDriver, DriverConfig};
use adframe_monitor::{MonitorConfig, OutputPaths, PollingMonitor};
use adframe_persist::{FileSink, PersistConfig};

use crate::sites;

pub struct ExperimentConfig {
    pub sites_file: PathBuf,
    pub output_root: PathBuf,
    pub monitor: MonitorConfig,
    pub driver: DriverConfig,
    pub persist: PersistConfig,
    /// Wall-clock budget for the whole run; no new site starts after it.
    pub budget: Duration,
    pub init_attempts: u32,
    pub visit_attempts: u32,
}

/// Run the whole experiment: load the site list, launch the browser, visit
/// each site under the wall-clock budget and drain the write queue at the
/// end. A browser that cannot be started (or restarted) at all is the one
/// fatal error; everything per-site is logged and skipped.
pub async fn run(config: ExperimentConfig) -> Result<()> {
    let sites = sites::load_sites(&config.sites_file)
        .with_context(|| format!("reading site list {}", config.sites_file.display()))?;
    if sites.is_empty() {
        bail!("site list {} contains no sites", config.sites_file.display());
    }

    let run_dir = config
        .output_root
        .join(format!("run_{}", Utc::now().format("%Y%m%d_%H%M%S")));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("creating run directory {}", run_dir.display()))?;
    let paths = OutputPaths::for_run_dir(&run_dir);

    info!("adframe experiment starting");
    info!(sites = sites.len(), run_dir = %run_dir.display(), "run configuration");
    info!(
        poll = ?config.monitor.poll_interval,
        max_wait = ?config.monitor.max_iframe_wait,
        dwell = ?config.monitor.dwell_time,
        budget = ?config.budget,
        headless = config.driver.headless,
        "timing configuration"
    );

    let (sink, sink_handle) = FileSink::spawn(config.persist.clone());
    let driver = init_driver(&config).await?;
    let monitor = PollingMonitor::new(
        driver.clone() as Arc<dyn BrowserControl>,
        sink.clone(),
        config.monitor.clone(),
        paths,
    );

    let outcome = visit_all(&config, &sites, monitor, driver).await;

    // Drain whatever the visits enqueued even when the loop failed.
    let stats = sink_handle.shutdown(sink).await;
    if stats.failed > 0 {
        warn!(failed = stats.failed, "some write tasks were lost");
    }

    let summary = outcome?;
    info!(
        visited = summary.visited,
        with_iframes = summary.with_iframes,
        payloads = summary.payloads_saved,
        "experiment finished"
    );
    Ok(())
}

struct RunSummary {
    visited: usize,
    with_iframes: usize,
    payloads_saved: u64,
}

async fn visit_all(
    config: &ExperimentConfig,
    sites: &[String],
    mut monitor: PollingMonitor,
    mut driver: Arc<CdpDriver>,
) -> Result<RunSummary> {
    let started = Instant::now();
    let total = sites.len();
    let mut visited = 0usize;
    let mut with_iframes = 0usize;

    'sites: for (index, site) in sites.iter().enumerate() {
        if started.elapsed() >= config.budget {
            info!(
                remaining = total - index,
                "run budget exhausted, skipping remaining sites"
            );
            break;
        }
        info!(site = %site, visit = index + 1, total, "visiting site");

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let result = tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    warn!("interrupt received, ending run early");
                    break 'sites;
                }
                result = monitor.visit(site) => result,
            };
            match result {
                Ok(report) => {
                    visited += 1;
                    if report.found_iframes {
                        with_iframes += 1;
                    }
                    info!(
                        site = %site,
                        iframes = report.iframes_tracked,
                        attributed = report.requests_attributed,
                        "visit complete"
                    );
                    break;
                }
                Err(err) if err.is_nav_timeout() && attempt < config.visit_attempts => {
                    warn!(site = %site, %err, attempt, "page load timed out, relaunching browser");
                    driver.shutdown().await;
                    driver = init_driver(config)
                        .await
                        .context("relaunching browser after page-load timeout")?;
                    monitor.set_driver(driver.clone() as Arc<dyn BrowserControl>);
                }
                Err(err) => {
                    error!(site = %site, %err, "visit abandoned");
                    break;
                }
            }
        }
    }

    let payloads_saved = monitor.payloads_saved();
    drop(monitor);
    driver.shutdown().await;

    Ok(RunSummary {
        visited,
        with_iframes,
        payloads_saved,
    })
}

async fn init_driver(config: &ExperimentConfig) -> Result<Arc<CdpDriver>> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match CdpDriver::launch(&config.driver).await {
            Ok(driver) => {
                info!("browser ready");
                return Ok(Arc::new(driver));
            }
            Err(err) if attempt < config.init_attempts => {
                warn!(%err, attempt, "browser launch failed, retrying");
                sleep(Duration::from_secs(2)).await;
            }
            Err(err) => {
                return Err(anyhow::Error::new(err)).context("browser could not be started");
            }
        }
    }
}
