use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use adframe_driver::DriverConfig;
use adframe_monitor::MonitorConfig;
use adframe_persist::PersistConfig;

mod experiment;
mod sites;

use experiment::ExperimentConfig;

/// Visits a list of sites, watches for SDK-injected iframes and records
/// the network traffic they are responsible for.
#[derive(Parser, Debug)]
#[command(name = "adframe", version, about)]
struct Cli {
    /// File with one site URL per line ('#' starts a comment)
    #[arg(long, default_value = "sites.txt")]
    sites: PathBuf,

    /// Root directory for run output
    #[arg(long, default_value = "output")]
    output: PathBuf,

    /// Seconds to stay on a page when no iframe ever appears
    #[arg(long, env = "DWELL_TIME", default_value_t = 30)]
    dwell_secs: u64,

    /// Seconds to wait for a first iframe before giving up on the site
    #[arg(long, default_value_t = 300)]
    max_wait_secs: u64,

    /// Seconds between iframe polls
    #[arg(long, default_value_t = 2)]
    poll_secs: u64,

    /// Overall wall-clock budget for the run, in minutes
    #[arg(long, default_value_t = 55)]
    budget_minutes: u64,

    /// Run the browser without a visible window
    #[arg(long, env = "HEADLESS")]
    headless: bool,

    /// Path to the Chrome/Chromium binary
    #[arg(long)]
    chrome: Option<PathBuf>,

    /// Unpacked extension directory to load (repeatable)
    #[arg(long = "extension")]
    extensions: Vec<PathBuf>,
}

impl Cli {
    fn into_config(self) -> ExperimentConfig {
        let mut monitor = MonitorConfig::default();
        monitor.poll_interval = Duration::from_secs(self.poll_secs.max(1));
        monitor.max_iframe_wait = Duration::from_secs(self.max_wait_secs);
        monitor.dwell_time = Duration::from_secs(self.dwell_secs);

        let mut driver = DriverConfig::default();
        driver.headless = self.headless;
        driver.executable = self.chrome;
        driver.extension_dirs = self.extensions;

        ExperimentConfig {
            sites_file: self.sites,
            output_root: self.output,
            monitor,
            driver,
            persist: PersistConfig::default(),
            budget: Duration::from_secs(self.budget_minutes * 60),
            init_attempts: 3,
            visit_attempts: 3,
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,chromiumoxide=warn,tungstenite=warn")
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    experiment::run(cli.into_config()).await
}
