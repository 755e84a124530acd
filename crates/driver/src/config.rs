//! Launch configuration for the CDP driver.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct DriverConfig {
    /// Run without a visible window. Off by default: a virtual display keeps
    /// the regular Chrome user agent, headless mode advertises itself.
    pub headless: bool,
    pub window: (u32, u32),
    /// Explicit browser binary; the system default is used when unset.
    pub executable: Option<PathBuf>,
    pub user_data_dir: Option<PathBuf>,
    /// Unpacked extension directories passed via `--load-extension`.
    pub extension_dirs: Vec<PathBuf>,
    pub extra_args: Vec<String>,
    /// Outer bound on a single navigation.
    pub page_load_timeout: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            headless: false,
            window: (1920, 1080),
            executable: None,
            user_data_dir: None,
            extension_dirs: Vec::new(),
            extra_args: vec![
                "--no-sandbox".into(),
                "--disable-dev-shm-usage".into(),
                "--disable-gpu".into(),
                "--disable-blink-features=AutomationControlled".into(),
                "--disable-notifications".into(),
                "--disable-popup-blocking".into(),
                "--no-first-run".into(),
                "--no-default-browser-check".into(),
            ],
            page_load_timeout: Duration::from_secs(60),
        }
    }
}
