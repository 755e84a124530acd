//! Chromium DevTools driver behind the [`BrowserControl`] port.

use std::sync::Arc;
use std::time::Duration;

use adframe_core_types::{IframeElement, RequestView, ResponseView};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams as NetworkEnableParams, EventRequestWillBeSent, EventResponseReceived, Headers,
};
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::DriverConfig;
use crate::control::BrowserControl;
use crate::error::DriverError;
use crate::traffic::TrafficLog;

/// A live Chromium session with network interception enabled on its page.
pub struct CdpDriver {
    browser: Mutex<Browser>,
    page: Page,
    traffic: Arc<TrafficLog>,
    tasks: Vec<JoinHandle<()>>,
    page_load_timeout: Duration,
}

impl CdpDriver {
    /// Launch the browser, open a blank page and start the traffic tap.
    pub async fn launch(config: &DriverConfig) -> Result<Self, DriverError> {
        let mut builder = BrowserConfig::builder().window_size(config.window.0, config.window.1);
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &config.executable {
            builder = builder.chrome_executable(executable);
        }
        if let Some(dir) = &config.user_data_dir {
            builder = builder.user_data_dir(dir);
        }
        for extension in &config.extension_dirs {
            builder = builder.arg(format!("--load-extension={}", extension.display()));
        }
        for arg in &config.extra_args {
            builder = builder.arg(arg.clone());
        }
        let browser_config = builder.build().map_err(DriverError::Launch)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|err| DriverError::Launch(err.to_string()))?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|err| DriverError::Launch(err.to_string()))?;
        page.execute(NetworkEnableParams::default())
            .await
            .map_err(|err| DriverError::Launch(err.to_string()))?;

        let traffic = Arc::new(TrafficLog::default());

        let mut request_events = page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(|err| DriverError::Launch(err.to_string()))?;
        let request_log = Arc::clone(&traffic);
        let request_task = tokio::spawn(async move {
            while let Some(event) = request_events.next().await {
                let view = RequestView {
                    url: event.request.url.clone(),
                    method: event.request.method.clone(),
                    headers: header_pairs(&event.request.headers),
                    response: None,
                    body: event.request.post_data_entries.clone().map(|entries| {
                        entries
                            .into_iter()
                            .filter_map(|entry| entry.bytes)
                            .flat_map(|bytes| String::from(bytes).into_bytes())
                            .collect()
                    }),
                };
                request_log.record_request(event.request_id.inner().clone(), view);
            }
        });

        let mut response_events = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(|err| DriverError::Launch(err.to_string()))?;
        let response_log = Arc::clone(&traffic);
        let response_task = tokio::spawn(async move {
            while let Some(event) = response_events.next().await {
                let response = ResponseView {
                    status: event.response.status,
                    reason: event.response.status_text.clone(),
                    headers: header_pairs(&event.response.headers),
                };
                response_log.record_response(event.request_id.inner(), response);
            }
        });

        info!("browser launched, network tap enabled");
        Ok(Self {
            browser: Mutex::new(browser),
            page,
            traffic,
            tasks: vec![handler_task, request_task, response_task],
            page_load_timeout: config.page_load_timeout,
        })
    }

    /// Close the browser and stop the event pumps.
    pub async fn shutdown(&self) {
        {
            let mut browser = self.browser.lock().await;
            if let Err(err) = browser.close().await {
                warn!(%err, "browser close failed");
            }
        }
        for task in &self.tasks {
            task.abort();
        }
        debug!("browser session closed");
    }
}

#[async_trait]
impl BrowserControl for CdpDriver {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        match timeout(self.page_load_timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(DriverError::Protocol(err.to_string())),
            Err(_) => Err(DriverError::NavTimeout),
        }
    }

    async fn iframe_snapshot(&self, marker: &str) -> Result<Vec<IframeElement>, DriverError> {
        let result = self
            .page
            .evaluate(snapshot_script(marker))
            .await
            .map_err(|err| DriverError::Script(err.to_string()))?;
        result
            .into_value::<Vec<IframeElement>>()
            .map_err(|err| DriverError::Script(err.to_string()))
    }

    async fn scroll_by(&self, pixels: i64) -> Result<(), DriverError> {
        self.page
            .evaluate(format!("window.scrollBy(0, {pixels});"))
            .await
            .map_err(|err| DriverError::Script(err.to_string()))?;
        Ok(())
    }

    async fn request_count(&self) -> Result<usize, DriverError> {
        Ok(self.traffic.len())
    }

    async fn request_at(&self, index: usize) -> Result<Option<RequestView>, DriverError> {
        Ok(self.traffic.get(index))
    }

    async fn clear_requests(&self) -> Result<(), DriverError> {
        self.traffic.clear();
        Ok(())
    }
}

fn snapshot_script(marker: &str) -> String {
    // The marker is a plain token; single quotes keep the embedding simple.
    format!(
        r#"(() => {{
    const marker = '{marker}';
    const found = [];
    document.querySelectorAll('iframe').forEach((frame) => {{
        const id = frame.getAttribute('id') || '';
        const dataId = frame.getAttribute('data-id') || '';
        if (!id.includes(marker) && !dataId.includes(marker)) {{
            return;
        }}
        const src = frame.getAttribute('src') || '';
        if (src) {{
            found.push({{ src: src, id: id, dataId: dataId }});
        }}
    }});
    return found;
}})()"#
    )
}

fn header_pairs(headers: &Headers) -> Vec<(String, String)> {
    match serde_json::to_value(headers) {
        Ok(Value::Object(map)) => map
            .into_iter()
            .map(|(name, value)| {
                let rendered = match value {
                    Value::String(text) => text,
                    other => other.to_string(),
                };
                (name, rendered)
            })
            .collect(),
        _ => Vec::new(),
    }
}
