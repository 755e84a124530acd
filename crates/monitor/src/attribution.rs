//! The request-attribution engine.
//!
//! Classifies each newly intercepted request as relevant or not and assigns
//! relevant ones to zero, one or several tracked iframes. Relay-host
//! requests attribute via the `Referer` header; a missing header broadcasts
//! the request to every visible iframe — a documented lossy policy, kept
//! deliberately.

use adframe_core_types::{extract_domain, RequestRecord};
use adframe_driver::{BrowserControl, DriverError};
use tracing::{debug, warn};

use crate::config::MonitorConfig;
use crate::payload::PayloadExtractor;
use crate::session::SessionState;

/// One attribution pass over the requests observed since the last pass.
///
/// Only indices at or beyond the session's high-water mark are examined, so
/// the cost scales with new traffic, not visit history. A fault on a single
/// index skips that index; the mark always advances to the observed total,
/// so no request is classified twice. Returns the number of attributed
/// records (broadcast duplicates counted individually).
pub async fn process_new_requests(
    driver: &dyn BrowserControl,
    session: &mut SessionState,
    config: &MonitorConfig,
    site_url: &str,
    payloads: &mut PayloadExtractor,
) -> Result<usize, DriverError> {
    let total = driver.request_count().await?;
    if session.last_processed_request_index >= total {
        return Ok(0);
    }

    let mut attributed = 0;
    for index in session.last_processed_request_index..total {
        let view = match driver.request_at(index).await {
            Ok(Some(view)) => view,
            Ok(None) => continue,
            Err(err) if err.is_transient() => {
                warn!(index, %err, "skipping request index after transient fault");
                continue;
            }
            Err(err) => return Err(err),
        };

        payloads.inspect(&view, site_url);

        if !is_relevant(&view.url, session, config) {
            continue;
        }
        let record = RequestRecord::from_view(&view, site_url);

        if view.url.contains(&config.relay_marker) {
            match view.header("referer") {
                Some(referer) => {
                    let referer_domain = extract_domain(referer);
                    let matched = session
                        .currently_visible
                        .iter()
                        .find(|src| extract_domain(src) == referer_domain)
                        .cloned();
                    match matched {
                        Some(src) => {
                            session.push_attributed(&src, record);
                            attributed += 1;
                        }
                        None => warn!(
                            %referer_domain,
                            url = %view.url,
                            "no visible iframe matches relay referer, dropping request"
                        ),
                    }
                }
                None => {
                    // Accepted lossy policy: without a referer the request is
                    // duplicated into every visible iframe's bucket.
                    warn!(
                        url = %view.url,
                        "relay request without referer, attributing to all visible iframes"
                    );
                    let visible: Vec<String> = session.currently_visible.iter().cloned().collect();
                    for src in visible {
                        session.push_attributed(&src, record.clone());
                        attributed += 1;
                    }
                }
            }
        } else {
            let request_domain = extract_domain(&view.url);
            let matched = session
                .currently_visible
                .iter()
                .find(|src| extract_domain(src) == request_domain)
                .cloned();
            if let Some(src) = matched {
                session.push_attributed(&src, record);
                attributed += 1;
            }
        }
    }

    session.last_processed_request_index = total;
    if attributed > 0 {
        debug!(attributed, "attribution pass complete");
    }
    Ok(attributed)
}

/// Relevance test: relay-host requests, or requests whose domain matches a
/// tracked iframe domain. Everything else is discarded unrecorded.
fn is_relevant(url: &str, session: &SessionState, config: &MonitorConfig) -> bool {
    if url.contains(&config.relay_marker) {
        return true;
    }
    let domain = extract_domain(url);
    !domain.is_empty() && session.tracked_domains.contains(&domain)
}
