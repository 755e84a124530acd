//! Host extraction used by the tracker and the attribution engine.

use url::Url;

/// Extract the normalized (lowercase) host from a URL.
///
/// Returns an empty string when the URL cannot be parsed or carries no host,
/// so callers can treat "no domain" and "invalid URL" uniformly.
pub fn extract_domain(raw: &str) -> String {
    Url::parse(raw)
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_ascii_lowercase()))
        .unwrap_or_default()
}
