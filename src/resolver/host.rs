//! Host canonicalization and absolute-URL construction

use crate::{UrlError, UrlResult};
use url::Url;

/// Prefix labels that mark mobile/desktop variants of the same site. One
/// leading label is stripped, never more.
const STRIP_PREFIXES: [&str; 3] = ["www.", "m.", "mobile."];

/// Extracts the canonical host of a URL: the host with a single leading
/// `www.`/`m.`/`mobile.` label removed, case-insensitively, only at the
/// start of the name.
pub fn canonical_host(url_str: &str) -> UrlResult<String> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;
    let host = url.host_str().ok_or(UrlError::MissingHost)?;

    for prefix in STRIP_PREFIXES {
        if host.len() > prefix.len() && host[..prefix.len()].eq_ignore_ascii_case(prefix) {
            return Ok(host[prefix.len()..].to_string());
        }
    }
    Ok(host.to_string())
}

/// Builds the absolute form of a redirect target. A target that is already
/// absolute is kept; a path is resolved against the previous URL's scheme,
/// host and explicit port.
pub fn build_absolute_url(previous: &str, location: &str) -> UrlResult<String> {
    if location.to_lowercase().starts_with("http") {
        return Ok(location.to_string());
    }
    let url = Url::parse(previous).map_err(|e| UrlError::Parse(e.to_string()))?;
    let host = url.host_str().ok_or(UrlError::MissingHost)?;
    let port = url.port().map(|p| format!(":{p}")).unwrap_or_default();
    Ok(format!("{}://{}{}{}", url.scheme(), host, port, location))
}
