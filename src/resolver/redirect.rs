//! Hop-bounded redirect resolution for a single URL
//!
//! Follows a redirect chain with header-only requests and redirects disabled,
//! classifying every terminal state. Failure codes: `-1` transport, `-2` hop
//! limit or oversized URL, `-6` DNS, `-7` malformed URL, or the upstream HTTP
//! status for anything else.

use crate::resolver::host::{build_absolute_url, canonical_host};
use reqwest::StatusCode;
use url::Url;

/// Terminal state of resolving one URL. The intermediate moved state never
/// leaves the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    Resolved {
        final_url: String,
        canonical_host: String,
    },
    Error {
        code: i32,
        message: String,
    },
}

impl ResolveOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, ResolveOutcome::Error { .. })
    }
}

/// One step of the chain: finished, or moved to the next URL.
enum Hop {
    Done(ResolveOutcome),
    Moved(String),
}

pub struct RedirectResolver {
    http: reqwest::Client,
    max_hops: u32,
    max_url_length: usize,
}

impl RedirectResolver {
    /// The client must have redirect following disabled; the resolver walks
    /// the chain itself.
    pub fn new(http: reqwest::Client, max_hops: u32, max_url_length: usize) -> Self {
        RedirectResolver {
            http,
            max_hops,
            max_url_length,
        }
    }

    pub async fn resolve(&self, url: &str) -> ResolveOutcome {
        tracing::trace!("resolving {url}");

        let mut next = url.to_string();
        for _ in 0..self.max_hops {
            match self.resolve_once(&next).await {
                Ok(Hop::Done(outcome)) => return outcome,
                Ok(Hop::Moved(moved_to)) => next = moved_to,
                Err(error) => return error,
            }
        }
        ResolveOutcome::Error {
            code: -2,
            message: "too many redirects".to_string(),
        }
    }

    async fn resolve_once(&self, url_str: &str) -> Result<Hop, ResolveOutcome> {
        if let Err(e) = Url::parse(url_str) {
            return Err(ResolveOutcome::Error {
                code: -7,
                message: e.to_string(),
            });
        }

        let response = self
            .http
            .head(url_str)
            .send()
            .await
            .map_err(classify_transport_error)?;
        let status = response.status();

        if status == StatusCode::OK {
            if url_str.len() > self.max_url_length {
                return Err(ResolveOutcome::Error {
                    code: -2,
                    message: format!("url too long: {}", url_str.len()),
                });
            }
            let host = canonical_host(url_str).map_err(|e| ResolveOutcome::Error {
                code: -7,
                message: e.to_string(),
            })?;
            return Ok(Hop::Done(ResolveOutcome::Resolved {
                final_url: url_str.to_string(),
                canonical_host: host,
            }));
        }

        if matches!(
            status,
            StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND | StatusCode::SEE_OTHER
        ) {
            match response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
            {
                Some(location) => {
                    let next = build_absolute_url(url_str, location).map_err(|e| {
                        ResolveOutcome::Error {
                            code: -7,
                            message: e.to_string(),
                        }
                    })?;
                    return Ok(Hop::Moved(next));
                }
                None => {
                    tracing::error!("{url_str} returned {status} without a Location header");
                }
            }
        }

        Err(ResolveOutcome::Error {
            code: status.as_u16() as i32,
            message: status.canonical_reason().unwrap_or("").to_string(),
        })
    }
}

/// Maps a transport failure onto the error taxonomy: `-6` for DNS failures,
/// `-1` for everything else, carrying the root cause's message.
fn classify_transport_error(error: reqwest::Error) -> ResolveOutcome {
    let message = root_cause_message(&error);
    let chain_mentions_dns = message.to_lowercase().contains("dns")
        || message.to_lowercase().contains("failed to lookup");
    ResolveOutcome::Error {
        code: if chain_mentions_dns { -6 } else { -1 },
        message,
    }
}

/// Deepest non-empty message in the cause chain; a root that renders empty
/// does not erase the informative text above it.
fn root_cause_message(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut current = error;
    while let Some(source) = current.source() {
        let text = source.to_string();
        if !text.is_empty() {
            message = text;
        }
        current = source;
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Layer {
        message: &'static str,
        source: Option<Box<Layer>>,
    }

    impl fmt::Display for Layer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.message)
        }
    }

    impl std::error::Error for Layer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            self.source
                .as_deref()
                .map(|s| s as &(dyn std::error::Error + 'static))
        }
    }

    #[test]
    fn root_cause_takes_the_deepest_message() {
        let chain = Layer {
            message: "error sending request",
            source: Some(Box::new(Layer {
                message: "connection refused",
                source: None,
            })),
        };
        assert_eq!(root_cause_message(&chain), "connection refused");
    }

    #[test]
    fn empty_root_falls_back_to_the_last_informative_message() {
        let chain = Layer {
            message: "error sending request",
            source: Some(Box::new(Layer {
                message: "failed to lookup address information",
                source: Some(Box::new(Layer { message: "", source: None })),
            })),
        };
        assert_eq!(
            root_cause_message(&chain),
            "failed to lookup address information"
        );
    }

    #[test]
    fn outcome_error_classification() {
        let ok = ResolveOutcome::Resolved {
            final_url: "http://site.com".into(),
            canonical_host: "site.com".into(),
        };
        let err = ResolveOutcome::Error {
            code: -2,
            message: "too many redirects".into(),
        };
        assert!(!ok.is_error());
        assert!(err.is_error());
    }
}
