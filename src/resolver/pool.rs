//! Concurrent fan-out over a batch of URLs
//!
//! Each distinct input URL becomes one resolve task on a bounded pool of
//! in-flight requests sharing a pooled connection manager. The join point
//! blocks until the whole batch is done; failures stay in the result map as
//! error entries, never dropped.

use crate::config::ResolverConfig;
use crate::resolver::redirect::{RedirectResolver, ResolveOutcome};
use futures::stream::{self, StreamExt};
use reqwest::redirect::Policy;
use std::collections::{HashMap, HashSet};

pub struct ResolverPool {
    resolver: RedirectResolver,
    max_in_flight: usize,
}

impl ResolverPool {
    pub fn new(config: &ResolverConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("murmuration/", env!("CARGO_PKG_VERSION")))
            .redirect(Policy::none())
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
            .pool_max_idle_per_host(config.max_per_host)
            // shortened links point anywhere, including sites with broken TLS
            .danger_accept_invalid_certs(true)
            .build()?;

        Ok(ResolverPool {
            resolver: RedirectResolver::new(http, config.max_hops, config.max_url_length),
            max_in_flight: config.max_in_flight,
        })
    }

    /// Resolves every distinct URL of the batch. The returned map has
    /// exactly one entry per distinct input, in no particular order.
    pub async fn resolve_all(
        &self,
        urls: impl IntoIterator<Item = String>,
    ) -> HashMap<String, ResolveOutcome> {
        let distinct: HashSet<String> = urls.into_iter().collect();
        let total = distinct.len();
        tracing::debug!("resolving {total} distinct links");

        let resolver = &self.resolver;
        let results: HashMap<String, ResolveOutcome> = stream::iter(distinct)
            .map(|url| async move {
                let outcome = resolver.resolve(&url).await;
                (url, outcome)
            })
            .buffer_unordered(self.max_in_flight)
            .collect()
            .await;

        debug_assert_eq!(results.len(), total);
        results
    }
}
