//! Crawler module for social graph harvesting
//!
//! This module contains the core crawl logic, including:
//! - Depth-bounded expansion from a seed user
//! - Hashtag search and frontier walking
//! - Staleness-gated refresh against the store
//! - Tweet hydration and reply backfill

mod orchestrator;

pub use orchestrator::Crawler;

use crate::api::ApiClient;
use crate::config::Config;
use crate::resolver::ResolverPool;
use crate::store::SqliteStore;
use crate::{ApiError, MurmurationError};
use std::path::Path;

/// Builds a ready-to-run crawler from a loaded configuration
///
/// This is the main entry point. It will:
/// 1. Open (and if needed initialize) the SQLite store
/// 2. Build the API client over the configured accounts
/// 3. Seed every account's rate limits from the upstream
/// 4. Build the link resolver pool
///
/// A rate-limit seeding failure is fatal: running blind against quota
/// windows burns accounts.
pub async fn bootstrap(config: &Config) -> Result<Crawler<SqliteStore>, MurmurationError> {
    let store = SqliteStore::new(Path::new(&config.store.database_path))?;

    let mut api = ApiClient::new(&config.api, &config.crawler, config.accounts.clone())?;
    api.seed_rate_limits().await?;

    let resolver = ResolverPool::new(&config.resolver).map_err(ApiError::from)?;

    Ok(Crawler::new(store, api, resolver, &config.crawler))
}
