use crate::api::Credentials;
use chrono::Duration;
use serde::Deserialize;

/// Main configuration structure for Murmuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub api: ApiConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub accounts: Vec<Credentials>,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum relationship depth to expand from the seed user
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Users with more friends+followers than this are recorded but their
    /// relationship lists are never paged through
    #[serde(rename = "max-friends-to-load", default = "default_max_friends_to_load")]
    pub max_friends_to_load: i64,

    /// Days before a stored record is considered stale and refetched
    #[serde(rename = "stale-after-days", default = "default_stale_after_days")]
    pub stale_after_days: i64,

    /// Hard cap on upstream calls per run, across all accounts
    #[serde(rename = "call-ceiling", default = "default_call_ceiling")]
    pub call_ceiling: u64,
}

/// Upstream API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the upstream REST API
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Seconds added to every reported window reset time
    #[serde(rename = "reset-pad-secs", default = "default_reset_pad_secs")]
    pub reset_pad_secs: i64,

    /// Seconds a resource stays disabled after an unclassified failure
    #[serde(rename = "cooldown-secs", default = "default_cooldown_secs")]
    pub cooldown_secs: i64,
}

/// Link resolver configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    /// Maximum redirect hops before a chain is abandoned
    #[serde(rename = "max-hops", default = "default_max_hops")]
    pub max_hops: u32,

    /// Maximum resolutions in flight at once
    #[serde(rename = "max-in-flight", default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// Idle connections kept per host
    #[serde(rename = "max-per-host", default = "default_max_per_host")]
    pub max_per_host: usize,

    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Final URLs longer than this are treated as resolution failures
    #[serde(rename = "max-url-length", default = "default_max_url_length")]
    pub max_url_length: usize,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

impl CrawlerConfig {
    /// The staleness window as a duration.
    pub fn stale_after(&self) -> Duration {
        Duration::days(self.stale_after_days)
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            max_hops: default_max_hops(),
            max_in_flight: default_max_in_flight(),
            max_per_host: default_max_per_host(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            max_url_length: default_max_url_length(),
        }
    }
}

fn default_max_depth() -> u32 {
    3
}

fn default_max_friends_to_load() -> i64 {
    12_000
}

fn default_stale_after_days() -> i64 {
    7
}

fn default_call_ceiling() -> u64 {
    100_000
}

fn default_reset_pad_secs() -> i64 {
    20
}

fn default_cooldown_secs() -> i64 {
    1200
}

fn default_max_hops() -> u32 {
    10
}

fn default_max_in_flight() -> usize {
    500
}

fn default_max_per_host() -> usize {
    50
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_url_length() -> usize {
    1000
}
