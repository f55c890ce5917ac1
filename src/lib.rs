//! Murmuration: a rate-limit-aware social graph harvester
//!
//! This crate crawls a social network's REST API outward from a seed user or
//! hashtag, sharing call budgets across a pool of accounts, and persists the
//! harvested graph of users, tweets, hashtags and resolved links.

pub mod api;
pub mod config;
pub mod crawler;
pub mod model;
pub mod resolver;
pub mod store;

use thiserror::Error;

/// Main error type for Murmuration operations
#[derive(Debug, Error)]
pub enum MurmurationError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the upstream API and the account broker
#[derive(Debug, Error)]
pub enum ApiError {
    /// The upstream refused to serve this target (suspended, deleted, or
    /// protected from this account's point of view). The target is skipped,
    /// never retried.
    #[error("target is not readable")]
    UserNotReadable,

    /// Transient broker-level failure; the call should simply be reissued
    /// and will land on a different account.
    #[error("resource disabled, retry the call")]
    RetryLater,

    /// The per-run call ceiling was reached; the run is over.
    #[error("call budget of {0} exhausted")]
    CallBudgetExhausted(u64),

    #[error("upstream returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("response decode error: {0}")]
    Decode(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Murmuration operations
pub type Result<T> = std::result::Result<T, MurmurationError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::Crawler;
pub use model::{Hashtag, Tweet, User};
pub use resolver::ResolveOutcome;
pub use store::{GraphStore, SqliteStore};
