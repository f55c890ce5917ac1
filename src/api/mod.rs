//! Upstream API access: resource classification, per-account quota tracking,
//! the account broker, and the resource-specific client operations.

mod account;
mod client;
mod limit;
mod pool;
mod resource;
pub mod wire;

pub use account::{Account, Credentials};
pub use client::ApiClient;
pub use limit::{RateLimitReport, ResourceLimit};
pub use pool::{AccountPool, ApiResponse};
pub use resource::{ResourceKind, ALL_KINDS};
