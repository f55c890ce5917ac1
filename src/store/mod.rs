//! Graph persistence
//!
//! The [`GraphStore`] trait is the contract the crawler drives; the SQLite
//! implementation is the one backend shipped here. Tests swap in an
//! in-memory store through the same trait.

pub mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{GraphStore, StoreError, StoreResult};
