//! Store contract and error types
//!
//! The crawler only ever talks to the store through [`GraphStore`]. All
//! upserts are idempotent merges: re-applying identical or newer data is
//! safe, and partial records never clobber fuller ones.

use crate::model::{Hashtag, Tweet, User};
use crate::resolver::ResolveOutcome;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait GraphStore {
    // ===== Writes =====

    /// Merges tweets with their authors, hashtags, mentions, contained URLs
    /// and nested quote/retweet/reply relationships.
    fn upsert_tweets(&mut self, tweets: &[Tweet]) -> StoreResult<()>;

    /// Merges user records plus their friend/follower edges (edge endpoints
    /// become id/screen-name stubs if unknown).
    fn upsert_users(&mut self, users: &[User]) -> StoreResult<()>;

    fn upsert_hashtag(&mut self, hashtag: &Hashtag) -> StoreResult<()>;

    /// Records resolution results per link. A successful resolution may
    /// replace an earlier error, never the other way around.
    fn upsert_resolved_links(
        &mut self,
        links: &HashMap<String, ResolveOutcome>,
    ) -> StoreResult<()>;

    // ===== Reads =====

    fn get_user(&self, id: u64) -> StoreResult<Option<User>>;

    fn get_user_by_screen_name(&self, screen_name: &str) -> StoreResult<Option<User>>;

    fn load_friends(&self, user: &User) -> StoreResult<HashSet<User>>;

    fn load_followers(&self, user: &User) -> StoreResult<HashSet<User>>;

    /// The user's most used hashtags, ranked by how many tweets each tag
    /// carries overall.
    fn get_top_hashtags_for(&self, user: &User, limit: usize) -> StoreResult<Vec<Hashtag>>;

    fn get_users_for_hashtag(&self, hashtag: &Hashtag) -> StoreResult<HashSet<User>>;

    /// The subset of `candidates` that is absent from the store entirely.
    fn find_missing_tweet_ids(&self, candidates: &HashSet<u64>) -> StoreResult<HashSet<u64>>;

    /// Highest known tweet id for a user, `-1` when none is stored.
    fn get_max_tweet_id(&self, user: &User) -> StoreResult<i64>;

    /// Tweets stored with only id and author, i.e. backfill candidates.
    fn get_empty_tweets(&self) -> StoreResult<Vec<u64>>;

    /// The next unscanned hashtag reachable within `max_hops` co-occurrence
    /// hops of `start_tag`. Ordering contract: nearest hop count first, then
    /// highest tagged-tweet weight.
    fn next_hashtag_to_scan(&self, start_tag: &str, max_hops: u32) -> StoreResult<Option<String>>;
}
