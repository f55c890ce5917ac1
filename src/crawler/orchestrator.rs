//! Crawl orchestration
//!
//! Walks the social graph outward from a seed, depth-bounded and
//! staleness-gated: a record fresher than the configured window is served
//! from the store without touching the upstream. The work list is an
//! explicit stack, so depth is bounded by configuration and not by the call
//! stack.

use crate::api::ApiClient;
use crate::config::CrawlerConfig;
use crate::model::{Hashtag, Tweet, User};
use crate::resolver::ResolverPool;
use crate::store::GraphStore;
use crate::{ApiError, MurmurationError};
use chrono::{Duration, Utc};
use std::collections::HashSet;

const HYDRATE_BATCH_SIZE: usize = 1000;
const TOP_HASHTAG_COUNT: usize = 10;

pub struct Crawler<S> {
    store: S,
    api: ApiClient,
    resolver: ResolverPool,
    stale_after: Duration,
    /// Ids whose relationship expansion has already run. Gates re-expansion
    /// only; a visited user still lands in other users' relationship sets.
    visited: HashSet<u64>,
}

impl<S: GraphStore> Crawler<S> {
    pub fn new(store: S, api: ApiClient, resolver: ResolverPool, config: &CrawlerConfig) -> Self {
        Crawler {
            store,
            api,
            resolver,
            stale_after: config.stale_after(),
            visited: HashSet::new(),
        }
    }

    pub fn calls_made(&self) -> u64 {
        self.api.calls_made()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Crawls outward from `screen_name`, expanding relationship sets up to
    /// `max_depth` hops from the seed. An unknown or unreadable seed is
    /// fatal; unreadable users found mid-walk are skipped.
    pub async fn follow_user(
        &mut self,
        screen_name: &str,
        max_depth: u32,
    ) -> Result<(), MurmurationError> {
        let seed = self.seed_user(screen_name).await?;
        tracing::info!("crawling from @{} to depth {}", seed.screen_name, max_depth);

        let mut stack: Vec<(u64, u32)> = vec![(seed.id, 0)];
        while let Some((id, depth)) = stack.pop() {
            if self.visited.contains(&id) {
                continue;
            }
            let expand = depth < max_depth;
            let user = match self.process_user(id, expand).await? {
                Some(user) => user,
                None => continue,
            };
            // leaves are refreshed but stay eligible: the same id reached
            // again within the depth bound still gets its expansion
            if expand {
                self.visited.insert(id);
                for neighbor in user.friends.iter().chain(user.followers.iter()) {
                    if !self.visited.contains(&neighbor.id) {
                        stack.push((neighbor.id, depth + 1));
                    }
                }
            }
        }
        Ok(())
    }

    /// Searches a hashtag, persists everything found, and processes each
    /// poster without expanding their relationships.
    pub async fn query_for_hashtag(&mut self, tag: &str) -> Result<(), MurmurationError> {
        let mut hashtag = Hashtag::new(tag);
        tracing::info!("searching {}", hashtag.query_form());

        let tweets = self.api.search(&hashtag).await?;
        tracing::info!("{}: {} tweets found", hashtag.query_form(), tweets.len());

        hashtag.last_scanned = Some(Utc::now());
        hashtag.last_tweet_seen = Tweet::max_id(&tweets).unwrap_or(0);
        self.store.upsert_hashtag(&hashtag)?;

        let authors: Vec<u64> = tweets
            .iter()
            .map(|t| t.author.id)
            .collect::<HashSet<u64>>()
            .into_iter()
            .collect();
        self.persist_tweets(tweets).await?;

        for id in authors {
            if !self.visited.contains(&id) {
                self.process_user(id, false).await?;
            }
        }
        Ok(())
    }

    /// Scans the hashtags a stored user actually posts under, heaviest
    /// first.
    pub async fn follow_user_hashtags(&mut self, screen_name: &str) -> Result<(), MurmurationError> {
        let seed = self.seed_user(screen_name).await?;
        let tags = self.store.get_top_hashtags_for(&seed, TOP_HASHTAG_COUNT)?;
        tracing::info!(
            "@{} posts under {} hashtags worth scanning",
            seed.screen_name,
            tags.len()
        );
        for tag in tags {
            self.query_for_hashtag(tag.name()).await?;
        }
        Ok(())
    }

    /// Walks the hashtag co-occurrence frontier out from `tag`: scan the
    /// start tag, then repeatedly scan the nearest unscanned tag within
    /// `max_hops`, heaviest first among ties.
    pub async fn follow_hashtag(&mut self, tag: &str, max_hops: u32) -> Result<(), MurmurationError> {
        let start = Hashtag::new(tag);
        self.query_for_hashtag(start.name()).await?;

        while let Some(next) = self.store.next_hashtag_to_scan(start.name(), max_hops)? {
            tracing::info!("frontier walk: next tag #{}", next);
            self.query_for_hashtag(&next).await?;
        }
        tracing::info!("frontier exhausted within {} hops of #{}", max_hops, start.name());
        Ok(())
    }

    /// Fetches full content for every tweet the store only knows by id.
    pub async fn hydrate_tweets(&mut self) -> Result<(), MurmurationError> {
        let empty = self.store.get_empty_tweets()?;
        tracing::info!("{} tweets need hydration", empty.len());

        for batch in empty.chunks(HYDRATE_BATCH_SIZE) {
            let fetched = self.api.fetch_tweets_by_id(batch).await?;
            if fetched.len() < batch.len() {
                // the upstream routinely withholds around a tenth of the ids
                tracing::info!(
                    "hydration under-delivered: {} of {} ids returned",
                    fetched.len(),
                    batch.len()
                );
            }
            self.persist_tweets(fetched).await?;
        }
        Ok(())
    }

    /// Resolves the seed by screen name, store first. A seed the upstream
    /// refuses to serve is an error, not a skip.
    async fn seed_user(&mut self, screen_name: &str) -> Result<User, MurmurationError> {
        match self.store.get_user_by_screen_name(screen_name)? {
            Some(user) => Ok(user),
            None => {
                let user = self.api.lookup_user(screen_name).await?;
                self.store.upsert_users(&[user.clone()])?;
                Ok(user)
            }
        }
    }

    /// One user's worth of work: refresh the profile and timeline when they
    /// have gone stale, persist, and return the user. Relationship sets are
    /// populated only when `want_neighbors` is set, refreshed or loaded from
    /// the store depending on staleness.
    ///
    /// Returns `None` for users the upstream refuses to serve and for
    /// protected users, whose records are kept but never expanded.
    async fn process_user(
        &mut self,
        id: u64,
        want_neighbors: bool,
    ) -> Result<Option<User>, MurmurationError> {
        let known = self.store.get_user(id)?;
        let mut user = match known {
            Some(user) if !user.needs_rescan(self.stale_after) => user,
            known => match self.api.lookup_user_by_id(id).await {
                Ok(fresh) => fresh,
                Err(ApiError::UserNotReadable) => {
                    tracing::warn!("user {} is not readable, skipping", id);
                    // keep whatever partial record we had, marked protected
                    if let Some(mut user) = known {
                        user.protected = true;
                        self.store.upsert_users(&[user])?;
                    }
                    return Ok(None);
                }
                Err(err) => return Err(err.into()),
            },
        };

        if user.protected {
            tracing::debug!("@{} is protected, not expanding", user.screen_name);
            self.store.upsert_users(&[user])?;
            return Ok(None);
        }

        if user.tweets_need_rescan(self.stale_after) {
            let since = self.store.get_max_tweet_id(&user)?;
            match self.api.fetch_timeline(&mut user, since).await {
                Ok(tweets) => {
                    tracing::info!("@{}: {} new tweets", user.screen_name, tweets.len());
                    self.persist_tweets(tweets).await?;
                }
                Err(ApiError::UserNotReadable) => {
                    tracing::warn!(
                        "timeline of @{} is not readable, marking protected",
                        user.screen_name
                    );
                    user.protected = true;
                    user.tweets_last_scanned = Some(Utc::now());
                    self.store.upsert_users(&[user])?;
                    return Ok(None);
                }
                Err(err) => return Err(err.into()),
            }
        }

        // relationship lists are only worth the call quota when the caller
        // will expand them
        if want_neighbors {
            if user.ff_need_rescan(self.stale_after) {
                match self.api.fill_friends_and_followers(user).await {
                    Ok(filled) => user = filled,
                    Err(ApiError::UserNotReadable) => {
                        return Ok(None);
                    }
                    Err(err) => return Err(err.into()),
                }
            } else {
                user.friends = self.store.load_friends(&user)?;
                user.followers = self.store.load_followers(&user)?;
            }
        }

        self.store.upsert_users(&[user.clone()])?;
        Ok(Some(user))
    }

    /// Persists a batch of tweets, backfills reply targets the store has
    /// never seen, and resolves every shared link.
    async fn persist_tweets(&mut self, tweets: HashSet<Tweet>) -> Result<(), MurmurationError> {
        if tweets.is_empty() {
            return Ok(());
        }
        let tweets: Vec<Tweet> = tweets.into_iter().collect();

        // reply targets must be checked before the upsert writes their stubs;
        // targets delivered in this very batch need no lookup
        let batch_ids: HashSet<u64> = tweets.iter().map(|t| t.id).collect();
        let reply_ids: HashSet<u64> = tweets
            .iter()
            .filter_map(|t| t.reply_to.as_ref().map(|r| r.tweet_id))
            .filter(|id| !batch_ids.contains(id))
            .collect();
        let missing: Vec<u64> = self
            .store
            .find_missing_tweet_ids(&reply_ids)?
            .into_iter()
            .collect();

        self.store.upsert_tweets(&tweets)?;
        self.resolve_links(&tweets).await?;

        if !missing.is_empty() {
            let fetched = self.api.fetch_tweets_by_id(&missing).await?;
            if fetched.len() < missing.len() {
                tracing::info!(
                    "reply backfill under-delivered: {} of {} ids returned",
                    fetched.len(),
                    missing.len()
                );
            }
            if !fetched.is_empty() {
                let fetched: Vec<Tweet> = fetched.into_iter().collect();
                self.store.upsert_tweets(&fetched)?;
                self.resolve_links(&fetched).await?;
            }
        }
        Ok(())
    }

    async fn resolve_links(&mut self, tweets: &[Tweet]) -> Result<(), MurmurationError> {
        let mut urls: HashSet<String> = HashSet::new();
        for tweet in tweets {
            collect_urls(tweet, &mut urls);
        }
        if urls.is_empty() {
            return Ok(());
        }
        let outcomes = self.resolver.resolve_all(urls).await;
        self.store.upsert_resolved_links(&outcomes)?;
        Ok(())
    }
}

/// Quoted and retweeted statuses are persisted alongside their carrier, so
/// their links get resolved too.
fn collect_urls(tweet: &Tweet, into: &mut HashSet<String>) {
    into.extend(tweet.urls.iter().cloned());
    if let Some(quoted) = &tweet.quoted {
        collect_urls(quoted, into);
    }
    if let Some(retweeted) = &tweet.retweeted {
        collect_urls(retweeted, into);
    }
}
