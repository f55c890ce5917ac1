//! Resource-specific API operations built on the account broker
//!
//! The client owns pagination (rolling max-id for tweets, cursors for
//! friend/follower lists), response-to-domain mapping, and the caller-driven
//! retry loop: a `RetryLater` from the broker simply re-invokes the call and
//! a different account typically serves it.

use crate::api::account::{Account, Credentials};
use crate::api::limit::{RateLimitReport, ResourceLimit};
use crate::api::pool::{AccountPool, ApiResponse};
use crate::api::resource::ResourceKind;
use crate::api::wire::{
    WireRateLimitStatus, WireSearchPage, WireStatus, WireUser, WireUserPage,
};
use crate::config::{ApiConfig, CrawlerConfig};
use crate::model::{Hashtag, Tweet, User};
use crate::ApiError;
use chrono::{Duration, Utc};
use serde::de::DeserializeOwned;
use std::collections::HashSet;

const SEARCH_PAGE_SIZE: usize = 100;
const TIMELINE_PAGE_SIZE: usize = 200;
const FF_PAGE_SIZE: usize = 200;
const LOOKUP_CHUNK_SIZE: usize = 100;

/// The HTTP side of a call: base URL plus a shared client. Split from the
/// pool so a broker call can borrow it while the pool is borrowed mutably.
struct Transport {
    http: reqwest::Client,
    base_url: String,
}

impl Transport {
    async fn get<T: DeserializeOwned>(
        &self,
        creds: Credentials,
        path: &str,
        query: Vec<(String, String)>,
    ) -> Result<ApiResponse<T>, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(creds.bearer_token())
            .query(&query)
            .send()
            .await?;

        let rate_limit = rate_limit_from_headers(response.headers());
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        let value = response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(ApiResponse { value, rate_limit })
    }
}

fn rate_limit_from_headers(headers: &reqwest::header::HeaderMap) -> Option<RateLimitReport> {
    let parse = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok())
    };
    let remaining = parse("x-rate-limit-remaining")?;
    let reset_epoch = parse("x-rate-limit-reset")?;
    Some(RateLimitReport {
        remaining,
        seconds_until_reset: reset_epoch - Utc::now().timestamp(),
    })
}

pub struct ApiClient {
    transport: Transport,
    pool: AccountPool,
    max_friends_to_load: i64,
}

impl ApiClient {
    pub fn new(
        api: &ApiConfig,
        crawler: &CrawlerConfig,
        accounts: Vec<Credentials>,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("murmuration/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(30))
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()?;

        let pool = AccountPool::new(
            accounts.into_iter().map(Account::new).collect(),
            Duration::seconds(api.reset_pad_secs),
            Duration::seconds(api.cooldown_secs),
            crawler.call_ceiling,
        );

        Ok(ApiClient {
            transport: Transport {
                http,
                base_url: api.base_url.trim_end_matches('/').to_string(),
            },
            pool,
            max_friends_to_load: crawler.max_friends_to_load,
        })
    }

    /// Seeds every account's quota table from the upstream's rate-limit
    /// report. Part of bootstrap; a failure here is fatal.
    pub async fn seed_rate_limits(&mut self) -> Result<(), ApiError> {
        let creds: Vec<Credentials> = self
            .pool
            .accounts_mut()
            .iter()
            .map(|a| a.credentials.clone())
            .collect();

        for (idx, cred) in creds.into_iter().enumerate() {
            let name = cred.name.clone();
            let status: ApiResponse<WireRateLimitStatus> = self
                .transport
                .get(cred, "/application/rate_limit_status.json", Vec::new())
                .await?;

            let now = Utc::now().timestamp();
            let mut seeded = std::collections::HashMap::new();
            for endpoints in status.value.resources.values() {
                for (path, entry) in endpoints {
                    if let Some(kind) = ResourceKind::from_path(path) {
                        seeded.entry(kind).or_insert_with(|| {
                            ResourceLimit::from_report(
                                RateLimitReport {
                                    remaining: entry.remaining,
                                    seconds_until_reset: entry.reset - now,
                                },
                                Duration::zero(),
                            )
                        });
                    }
                }
            }
            tracing::info!("account {}: seeded limits for {} resources", name, seeded.len());
            self.pool.accounts_mut()[idx].seed_limits(seeded);
        }
        Ok(())
    }

    pub fn calls_made(&self) -> u64 {
        self.pool.calls_made()
    }

    /// One brokered GET with the caller-driven retry loop applied.
    async fn call_retrying<T: DeserializeOwned>(
        &mut self,
        kind: ResourceKind,
        path: &'static str,
        query: Vec<(String, String)>,
    ) -> Result<T, ApiError> {
        loop {
            let transport = &self.transport;
            let query = query.clone();
            match self
                .pool
                .call(kind, move |creds| transport.get::<T>(creds, path, query))
                .await
            {
                Ok(value) => return Ok(value),
                Err(ApiError::RetryLater) => continue,
                Err(err) => return Err(err),
            }
        }
    }

    /// Searches recent tweets for a hashtag, walking all pages with a
    /// rolling max-id cursor.
    pub async fn search(&mut self, hashtag: &Hashtag) -> Result<HashSet<Tweet>, ApiError> {
        let mut tweets: HashSet<Tweet> = HashSet::new();
        let mut max_id: Option<u64> = None;

        loop {
            let mut query = vec![
                ("q".to_string(), hashtag.query_form()),
                ("count".to_string(), SEARCH_PAGE_SIZE.to_string()),
                ("result_type".to_string(), "recent".to_string()),
            ];
            if let Some(id) = max_id {
                query.push(("max_id".to_string(), id.to_string()));
            }

            let page: WireSearchPage = self
                .call_retrying(ResourceKind::Search, "/search/tweets.json", query)
                .await?;
            let page: Vec<Tweet> = page.statuses.into_iter().map(Tweet::from).collect();
            if page.is_empty() {
                break;
            }
            let fetched = page.len();
            let min_id = Tweet::min_id(&page).expect("page is non-empty");
            tweets.extend(page);
            if fetched < SEARCH_PAGE_SIZE {
                break;
            }
            max_id = Some(min_id - 1);
        }
        Ok(tweets)
    }

    /// Fetches a user's timeline, newest first, starting at `since_max_id`
    /// when the store already knows part of it. Stamps the user's
    /// `tweets_last_scanned` on completion.
    pub async fn fetch_timeline(
        &mut self,
        user: &mut User,
        since_max_id: i64,
    ) -> Result<HashSet<Tweet>, ApiError> {
        let mut tweets: HashSet<Tweet> = HashSet::new();
        let mut max_id: Option<u64> = (since_max_id > 0).then_some(since_max_id as u64);

        loop {
            let mut query = vec![
                ("user_id".to_string(), user.id.to_string()),
                ("count".to_string(), TIMELINE_PAGE_SIZE.to_string()),
            ];
            if let Some(id) = max_id {
                query.push(("max_id".to_string(), id.to_string()));
            }

            let page: Vec<WireStatus> = self
                .call_retrying(
                    ResourceKind::Timeline,
                    "/statuses/user_timeline.json",
                    query,
                )
                .await?;
            let page: Vec<Tweet> = page.into_iter().map(Tweet::from).collect();
            if page.is_empty() {
                break;
            }
            let fetched = page.len();
            let min_id = Tweet::min_id(&page).expect("page is non-empty");
            tweets.extend(page);
            if fetched < TIMELINE_PAGE_SIZE {
                break;
            }
            max_id = Some(min_id - 1);
        }

        user.tweets_last_scanned = Some(Utc::now());
        Ok(tweets)
    }

    /// Fetches full tweets for a set of ids in chunks of 100. The upstream
    /// legitimately returns nothing for roughly a tenth of the ids; that is
    /// reported by the caller, not treated as an error here.
    pub async fn fetch_tweets_by_id(&mut self, ids: &[u64]) -> Result<HashSet<Tweet>, ApiError> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        tracing::info!("fetching {} tweets by id", ids.len());

        let mut tweets: HashSet<Tweet> = HashSet::new();
        for chunk in ids.chunks(LOOKUP_CHUNK_SIZE) {
            let joined = chunk
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(",");
            let query = vec![("id".to_string(), joined)];
            match self
                .call_retrying::<Vec<WireStatus>>(
                    ResourceKind::Timeline,
                    "/statuses/lookup.json",
                    query,
                )
                .await
            {
                Ok(page) => tweets.extend(page.into_iter().map(Tweet::from)),
                Err(ApiError::UserNotReadable) => {
                    // id lookups have no single target; this should not happen
                    tracing::warn!("unexpected auth rejection on a tweet id batch");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(tweets)
    }

    pub async fn lookup_user_by_id(&mut self, id: u64) -> Result<User, ApiError> {
        let query = vec![("user_id".to_string(), id.to_string())];
        self.lookup(query).await
    }

    pub async fn lookup_user(&mut self, screen_name: &str) -> Result<User, ApiError> {
        let query = vec![("screen_name".to_string(), screen_name.to_string())];
        self.lookup(query).await
    }

    async fn lookup(&mut self, query: Vec<(String, String)>) -> Result<User, ApiError> {
        let found: Vec<WireUser> = self
            .call_retrying(ResourceKind::UserLookup, "/users/lookup.json", query)
            .await?;
        let mut user: User = found
            .into_iter()
            .next()
            .map(User::from)
            .ok_or(ApiError::UserNotReadable)?;
        user.last_scanned = Some(Utc::now());
        Ok(user)
    }

    /// Loads both relationship sets of a user and stamps `ff_last_scanned`.
    /// Users whose declared counts exceed the configured cap keep their sets
    /// empty; paging through them would blow the time budget.
    pub async fn fill_friends_and_followers(&mut self, user: User) -> Result<User, ApiError> {
        let mut user = self
            .fill_relationships(user, ResourceKind::Friends, "/friends/list.json")
            .await?;
        user = self
            .fill_relationships(user, ResourceKind::Followers, "/followers/list.json")
            .await?;
        user.ff_last_scanned = Some(Utc::now());
        Ok(user)
    }

    async fn fill_relationships(
        &mut self,
        mut user: User,
        kind: ResourceKind,
        path: &'static str,
    ) -> Result<User, ApiError> {
        let count = match kind {
            ResourceKind::Friends => user.friend_count,
            _ => user.follower_count,
        };
        let count = match count {
            Some(c) => c,
            // partial record, fetch the profile first
            None => {
                user = self.lookup_user_by_id(user.id).await?;
                match kind {
                    ResourceKind::Friends => user.friend_count.unwrap_or(0),
                    _ => user.follower_count.unwrap_or(0),
                }
            }
        };
        if count > self.max_friends_to_load {
            tracing::info!(
                "skipping {} of {}: {} exceeds cap of {}",
                kind,
                user.screen_name,
                count,
                self.max_friends_to_load
            );
            return Ok(user);
        }

        tracing::info!("filling in {} {} of {}", count, kind, user.screen_name);
        let mut collected: HashSet<User> = HashSet::new();
        let mut cursor: i64 = -1;
        loop {
            let query = vec![
                ("user_id".to_string(), user.id.to_string()),
                ("cursor".to_string(), cursor.to_string()),
                ("count".to_string(), FF_PAGE_SIZE.to_string()),
            ];
            let page: WireUserPage = self.call_retrying(kind, path, query).await?;
            collected.extend(page.users.into_iter().map(User::from));
            cursor = page.next_cursor;
            if cursor == 0 {
                break;
            }
        }

        match kind {
            ResourceKind::Friends => user.friends = collected,
            _ => user.followers = collected,
        }
        Ok(user)
    }
}
