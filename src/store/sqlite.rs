//! SQLite-backed graph store
//!
//! Implements the [`GraphStore`] contract on rusqlite. Writes run in one
//! transaction per batch. Merge rules: COALESCE keeps known values when a
//! partial record arrives later, stub inserts never overwrite, and scan
//! stamps only move forward when the caller supplies them.

use crate::model::{Hashtag, Mention, ReplyTarget, Tweet, User};
use crate::resolver::ResolveOutcome;
use crate::store::schema;
use crate::store::traits::{GraphStore, StoreResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, Transaction};
use std::collections::{HashMap, HashSet};
use std::path::Path;

const USER_COLUMNS: &str = "id, screen_name, name, location, description, lang, time_zone, \
     created_at, verified, profile_image_url, follower_count, friend_count, tweet_count, \
     protected, last_scanned, tweets_last_scanned, ff_last_scanned";

const USER_UPSERT: &str = "\
INSERT INTO users (id, screen_name, name, location, description, lang, time_zone, created_at, \
                   verified, profile_image_url, follower_count, friend_count, tweet_count, \
                   protected, last_scanned, tweets_last_scanned, ff_last_scanned) \
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17) \
ON CONFLICT(id) DO UPDATE SET \
    screen_name         = excluded.screen_name, \
    name                = COALESCE(excluded.name, users.name), \
    location            = COALESCE(excluded.location, users.location), \
    description         = COALESCE(excluded.description, users.description), \
    lang                = COALESCE(excluded.lang, users.lang), \
    time_zone           = COALESCE(excluded.time_zone, users.time_zone), \
    created_at          = COALESCE(excluded.created_at, users.created_at), \
    verified            = COALESCE(excluded.verified, users.verified), \
    profile_image_url   = COALESCE(excluded.profile_image_url, users.profile_image_url), \
    follower_count      = COALESCE(excluded.follower_count, users.follower_count), \
    friend_count        = COALESCE(excluded.friend_count, users.friend_count), \
    tweet_count         = COALESCE(excluded.tweet_count, users.tweet_count), \
    protected           = excluded.protected, \
    last_scanned        = COALESCE(excluded.last_scanned, users.last_scanned), \
    tweets_last_scanned = COALESCE(excluded.tweets_last_scanned, users.tweets_last_scanned), \
    ff_last_scanned     = COALESCE(excluded.ff_last_scanned, users.ff_last_scanned)";

const TWEET_UPSERT: &str = "\
INSERT INTO tweets (id, author_id, created_at, text, lang, is_retweet, favorite_count, \
                    retweet_count, in_reply_to_tweet_id, in_reply_to_user_id, quoted_tweet_id, \
                    retweeted_tweet_id) \
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12) \
ON CONFLICT(id) DO UPDATE SET \
    author_id            = excluded.author_id, \
    created_at           = COALESCE(excluded.created_at, tweets.created_at), \
    text                 = COALESCE(excluded.text, tweets.text), \
    lang                 = COALESCE(excluded.lang, tweets.lang), \
    is_retweet           = excluded.is_retweet, \
    favorite_count       = excluded.favorite_count, \
    retweet_count        = excluded.retweet_count, \
    in_reply_to_tweet_id = COALESCE(excluded.in_reply_to_tweet_id, tweets.in_reply_to_tweet_id), \
    in_reply_to_user_id  = COALESCE(excluded.in_reply_to_user_id, tweets.in_reply_to_user_id), \
    quoted_tweet_id      = COALESCE(excluded.quoted_tweet_id, tweets.quoted_tweet_id), \
    retweeted_tweet_id   = COALESCE(excluded.retweeted_tweet_id, tweets.retweeted_tweet_id)";

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn new(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(SqliteStore { conn })
    }

    /// In-memory store, used by tests.
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(SqliteStore { conn })
    }
}

fn ts_out(ts: Option<DateTime<Utc>>) -> Option<String> {
    ts.map(|t| t.to_rfc3339())
}

fn ts_in(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|t| t.with_timezone(&Utc))
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get::<_, i64>("id")? as u64,
        screen_name: row.get("screen_name")?,
        name: row.get("name")?,
        location: row.get("location")?,
        description: row.get("description")?,
        lang: row.get("lang")?,
        time_zone: row.get("time_zone")?,
        created_at: ts_in(row.get("created_at")?),
        verified: row.get::<_, Option<i64>>("verified")?.map(|v| v != 0),
        profile_image_url: row.get("profile_image_url")?,
        follower_count: row.get("follower_count")?,
        friend_count: row.get("friend_count")?,
        tweet_count: row.get("tweet_count")?,
        protected: row.get::<_, i64>("protected")? != 0,
        last_scanned: ts_in(row.get("last_scanned")?),
        tweets_last_scanned: ts_in(row.get("tweets_last_scanned")?),
        ff_last_scanned: ts_in(row.get("ff_last_scanned")?),
        friends: HashSet::new(),
        followers: HashSet::new(),
    })
}

fn write_user(tx: &Transaction<'_>, user: &User) -> rusqlite::Result<()> {
    tx.execute(
        USER_UPSERT,
        params![
            user.id as i64,
            user.screen_name,
            user.name,
            user.location,
            user.description,
            user.lang,
            user.time_zone,
            ts_out(user.created_at),
            user.verified.map(i64::from),
            user.profile_image_url,
            user.follower_count,
            user.friend_count,
            user.tweet_count,
            user.protected as i64,
            ts_out(user.last_scanned),
            ts_out(user.tweets_last_scanned),
            ts_out(user.ff_last_scanned),
        ],
    )?;
    Ok(())
}

/// Id/screen-name stub for edge endpoints; a later full profile fills the
/// rest in, this never overwrites one.
fn write_user_stub(tx: &Transaction<'_>, id: u64, screen_name: &str) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT INTO users (id, screen_name) VALUES (?1, ?2) ON CONFLICT(id) DO NOTHING",
        params![id as i64, screen_name],
    )?;
    Ok(())
}

fn write_tweet(tx: &Transaction<'_>, tweet: &Tweet) -> rusqlite::Result<()> {
    write_user(tx, &tweet.author)?;

    tx.execute(
        TWEET_UPSERT,
        params![
            tweet.id as i64,
            tweet.author.id as i64,
            ts_out(tweet.created_at),
            tweet.text,
            tweet.lang,
            tweet.is_retweet as i64,
            tweet.favorite_count,
            tweet.retweet_count,
            tweet.reply_to.as_ref().map(|r| r.tweet_id as i64),
            tweet.reply_to.as_ref().map(|r| r.user_id as i64),
            tweet.quoted.as_ref().map(|q| q.id as i64),
            tweet.retweeted.as_ref().map(|r| r.id as i64),
        ],
    )?;

    for tag in &tweet.hashtags {
        tx.execute(
            "INSERT OR IGNORE INTO hashtags (name) VALUES (?1)",
            params![tag],
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO tweet_hashtags (tweet_id, tag) VALUES (?1, ?2)",
            params![tweet.id as i64, tag],
        )?;
    }

    for Mention { id, screen_name } in &tweet.mentions {
        write_user_stub(tx, *id, screen_name)?;
        tx.execute(
            "INSERT OR IGNORE INTO tweet_mentions (tweet_id, user_id) VALUES (?1, ?2)",
            params![tweet.id as i64, *id as i64],
        )?;
    }

    for url in &tweet.urls {
        tx.execute(
            "INSERT OR IGNORE INTO tweet_urls (tweet_id, url) VALUES (?1, ?2)",
            params![tweet.id as i64, url],
        )?;
        // a bare row marks the link as seen; resolution fills it later
        tx.execute("INSERT OR IGNORE INTO links (url) VALUES (?1)", params![url])?;
    }

    if let Some(ReplyTarget {
        tweet_id,
        user_id,
        user_screen_name,
    }) = &tweet.reply_to
    {
        write_user_stub(tx, *user_id, user_screen_name)?;
        tx.execute(
            "INSERT OR IGNORE INTO tweets (id, author_id) VALUES (?1, ?2)",
            params![*tweet_id as i64, *user_id as i64],
        )?;
    }

    if let Some(quoted) = &tweet.quoted {
        write_tweet(tx, quoted)?;
    }
    if let Some(retweeted) = &tweet.retweeted {
        write_tweet(tx, retweeted)?;
    }
    Ok(())
}

impl GraphStore for SqliteStore {
    fn upsert_tweets(&mut self, tweets: &[Tweet]) -> StoreResult<()> {
        tracing::debug!("persisting {} tweets", tweets.len());
        let tx = self.conn.transaction()?;
        for tweet in tweets {
            write_tweet(&tx, tweet)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn upsert_users(&mut self, users: &[User]) -> StoreResult<()> {
        tracing::debug!("persisting {} users", users.len());
        let tx = self.conn.transaction()?;
        for user in users {
            write_user(&tx, user)?;
            for friend in &user.friends {
                write_user_stub(&tx, friend.id, &friend.screen_name)?;
                tx.execute(
                    "INSERT OR IGNORE INTO follows (follower_id, friend_id) VALUES (?1, ?2)",
                    params![user.id as i64, friend.id as i64],
                )?;
            }
            for follower in &user.followers {
                write_user_stub(&tx, follower.id, &follower.screen_name)?;
                tx.execute(
                    "INSERT OR IGNORE INTO follows (follower_id, friend_id) VALUES (?1, ?2)",
                    params![follower.id as i64, user.id as i64],
                )?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn upsert_hashtag(&mut self, hashtag: &Hashtag) -> StoreResult<()> {
        tracing::debug!("persisting hashtag #{}", hashtag.name());
        self.conn.execute(
            "INSERT INTO hashtags (name, last_scanned, last_tweet_seen) VALUES (?1, ?2, ?3) \
             ON CONFLICT(name) DO UPDATE SET \
                 last_scanned    = COALESCE(excluded.last_scanned, hashtags.last_scanned), \
                 last_tweet_seen = MAX(hashtags.last_tweet_seen, excluded.last_tweet_seen)",
            params![
                hashtag.name(),
                ts_out(hashtag.last_scanned),
                hashtag.last_tweet_seen as i64
            ],
        )?;
        Ok(())
    }

    fn upsert_resolved_links(
        &mut self,
        links: &HashMap<String, ResolveOutcome>,
    ) -> StoreResult<()> {
        let good = links.values().filter(|o| !o.is_error()).count();
        tracing::debug!(
            "persisting {} resolved and {} error links",
            good,
            links.len() - good
        );

        let tx = self.conn.transaction()?;
        for (url, outcome) in links {
            match outcome {
                ResolveOutcome::Resolved {
                    final_url,
                    canonical_host,
                } => {
                    tx.execute(
                        "INSERT INTO links (url, final_url, site) VALUES (?1, ?2, ?3) \
                         ON CONFLICT(url) DO UPDATE SET \
                             final_url = excluded.final_url, \
                             site = excluded.site, \
                             error_code = NULL, \
                             error_message = NULL",
                        params![url, final_url, canonical_host],
                    )?;
                }
                ResolveOutcome::Error { code, message } => {
                    // an error never replaces an earlier successful resolution
                    tx.execute(
                        "INSERT INTO links (url, error_code, error_message) VALUES (?1, ?2, ?3) \
                         ON CONFLICT(url) DO UPDATE SET \
                             error_code = excluded.error_code, \
                             error_message = excluded.error_message \
                         WHERE links.final_url IS NULL",
                        params![url, code, message],
                    )?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn get_user(&self, id: u64) -> StoreResult<Option<User>> {
        let user = self
            .conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id as i64],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    fn get_user_by_screen_name(&self, screen_name: &str) -> StoreResult<Option<User>> {
        let user = self
            .conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE screen_name = ?1"),
                params![screen_name],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    fn load_friends(&self, user: &User) -> StoreResult<HashSet<User>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE id IN (SELECT friend_id FROM follows WHERE follower_id = ?1)"
        ))?;
        let users = stmt
            .query_map(params![user.id as i64], row_to_user)?
            .collect::<rusqlite::Result<HashSet<User>>>()?;
        Ok(users)
    }

    fn load_followers(&self, user: &User) -> StoreResult<HashSet<User>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE id IN (SELECT follower_id FROM follows WHERE friend_id = ?1)"
        ))?;
        let users = stmt
            .query_map(params![user.id as i64], row_to_user)?
            .collect::<rusqlite::Result<HashSet<User>>>()?;
        Ok(users)
    }

    fn get_top_hashtags_for(&self, user: &User, limit: usize) -> StoreResult<Vec<Hashtag>> {
        let mut stmt = self.conn.prepare(
            "SELECT th.tag, \
                    (SELECT COUNT(*) FROM tweet_hashtags w WHERE w.tag = th.tag) AS weight \
             FROM tweet_hashtags th \
             JOIN tweets t ON t.id = th.tweet_id \
             WHERE t.author_id = ?1 \
             GROUP BY th.tag \
             ORDER BY weight DESC \
             LIMIT ?2",
        )?;
        let tags = stmt
            .query_map(params![user.id as i64, limit as i64], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(tags.iter().map(|t| Hashtag::new(t)).collect())
    }

    fn get_users_for_hashtag(&self, hashtag: &Hashtag) -> StoreResult<HashSet<User>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE id IN (SELECT t.author_id FROM tweets t \
                          JOIN tweet_hashtags th ON th.tweet_id = t.id \
                          WHERE th.tag = ?1)"
        ))?;
        let users = stmt
            .query_map(params![hashtag.name()], row_to_user)?
            .collect::<rusqlite::Result<HashSet<User>>>()?;
        Ok(users)
    }

    fn find_missing_tweet_ids(&self, candidates: &HashSet<u64>) -> StoreResult<HashSet<u64>> {
        if candidates.is_empty() {
            return Ok(HashSet::new());
        }
        tracing::info!("checking {} tweet ids against the store", candidates.len());

        let placeholders = vec!["?"; candidates.len()].join(",");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id FROM tweets WHERE id IN ({placeholders})"
        ))?;
        let known = stmt
            .query_map(
                params_from_iter(candidates.iter().map(|&id| id as i64)),
                |row| row.get::<_, i64>(0),
            )?
            .collect::<rusqlite::Result<HashSet<i64>>>()?;

        Ok(candidates
            .iter()
            .copied()
            .filter(|&id| !known.contains(&(id as i64)))
            .collect())
    }

    fn get_max_tweet_id(&self, user: &User) -> StoreResult<i64> {
        let max = self.conn.query_row(
            "SELECT COALESCE(MAX(id), -1) FROM tweets WHERE author_id = ?1",
            params![user.id as i64],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(max)
    }

    fn get_empty_tweets(&self) -> StoreResult<Vec<u64>> {
        let mut stmt = self.conn.prepare("SELECT id FROM tweets WHERE text IS NULL")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids.into_iter().map(|id| id as u64).collect())
    }

    fn next_hashtag_to_scan(&self, start_tag: &str, max_hops: u32) -> StoreResult<Option<String>> {
        // two tags are one hop apart when they tag the same tweet; the
        // ordering contract (nearest hop, then weight descending) is spelled
        // out rather than left to the store
        let next = self
            .conn
            .query_row(
                "WITH RECURSIVE reach(tag, dist) AS ( \
                     SELECT ?1, 0 \
                     UNION \
                     SELECT th2.tag, reach.dist + 1 \
                     FROM reach \
                     JOIN tweet_hashtags th1 ON th1.tag = reach.tag \
                     JOIN tweet_hashtags th2 \
                       ON th2.tweet_id = th1.tweet_id AND th2.tag <> th1.tag \
                     WHERE reach.dist < ?2 \
                 ) \
                 SELECT r.tag, MIN(r.dist) AS dist, \
                        (SELECT COUNT(*) FROM tweet_hashtags w WHERE w.tag = r.tag) AS weight \
                 FROM reach r \
                 LEFT JOIN hashtags h ON h.name = r.tag \
                 WHERE r.tag <> ?1 AND h.last_scanned IS NULL \
                 GROUP BY r.tag \
                 ORDER BY dist ASC, weight DESC \
                 LIMIT 1",
                params![start_tag, max_hops as i64],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(next)
    }
}
