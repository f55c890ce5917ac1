//! SQLite schema
//!
//! A relational rendering of the harvested graph: node tables for users,
//! tweets and hashtags, edge tables for follows/tags/mentions/contains, and
//! a links table holding resolution results keyed by the original URL.

use rusqlite::Connection;

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id                  INTEGER PRIMARY KEY,
    screen_name         TEXT NOT NULL,
    name                TEXT,
    location            TEXT,
    description         TEXT,
    lang                TEXT,
    time_zone           TEXT,
    created_at          TEXT,
    verified            INTEGER,
    profile_image_url   TEXT,
    follower_count      INTEGER,
    friend_count        INTEGER,
    tweet_count         INTEGER,
    protected           INTEGER NOT NULL DEFAULT 0,
    last_scanned        TEXT,
    tweets_last_scanned TEXT,
    ff_last_scanned     TEXT
);

CREATE INDEX IF NOT EXISTS idx_users_screen_name ON users(screen_name);

CREATE TABLE IF NOT EXISTS follows (
    follower_id INTEGER NOT NULL,
    friend_id   INTEGER NOT NULL,
    PRIMARY KEY (follower_id, friend_id)
);

CREATE INDEX IF NOT EXISTS idx_follows_friend ON follows(friend_id);

CREATE TABLE IF NOT EXISTS tweets (
    id                   INTEGER PRIMARY KEY,
    author_id            INTEGER NOT NULL,
    created_at           TEXT,
    text                 TEXT,
    lang                 TEXT,
    is_retweet           INTEGER NOT NULL DEFAULT 0,
    favorite_count       INTEGER NOT NULL DEFAULT 0,
    retweet_count        INTEGER NOT NULL DEFAULT 0,
    in_reply_to_tweet_id INTEGER,
    in_reply_to_user_id  INTEGER,
    quoted_tweet_id      INTEGER,
    retweeted_tweet_id   INTEGER
);

CREATE INDEX IF NOT EXISTS idx_tweets_author ON tweets(author_id);

CREATE TABLE IF NOT EXISTS tweet_hashtags (
    tweet_id INTEGER NOT NULL,
    tag      TEXT NOT NULL,
    PRIMARY KEY (tweet_id, tag)
);

CREATE INDEX IF NOT EXISTS idx_tweet_hashtags_tag ON tweet_hashtags(tag);

CREATE TABLE IF NOT EXISTS tweet_mentions (
    tweet_id INTEGER NOT NULL,
    user_id  INTEGER NOT NULL,
    PRIMARY KEY (tweet_id, user_id)
);

CREATE TABLE IF NOT EXISTS tweet_urls (
    tweet_id INTEGER NOT NULL,
    url      TEXT NOT NULL,
    PRIMARY KEY (tweet_id, url)
);

CREATE TABLE IF NOT EXISTS hashtags (
    name            TEXT PRIMARY KEY,
    last_scanned    TEXT,
    last_tweet_seen INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS links (
    url           TEXT PRIMARY KEY,
    final_url     TEXT,
    site          TEXT,
    error_code    INTEGER,
    error_message TEXT
);
"#;

/// Applies the schema and connection pragmas. Idempotent: safe on every open.
pub fn initialize(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
    conn.execute_batch(SCHEMA)
}
