//! Upstream JSON payload shapes and their mapping into domain records
//!
//! Only the fields the crawler keeps are declared; serde drops the rest. The
//! upstream's `created_at` uses the legacy `"Wed Aug 27 13:08:45 +0000 2008"`
//! format.

use crate::model::{Hashtag, Mention, ReplyTarget, Tweet, User};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

const CREATED_AT_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

fn parse_created_at(raw: &Option<String>) -> Option<DateTime<Utc>> {
    raw.as_deref()
        .and_then(|s| DateTime::parse_from_str(s, CREATED_AT_FORMAT).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[derive(Debug, Deserialize)]
pub struct WireUser {
    pub id: u64,
    pub screen_name: String,
    pub name: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub lang: Option<String>,
    pub time_zone: Option<String>,
    pub created_at: Option<String>,
    pub verified: Option<bool>,
    #[serde(default)]
    pub protected: bool,
    pub profile_image_url_https: Option<String>,
    pub followers_count: Option<i64>,
    pub friends_count: Option<i64>,
    pub statuses_count: Option<i64>,
}

impl From<WireUser> for User {
    fn from(wire: WireUser) -> Self {
        User {
            id: wire.id,
            screen_name: wire.screen_name,
            name: wire.name,
            location: wire.location,
            description: wire.description,
            lang: wire.lang,
            time_zone: wire.time_zone,
            created_at: parse_created_at(&wire.created_at),
            verified: wire.verified,
            profile_image_url: wire.profile_image_url_https,
            follower_count: wire.followers_count,
            friend_count: wire.friends_count,
            tweet_count: wire.statuses_count,
            protected: wire.protected,
            ..User::default()
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct WireEntities {
    #[serde(default)]
    pub hashtags: Vec<WireHashtagEntity>,
    #[serde(default)]
    pub urls: Vec<WireUrlEntity>,
    #[serde(default)]
    pub user_mentions: Vec<WireMentionEntity>,
}

#[derive(Debug, Deserialize)]
pub struct WireHashtagEntity {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct WireUrlEntity {
    pub expanded_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireMentionEntity {
    pub id: u64,
    pub screen_name: String,
}

#[derive(Debug, Deserialize)]
pub struct WireStatus {
    pub id: u64,
    pub user: WireUser,
    pub created_at: Option<String>,
    pub text: Option<String>,
    pub lang: Option<String>,
    #[serde(default)]
    pub favorite_count: i64,
    #[serde(default)]
    pub retweet_count: i64,
    #[serde(default)]
    pub entities: WireEntities,
    pub in_reply_to_status_id: Option<u64>,
    pub in_reply_to_user_id: Option<u64>,
    pub in_reply_to_screen_name: Option<String>,
    pub quoted_status: Option<Box<WireStatus>>,
    pub retweeted_status: Option<Box<WireStatus>>,
}

impl From<WireStatus> for Tweet {
    fn from(wire: WireStatus) -> Self {
        let reply_to = match (
            wire.in_reply_to_status_id,
            wire.in_reply_to_user_id,
            wire.in_reply_to_screen_name,
        ) {
            (Some(tweet_id), Some(user_id), Some(user_screen_name)) => Some(ReplyTarget {
                tweet_id,
                user_id,
                user_screen_name,
            }),
            _ => None,
        };

        Tweet {
            id: wire.id,
            author: wire.user.into(),
            created_at: parse_created_at(&wire.created_at),
            text: wire.text,
            lang: wire.lang,
            is_retweet: wire.retweeted_status.is_some(),
            favorite_count: wire.favorite_count,
            retweet_count: wire.retweet_count,
            hashtags: wire
                .entities
                .hashtags
                .into_iter()
                .map(|h| Hashtag::new(&h.text).name().to_string())
                .collect(),
            mentions: wire
                .entities
                .user_mentions
                .into_iter()
                .map(|m| Mention {
                    id: m.id,
                    screen_name: m.screen_name,
                })
                .collect(),
            urls: wire
                .entities
                .urls
                .into_iter()
                .filter_map(|u| u.expanded_url)
                .filter(|u| !u.trim().is_empty())
                .collect(),
            quoted: wire.quoted_status.map(|s| Box::new(Tweet::from(*s))),
            retweeted: wire.retweeted_status.map(|s| Box::new(Tweet::from(*s))),
            reply_to,
        }
    }
}

/// Envelope of the search endpoint.
#[derive(Debug, Deserialize)]
pub struct WireSearchPage {
    pub statuses: Vec<WireStatus>,
}

/// One cursor-paginated page of users (friends/followers lists).
#[derive(Debug, Deserialize)]
pub struct WireUserPage {
    pub users: Vec<WireUser>,
    #[serde(default)]
    pub next_cursor: i64,
}

/// The rate-limit-status envelope: category → endpoint path → limit entry.
#[derive(Debug, Deserialize)]
pub struct WireRateLimitStatus {
    pub resources: HashMap<String, HashMap<String, WireRateLimitEntry>>,
}

#[derive(Debug, Deserialize)]
pub struct WireRateLimitEntry {
    pub remaining: i64,
    /// Reset instant as unix epoch seconds.
    pub reset: i64,
}
