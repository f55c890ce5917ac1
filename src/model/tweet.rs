use crate::model::User;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

/// A user summary attached to a tweet's mention list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mention {
    pub id: u64,
    pub screen_name: String,
}

/// The reply target of a tweet. The upstream delivers the three fields
/// together or not at all, so they live in one optional struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyTarget {
    pub tweet_id: u64,
    pub user_id: u64,
    pub user_screen_name: String,
}

/// One harvested tweet. Hashtags are normalized (lowercase, no `#`), URLs are
/// the expanded forms from the entity list. Quoted and retweeted tweets nest
/// one level; replies are carried as an id-only target.
#[derive(Debug, Clone)]
pub struct Tweet {
    pub id: u64,
    pub author: User,
    pub created_at: Option<DateTime<Utc>>,
    pub text: Option<String>,
    pub lang: Option<String>,
    pub is_retweet: bool,
    pub favorite_count: i64,
    pub retweet_count: i64,
    pub hashtags: HashSet<String>,
    pub mentions: Vec<Mention>,
    pub urls: HashSet<String>,
    pub quoted: Option<Box<Tweet>>,
    pub retweeted: Option<Box<Tweet>>,
    pub reply_to: Option<ReplyTarget>,
}

impl Tweet {
    /// Smallest id in a batch, used to roll the max-id pagination cursor.
    pub fn min_id<'a>(tweets: impl IntoIterator<Item = &'a Tweet>) -> Option<u64> {
        tweets.into_iter().map(|t| t.id).min()
    }

    /// Largest id in a batch, used to stamp a hashtag's `last_tweet_seen`.
    pub fn max_id<'a>(tweets: impl IntoIterator<Item = &'a Tweet>) -> Option<u64> {
        tweets.into_iter().map(|t| t.id).max()
    }
}

impl PartialEq for Tweet {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Tweet {}

impl Hash for Tweet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tweet(id: u64) -> Tweet {
        Tweet {
            id,
            author: User::stub(1, "alice"),
            created_at: None,
            text: Some("hello".into()),
            lang: None,
            is_retweet: false,
            favorite_count: 0,
            retweet_count: 0,
            hashtags: HashSet::new(),
            mentions: Vec::new(),
            urls: HashSet::new(),
            quoted: None,
            retweeted: None,
            reply_to: None,
        }
    }

    #[test]
    fn min_and_max_id_over_batch() {
        let batch = vec![tweet(30), tweet(10), tweet(20)];
        assert_eq!(Tweet::min_id(&batch), Some(10));
        assert_eq!(Tweet::max_id(&batch), Some(30));
        assert_eq!(Tweet::min_id(&[]), None);
    }

    #[test]
    fn equality_is_by_id() {
        let a = tweet(7);
        let mut b = tweet(7);
        b.text = Some("different".into());
        assert_eq!(a, b);
    }
}
