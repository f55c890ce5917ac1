use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

/// A user record with an open set of profile properties and two relationship
/// sets that are only populated on demand.
///
/// Identity is the numeric id; `screen_name` is carried for display and for
/// stub records (mentions, reply targets) where the id is all we know besides
/// the name. The three `*_scanned` stamps drive staleness-based refresh.
#[derive(Debug, Clone, Default)]
pub struct User {
    pub id: u64,
    pub screen_name: String,

    pub name: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub lang: Option<String>,
    pub time_zone: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub verified: Option<bool>,
    pub profile_image_url: Option<String>,
    pub follower_count: Option<i64>,
    pub friend_count: Option<i64>,
    pub tweet_count: Option<i64>,
    pub protected: bool,

    pub last_scanned: Option<DateTime<Utc>>,
    pub tweets_last_scanned: Option<DateTime<Utc>>,
    pub ff_last_scanned: Option<DateTime<Utc>>,

    /// Users this user follows. Empty unless explicitly filled; never
    /// partially populated.
    pub friends: HashSet<User>,
    /// Users following this user. Same population rule as `friends`.
    pub followers: HashSet<User>,
}

impl User {
    /// Creates a stub record carrying only id and screen name.
    pub fn stub(id: u64, screen_name: impl Into<String>) -> Self {
        User {
            id,
            screen_name: screen_name.into(),
            ..User::default()
        }
    }

    /// Whether the profile itself is due for a refresh.
    pub fn needs_rescan(&self, stale_after: Duration) -> bool {
        is_stale(self.last_scanned, stale_after)
    }

    /// Whether the timeline is due for a refresh.
    pub fn tweets_need_rescan(&self, stale_after: Duration) -> bool {
        is_stale(self.tweets_last_scanned, stale_after)
    }

    /// Whether friends/followers are due for a refresh.
    pub fn ff_need_rescan(&self, stale_after: Duration) -> bool {
        is_stale(self.ff_last_scanned, stale_after)
    }
}

fn is_stale(last: Option<DateTime<Utc>>, stale_after: Duration) -> bool {
    match last {
        None => true,
        Some(at) => Utc::now() - at > stale_after,
    }
}

impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for User {}

impl Hash for User {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
