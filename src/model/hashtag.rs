use chrono::{DateTime, Utc};

/// A hashtag, stored without the leading `#` and lowercased. Equality is by
/// name only; the scan bookkeeping is mutable state.
#[derive(Debug, Clone)]
pub struct Hashtag {
    name: String,
    pub last_scanned: Option<DateTime<Utc>>,
    pub last_tweet_seen: u64,
}

impl Hashtag {
    pub fn new(tag: &str) -> Self {
        Hashtag {
            name: tag.to_lowercase().replace('#', ""),
            last_scanned: None,
            last_tweet_seen: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The tag with its marker, as used in search queries.
    pub fn query_form(&self) -> String {
        format!("#{}", self.name)
    }
}

impl PartialEq for Hashtag {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Hashtag {}

impl std::hash::Hash for Hashtag {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}
