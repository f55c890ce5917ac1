//! Resource classification for upstream endpoints
//!
//! The upstream API accounts its quota per coarse endpoint family, not per
//! call. Each family has its own remaining-calls counter and reset clock, so
//! the broker needs to know which bucket a request draws from.

/// A coarse category of upstream endpoint sharing one rate-limit bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Friends,
    Followers,
    Timeline,
    UserLookup,
    Search,
    App,
}

/// All kinds, in the order the limiter table is initialized.
pub const ALL_KINDS: [ResourceKind; 6] = [
    ResourceKind::Friends,
    ResourceKind::Followers,
    ResourceKind::Timeline,
    ResourceKind::UserLookup,
    ResourceKind::Search,
    ResourceKind::App,
];

impl ResourceKind {
    /// The endpoint path prefix this kind matches.
    pub fn path_prefix(&self) -> &'static str {
        match self {
            ResourceKind::Friends => "/friends/list",
            ResourceKind::Followers => "/followers/",
            ResourceKind::Timeline => "/statuses/",
            ResourceKind::UserLookup => "/users/lookup",
            ResourceKind::Search => "/search/",
            ResourceKind::App => "/application/rate_limit_status",
        }
    }

    /// Classifies an endpoint path by prefix. Paths outside the six known
    /// families (the upstream reports limits for many more) return `None`.
    pub fn from_path(path: &str) -> Option<ResourceKind> {
        ALL_KINDS.into_iter().find(|k| path.starts_with(k.path_prefix()))
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResourceKind::Friends => "friends",
            ResourceKind::Followers => "followers",
            ResourceKind::Timeline => "timeline",
            ResourceKind::UserLookup => "user-lookup",
            ResourceKind::Search => "search",
            ResourceKind::App => "app",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_known_prefixes() {
        assert_eq!(
            ResourceKind::from_path("/friends/list.json"),
            Some(ResourceKind::Friends)
        );
        assert_eq!(
            ResourceKind::from_path("/followers/list.json"),
            Some(ResourceKind::Followers)
        );
        assert_eq!(
            ResourceKind::from_path("/statuses/user_timeline.json"),
            Some(ResourceKind::Timeline)
        );
        assert_eq!(
            ResourceKind::from_path("/statuses/lookup.json"),
            Some(ResourceKind::Timeline)
        );
        assert_eq!(
            ResourceKind::from_path("/users/lookup.json"),
            Some(ResourceKind::UserLookup)
        );
        assert_eq!(
            ResourceKind::from_path("/search/tweets.json"),
            Some(ResourceKind::Search)
        );
        assert_eq!(
            ResourceKind::from_path("/application/rate_limit_status.json"),
            Some(ResourceKind::App)
        );
    }

    #[test]
    fn unknown_paths_are_unclassified() {
        assert_eq!(ResourceKind::from_path("/lists/members.json"), None);
        assert_eq!(ResourceKind::from_path(""), None);
    }
}
