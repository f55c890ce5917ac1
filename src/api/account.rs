use crate::api::limit::{RateLimitReport, ResourceLimit};
use crate::api::resource::{ResourceKind, ALL_KINDS};
use serde::Deserialize;
use std::collections::HashMap;

/// Credential bundle for one upstream account, loaded from an `[[accounts]]`
/// table in the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub name: String,
    #[serde(rename = "consumer-key")]
    pub consumer_key: String,
    #[serde(rename = "consumer-secret")]
    pub consumer_secret: String,
    #[serde(rename = "access-token")]
    pub access_token: String,
    #[serde(rename = "access-token-secret")]
    pub access_token_secret: String,
}

impl Credentials {
    /// The opaque token attached to requests. Proper request signing is the
    /// transport's concern, not ours; the broker only needs something that
    /// identifies the account to the upstream.
    pub fn bearer_token(&self) -> String {
        format!("{}:{}", self.access_token, self.access_token_secret)
    }
}

/// One configured account with its per-resource quota table. Owned
/// exclusively by the account pool; identity is the account name.
#[derive(Debug)]
pub struct Account {
    pub credentials: Credentials,
    limits: HashMap<ResourceKind, ResourceLimit>,
}

impl Account {
    /// Creates an account with default limits (one probe call per resource).
    pub fn new(credentials: Credentials) -> Self {
        let limits = ALL_KINDS
            .into_iter()
            .map(|kind| (kind, ResourceLimit::new()))
            .collect();
        Account { credentials, limits }
    }

    pub fn name(&self) -> &str {
        &self.credentials.name
    }

    /// Replaces the limit table from a bootstrap rate-limit lookup. Kinds the
    /// upstream did not report keep their probe default.
    pub fn seed_limits(&mut self, seeded: HashMap<ResourceKind, ResourceLimit>) {
        for (kind, limit) in seeded {
            self.limits.insert(kind, limit);
        }
    }

    pub fn limit(&self, kind: ResourceKind) -> &ResourceLimit {
        &self.limits[&kind]
    }

    pub fn limit_mut(&mut self, kind: ResourceKind) -> &mut ResourceLimit {
        self.limits.get_mut(&kind).expect("all kinds initialized")
    }

    pub fn is_usable(&self, kind: ResourceKind) -> bool {
        self.limits[&kind].is_usable()
    }

    pub fn record_success(
        &mut self,
        kind: ResourceKind,
        report: Option<RateLimitReport>,
        reset_pad: chrono::Duration,
    ) {
        self.limit_mut(kind).record_success(report, reset_pad);
    }
}
