//! Per-resource quota bookkeeping for one account
//!
//! Every call outcome mutates the limit for the resource it drew from. The
//! upstream reports its own view of the quota on success; on failures we fall
//! back to pessimistic local bookkeeping.

use chrono::{DateTime, Duration, Utc};

/// The upstream's rate-limit report, taken from response headers on success
/// or from the dedicated rate-limit-status endpoint at bootstrap.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitReport {
    pub remaining: i64,
    pub seconds_until_reset: i64,
}

/// Remaining calls and reset clock for one (account, resource) pair.
///
/// Invariant: the pair is usable iff the reset instant has passed or calls
/// remain. A fresh limit starts with one call remaining so an account can
/// always probe a resource once before the first report arrives.
#[derive(Debug, Clone)]
pub struct ResourceLimit {
    remaining: i64,
    next_reset: DateTime<Utc>,
}

impl ResourceLimit {
    pub fn new() -> Self {
        ResourceLimit {
            remaining: 1,
            next_reset: Utc::now(),
        }
    }

    /// Builds a limit from an upstream report, padding the reset instant to
    /// absorb clock skew between us and the API.
    pub fn from_report(report: RateLimitReport, reset_pad: Duration) -> Self {
        ResourceLimit {
            remaining: report.remaining,
            next_reset: Utc::now() + Duration::seconds(report.seconds_until_reset) + reset_pad,
        }
    }

    /// Refreshes both fields from the report delivered with a successful
    /// call. The upstream omits the report on some endpoints; in that case
    /// all we can do is count the call we just spent.
    pub fn record_success(&mut self, report: Option<RateLimitReport>, reset_pad: Duration) {
        match report {
            Some(report) => {
                self.remaining = report.remaining;
                self.next_reset =
                    Utc::now() + Duration::seconds(report.seconds_until_reset) + reset_pad;
            }
            None => self.remaining -= 1,
        }
    }

    /// An auth rejection means the target was inaccessible, not that the
    /// quota is gone, so only the spent call is counted.
    pub fn record_auth_rejection(&mut self) {
        self.remaining -= 1;
    }

    /// Freezes this resource for `cooldown`. Used when a call failed for an
    /// unclassified reason and the true quota state is unknown.
    pub fn disable_for(&mut self, cooldown: Duration) {
        self.remaining = 0;
        self.next_reset = Utc::now() + cooldown;
    }

    pub fn is_usable(&self) -> bool {
        Utc::now() >= self.next_reset || self.remaining > 0
    }

    /// Seconds until the reset instant; negative once it has passed.
    pub fn seconds_until_reset(&self) -> i64 {
        (self.next_reset - Utc::now()).num_seconds()
    }

    pub fn next_reset(&self) -> DateTime<Utc> {
        self.next_reset
    }

    pub fn remaining(&self) -> i64 {
        self.remaining
    }
}

impl Default for ResourceLimit {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ResourceLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{remaining={}, reset in {}s}}",
            self.remaining,
            self.seconds_until_reset()
        )
    }
}
