//! Account pool / broker
//!
//! All configured accounts share the call load. For every call the broker
//! picks the best account for the requested resource kind, runs the call, and
//! feeds the outcome back into that account's quota table. When every account
//! is exhausted for a kind, the calling task blocks until the soonest reset.

use crate::api::account::{Account, Credentials};
use crate::api::limit::RateLimitReport;
use crate::api::resource::ResourceKind;
use crate::ApiError;
use chrono::Duration;
use std::future::Future;

/// A successful upstream call: the decoded value plus the rate-limit report
/// the response carried, if any.
pub struct ApiResponse<T> {
    pub value: T,
    pub rate_limit: Option<RateLimitReport>,
}

pub struct AccountPool {
    accounts: Vec<Account>,
    reset_pad: Duration,
    cooldown: Duration,
    call_ceiling: u64,
    calls_made: u64,
}

impl AccountPool {
    pub fn new(
        accounts: Vec<Account>,
        reset_pad: Duration,
        cooldown: Duration,
        call_ceiling: u64,
    ) -> Self {
        AccountPool {
            accounts,
            reset_pad,
            cooldown,
            call_ceiling,
            calls_made: 0,
        }
    }

    pub fn accounts_mut(&mut self) -> &mut [Account] {
        &mut self.accounts
    }

    pub fn calls_made(&self) -> u64 {
        self.calls_made
    }

    /// Picks the account to serve `kind`, blocking the calling task until one
    /// becomes usable.
    ///
    /// Among usable accounts the one with the soonest reset wins: accounts
    /// are round-robined toward exhaustion evenly, so closest-to-refresh is
    /// the most available. If none is usable the task sleeps until the
    /// soonest reset across the pool and selection is retried.
    async fn acquire(&mut self, kind: ResourceKind) -> Result<usize, ApiError> {
        loop {
            if self.calls_made >= self.call_ceiling {
                return Err(ApiError::CallBudgetExhausted(self.call_ceiling));
            }

            let usable = self
                .accounts
                .iter()
                .enumerate()
                .filter(|(_, a)| a.is_usable(kind))
                .min_by_key(|(_, a)| a.limit(kind).next_reset());
            if let Some((idx, _)) = usable {
                return Ok(idx);
            }

            let (idx, wait_secs) = self
                .accounts
                .iter()
                .enumerate()
                .min_by_key(|(_, a)| a.limit(kind).next_reset())
                .map(|(i, a)| (i, a.limit(kind).seconds_until_reset()))
                .expect("pool has at least one account");

            tracing::info!(
                "all accounts exhausted for {}, waiting {}s for {}",
                kind,
                wait_secs.max(0),
                self.accounts[idx].name()
            );
            if wait_secs > 0 {
                tokio::time::sleep(std::time::Duration::from_secs(wait_secs as u64)).await;
            }
        }
    }

    /// Acquires an account, runs `f` with its credentials and classifies the
    /// outcome:
    ///
    /// - success: the account's limit is refreshed from the response's
    ///   rate-limit report and the value is returned;
    /// - HTTP 401/403: the target is unreadable; one call is charged and
    ///   [`ApiError::UserNotReadable`] is returned;
    /// - anything else: quota state is unknown, the resource is frozen on
    ///   this account for the cooldown and [`ApiError::RetryLater`] is
    ///   returned. The caller re-invokes `call`; a different account will
    ///   typically serve the retry.
    pub async fn call<T, F, Fut>(&mut self, kind: ResourceKind, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(Credentials) -> Fut,
        Fut: Future<Output = Result<ApiResponse<T>, ApiError>>,
    {
        let idx = self.acquire(kind).await?;
        self.calls_made += 1;
        let account_name = self.accounts[idx].name().to_string();
        tracing::debug!("calling {} via account {}", kind, account_name);

        match f(self.accounts[idx].credentials.clone()).await {
            Ok(response) => {
                self.accounts[idx].record_success(kind, response.rate_limit, self.reset_pad);
                Ok(response.value)
            }
            Err(ApiError::Status { status, .. }) if status == 401 || status == 403 => {
                tracing::info!("{} target is protected (HTTP {})", kind, status);
                self.accounts[idx].limit_mut(kind).record_auth_rejection();
                Err(ApiError::UserNotReadable)
            }
            Err(err) => {
                tracing::warn!(
                    "call failed on account {} for {}: {err}; disabling resource for {}s",
                    account_name,
                    kind,
                    self.cooldown.num_seconds()
                );
                self.accounts[idx].limit_mut(kind).disable_for(self.cooldown);
                Err(ApiError::RetryLater)
            }
        }
    }
}
