//! Distributed lock taken by bounded polling
//!
//! Probes the lock with `try_acquire`, sleeping a fixed delay between
//! probes. Polling is unfair: under sustained contention a caller can lose
//! every probe and give up while later arrivals succeed.

use std::sync::Arc;
use std::thread;
use stockade_core::{
    IssuanceResult, IssueOutcome, ItemId, LockHandle, LockProvider, RequesterId, StockStore,
    StrategyKind, UnavailableReason,
};
use tracing::{debug, trace};

use super::{attempt_under_lock, lock_key, read_stock, IssueStrategy};
use crate::guard::LockGuard;
use crate::retry::SpinPolicy;

/// Spin on a distributed lock, then run the plain issuance path
pub struct SpinLockStrategy {
    store: Arc<dyn StockStore>,
    locks: Arc<dyn LockProvider>,
    policy: SpinPolicy,
}

impl SpinLockStrategy {
    /// Create a strategy with the default spin policy
    pub fn new(store: Arc<dyn StockStore>, locks: Arc<dyn LockProvider>) -> Self {
        Self::with_policy(store, locks, SpinPolicy::default())
    }

    /// Create a strategy with a custom spin policy
    pub fn with_policy(
        store: Arc<dyn StockStore>,
        locks: Arc<dyn LockProvider>,
        policy: SpinPolicy,
    ) -> Self {
        Self {
            store,
            locks,
            policy,
        }
    }

    /// Active spin policy
    pub fn policy(&self) -> &SpinPolicy {
        &self.policy
    }

    fn spin(&self, key: &str) -> IssuanceResult<Option<LockHandle>> {
        let max_attempts = self.policy.max_attempts;
        for probe in 1..=max_attempts {
            if let Some(handle) = self.locks.try_acquire(key, self.policy.lease)? {
                trace!(target: "stockade::strategy", key, probe, "Lock acquired");
                return Ok(Some(handle));
            }
            if probe < max_attempts {
                thread::sleep(self.policy.retry_delay);
            }
        }
        Ok(None)
    }
}

impl IssueStrategy for SpinLockStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::SpinLock
    }

    fn issue(&self, requester: RequesterId, item: ItemId) -> IssuanceResult<IssueOutcome> {
        let key = lock_key(item);
        let Some(handle) = self.spin(&key)? else {
            debug!(
                target: "stockade::strategy",
                %item,
                %requester,
                attempts = self.policy.max_attempts,
                "Spin lock not acquired"
            );
            return Ok(IssueOutcome::Unavailable(
                UnavailableReason::LockNotAcquired {
                    attempts: self.policy.max_attempts,
                },
            ));
        };

        let guard = LockGuard::new(&*self.locks, handle);
        attempt_under_lock(&*self.store, requester, item, guard.handle().fencing_token)
    }

    fn query_stock(&self, item: ItemId) -> IssuanceResult<u64> {
        Ok(read_stock(&*self.store, item, None)?)
    }
}
