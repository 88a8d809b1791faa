//! Distributed lock taken by a blocking, bounded wait

use std::sync::Arc;
use stockade_core::{
    IssuanceResult, IssueOutcome, ItemId, LockError, LockProvider, RequesterId, StockStore,
    StrategyKind, UnavailableReason,
};
use tracing::debug;

use super::{attempt_under_lock, lock_key, read_stock, IssueStrategy};
use crate::guard::LockGuard;
use crate::retry::LeasePolicy;

/// Wait for a leased lock, run the plain issuance path, release if still held
///
/// Pairs naturally with [`crate::QueuedLockProvider`], which grants waiters
/// in arrival order. If the lease lapses inside the critical section and
/// another holder commits first, the write is rejected and the call
/// reports `LeaseLost`.
pub struct LeaseLockStrategy {
    store: Arc<dyn StockStore>,
    locks: Arc<dyn LockProvider>,
    policy: LeasePolicy,
}

impl LeaseLockStrategy {
    /// Create a strategy with the default lease policy
    pub fn new(store: Arc<dyn StockStore>, locks: Arc<dyn LockProvider>) -> Self {
        Self::with_policy(store, locks, LeasePolicy::default())
    }

    /// Create a strategy with a custom lease policy
    pub fn with_policy(
        store: Arc<dyn StockStore>,
        locks: Arc<dyn LockProvider>,
        policy: LeasePolicy,
    ) -> Self {
        Self {
            store,
            locks,
            policy,
        }
    }

    /// Active lease policy
    pub fn policy(&self) -> &LeasePolicy {
        &self.policy
    }
}

impl IssueStrategy for LeaseLockStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::LeaseLock
    }

    fn issue(&self, requester: RequesterId, item: ItemId) -> IssuanceResult<IssueOutcome> {
        let key = lock_key(item);
        let acquired = self
            .locks
            .acquire_blocking(&key, self.policy.wait_timeout, self.policy.lease);
        let handle = match acquired {
            Ok(handle) => handle,
            Err(LockError::TimedOut { waited, .. }) => {
                debug!(
                    target: "stockade::strategy",
                    %item,
                    %requester,
                    ?waited,
                    "Lock wait timed out"
                );
                return Ok(IssueOutcome::Unavailable(
                    UnavailableReason::LockWaitTimedOut { waited },
                ));
            }
            Err(e) => return Err(e.into()),
        };

        let guard = LockGuard::new(&*self.locks, handle);
        attempt_under_lock(&*self.store, requester, item, guard.handle().fencing_token)
    }

    fn query_stock(&self, item: ItemId) -> IssuanceResult<u64> {
        Ok(read_stock(&*self.store, item, None)?)
    }
}
