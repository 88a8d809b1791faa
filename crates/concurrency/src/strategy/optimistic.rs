//! Optimistic issuance with bounded retry
//!
//! Reads the row version, decides, and commits a version-checked write. A
//! conflict means another writer got there first: back off, re-read, and
//! try again until the attempt budget runs out.

use std::sync::Arc;
use std::thread;
use stockade_core::{
    IssuanceResult, IssueOutcome, ItemId, RequesterId, StockStore, StrategyKind,
    UnavailableReason,
};
use tracing::{debug, warn};

use super::{attempt, read_stock, IssueStrategy, ReadDiscipline};
use crate::retry::RetryPolicy;

/// Versioned read, conditional write, fixed-backoff retry
pub struct OptimisticStrategy {
    store: Arc<dyn StockStore>,
    policy: RetryPolicy,
}

impl OptimisticStrategy {
    /// Create a strategy with the default retry policy
    pub fn new(store: Arc<dyn StockStore>) -> Self {
        Self::with_policy(store, RetryPolicy::default())
    }

    /// Create a strategy with a custom retry policy
    pub fn with_policy(store: Arc<dyn StockStore>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    /// Active retry policy
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

impl IssueStrategy for OptimisticStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Optimistic
    }

    fn issue(&self, requester: RequesterId, item: ItemId) -> IssuanceResult<IssueOutcome> {
        let max_attempts = self.policy.max_attempts;
        for attempt_no in 1..=max_attempts {
            match attempt(&*self.store, requester, item, ReadDiscipline::Versioned) {
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_conflict() => {
                    debug!(
                        target: "stockade::strategy",
                        %item,
                        %requester,
                        attempt = attempt_no,
                        "Version conflict; retrying"
                    );
                    if attempt_no < max_attempts {
                        thread::sleep(self.policy.backoff);
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(
            target: "stockade::strategy",
            %item,
            %requester,
            attempts = max_attempts,
            "Optimistic retries exhausted"
        );
        Ok(IssueOutcome::Unavailable(
            UnavailableReason::RetriesExhausted {
                attempts: max_attempts,
            },
        ))
    }

    fn query_stock(&self, item: ItemId) -> IssuanceResult<u64> {
        Ok(read_stock(&*self.store, item, Some(ReadDiscipline::Versioned))?)
    }
}
