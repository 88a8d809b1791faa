//! Issuance strategies
//!
//! Every strategy runs the same pure [`decide`] inside a different form of
//! concurrency control:
//!
//! | Strategy | Control | Gives up with |
//! |---|---|---|
//! | [`MutexStrategy`] | per-item process mutex | never |
//! | [`OptimisticStrategy`] | versioned write, bounded retry | `RetriesExhausted` |
//! | [`PessimisticStrategy`] | exclusive row lock | never (row lock timeout is a fault) |
//! | [`SpinLockStrategy`] | polled distributed lock | `LockNotAcquired` |
//! | [`LeaseLockStrategy`] | queued distributed lock | `LockWaitTimedOut` |
//!
//! A caller that fails to obtain control never touches the stock row.

mod lease_lock;
mod mutex;
mod optimistic;
mod pessimistic;
mod spin_lock;

pub use lease_lock::LeaseLockStrategy;
pub use mutex::MutexStrategy;
pub use optimistic::OptimisticStrategy;
pub use pessimistic::PessimisticStrategy;
pub use spin_lock::SpinLockStrategy;

use stockade_core::{
    decide, Decision, IssuanceResult, IssueOutcome, ItemId, RequesterId, StockStore, StoreError,
    StoreResult, StrategyKind, UnavailableReason,
};
use tracing::{debug, trace, warn};

/// A concurrency-control discipline for issuing units of stock
///
/// Thread safety: `issue` is called concurrently from many threads, for
/// the same and for different items.
pub trait IssueStrategy: Send + Sync {
    /// Which discipline this is
    fn kind(&self) -> StrategyKind;

    /// Issue at most one unit of `item` to `requester`
    ///
    /// Denials and failure to obtain control are returned as outcomes.
    ///
    /// # Errors
    ///
    /// Returns `IssuanceError` only for store or lock service faults.
    fn issue(&self, requester: RequesterId, item: ItemId) -> IssuanceResult<IssueOutcome>;

    /// Current stock of `item`, read with this strategy's read discipline
    ///
    /// # Errors
    ///
    /// Returns `IssuanceError::Store` if the item has no row or the read
    /// cannot take the row lock in time.
    fn query_stock(&self, item: ItemId) -> IssuanceResult<u64>;
}

/// How a strategy reads the row it is about to write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReadDiscipline {
    /// Versioned read, version-checked write
    Versioned,
    /// Exclusive row lock, unconditional write
    Exclusive,
}

/// Name of the distributed lock guarding `item`
pub fn lock_key(item: ItemId) -> String {
    format!("stock:lock:{}", item)
}

/// One read-decide-write-record-commit pass in a fresh transaction
///
/// A duplicate record found at write or commit time becomes
/// `AlreadyIssued`. Version conflicts are returned to the caller, which
/// decides whether they mean "retry" or "lease lost".
pub(crate) fn attempt(
    store: &dyn StockStore,
    requester: RequesterId,
    item: ItemId,
    discipline: ReadDiscipline,
) -> StoreResult<IssueOutcome> {
    let mut txn = store.begin();
    let row = match discipline {
        ReadDiscipline::Versioned => txn.read_for_versioned_update(item)?,
        ReadDiscipline::Exclusive => txn.read_for_exclusive_update(item)?,
    };
    let already_issued = txn.is_issued(item, requester)?;

    let new_stock = match decide(row.remaining, requester, already_issued) {
        Decision::Allow { new_stock } => new_stock,
        Decision::Deny(reason) => {
            txn.rollback();
            trace!(
                target: "stockade::strategy",
                %item,
                %requester,
                ?reason,
                "Request denied"
            );
            return Ok(reason.into());
        }
    };

    let staged = match discipline {
        ReadDiscipline::Versioned => txn.write_if_version_matches(item, new_stock, row.version),
        ReadDiscipline::Exclusive => txn.write(item, new_stock),
    }
    .and_then(|()| txn.record_issuance(item, requester));

    let committed = match staged {
        Ok(()) => txn.commit(),
        Err(e) => {
            txn.rollback();
            Err(e)
        }
    };

    match committed {
        Ok(()) => {
            trace!(
                target: "stockade::strategy",
                %item,
                %requester,
                remaining = new_stock,
                "Unit issued"
            );
            Ok(IssueOutcome::Issued {
                remaining: new_stock,
            })
        }
        Err(StoreError::DuplicateIssuance { .. }) => {
            debug!(
                target: "stockade::strategy",
                %item,
                %requester,
                "Concurrent duplicate rejected at commit"
            );
            Ok(IssueOutcome::AlreadyIssued)
        }
        Err(e) => Err(e),
    }
}

/// The plain issuance path run while holding a distributed lock
///
/// A version conflict here means mutual exclusion was lost: the lease
/// lapsed and another holder committed first. Nothing was applied.
pub(crate) fn attempt_under_lock(
    store: &dyn StockStore,
    requester: RequesterId,
    item: ItemId,
    fencing_token: u64,
) -> IssuanceResult<IssueOutcome> {
    match attempt(store, requester, item, ReadDiscipline::Versioned) {
        Ok(outcome) => Ok(outcome),
        Err(e) if e.is_conflict() => {
            warn!(
                target: "stockade::strategy",
                %item,
                %requester,
                fencing_token,
                "Lease lost inside critical section; write rejected"
            );
            Ok(IssueOutcome::Unavailable(UnavailableReason::LeaseLost))
        }
        Err(e) => Err(e.into()),
    }
}

/// Read the remaining stock of `item` under `discipline`, or plainly
pub(crate) fn read_stock(
    store: &dyn StockStore,
    item: ItemId,
    discipline: Option<ReadDiscipline>,
) -> StoreResult<u64> {
    let Some(discipline) = discipline else {
        return Ok(store.read_plain(item)?.remaining);
    };
    let mut txn = store.begin();
    let row = match discipline {
        ReadDiscipline::Versioned => txn.read_for_versioned_update(item)?,
        ReadDiscipline::Exclusive => txn.read_for_exclusive_update(item)?,
    };
    txn.rollback();
    Ok(row.remaining)
}
