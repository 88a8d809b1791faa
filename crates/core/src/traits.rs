//! Core traits for the store and lock abstractions
//!
//! This module defines the StockStore, StockTransaction and LockProvider
//! traits. Strategies are written against these traits only, so any backing
//! store or lock service with the stated atomicity guarantees can be swapped
//! in without touching the concurrency layer.

use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::error::{LockResult, StoreResult};
use crate::types::{ItemId, RequesterId, StockItem, TxnId, Version};

/// Transactional store of stock rows and issuance records
///
/// Thread safety: All methods must be safe to call concurrently from
/// multiple threads (requires Send + Sync).
pub trait StockStore: Send + Sync {
    /// Create the stock row for an item
    ///
    /// # Errors
    ///
    /// Returns `ItemExists` if the item already has a row.
    fn create_item(&self, item: ItemId, initial_stock: u64) -> StoreResult<StockItem>;

    /// Begin a new transaction
    ///
    /// Dropping the returned transaction without committing rolls it back
    /// and releases any row locks it holds.
    fn begin(&self) -> Box<dyn StockTransaction + '_>;

    /// Read the committed row without any locking
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` if the item has no row.
    fn read_plain(&self, item: ItemId) -> StoreResult<StockItem>;

    /// Whether a committed issuance record exists for the pair
    fn is_issued(&self, item: ItemId, requester: RequesterId) -> StoreResult<bool>;

    /// Number of committed issuance records for an item
    fn issuance_count(&self, item: ItemId) -> StoreResult<usize>;
}

/// One unit of work against a [`StockStore`]
///
/// Writes are buffered until [`commit`](StockTransaction::commit), which
/// validates every pending conditional write and issuance record and applies
/// all of them or none of them. Row locks taken through
/// [`read_for_exclusive_update`](StockTransaction::read_for_exclusive_update)
/// are held until the transaction commits, rolls back, or is dropped.
pub trait StockTransaction: Send {
    /// Identifier of this transaction
    fn id(&self) -> TxnId;

    /// Read the committed row without locking; may observe stale data
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` if the item has no row.
    fn read_plain(&mut self, item: ItemId) -> StoreResult<StockItem>;

    /// Read the row for a later version-checked write
    ///
    /// Waits while another transaction holds the row's exclusive lock. The
    /// caller passes the observed version back to
    /// [`write_if_version_matches`](StockTransaction::write_if_version_matches).
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound`, or `LockTimeout` if the exclusive holder does
    /// not finish within the store's lock timeout.
    fn read_for_versioned_update(&mut self, item: ItemId) -> StoreResult<StockItem>;

    /// Compare-and-swap the remaining stock
    ///
    /// Fails fast with `Conflict` if the committed version already differs
    /// from `expected`; the check is repeated atomically at commit.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` on version mismatch or `ItemNotFound`.
    fn write_if_version_matches(
        &mut self,
        item: ItemId,
        new_remaining: u64,
        expected: Version,
    ) -> StoreResult<()>;

    /// Read the row and take its exclusive lock for the rest of the transaction
    ///
    /// Blocks while another transaction holds the lock, bounded by the
    /// store's lock timeout. Re-entrant within the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` or `LockTimeout`.
    fn read_for_exclusive_update(&mut self, item: ItemId) -> StoreResult<StockItem>;

    /// Unconditionally write the remaining stock
    ///
    /// # Errors
    ///
    /// Returns `NotLocked` unless this transaction holds the row's
    /// exclusive lock.
    fn write(&mut self, item: ItemId, new_remaining: u64) -> StoreResult<()>;

    /// Record that `requester` received a unit of `item`
    ///
    /// # Errors
    ///
    /// Returns `DuplicateIssuance` if the pair is already recorded, either
    /// committed or earlier in this transaction. Re-checked at commit.
    fn record_issuance(&mut self, item: ItemId, requester: RequesterId) -> StoreResult<()>;

    /// Whether a committed issuance record exists for the pair
    fn is_issued(&mut self, item: ItemId, requester: RequesterId) -> StoreResult<bool>;

    /// Validate and apply all buffered writes atomically
    ///
    /// Every row whose stock is written moves to its next version. Row
    /// locks are released whether or not the commit succeeds.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` or `DuplicateIssuance` when validation fails; in
    /// that case nothing is applied.
    fn commit(self: Box<Self>) -> StoreResult<()>;

    /// Discard buffered writes and release row locks
    fn rollback(self: Box<Self>);
}

/// Run `f` inside a store transaction
///
/// Commits when `f` returns `Ok`, rolls back when it returns `Err`.
///
/// # Example
/// ```text
/// let remaining = with_transaction(store, |txn| {
///     let row = txn.read_for_exclusive_update(item)?;
///     txn.write(item, row.remaining - 1)?;
///     Ok(row.remaining - 1)
/// })?;
/// ```
pub fn with_transaction<T, E, F>(store: &dyn StockStore, f: F) -> Result<T, E>
where
    F: FnOnce(&mut dyn StockTransaction) -> Result<T, E>,
    E: From<crate::error::StoreError>,
{
    let mut txn = store.begin();
    match f(txn.as_mut()) {
        Ok(value) => {
            txn.commit()?;
            Ok(value)
        }
        Err(e) => {
            txn.rollback();
            Err(e)
        }
    }
}

/// Opaque identity of a lock holder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HolderToken(Uuid);

impl HolderToken {
    /// Generate a fresh random token
    pub fn new() -> Self {
        HolderToken(Uuid::new_v4())
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for HolderToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for HolderToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A granted lease on a named lock
///
/// Owned by the caller that acquired it. The lease expires at `expires_at`
/// even if it is never released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHandle {
    /// Lock name
    pub key: String,
    /// Identity of this grant; release checks it
    pub holder: HolderToken,
    /// Strictly increasing per key across grants
    pub fencing_token: u64,
    /// Instant at which the lease lapses
    pub expires_at: Instant,
}

impl LockHandle {
    /// Whether the lease has lapsed at `now`
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    /// Whether the lease has lapsed
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }
}

/// Result of releasing a lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The caller was the holder and the lock is now free
    Released,
    /// The caller no longer held the lock (lease expired, maybe re-granted);
    /// nothing was changed
    NotHeld,
}

/// Mutual exclusion keyed by lock name, with leases
///
/// Implementations must never let a release revoke a grant held by someone
/// else: release is checked against the handle's holder token.
pub trait LockProvider: Send + Sync {
    /// Try to take the lock without blocking
    ///
    /// Returns `Ok(None)` if the lock is currently held by a live lease.
    ///
    /// # Errors
    ///
    /// Returns `Backend` if the lock service fails.
    fn try_acquire(&self, key: &str, lease: Duration) -> LockResult<Option<LockHandle>>;

    /// Take the lock, waiting up to `wait_timeout`
    ///
    /// # Errors
    ///
    /// Returns `TimedOut` if the lock could not be obtained in time, or
    /// `Backend` if the lock service fails.
    fn acquire_blocking(
        &self,
        key: &str,
        wait_timeout: Duration,
        lease: Duration,
    ) -> LockResult<LockHandle>;

    /// Release the lock if `handle` is still the current holder
    ///
    /// Releasing a lock that is no longer held is not an error.
    ///
    /// # Errors
    ///
    /// Returns `Backend` if the lock service fails.
    fn release(&self, handle: &LockHandle) -> LockResult<ReleaseOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holder_tokens_are_unique() {
        let a = HolderToken::new();
        let b = HolderToken::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_lock_handle_expiry() {
        let now = Instant::now();
        let handle = LockHandle {
            key: "k".to_string(),
            holder: HolderToken::new(),
            fencing_token: 1,
            expires_at: now + Duration::from_millis(10),
        };
        assert!(!handle.is_expired_at(now));
        assert!(handle.is_expired_at(now + Duration::from_millis(10)));
    }
}
