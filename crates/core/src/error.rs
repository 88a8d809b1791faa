//! Error types for stockade
//!
//! This module defines the error hierarchy used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Domain denials (out of stock, already issued) and control-acquisition
//! failures are NOT errors: they are returned as typed outcomes. The types
//! here cover store and lock faults, plus the store-level conflicts that
//! strategies translate into outcomes.

use crate::types::{ItemId, RequesterId, Version};
use std::time::Duration;
use thiserror::Error;

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for lock provider operations
pub type LockResult<T> = std::result::Result<T, LockError>;

/// Result type alias for issuance operations
pub type IssuanceResult<T> = std::result::Result<T, IssuanceError>;

/// Errors raised by a [`crate::traits::StockStore`]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No stock row exists for the item
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    /// A stock row already exists for the item
    #[error("Item already exists: {0}")]
    ItemExists(ItemId),

    /// Version check failed: another writer committed since the read
    #[error("Version conflict on item {item}: expected {expected}, found {actual}")]
    Conflict {
        /// Item whose row changed
        item: ItemId,
        /// Version the writer observed
        expected: Version,
        /// Version found at write or commit time
        actual: Version,
    },

    /// The `(item, requester)` pair already has an issuance record
    #[error("Requester {requester} already holds a unit of item {item}")]
    DuplicateIssuance {
        /// Item the record belongs to
        item: ItemId,
        /// Requester that already holds a unit
        requester: RequesterId,
    },

    /// Waiting for a row's exclusive lock exceeded the store's lock timeout
    #[error("Timed out after {waited:?} waiting for row lock on item {item}")]
    LockTimeout {
        /// Item whose row lock could not be obtained
        item: ItemId,
        /// Time spent waiting
        waited: Duration,
    },

    /// Unconditional write attempted without holding the row's exclusive lock
    #[error("Write to item {0} requires the row's exclusive lock")]
    NotLocked(ItemId),

    /// Invalid operation or state (e.g. stock underflow, closed transaction)
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl StoreError {
    /// Whether this is an optimistic version conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    /// Whether this is a uniqueness violation on the issuance records
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::DuplicateIssuance { .. })
    }
}

/// Errors raised by a [`crate::traits::LockProvider`]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LockError {
    /// Blocking acquisition gave up after the wait timeout
    #[error("Timed out after {waited:?} waiting for lock '{key}'")]
    TimedOut {
        /// Lock name
        key: String,
        /// Time spent waiting
        waited: Duration,
    },

    /// The lock backend failed (unreachable service, poisoned state)
    #[error("Lock backend error: {0}")]
    Backend(String),
}

/// Fatal issuance failures
///
/// Anything in here is a fault of the underlying collaborators and is
/// propagated unchanged. Expected outcomes live in `IssueOutcome`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IssuanceError {
    /// Store unreachable or inconsistent
    #[error("Store fault: {0}")]
    Store(#[from] StoreError),

    /// Lock service fault
    #[error("Lock fault: {0}")]
    Lock(#[from] LockError),

    /// Invalid service configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl IssuanceError {
    /// Whether retrying the same call later could succeed
    ///
    /// Row lock timeouts and lock backend hiccups are transient; missing
    /// items and configuration mistakes are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            IssuanceError::Store(StoreError::LockTimeout { .. }) => true,
            IssuanceError::Store(StoreError::Conflict { .. }) => true,
            IssuanceError::Lock(_) => true,
            _ => false,
        }
    }
}
