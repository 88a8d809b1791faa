//! Core types and traits for Stockade
//!
//! This crate defines the foundational types used throughout the system:
//! - ItemId / RequesterId: Identifiers of stock rows and requesters
//! - StockItem / IssuanceRecord: The two persisted facts
//! - Decision: Pure allow/deny logic shared by every strategy
//! - IssueOutcome: Typed result of an issuance attempt
//! - Error: Store, lock and issuance error hierarchy
//! - Traits: StockStore, StockTransaction, LockProvider

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod decision;
pub mod error;
pub mod outcome;
pub mod traits;
pub mod types;

pub use decision::{decide, Decision, DenyReason};
pub use error::{
    IssuanceError, IssuanceResult, LockError, LockResult, StoreError, StoreResult,
};
pub use outcome::{IssueOutcome, StrategyKind, UnavailableReason};
pub use traits::{
    with_transaction, HolderToken, LockHandle, LockProvider, ReleaseOutcome, StockStore,
    StockTransaction,
};
pub use types::{IssuanceRecord, ItemId, RequesterId, StockItem, TxnId, Version};
