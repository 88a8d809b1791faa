//! Storage layer for stockade
//!
//! This crate implements the in-memory transactional stock store with:
//! - InMemoryStockStore: DashMap of per-item rows
//! - Row versioning for optimistic conditional writes
//! - Exclusive row locks held until transaction end
//! - Uniqueness enforcement on `(item, requester)` issuance records
//! - InMemoryTransaction: buffered writes, atomic validate-and-apply commit

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;
mod row;
pub mod transaction;

pub use memory::{InMemoryStockStore, StoreMetrics, DEFAULT_LOCK_TIMEOUT};
pub use transaction::{InMemoryTransaction, TransactionStatus};
