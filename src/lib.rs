//! Stockade - concurrency control for contended stock issuance
//!
//! Many requesters race to take one unit each from a finite stock. Stockade
//! issues at most the initial stock, never lets stock go negative, and
//! gives each requester at most one unit per item, under any of five
//! concurrency-control strategies.
//!
//! # Quick Start
//!
//! ```ignore
//! use stockade::{IssuanceService, IssueOutcome, ItemId, RequesterId, StockStore, StockadeConfig};
//!
//! let config = StockadeConfig::for_strategy(stockade::StrategyKind::Optimistic);
//! let (service, store) = IssuanceService::in_memory(&config)?;
//! store.create_item(ItemId(1), 100)?;
//!
//! match service.issue(RequesterId(7), ItemId(1))? {
//!     IssueOutcome::Issued { remaining } => println!("{} left", remaining),
//!     other => println!("{}", other),
//! }
//! ```
//!
//! # Architecture
//!
//! - `stockade-core`: identifiers, the pure issuance decision, outcomes,
//!   errors and the store / lock traits
//! - `stockade-storage`: transactional in-memory store
//! - `stockade-concurrency`: lock backends and the five strategies
//! - `stockade-engine`: configuration and the issuance service

pub use stockade_concurrency::{
    lock_key, IssueStrategy, LeaseLockStrategy, LeasePolicy, LockGuard, LockStats, MutexStrategy,
    OptimisticStrategy, PessimisticStrategy, QueuedLockProvider, RetryPolicy,
    SetIfAbsentLockProvider, SpinLockStrategy, SpinPolicy,
};
pub use stockade_core::*;
pub use stockade_engine::{
    ConfigError, IssuanceMetrics, IssuanceService, StockadeConfig, CONFIG_FILE_NAME,
};
pub use stockade_storage::{InMemoryStockStore, StoreMetrics};
