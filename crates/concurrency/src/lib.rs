//! Concurrency control for stock issuance
//!
//! This crate provides:
//! - Lock backends: `SetIfAbsentLockProvider` (polled leases) and
//!   `QueuedLockProvider` (FIFO waiters with leases)
//! - `LockGuard`: scoped release of a granted lease
//! - Retry and lease policies
//! - Issuance strategies: mutex, optimistic, pessimistic, spin lock and
//!   lease lock, all behind the `IssueStrategy` trait

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod guard;
mod lease;
pub mod queued;
pub mod retry;
pub mod set_if_absent;
pub mod strategy;

pub use guard::LockGuard;
pub use lease::LockStats;
pub use queued::QueuedLockProvider;
pub use retry::{LeasePolicy, RetryPolicy, SpinPolicy};
pub use set_if_absent::{SetIfAbsentLockProvider, DEFAULT_POLL_INTERVAL};
pub use strategy::{
    lock_key, IssueStrategy, LeaseLockStrategy, MutexStrategy, OptimisticStrategy,
    PessimisticStrategy, SpinLockStrategy,
};
