//! Issuance Integration Tests
//!
//! Every strategy, driven through `IssuanceService` by real threads.

#[path = "../common/mod.rs"]
mod common;

mod idempotency;
mod lock_hygiene;
mod no_lost_updates;
mod safety;
mod scenarios;
