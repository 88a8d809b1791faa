//! Issuance engine for Stockade
//!
//! This crate wires a store, a lock provider and a strategy into an
//! `IssuanceService`, configured from `stockade.toml`:
//! - config: `StockadeConfig` and its sections
//! - service: `IssuanceService` (issue, query_stock, metrics)
//! - metrics: `IssuanceMetrics` snapshot

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod metrics;
pub mod service;

pub use config::{
    ConfigError, LeaseLockSection, OptimisticSection, SpinLockSection, StockadeConfig,
    StoreSection, CONFIG_FILE_NAME,
};
pub use metrics::IssuanceMetrics;
pub use service::IssuanceService;
