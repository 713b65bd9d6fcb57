//! # Core Logic - Shared Utilities for the Transfer Workspace
//!
//! This crate provides the chain-agnostic plumbing used by the network crates:
//! configuration types, wallet key loading, logging, retry helpers, metrics
//! and the SQLite run ledger.
//!
//! ## Modules
//!
//! - [`config`] - Network and wallet source configuration
//! - [`database`] - Async SQLite ledger for run reports
//! - [`error`] - Typed error handling with thiserror
//! - [`metrics`] - Transfer counters and confirmation latency
//! - [`utils`] - Utility modules (wallet, logger, gas, retry)

pub mod config;
pub mod database;
pub mod error;
pub mod metrics;
pub(crate) mod utils;

pub use config::{NetworkConfig, WalletSource};
pub use database::{DatabaseManager, LedgerOutcome, LedgerRun};
pub use error::{ConfigError, DatabaseError, NetworkError, WalletError};
pub use metrics::{MetricsCollector, MetricsSnapshot};

// Utils are pub(crate) - only export specific public utilities
pub use utils::{
    multiplier_percent, setup_logger, GasConfig, GasConfigToml, StandardGasLimits, WalletManager,
    WalletSecret, RESULT_TARGET,
};

pub use utils::retry::{with_retry, RetryConfig};
