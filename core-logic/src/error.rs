//! # Core Error Types
//!
//! Typed errors raised by core-logic. Callers fold them into `anyhow::Error`.

use thiserror::Error;

/// Configuration-related errors
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("Invalid RPC URL format: '{url}'")]
    InvalidRpcUrl { url: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Unknown network '{name}' (available: {available})")]
    UnknownNetwork { name: String, available: String },

    #[error("I/O error reading {path}: {msg}")]
    IoError { path: String, msg: String },
}

/// Wallet key loading errors
#[derive(Error, Debug, Clone)]
pub enum WalletError {
    #[error("No wallet keys found (set WALLET_MAIN or provide {fallback})")]
    NoWallets { fallback: String },

    #[error("Wallet not found at index {index} (total wallets: {total})")]
    NotFound { index: usize, total: usize },

    #[error("Invalid private key format for '{label}': expected hex string")]
    InvalidKeyFormat { label: String },

    #[error("Private key for '{label}' has wrong length: expected 64 hex chars, got {length}")]
    InvalidKeyLength { label: String, length: usize },
}

/// Database operation errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection pool exhausted (max: {max_size})")]
    PoolExhausted { max_size: u32 },

    #[error("Transaction failed: {msg}")]
    TransactionFailed { msg: String },

    #[error("Query returned no rows for key: {key}")]
    NotFound { key: String },
}

/// Network and RPC-related errors
#[derive(Error, Debug, Clone)]
pub enum NetworkError {
    #[error("RPC request timeout after {timeout_ms}ms to {endpoint}")]
    Timeout { timeout_ms: u64, endpoint: String },

    #[error("Connection refused to {endpoint}: {reason}")]
    ConnectionRefused { endpoint: String, reason: String },

    #[error("Transaction {tx_hash} dropped before confirmation")]
    Dropped { tx_hash: String },
}
