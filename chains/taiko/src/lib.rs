//! # Taiko Transfer
//!
//! Nonce-safe sequential transfer runs against the Taiko Preconf devnet and the
//! Hekla testnet.
//!
//! A run is built from four pieces that sit on top of the [`client::ChainClient`] seam:
//!
//! - **[`recovery::NonceRecovery`]**: clears stale pending transactions with zero-value
//!   self-transfers at an elevated fee
//! - **[`engine::SequentialTransfer`]**: one transaction in flight per sender, nonce
//!   advanced only after confirmation, resync from `latest` after any failure
//! - **[`orchestrator::MultiSender`]**: funds secondary wallets from the primary, then
//!   runs the engine once per wallet
//! - **[`report::RunReport`]**: pure aggregation plus a create-new JSON record per run
//!
//! [`robust`] and [`stress`] wire these into the two runs the binary exposes.

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod outcome;
pub mod recovery;
pub mod report;
pub mod robust;
pub mod stress;
pub mod utils;

pub use client::{ChainClient, EthersClient, NonceTag, TransferRequest, TxHandle, TxReceipt, Wallet};
pub use config::TransferConfig;
pub use engine::SequentialTransfer;
pub use error::TransferError;
pub use orchestrator::{FundingPolicy, MultiSender};
pub use outcome::{FailureStage, TransferOutcome};
pub use recovery::{CancellationSummary, NonceRecovery};
pub use report::{RunReport, RunSummary};
