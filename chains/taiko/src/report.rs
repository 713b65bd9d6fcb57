//! Run aggregation and the per-run JSON record.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use core_logic::{DatabaseManager, LedgerOutcome, LedgerRun, NetworkConfig};
use ethers::types::U256;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::outcome::{serialize_decimal, TransferOutcome};

pub const ROBUST_PREFIX: &str = "robust-test";
pub const STRESS_PREFIX: &str = "transfer-test";

/// Counts derived from an outcome list. Computing it twice gives the same answer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// In `[0, 1]`; `0` for an empty run.
    pub success_rate: f64,
    /// Gas of successful transfers only.
    pub total_gas_used: U256,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: &[TransferOutcome]) -> Self {
        let total = outcomes.len();
        let successful = outcomes.iter().filter(|o| o.success).count();
        let total_gas_used = outcomes
            .iter()
            .filter(|o| o.success)
            .filter_map(|o| o.gas_used)
            .fold(U256::zero(), |acc, gas| acc.saturating_add(gas));

        Self {
            total,
            successful,
            failed: total - successful,
            success_rate: if total == 0 {
                0.0
            } else {
                successful as f64 / total as f64
            },
            total_gas_used,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub timestamp: String,
    pub network: String,
    pub rpc_endpoint: String,
    pub started_at: String,
    pub finished_at: String,
    pub total_execution_time_seconds: f64,
    pub transaction_count: usize,
    pub successful_txs: usize,
    pub failed_txs: usize,
    pub success_rate: f64,
    #[serde(serialize_with = "serialize_decimal")]
    pub total_gas_used: U256,
    pub transactions_per_second: f64,
    pub transactions: Vec<TransferOutcome>,
}

impl RunReport {
    pub fn from_outcomes(
        network: &NetworkConfig,
        started: DateTime<Utc>,
        finished: DateTime<Utc>,
        transactions: Vec<TransferOutcome>,
    ) -> Self {
        let summary = RunSummary::from_outcomes(&transactions);
        let elapsed = (finished - started).num_milliseconds().max(0) as f64 / 1000.0;
        let transactions_per_second = if elapsed > 0.0 {
            summary.successful as f64 / elapsed
        } else {
            0.0
        };
        let finished_at = finished.to_rfc3339_opts(SecondsFormat::Millis, true);

        Self {
            timestamp: finished_at.clone(),
            network: network.name.clone(),
            rpc_endpoint: network.rpc_url.clone(),
            started_at: started.to_rfc3339_opts(SecondsFormat::Millis, true),
            finished_at,
            total_execution_time_seconds: elapsed,
            transaction_count: summary.total,
            successful_txs: summary.successful,
            failed_txs: summary.failed,
            success_rate: summary.success_rate,
            total_gas_used: summary.total_gas_used,
            transactions_per_second,
            transactions,
        }
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary::from_outcomes(&self.transactions)
    }

    /// `<prefix>-<network_key>-<timestamp>.json`, colons in the timestamp replaced by `-`.
    pub fn file_name(&self, prefix: &str, network_key: &str) -> String {
        format!(
            "{}-{}-{}.json",
            prefix,
            network_key,
            self.timestamp.replace(':', "-")
        )
    }

    /// Write pretty JSON into `dir`. Fails rather than overwrite an existing record.
    pub async fn write_to(&self, dir: &Path, prefix: &str, network_key: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create report directory {}", dir.display()))?;

        let path = dir.join(self.file_name(prefix, network_key));
        let json = serde_json::to_string_pretty(self)?;

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to create report {}", path.display()))?;
        file.write_all(json.as_bytes()).await?;
        file.flush().await?;

        Ok(path)
    }

    /// Store this run in the ledger and read it back. Returns the ledger id.
    pub async fn record_in(&self, db: &DatabaseManager, report_path: Option<&Path>) -> Result<i64> {
        let (run, outcomes) = self.to_ledger(report_path);
        let id = db.record_run(&run, &outcomes).await?;

        let stored = db.get_run(id).await?;
        let rows = db.outcomes_for_run(id).await?;
        if rows.len() as i64 != stored.transaction_count {
            bail!(
                "Ledger run {} holds {} outcomes, expected {}",
                id,
                rows.len(),
                stored.transaction_count
            );
        }
        Ok(id)
    }

    /// Rows for the SQLite ledger.
    pub fn to_ledger(&self, report_path: Option<&Path>) -> (LedgerRun, Vec<LedgerOutcome>) {
        let run = LedgerRun {
            id: 0,
            network: self.network.clone(),
            rpc_endpoint: self.rpc_endpoint.clone(),
            started_at: self.started_at.clone(),
            finished_at: self.finished_at.clone(),
            transaction_count: self.transaction_count as i64,
            successful_txs: self.successful_txs as i64,
            failed_txs: self.failed_txs as i64,
            success_rate: self.success_rate,
            total_gas_used: self.total_gas_used.to_string(),
            report_path: report_path.map(|p| p.display().to_string()),
        };

        let outcomes = self
            .transactions
            .iter()
            .enumerate()
            .map(|(position, o)| LedgerOutcome {
                position: position as i64,
                tx_index: o.index as i64,
                sender: format!("{:?}", o.from),
                recipient: format!("{:?}", o.to),
                success: o.success,
                nonce: o.nonce.map(|n| n as i64),
                tx_hash: o.hash.map(|h| format!("{:?}", h)),
                block_number: o.block_number.map(|b| b as i64),
                gas_used: o.gas_used.map(|g| g.to_string()),
                latency_ms: o.latency_ms.map(|l| l as i64),
                error: o.error.clone(),
            })
            .collect();

        (run, outcomes)
    }
}
