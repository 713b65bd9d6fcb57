use anyhow::Result;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, DatabaseError};

/// Summary row for one finished run.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LedgerRun {
    pub id: i64,
    pub network: String,
    pub rpc_endpoint: String,
    pub started_at: String,
    pub finished_at: String,
    pub transaction_count: i64,
    pub successful_txs: i64,
    pub failed_txs: i64,
    pub success_rate: f64,
    pub total_gas_used: String,
    pub report_path: Option<String>,
}

/// One transfer attempt belonging to a run.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct LedgerOutcome {
    pub position: i64,
    pub tx_index: i64,
    pub sender: String,
    pub recipient: String,
    pub success: bool,
    pub nonce: Option<i64>,
    pub tx_hash: Option<String>,
    pub block_number: Option<i64>,
    pub gas_used: Option<String>,
    pub latency_ms: Option<i64>,
    pub error: Option<String>,
}

/// SQLite ledger of run reports.
#[derive(Debug)]
pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 4;
    pub const DEFAULT_TIMEOUT_MS: u64 = 30000;

    pub async fn new(db_path: &str) -> Result<Self> {
        if !Path::new(db_path).exists() {
            std::fs::File::create(db_path).map_err(|e| ConfigError::IoError {
                path: db_path.to_string(),
                msg: e.to_string(),
            })?;
            info!("Created new database file: {}", db_path);
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(Self::DEFAULT_MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_millis(Self::DEFAULT_TIMEOUT_MS))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA journal_mode=WAL;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA synchronous=NORMAL;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(&format!("sqlite://{}", db_path))
            .await
            .map_err(|e| DatabaseError::TransactionFailed { msg: e.to_string() })?;

        let manager = Self { pool };
        manager.init_schema().await?;
        info!("Run ledger ready at {} (WAL Mode)", db_path);
        Ok(manager)
    }

    async fn init_schema(&self) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|_| DatabaseError::PoolExhausted {
                max_size: Self::DEFAULT_MAX_CONNECTIONS,
            })?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS runs (
                id INTEGER PRIMARY KEY,
                network TEXT NOT NULL,
                rpc_endpoint TEXT NOT NULL,
                started_at TEXT NOT NULL,
                finished_at TEXT NOT NULL,
                transaction_count INTEGER NOT NULL,
                successful_txs INTEGER NOT NULL,
                failed_txs INTEGER NOT NULL,
                success_rate REAL NOT NULL,
                total_gas_used TEXT NOT NULL,
                report_path TEXT
            );
            CREATE TABLE IF NOT EXISTS transfer_outcomes (
                id INTEGER PRIMARY KEY,
                run_id INTEGER NOT NULL REFERENCES runs(id),
                position INTEGER NOT NULL,
                tx_index INTEGER NOT NULL,
                sender TEXT NOT NULL,
                recipient TEXT NOT NULL,
                success INTEGER NOT NULL,
                nonce INTEGER,
                tx_hash TEXT,
                block_number INTEGER,
                gas_used TEXT,
                latency_ms INTEGER,
                error TEXT
            );",
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| DatabaseError::TransactionFailed { msg: e.to_string() })?;

        let indexes = [
            "CREATE INDEX IF NOT EXISTS idx_outcomes_run ON transfer_outcomes(run_id);",
            "CREATE INDEX IF NOT EXISTS idx_outcomes_sender ON transfer_outcomes(sender);",
        ];
        for idx_sql in indexes {
            if let Err(e) = sqlx::query(idx_sql).execute(&mut *conn).await {
                warn!("Failed to create index: {}", e);
            }
        }

        debug!("Run ledger schema initialized.");
        Ok(())
    }

    /// Insert a run and all its outcomes atomically. Returns the new run id.
    ///
    /// `run.id` is ignored; `position` on each outcome is overwritten with its slice index.
    pub async fn record_run(&self, run: &LedgerRun, outcomes: &[LedgerOutcome]) -> Result<i64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DatabaseError::TransactionFailed { msg: e.to_string() })?;

        let run_id = sqlx::query(
            "INSERT INTO runs (network, rpc_endpoint, started_at, finished_at, transaction_count, successful_txs, failed_txs, success_rate, total_gas_used, report_path) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&run.network)
        .bind(&run.rpc_endpoint)
        .bind(&run.started_at)
        .bind(&run.finished_at)
        .bind(run.transaction_count)
        .bind(run.successful_txs)
        .bind(run.failed_txs)
        .bind(run.success_rate)
        .bind(&run.total_gas_used)
        .bind(&run.report_path)
        .execute(&mut *tx)
        .await
        .map_err(|e| DatabaseError::TransactionFailed { msg: e.to_string() })?
        .last_insert_rowid();

        for (position, outcome) in outcomes.iter().enumerate() {
            sqlx::query(
                "INSERT INTO transfer_outcomes (run_id, position, tx_index, sender, recipient, success, nonce, tx_hash, block_number, gas_used, latency_ms, error) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(run_id)
            .bind(position as i64)
            .bind(outcome.tx_index)
            .bind(&outcome.sender)
            .bind(&outcome.recipient)
            .bind(outcome.success)
            .bind(outcome.nonce)
            .bind(&outcome.tx_hash)
            .bind(outcome.block_number)
            .bind(&outcome.gas_used)
            .bind(outcome.latency_ms)
            .bind(&outcome.error)
            .execute(&mut *tx)
            .await
            .map_err(|e| DatabaseError::TransactionFailed { msg: e.to_string() })?;
        }

        tx.commit()
            .await
            .map_err(|e| DatabaseError::TransactionFailed { msg: e.to_string() })?;

        debug!("Recorded run {} with {} outcomes", run_id, outcomes.len());
        Ok(run_id)
    }

    pub async fn run_count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM runs")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DatabaseError::TransactionFailed { msg: e.to_string() })?;
        Ok(count.0)
    }

    pub async fn get_run(&self, run_id: i64) -> Result<LedgerRun> {
        let run = sqlx::query_as::<_, LedgerRun>("SELECT * FROM runs WHERE id = ?")
            .bind(run_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::TransactionFailed { msg: e.to_string() })?
            .ok_or_else(|| DatabaseError::NotFound {
                key: format!("run {}", run_id),
            })?;
        Ok(run)
    }

    /// Outcomes of a run in the order they were recorded.
    pub async fn outcomes_for_run(&self, run_id: i64) -> Result<Vec<LedgerOutcome>> {
        let rows = sqlx::query_as::<_, LedgerOutcome>(
            "SELECT position, tx_index, sender, recipient, success, nonce, tx_hash, block_number, gas_used, latency_ms, error
             FROM transfer_outcomes WHERE run_id = ? ORDER BY position",
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::TransactionFailed { msg: e.to_string() })?;
        Ok(rows)
    }
}
