use chrono::{Duration, TimeZone, Utc};
use core_logic::{DatabaseManager, NetworkConfig};
use ethers::types::{Address, H256, U256};
use taiko_transfer::client::TxReceipt;
use taiko_transfer::report::{RunReport, RunSummary, ROBUST_PREFIX};
use taiko_transfer::{FailureStage, TransferOutcome};

fn confirmed(index: usize, gas: u64) -> TransferOutcome {
    let receipt = TxReceipt {
        hash: H256::from_low_u64_be(index as u64 + 1),
        block_number: 500 + index as u64,
        gas_used: U256::from(gas),
        status: Some(1),
    };
    TransferOutcome::confirmed(
        index,
        Address::from_low_u64_be(1),
        Address::from_low_u64_be(2),
        U256::exp10(15),
        index as u64,
        &receipt,
        900,
    )
}

fn failed(index: usize) -> TransferOutcome {
    TransferOutcome::failed(
        index,
        Address::from_low_u64_be(1),
        Address::from_low_u64_be(2),
        U256::exp10(15),
        Some(index as u64),
        None,
        FailureStage::Submission,
        &anyhow::anyhow!("nonce too low"),
    )
}

#[test]
fn test_summary_counts_and_gas() {
    let outcomes = vec![confirmed(0, 21_000), failed(1), confirmed(2, 30_000)];
    let summary = RunSummary::from_outcomes(&outcomes);

    assert_eq!(summary.total, 3);
    assert_eq!(summary.successful, 2);
    assert_eq!(summary.failed, 1);
    assert!((summary.success_rate - 2.0 / 3.0).abs() < 1e-12);
    assert_eq!(summary.total_gas_used, U256::from(51_000u64));

    // Pure aggregation: the same list gives the same answer.
    assert_eq!(summary, RunSummary::from_outcomes(&outcomes));
}

#[test]
fn test_summary_gas_does_not_overflow_u64() {
    let mut big = confirmed(0, 0);
    big.gas_used = Some(U256::from(u64::MAX));
    let summary = RunSummary::from_outcomes(&[big.clone(), big]);
    assert_eq!(
        summary.total_gas_used,
        U256::from(u64::MAX) * U256::from(2u64)
    );
}

#[test]
fn test_empty_run_has_zero_rate_and_tps() {
    let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    let report = RunReport::from_outcomes(&NetworkConfig::hekla(), at, at, Vec::new());

    assert_eq!(report.transaction_count, 0);
    assert_eq!(report.success_rate, 0.0);
    assert_eq!(report.transactions_per_second, 0.0);
    assert!(!report.success_rate.is_nan());
}

#[test]
fn test_report_fields_and_file_name() {
    let started = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    let finished = started + Duration::seconds(4);
    let report = RunReport::from_outcomes(
        &NetworkConfig::preconf(),
        started,
        finished,
        vec![confirmed(0, 21_000), confirmed(1, 21_000), failed(2)],
    );

    assert_eq!(report.total_execution_time_seconds, 4.0);
    assert_eq!(report.transactions_per_second, 0.5);
    assert_eq!(report.timestamp, "2026-03-01T12:00:04.000Z");
    assert_eq!(
        report.file_name(ROBUST_PREFIX, "preconf"),
        "robust-test-preconf-2026-03-01T12-00-04.000Z.json"
    );

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["network"], "Taiko Preconf");
    assert_eq!(json["rpcEndpoint"], "https://rpc.helder.taiko.xyz/");
    assert_eq!(json["totalGasUsed"], "42000");
    assert_eq!(json["successfulTxs"], 2);
    assert_eq!(json["failedTxs"], 1);
    assert_eq!(json["transactions"][2]["failureStage"], "submission");
    assert_eq!(json["transactions"][0]["gasUsed"], "21000");
}

#[tokio::test]
async fn test_write_is_create_new() {
    let dir = tempfile::tempdir().unwrap();
    let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    let report =
        RunReport::from_outcomes(&NetworkConfig::hekla(), at, at, vec![confirmed(0, 21_000)]);

    let path = report
        .write_to(dir.path(), ROBUST_PREFIX, "hekla")
        .await
        .unwrap();
    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written["transactionCount"], 1);

    // Same timestamp, same name: the first record must survive.
    assert!(report
        .write_to(dir.path(), ROBUST_PREFIX, "hekla")
        .await
        .is_err());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_ledger_rows_follow_report_order() {
    let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    let report = RunReport::from_outcomes(
        &NetworkConfig::hekla(),
        at,
        at,
        vec![confirmed(0, 21_000), failed(1)],
    );

    let (run, rows) = report.to_ledger(None);
    assert_eq!(run.transaction_count, 2);
    assert_eq!(run.total_gas_used, "21000");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].position, 1);
    assert!(!rows[1].success);
    assert_eq!(rows[1].error.as_deref(), Some("nonce too low"));
}

#[tokio::test]
async fn test_record_in_ledger_reads_back_outcomes() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("ledger.db");
    let db = DatabaseManager::new(&db_path.to_string_lossy()).await.unwrap();

    let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    let report = RunReport::from_outcomes(
        &NetworkConfig::preconf(),
        at,
        at + Duration::seconds(4),
        vec![confirmed(0, 21_000), failed(1), confirmed(2, 21_000)],
    );

    let report_path = dir.path().join("robust-test-preconf.json");
    let id = report.record_in(&db, Some(&report_path)).await.unwrap();

    let run = db.get_run(id).await.unwrap();
    assert_eq!(run.network, "Taiko Preconf");
    assert_eq!(run.successful_txs, 2);
    assert_eq!(run.total_gas_used, "42000");
    assert_eq!(
        run.report_path.as_deref(),
        Some(report_path.to_string_lossy().as_ref())
    );
    assert_eq!(db.outcomes_for_run(id).await.unwrap().len(), 3);
    assert_eq!(db.run_count().await.unwrap(), 1);
}
