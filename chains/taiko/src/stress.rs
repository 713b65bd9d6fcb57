//! Plain transfer stress test: the primary sends a batch to each other wallet with a
//! client-chosen nonce and a lightly raised gas price.

use anyhow::Result;
use chrono::Utc;
use core_logic::{MetricsCollector, NetworkConfig, RESULT_TARGET};
use ethers::types::U256;
use ethers::utils::format_ether;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::client::{ChainClient, TransferRequest, Wallet};
use crate::config::StressSettings;
use crate::engine::parse_amount;
use crate::error::TransferError;
use crate::outcome::{FailureStage, TransferOutcome};
use crate::report::RunReport;
use crate::utils::GasManager;

#[derive(Debug, Clone)]
pub struct StressResult {
    pub report: RunReport,
    /// Primary balance before minus after; zero if the balance grew.
    pub eth_spent: U256,
}

pub async fn run_transfer_test<C: ChainClient + ?Sized>(
    client: &C,
    network: &NetworkConfig,
    wallets: &[Wallet],
    settings: &StressSettings,
    gas_limit: u64,
    metrics: &MetricsCollector,
) -> Result<StressResult> {
    if wallets.len() < 2 {
        return Err(TransferError::NotEnoughWallets {
            required: 2,
            found: wallets.len(),
        }
        .into());
    }
    let value = parse_amount(&settings.amount)?;
    let sender = &wallets[0];
    let from = sender.address();

    let started = Utc::now();
    info!("== Transaction stress test on {} ==", network.name);
    info!(
        "Sending {} transactions of {} ETH to each of {} wallets",
        settings.count,
        settings.amount,
        wallets.len() - 1
    );

    let initial_balance = client.balance(from).await?;
    info!("Sender initial balance: {} ETH", format_ether(initial_balance));

    let mut outcomes = Vec::with_capacity(settings.count * (wallets.len() - 1));
    for (position, recipient) in wallets.iter().enumerate().skip(1) {
        info!("== Processing wallet {} ({:?}) ==", position, recipient.address());
        let to = recipient.address();

        for j in 1..=settings.count {
            let index = outcomes.len();
            let base = match client.gas_price().await {
                Ok(base) => base,
                Err(e) => {
                    warn!(target: RESULT_TARGET, "Transaction {}-{} FAILED reading gas price: {:#}", position, j, e);
                    metrics.record_transfer(false, None);
                    outcomes.push(TransferOutcome::failed(
                        index, from, to, value, None, None, FailureStage::Fee, &e,
                    ));
                    continue;
                }
            };
            let gas_price = GasManager::scaled(base, network.gas_multiplier);
            let request =
                TransferRequest::new(sender, to, value, gas_limit).with_gas_price(gas_price);

            let submitted = Instant::now();
            let handle = match client.send_transaction(&request).await {
                Ok(handle) => handle,
                Err(e) => {
                    warn!(target: RESULT_TARGET, "Transaction {}-{} FAILED: {:#}", position, j, e);
                    metrics.record_transfer(false, None);
                    outcomes.push(TransferOutcome::failed(
                        index,
                        from,
                        to,
                        value,
                        None,
                        None,
                        FailureStage::Submission,
                        &e,
                    ));
                    continue;
                }
            };
            info!("Transfer {}-{} sent. Tx => [{:?}]", position, j, handle.hash);

            match client.wait_for_receipt(&handle).await {
                Ok(receipt) => {
                    let latency_ms = submitted.elapsed().as_millis() as u64;
                    info!(
                        target: RESULT_TARGET,
                        "Transfer {}-{} CONFIRMED in block {} ({}ms)",
                        position,
                        j,
                        receipt.block_number,
                        latency_ms
                    );
                    metrics.record_transfer(true, Some(Duration::from_millis(latency_ms)));
                    outcomes.push(TransferOutcome::confirmed(
                        index,
                        from,
                        to,
                        value,
                        handle.nonce,
                        &receipt,
                        latency_ms,
                    ));
                }
                Err(e) => {
                    warn!(target: RESULT_TARGET, "Transaction {}-{} FAILED waiting for receipt: {:#}", position, j, e);
                    metrics.record_transfer(false, None);
                    outcomes.push(TransferOutcome::failed(
                        index,
                        from,
                        to,
                        value,
                        Some(handle.nonce),
                        Some(handle.hash),
                        FailureStage::Confirmation,
                        &e,
                    ));
                }
            }

            if settings.delay_between_tx {
                tokio::time::sleep(Duration::from_millis(settings.delay_ms)).await;
            }
        }
    }

    let report = RunReport::from_outcomes(network, started, Utc::now(), outcomes);

    let eth_spent = match client.balance(from).await {
        Ok(final_balance) => initial_balance.saturating_sub(final_balance),
        Err(e) => {
            warn!("Final balance read failed: {:#}", e);
            U256::zero()
        }
    };

    info!("== Network stress test complete ==");
    info!("Total successful transactions: {}", report.successful_txs);
    info!("Total failed transactions: {}", report.failed_txs);
    info!(
        "Total execution time: {:.2} seconds",
        report.total_execution_time_seconds
    );
    info!("Transaction rate: {:.2} tx/second", report.transactions_per_second);
    info!("Total ETH spent: {} ETH", format_ether(eth_spent));
    info!("Total gas used: {}", report.total_gas_used);
    if let Some(url) = network.explorer_url(&format!("{:?}", from)) {
        info!("See all transactions at: {}", url);
    }

    Ok(StressResult { report, eth_spent })
}
