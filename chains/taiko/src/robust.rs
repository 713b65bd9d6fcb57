use anyhow::Result;
use chrono::Utc;
use core_logic::{MetricsCollector, NetworkConfig};
use ethers::types::Address;
use tracing::info;

use crate::client::{ChainClient, Wallet};
use crate::config::{RobustSettings, TransferConfig};
use crate::engine::SequentialTransfer;
use crate::error::TransferError;
use crate::orchestrator::MultiSender;
use crate::report::RunReport;
use crate::utils::GasManager;

/// Part 1: the primary sends `single_count` transfers round-robin to every other wallet.
/// Part 2: every wallet funds up if needed and sends `multi_count` transfers to the rest.
/// Both parts land in one report.
pub async fn run_robust_test<C: ChainClient + ?Sized>(
    client: &C,
    config: &TransferConfig,
    network: &NetworkConfig,
    wallets: &[Wallet],
    settings: &RobustSettings,
    metrics: &MetricsCollector,
) -> Result<RunReport> {
    if wallets.len() < 2 {
        return Err(TransferError::NotEnoughWallets {
            required: 2,
            found: wallets.len(),
        }
        .into());
    }

    let started = Utc::now();
    let gas = GasManager::new(config.gas_config());
    let engine = SequentialTransfer::new(client, &gas, metrics)
        .with_cancel_submit_delay(config.cancel_submit_delay());

    info!("=== Robust transfer test on {} ===", network.name);

    info!("Part 1: single-wallet sequential transfers");
    let recipients: Vec<Address> = wallets[1..].iter().map(|w| w.address()).collect();
    let mut outcomes = engine
        .run(
            &wallets[0],
            &recipients,
            &settings.single_amount,
            settings.single_count,
        )
        .await?;

    info!("Part 2: multi-wallet test");
    let orchestrator = MultiSender::new(client, &gas, &engine, metrics, config.funding_policy()?);
    let multi = orchestrator
        .run(wallets, &settings.multi_amount, settings.multi_count)
        .await?;
    outcomes.extend(multi);

    let report = RunReport::from_outcomes(network, started, Utc::now(), outcomes);
    if let Some(url) = network.explorer_url(&format!("{:?}", wallets[0].address())) {
        info!("Explorer URL: {}", url);
    }
    Ok(report)
}
