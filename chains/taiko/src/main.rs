use taiko_transfer::config::{TransferConfig, DEFAULT_CONFIG_PATH};
use taiko_transfer::report::{RunReport, ROBUST_PREFIX, STRESS_PREFIX};
use taiko_transfer::{robust, stress, EthersClient, Wallet};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use core_logic::{setup_logger, DatabaseManager, MetricsCollector, NetworkConfig, WalletManager};
use dotenv::dotenv;
use ethers::utils::format_ether;
use std::path::Path;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,
    /// Network key from the config (`preconf`, `hekla`, ...)
    #[arg(short, long)]
    network: Option<String>,
    #[arg(short, long)]
    export_metrics: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Single-wallet sequential transfers followed by the multi-wallet test
    Robust {
        #[arg(long)]
        single_amount: Option<String>,
        #[arg(long)]
        single_count: Option<usize>,
        #[arg(long)]
        multi_amount: Option<String>,
        #[arg(long)]
        multi_count: Option<usize>,
    },
    /// Primary sends a batch to every other wallet
    Stress {
        #[arg(long)]
        amount: Option<String>,
        #[arg(long)]
        count: Option<usize>,
        /// Pause between transactions
        #[arg(long)]
        delay: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = setup_logger();
    dotenv().ok();

    let args = Args::parse();
    info!("Loading config from: {}", args.config);

    let config = match TransferConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {:#}", e);
            return Ok(());
        }
    };

    let network_key = args
        .network
        .clone()
        .unwrap_or_else(|| config.default_network.clone());

    if let Err(e) = run(&args, &config, &network_key).await {
        error!("Run aborted, no report written: {:#}", e);
    }

    if let Some(metrics_path) = &args.export_metrics {
        match MetricsCollector::global().export_to_file(metrics_path).await {
            Ok(_) => info!("Metrics exported to {}", metrics_path),
            Err(e) => error!("Failed to export metrics: {}", e),
        }
    }

    Ok(())
}

async fn run(args: &Args, config: &TransferConfig, network_key: &str) -> Result<()> {
    let network = config.network(network_key)?.clone();

    let manager = WalletManager::load(&config.wallet_source())?;
    let wallets = manager
        .secrets()
        .iter()
        .map(Wallet::from_secret)
        .collect::<Result<Vec<_>>>()?;
    info!("Loaded {} wallets: {}", wallets.len(), manager.labels().join(", "));

    let client = EthersClient::connect(&network).await?;
    info!(
        "Connected to {} at {} (chain id {})",
        network.name,
        client.endpoint(),
        client.chain_id()
    );

    let metrics = MetricsCollector::global();
    let output_dir = Path::new(&config.output_dir);

    let (report, prefix) = match &args.command {
        Command::Robust {
            single_amount,
            single_count,
            multi_amount,
            multi_count,
        } => {
            let mut settings = config.robust.clone();
            if let Some(amount) = single_amount {
                settings.single_amount = amount.clone();
            }
            if let Some(count) = single_count {
                settings.single_count = *count;
            }
            if let Some(amount) = multi_amount {
                settings.multi_amount = amount.clone();
            }
            if let Some(count) = multi_count {
                settings.multi_count = *count;
            }

            let report =
                robust::run_robust_test(&client, config, &network, &wallets, &settings, metrics)
                    .await?;
            (report, ROBUST_PREFIX)
        }
        Command::Stress {
            amount,
            count,
            delay,
        } => {
            let mut settings = config.stress.clone();
            if let Some(amount) = amount {
                settings.amount = amount.clone();
            }
            if let Some(count) = count {
                settings.count = *count;
            }
            settings.delay_between_tx |= *delay;

            let result = stress::run_transfer_test(
                &client,
                &network,
                &wallets,
                &settings,
                config.gas_config().limit_transfer(),
                metrics,
            )
            .await?;
            println!("Total ETH spent: {} ETH", format_ether(result.eth_spent));
            (result.report, STRESS_PREFIX)
        }
    };

    print_summary(&network, &report);

    let path = report
        .write_to(output_dir, prefix, network_key)
        .await
        .context("Failed to write run report")?;
    info!("Report saved to {}", path.display());

    if let Some(db_path) = &config.database_path {
        record_in_ledger(db_path, &report, &path).await;
    }

    Ok(())
}

fn print_summary(network: &NetworkConfig, report: &RunReport) {
    println!();
    println!("{}", format!("=== {} TEST RESULTS ===", network.name).bold());
    println!(
        "Total execution time: {:.2} seconds",
        report.total_execution_time_seconds
    );
    println!("Total transactions attempted: {}", report.transaction_count);
    println!(
        "Successful transactions: {}",
        report.successful_txs.to_string().green().bold()
    );
    let failed = report.failed_txs.to_string();
    println!(
        "Failed transactions: {}",
        if report.failed_txs > 0 {
            failed.red().bold()
        } else {
            failed.normal()
        }
    );
    println!("Success rate: {:.2}%", report.success_rate * 100.0);
    println!("Transaction rate: {:.2} tx/second", report.transactions_per_second);
    println!("Total gas used: {}", report.total_gas_used);
}

async fn record_in_ledger(db_path: &str, report: &RunReport, report_path: &Path) {
    let db = match DatabaseManager::new(db_path).await {
        Ok(db) => db,
        Err(e) => {
            warn!("Run ledger unavailable at {}: {:#}", db_path, e);
            return;
        }
    };
    match report.record_in(&db, Some(report_path)).await {
        Ok(id) => match db.run_count().await {
            Ok(total) => info!("Run recorded in ledger as #{} ({} runs stored)", id, total),
            Err(_) => info!("Run recorded in ledger as #{}", id),
        },
        Err(e) => warn!("Failed to record run in ledger: {:#}", e),
    }
}
