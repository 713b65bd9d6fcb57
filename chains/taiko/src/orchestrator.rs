use anyhow::Result;
use core_logic::MetricsCollector;
use ethers::types::{Address, U256};
use ethers::utils::format_ether;
use tracing::{info, warn};

use crate::client::{ChainClient, TransferRequest, Wallet};
use crate::engine::SequentialTransfer;
use crate::error::TransferError;
use crate::outcome::TransferOutcome;
use crate::utils::GasManager;

/// Top up secondaries below `threshold` with `amount`, both in wei.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FundingPolicy {
    pub threshold: U256,
    pub amount: U256,
}

impl Default for FundingPolicy {
    fn default() -> Self {
        // 0.1 ETH
        let tenth = U256::exp10(17);
        Self {
            threshold: tenth,
            amount: tenth,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FundingSummary {
    pub checked: usize,
    pub funded: usize,
    pub failed: usize,
}

/// Funds every secondary wallet from the primary, then lets each wallet take a turn
/// as sender to all the others.
pub struct MultiSender<'a, C: ChainClient + ?Sized> {
    client: &'a C,
    gas: &'a GasManager,
    engine: &'a SequentialTransfer<'a, C>,
    metrics: &'a MetricsCollector,
    funding: FundingPolicy,
}

impl<'a, C: ChainClient + ?Sized> MultiSender<'a, C> {
    pub fn new(
        client: &'a C,
        gas: &'a GasManager,
        engine: &'a SequentialTransfer<'a, C>,
        metrics: &'a MetricsCollector,
        funding: FundingPolicy,
    ) -> Self {
        Self {
            client,
            gas,
            engine,
            metrics,
            funding,
        }
    }

    /// `wallets[0]` is the primary. Outcomes come back grouped by sender, in wallet order.
    pub async fn run(
        &self,
        wallets: &[Wallet],
        amount: &str,
        tx_per_sender: usize,
    ) -> Result<Vec<TransferOutcome>> {
        if wallets.len() < 2 {
            return Err(TransferError::NotEnoughWallets {
                required: 2,
                found: wallets.len(),
            }
            .into());
        }

        let summary = self.fund_wallets(&wallets[0], &wallets[1..]).await;
        info!(
            "Funding: {} checked, {} funded, {} failed",
            summary.checked, summary.funded, summary.failed
        );

        let mut outcomes = Vec::with_capacity(wallets.len() * tx_per_sender);
        for (position, sender) in wallets.iter().enumerate() {
            let recipients: Vec<Address> = wallets
                .iter()
                .enumerate()
                .filter(|(other, _)| *other != position)
                .map(|(_, w)| w.address())
                .collect();

            info!(
                "Wallet {}/{} ({}) sending {} transfers",
                position + 1,
                wallets.len(),
                sender.label,
                tx_per_sender
            );
            let sent = self
                .engine
                .run(sender, &recipients, amount, tx_per_sender)
                .await?;
            outcomes.extend(sent);
        }

        Ok(outcomes)
    }

    /// Sequential so the primary never has two funding transfers in flight.
    pub async fn fund_wallets(&self, primary: &Wallet, others: &[Wallet]) -> FundingSummary {
        let mut summary = FundingSummary::default();

        for wallet in others {
            let balance = match self.client.balance(wallet.address()).await {
                Ok(balance) => balance,
                Err(e) => {
                    warn!("Balance check for {} failed, not funding: {:#}", wallet.label, e);
                    summary.failed += 1;
                    self.metrics.record_funding(false);
                    continue;
                }
            };
            summary.checked += 1;

            if balance >= self.funding.threshold {
                info!(
                    "{} has {} ETH, no funding needed",
                    wallet.label,
                    format_ether(balance)
                );
                continue;
            }

            info!(
                "{} has {} ETH, sending {} ETH from {}",
                wallet.label,
                format_ether(balance),
                format_ether(self.funding.amount),
                primary.label
            );
            match self.fund_one(primary, wallet).await {
                Ok(()) => {
                    summary.funded += 1;
                    self.metrics.record_funding(true);
                }
                Err(e) => {
                    warn!("Funding {} failed: {:#}", wallet.label, e);
                    summary.failed += 1;
                    self.metrics.record_funding(false);
                }
            }
        }

        summary
    }

    async fn fund_one(&self, primary: &Wallet, wallet: &Wallet) -> Result<()> {
        let request = TransferRequest::new(
            primary,
            wallet.address(),
            self.funding.amount,
            self.gas.limit_transfer(),
        );
        let handle = self.client.send_transaction(&request).await?;
        let receipt = self.client.wait_for_receipt(&handle).await?;
        if receipt.reverted() {
            anyhow::bail!("funding transfer {:?} reverted", receipt.hash);
        }
        info!(
            "Funded {} in block {} ({:?})",
            wallet.label, receipt.block_number, receipt.hash
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::{ChainEvent, MockChain};
    use core_logic::RetryConfig;
    use ethers::signers::LocalWallet;
    use std::time::Duration;

    fn wallet(seed: u8) -> Wallet {
        Wallet::new(format!("W{}", seed), LocalWallet::from_bytes(&[seed; 32]).unwrap())
    }

    #[tokio::test]
    async fn test_underfunded_wallet_is_funded_before_it_sends() {
        let (a, b, c) = (wallet(1), wallet(2), wallet(3));
        let chain = MockChain::new()
            .with_account(a.address(), 0, 0, U256::exp10(19))
            .with_account(b.address(), 0, 0, U256::exp10(15))
            .with_account(c.address(), 0, 0, U256::exp10(18));
        let gas = GasManager::default();
        let metrics = MetricsCollector::default();
        let engine = SequentialTransfer::new(&chain, &gas, &metrics)
            .with_cancel_submit_delay(Duration::ZERO)
            .with_nonce_retry(RetryConfig::new(0, 1));
        let orchestrator =
            MultiSender::new(&chain, &gas, &engine, &metrics, FundingPolicy::default());

        let wallets = vec![a.clone(), b.clone(), c.clone()];
        let outcomes = orchestrator.run(&wallets, "0.0005", 2).await.unwrap();

        assert_eq!(outcomes.len(), 6);
        assert!(outcomes.iter().all(|o| o.success));

        let events = chain.events();
        let funded_at = events
            .iter()
            .position(|e| {
                matches!(e, ChainEvent::Confirmed { from, to, .. }
                    if *from == a.address() && *to == b.address())
            })
            .expect("funding confirmation");
        let first_b_send = events
            .iter()
            .position(|e| matches!(e, ChainEvent::Sent { from, .. } if *from == b.address()))
            .expect("b sends");
        assert!(funded_at < first_b_send);

        // Only B was below the threshold; the first send on chain is its funding.
        let sent = chain.sent();
        assert_eq!(sent[0].to, b.address());
        assert_eq!(sent[0].value, U256::exp10(17));
        assert!(sent[0].gas_price.is_none());
        assert_eq!(metrics.snapshot().funding.sent, 1);

        // Each sender addresses only the other two, in order.
        let senders: Vec<Address> = outcomes.iter().map(|o| o.from).collect();
        assert_eq!(
            senders,
            vec![a.address(), a.address(), b.address(), b.address(), c.address(), c.address()]
        );
        assert_eq!(outcomes[0].to, b.address());
        assert_eq!(outcomes[1].to, c.address());
        assert_eq!(outcomes[2].to, a.address());
        assert_eq!(outcomes[3].to, c.address());
    }

    #[tokio::test]
    async fn test_funding_failure_leaves_wallet_underfunded() {
        let (a, b) = (wallet(1), wallet(2));
        let chain = MockChain::new().with_account(a.address(), 0, 0, U256::exp10(19));
        chain.fail_send(0, "insufficient funds for gas * price + value");
        let gas = GasManager::default();
        let metrics = MetricsCollector::default();
        let engine = SequentialTransfer::new(&chain, &gas, &metrics);
        let orchestrator =
            MultiSender::new(&chain, &gas, &engine, &metrics, FundingPolicy::default());

        let summary = orchestrator.fund_wallets(&a, &[b.clone()]).await;
        assert_eq!(summary.checked, 1);
        assert_eq!(summary.funded, 0);
        assert_eq!(summary.failed, 1);
        assert!(chain.balance_of(b.address()).is_zero());
    }

    #[tokio::test]
    async fn test_single_wallet_is_rejected() {
        let chain = MockChain::new();
        let gas = GasManager::default();
        let metrics = MetricsCollector::default();
        let engine = SequentialTransfer::new(&chain, &gas, &metrics);
        let orchestrator =
            MultiSender::new(&chain, &gas, &engine, &metrics, FundingPolicy::default());

        let err = orchestrator
            .run(&[wallet(1)], "0.001", 1)
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<TransferError>(),
            Some(&TransferError::NotEnoughWallets {
                required: 2,
                found: 1
            })
        );
    }
}
