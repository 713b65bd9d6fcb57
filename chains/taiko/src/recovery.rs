//! Clearing stale pending transactions.
//!
//! A nonce range held by unconfirmed transactions is overwritten with zero-value
//! self-transfers priced well above the current baseline, so the node replaces the
//! stuck entries instead of rejecting the new ones as underpriced.

use anyhow::{Context, Result};
use futures::future::join_all;
use std::time::Duration;
use tracing::{info, warn};

use crate::client::{ChainClient, NonceTag, TransferRequest, TxHandle, Wallet};
use crate::utils::GasManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CancellationSummary {
    pub attempted: u64,
    pub submitted: u64,
    pub confirmed: u64,
    /// Sender's `latest` nonce after the cancellations settled.
    pub next_nonce: u64,
}

pub struct NonceRecovery<'a, C: ChainClient + ?Sized> {
    client: &'a C,
    gas: &'a GasManager,
    submit_delay: Duration,
}

impl<'a, C: ChainClient + ?Sized> NonceRecovery<'a, C> {
    pub fn new(client: &'a C, gas: &'a GasManager, submit_delay: Duration) -> Self {
        Self {
            client,
            gas,
            submit_delay,
        }
    }

    /// Replace every nonce in `start..=end`. An empty range (`end < start`) returns
    /// `start` without touching the chain.
    pub async fn cancel_pending(
        &self,
        wallet: &Wallet,
        start: u64,
        end: u64,
    ) -> Result<CancellationSummary> {
        if end < start {
            return Ok(CancellationSummary {
                next_nonce: start,
                ..Default::default()
            });
        }

        let fee = self
            .gas
            .current_cancel_price(self.client)
            .await
            .context("Failed to read gas price for cancellation")?;

        info!(
            "Cancelling pending nonces {}..={} for {} at {} wei",
            start, end, wallet.label, fee
        );

        let mut summary = CancellationSummary {
            attempted: end - start + 1,
            ..Default::default()
        };
        let mut handles: Vec<TxHandle> = Vec::new();

        for nonce in start..=end {
            let request =
                TransferRequest::cancellation(wallet, nonce, fee, self.gas.limit_transfer());
            match self.client.send_transaction(&request).await {
                Ok(handle) => {
                    info!("Cancellation for nonce {} submitted: {:?}", nonce, handle.hash);
                    handles.push(handle);
                }
                Err(e) => warn!("Cancellation for nonce {} not submitted: {:#}", nonce, e),
            }
            if !self.submit_delay.is_zero() {
                tokio::time::sleep(self.submit_delay).await;
            }
        }
        summary.submitted = handles.len() as u64;

        let receipts = join_all(handles.iter().map(|h| self.client.wait_for_receipt(h))).await;
        for (handle, receipt) in handles.iter().zip(receipts) {
            match receipt {
                Ok(r) => {
                    summary.confirmed += 1;
                    info!(
                        "Cancellation for nonce {} confirmed in block {}",
                        handle.nonce, r.block_number
                    );
                }
                Err(e) => warn!(
                    "Cancellation for nonce {} not confirmed: {:#}",
                    handle.nonce, e
                ),
            }
        }

        summary.next_nonce = self
            .client
            .transaction_count(wallet.address(), NonceTag::Latest)
            .await
            .context("Failed to re-read nonce after cancellations")?;

        info!(
            "Recovery done: {}/{} cancellations confirmed, next nonce {}",
            summary.confirmed, summary.attempted, summary.next_nonce
        );
        Ok(summary)
    }
}
