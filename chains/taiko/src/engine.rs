//! Sequential transfer engine.
//!
//! One sender, one transaction in flight. The nonce cursor moves only after a
//! receipt is observed; any failure re-reads the confirmed nonce from the chain.

use anyhow::Result;
use core_logic::{with_retry, MetricsCollector, RetryConfig, RESULT_TARGET};
use ethers::types::{Address, U256};
use ethers::utils::parse_ether;
use std::time::{Duration, Instant};
use tracing::{info, info_span, warn, Instrument};

use crate::client::{ChainClient, NonceTag, TransferRequest, Wallet};
use crate::error::TransferError;
use crate::outcome::{FailureStage, TransferOutcome};
use crate::recovery::NonceRecovery;
use crate::utils::{GasManager, NonceCursor};

/// Parse a decimal ether amount; zero and negative amounts are rejected.
pub fn parse_amount(amount: &str) -> Result<U256, TransferError> {
    if amount.trim().starts_with('-') {
        return Err(TransferError::InvalidAmount {
            amount: amount.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    let value = parse_ether(amount.trim()).map_err(|e| TransferError::InvalidAmount {
        amount: amount.to_string(),
        reason: e.to_string(),
    })?;
    if value.is_zero() {
        return Err(TransferError::InvalidAmount {
            amount: amount.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

pub struct SequentialTransfer<'a, C: ChainClient + ?Sized> {
    client: &'a C,
    gas: &'a GasManager,
    metrics: &'a MetricsCollector,
    cancel_submit_delay: Duration,
    nonce_retry: RetryConfig,
}

impl<'a, C: ChainClient + ?Sized> SequentialTransfer<'a, C> {
    pub fn new(client: &'a C, gas: &'a GasManager, metrics: &'a MetricsCollector) -> Self {
        Self {
            client,
            gas,
            metrics,
            cancel_submit_delay: Duration::from_millis(500),
            nonce_retry: RetryConfig::new(2, 250),
        }
    }

    pub fn with_cancel_submit_delay(mut self, delay: Duration) -> Self {
        self.cancel_submit_delay = delay;
        self
    }

    /// Backoff for the starting nonce reads and for resyncs after a failure.
    pub fn with_nonce_retry(mut self, retry: RetryConfig) -> Self {
        self.nonce_retry = retry;
        self
    }

    /// Send `tx_count` transfers of `amount` ether, cycling through `recipients`.
    ///
    /// Always returns exactly `tx_count` outcomes; only setup problems are errors.
    pub async fn run(
        &self,
        sender: &Wallet,
        recipients: &[Address],
        amount: &str,
        tx_count: usize,
    ) -> Result<Vec<TransferOutcome>> {
        if recipients.is_empty() {
            return Err(TransferError::NoRecipients.into());
        }
        let value = parse_amount(amount)?;

        let span = info_span!("sender", label = %sender.label);
        self.run_inner(sender, recipients, value, tx_count)
            .instrument(span)
            .await
    }

    async fn run_inner(
        &self,
        sender: &Wallet,
        recipients: &[Address],
        value: U256,
        tx_count: usize,
    ) -> Result<Vec<TransferOutcome>> {
        let address = sender.address();
        let start = self.starting_nonce(sender).await?;
        let mut cursor = NonceCursor::new(address, start);

        info!(
            "Sending {} transfers of {} wei from {:?} starting at nonce {}",
            tx_count, value, address, start
        );

        let mut outcomes = Vec::with_capacity(tx_count);
        for index in 0..tx_count {
            let to = recipients[index % recipients.len()];
            let outcome = self
                .attempt(sender, index, tx_count, to, value, cursor.current())
                .await;

            if outcome.success {
                cursor.advance();
                self.metrics.record_transfer(
                    true,
                    outcome.latency_ms.map(Duration::from_millis),
                );
            } else {
                self.metrics.record_transfer(false, None);
                self.resync(&mut cursor).await;
            }
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    /// `latest`, unless the mempool holds transactions past it; those are cancelled first.
    async fn starting_nonce(&self, sender: &Wallet) -> Result<u64> {
        let address = sender.address();
        let latest = with_retry(self.nonce_retry, "read latest nonce", || {
            self.client.transaction_count(address, NonceTag::Latest)
        })
        .await?;
        let pending = with_retry(self.nonce_retry, "read pending nonce", || {
            self.client.transaction_count(address, NonceTag::Pending)
        })
        .await?;

        if pending <= latest {
            return Ok(latest);
        }

        warn!(
            "{} pending transaction(s) ahead of confirmed nonce {} (pending {})",
            pending - latest,
            latest,
            pending
        );
        let summary = NonceRecovery::new(self.client, self.gas, self.cancel_submit_delay)
            .cancel_pending(sender, latest, pending - 1)
            .await?;
        self.metrics
            .record_cancellations(summary.submitted, summary.confirmed);
        Ok(summary.next_nonce)
    }

    async fn attempt(
        &self,
        sender: &Wallet,
        index: usize,
        total: usize,
        to: Address,
        value: U256,
        nonce: u64,
    ) -> TransferOutcome {
        let from = sender.address();
        let position = index + 1;

        let gas_price = match self.gas.current_transfer_price(self.client).await {
            Ok(price) => price,
            Err(e) => {
                warn!(target: RESULT_TARGET, "[{}/{}] FAILED reading gas price: {:#}", position, total, e);
                return TransferOutcome::failed(
                    index,
                    from,
                    to,
                    value,
                    Some(nonce),
                    None,
                    FailureStage::Fee,
                    &e,
                );
            }
        };

        let request = TransferRequest::new(sender, to, value, self.gas.limit_transfer())
            .with_nonce(nonce)
            .with_gas_price(gas_price);

        let started = Instant::now();
        let handle = match self.client.send_transaction(&request).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(target: RESULT_TARGET, "[{}/{}] FAILED submitting nonce {}: {:#}", position, total, nonce, e);
                return TransferOutcome::failed(
                    index,
                    from,
                    to,
                    value,
                    Some(nonce),
                    None,
                    FailureStage::Submission,
                    &e,
                );
            }
        };

        match self.client.wait_for_receipt(&handle).await {
            Ok(receipt) => {
                let latency_ms = started.elapsed().as_millis() as u64;
                if receipt.reverted() {
                    warn!("Transfer {:?} mined but reverted", receipt.hash);
                }
                info!(
                    target: RESULT_TARGET,
                    "[{}/{}] CONFIRMED nonce {} -> {:?} block {} gas {} in {}ms",
                    position,
                    total,
                    nonce,
                    to,
                    receipt.block_number,
                    receipt.gas_used,
                    latency_ms
                );
                TransferOutcome::confirmed(index, from, to, value, nonce, &receipt, latency_ms)
            }
            Err(e) => {
                warn!(target: RESULT_TARGET, "[{}/{}] FAILED waiting for {:?}: {:#}", position, total, handle.hash, e);
                TransferOutcome::failed(
                    index,
                    from,
                    to,
                    value,
                    Some(nonce),
                    Some(handle.hash),
                    FailureStage::Confirmation,
                    &e,
                )
            }
        }
    }

    async fn resync(&self, cursor: &mut NonceCursor) {
        let stale = cursor.current();
        match cursor.resync(self.client, self.nonce_retry).await {
            Ok(latest) => {
                self.metrics.record_nonce_resync();
                info!("Nonce resynced from chain: {} -> {}", stale, latest);
            }
            Err(e) => warn!("Nonce resync failed, keeping {}: {:#}", stale, e),
        }
    }
}
