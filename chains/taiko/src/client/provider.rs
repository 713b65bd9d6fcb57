use super::{ChainClient, NonceTag, TransferRequest, TxHandle, TxReceipt};
use anyhow::{Context, Result};
use async_trait::async_trait;
use core_logic::{NetworkConfig, NetworkError};
use ethers::prelude::*;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// [`ChainClient`] over an ethers HTTP provider. Transactions are legacy and signed locally.
#[derive(Clone, Debug)]
pub struct EthersClient {
    provider: Arc<Provider<Http>>,
    endpoint: String,
    chain_id: u64,
    poll_interval: Duration,
    receipt_timeout: Option<Duration>,
}

impl EthersClient {
    /// Build the provider and fetch the chain id once.
    pub async fn connect(network: &NetworkConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        let url = Url::parse(&network.rpc_url)
            .with_context(|| format!("Invalid RPC URL {}", network.rpc_url))?;
        let poll_interval = Duration::from_millis(network.receipt_poll_interval_ms);
        let provider = Provider::new(Http::new_with_client(url, client)).interval(poll_interval);

        let chain_id = provider
            .get_chainid()
            .await
            .map_err(|e| NetworkError::ConnectionRefused {
                endpoint: network.rpc_url.clone(),
                reason: e.to_string(),
            })?
            .as_u64();

        debug!("Connected to {} (chain id {})", network.name, chain_id);

        Ok(Self {
            provider: Arc::new(provider),
            endpoint: network.rpc_url.clone(),
            chain_id,
            poll_interval,
            receipt_timeout: network.receipt_timeout_secs.map(Duration::from_secs),
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn convert_receipt(receipt: TransactionReceipt) -> TxReceipt {
        TxReceipt {
            hash: receipt.transaction_hash,
            block_number: receipt.block_number.map(|b| b.as_u64()).unwrap_or_default(),
            gas_used: receipt.gas_used.unwrap_or_default(),
            status: receipt.status.map(|s| s.as_u64()),
        }
    }
}

#[async_trait]
impl ChainClient for EthersClient {
    async fn transaction_count(&self, address: Address, tag: NonceTag) -> Result<u64> {
        let block: BlockNumber = tag.into();
        let count = self
            .provider
            .get_transaction_count(address, Some(block.into()))
            .await
            .with_context(|| format!("eth_getTransactionCount({:?}, {:?}) failed", address, tag))?;
        Ok(count.as_u64())
    }

    async fn gas_price(&self) -> Result<U256> {
        self.provider
            .get_gas_price()
            .await
            .context("eth_gasPrice failed")
    }

    async fn balance(&self, address: Address) -> Result<U256> {
        self.provider
            .get_balance(address, None)
            .await
            .with_context(|| format!("eth_getBalance({:?}) failed", address))
    }

    async fn send_transaction(&self, request: &TransferRequest<'_>) -> Result<TxHandle> {
        let from = request.sender.address();
        let nonce = match request.nonce {
            Some(nonce) => nonce,
            None => self.transaction_count(from, NonceTag::Pending).await?,
        };

        let mut tx = TransactionRequest::new()
            .from(from)
            .to(request.to)
            .value(request.value)
            .gas(request.gas_limit)
            .nonce(nonce);
        if let Some(gas_price) = request.gas_price {
            tx = tx.gas_price(gas_price);
        }

        let signer = request.sender.signer().clone().with_chain_id(self.chain_id);
        let client = SignerMiddleware::new(self.provider.as_ref().clone(), signer);
        let pending_tx = client.send_transaction(tx, None).await?;

        Ok(TxHandle {
            hash: *pending_tx,
            nonce,
        })
    }

    async fn wait_for_receipt(&self, handle: &TxHandle) -> Result<TxReceipt> {
        let pending_tx = PendingTransaction::new(handle.hash, self.provider.as_ref())
            .interval(self.poll_interval)
            .confirmations(1);

        let waited = match self.receipt_timeout {
            Some(limit) => tokio::time::timeout(limit, pending_tx).await.map_err(|_| {
                NetworkError::Timeout {
                    timeout_ms: limit.as_millis() as u64,
                    endpoint: self.endpoint.clone(),
                }
            })?,
            None => pending_tx.await,
        };

        let receipt = waited
            .with_context(|| format!("Waiting for receipt of {:?} failed", handle.hash))?
            .ok_or_else(|| NetworkError::Dropped {
                tx_hash: format!("{:?}", handle.hash),
            })?;

        Ok(Self::convert_receipt(receipt))
    }

    async fn transaction_receipt(&self, hash: H256) -> Result<Option<TxReceipt>> {
        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .with_context(|| format!("eth_getTransactionReceipt({:?}) failed", hash))?;
        Ok(receipt.map(Self::convert_receipt))
    }
}
