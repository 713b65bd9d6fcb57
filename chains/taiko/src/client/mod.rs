//! Chain access used by the transfer protocol.
//!
//! [`ChainClient`] is the only way the protocol talks to a node. [`EthersClient`] is the
//! production implementation; tests drive the protocol through an in-memory chain.

mod provider;

#[cfg(test)]
pub(crate) mod mock;

pub use provider::EthersClient;

use anyhow::{Context, Result};
use async_trait::async_trait;
use core_logic::WalletSecret;
use ethers::prelude::*;
use std::fmt;

/// Block tag for `eth_getTransactionCount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NonceTag {
    /// Count of confirmed transactions.
    Latest,
    /// Confirmed plus those sitting in the node's mempool.
    Pending,
}

impl From<NonceTag> for BlockNumber {
    fn from(tag: NonceTag) -> Self {
        match tag {
            NonceTag::Latest => BlockNumber::Latest,
            NonceTag::Pending => BlockNumber::Pending,
        }
    }
}

/// A signing key plus the name it was loaded under.
#[derive(Clone)]
pub struct Wallet {
    pub label: String,
    signer: LocalWallet,
}

impl Wallet {
    pub fn new(label: impl Into<String>, signer: LocalWallet) -> Self {
        Self {
            label: label.into(),
            signer,
        }
    }

    pub fn from_secret(secret: &WalletSecret) -> Result<Self> {
        let signer = secret
            .private_key()
            .parse::<LocalWallet>()
            .with_context(|| format!("Failed to parse private key for {}", secret.label))?;
        Ok(Self::new(secret.label.clone(), signer))
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn signer(&self) -> &LocalWallet {
        &self.signer
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("label", &self.label)
            .field("address", &self.address())
            .finish()
    }
}

/// One value transfer. `None` for nonce or gas price lets the client choose.
#[derive(Debug, Clone)]
pub struct TransferRequest<'a> {
    pub sender: &'a Wallet,
    pub to: Address,
    pub value: U256,
    pub nonce: Option<u64>,
    pub gas_price: Option<U256>,
    pub gas_limit: u64,
}

impl<'a> TransferRequest<'a> {
    pub fn new(sender: &'a Wallet, to: Address, value: U256, gas_limit: u64) -> Self {
        Self {
            sender,
            to,
            value,
            nonce: None,
            gas_price: None,
            gas_limit,
        }
    }

    /// Zero-value transfer to self, used to replace whatever occupies `nonce`.
    pub fn cancellation(sender: &'a Wallet, nonce: u64, gas_price: U256, gas_limit: u64) -> Self {
        Self::new(sender, sender.address(), U256::zero(), gas_limit)
            .with_nonce(nonce)
            .with_gas_price(gas_price)
    }

    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn with_gas_price(mut self, gas_price: U256) -> Self {
        self.gas_price = Some(gas_price);
        self
    }
}

/// A transaction the node accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxHandle {
    pub hash: H256,
    pub nonce: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub hash: H256,
    pub block_number: u64,
    pub gas_used: U256,
    /// `Some(1)` success, `Some(0)` reverted, `None` for pre-byzantium receipts.
    pub status: Option<u64>,
}

impl TxReceipt {
    pub fn reverted(&self) -> bool {
        self.status == Some(0)
    }
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn transaction_count(&self, address: Address, tag: NonceTag) -> Result<u64>;

    /// Legacy `eth_gasPrice` baseline in wei.
    async fn gas_price(&self) -> Result<U256>;

    async fn balance(&self, address: Address) -> Result<U256>;

    /// Sign and submit. Returns once the node accepted the transaction.
    async fn send_transaction(&self, request: &TransferRequest<'_>) -> Result<TxHandle>;

    /// Block until the transaction is mined. Any timeout is the client's own.
    async fn wait_for_receipt(&self, handle: &TxHandle) -> Result<TxReceipt>;

    async fn transaction_receipt(&self, hash: H256) -> Result<Option<TxReceipt>>;
}
