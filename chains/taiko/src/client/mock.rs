//! Scripted in-memory chain for protocol tests.

use super::{ChainClient, NonceTag, TransferRequest, TxHandle, TxReceipt};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ethers::types::{Address, H256, U256};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

pub const MOCK_GAS_USED: u64 = 21_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainEvent {
    NonceQuery { address: Address, tag: NonceTag },
    GasPrice,
    Balance(Address),
    Sent { from: Address, to: Address, nonce: u64 },
    Confirmed { from: Address, to: Address, nonce: u64 },
}

#[derive(Debug, Clone)]
pub struct SentTx {
    pub hash: H256,
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub nonce: u64,
    pub gas_price: Option<U256>,
    pub gas_limit: u64,
}

#[derive(Debug, Default)]
struct Account {
    latest: u64,
    pending: u64,
    balance: U256,
}

#[derive(Debug)]
struct ScriptedFailure {
    message: String,
    latest_after: Option<(Address, u64)>,
}

#[derive(Debug, Default)]
struct MockState {
    accounts: HashMap<Address, Account>,
    gas_price: U256,
    block: u64,
    send_calls: usize,
    wait_calls: usize,
    gas_calls: usize,
    nonce_calls: usize,
    nonce_failures: HashMap<usize, String>,
    send_failures: HashMap<usize, ScriptedFailure>,
    wait_failures: HashMap<usize, ScriptedFailure>,
    gas_failures: HashSet<usize>,
    in_flight: HashMap<H256, SentTx>,
    receipts: HashMap<H256, TxReceipt>,
    sent: Vec<SentTx>,
    events: Vec<ChainEvent>,
}

impl MockState {
    fn apply_latest(&mut self, latest_after: Option<(Address, u64)>) {
        if let Some((address, latest)) = latest_after {
            let account = self.accounts.entry(address).or_default();
            account.latest = latest;
            account.pending = account.pending.max(latest);
        }
    }
}

/// Every send/wait/gas-price/nonce call is numbered from 0 in call order; failures are
/// scripted against those numbers.
#[derive(Debug)]
pub struct MockChain {
    state: Mutex<MockState>,
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                gas_price: U256::from(1_000_000_000u64),
                block: 100,
                ..Default::default()
            }),
        }
    }

    pub fn with_account(self, address: Address, latest: u64, pending: u64, balance: U256) -> Self {
        self.state.lock().unwrap().accounts.insert(
            address,
            Account {
                latest,
                pending,
                balance,
            },
        );
        self
    }

    pub fn with_gas_price(self, gas_price: U256) -> Self {
        self.state.lock().unwrap().gas_price = gas_price;
        self
    }

    pub fn fail_send(&self, call: usize, message: &str) {
        self.fail_send_and_set_latest(call, message, None);
    }

    /// Fail a send and move `address`'s confirmed nonce, as if something else landed.
    pub fn fail_send_and_set_latest(
        &self,
        call: usize,
        message: &str,
        latest_after: Option<(Address, u64)>,
    ) {
        self.state.lock().unwrap().send_failures.insert(
            call,
            ScriptedFailure {
                message: message.to_string(),
                latest_after,
            },
        );
    }

    pub fn fail_wait(&self, call: usize, message: &str) {
        self.state.lock().unwrap().wait_failures.insert(
            call,
            ScriptedFailure {
                message: message.to_string(),
                latest_after: None,
            },
        );
    }

    pub fn fail_nonce_query(&self, call: usize, message: &str) {
        self.state
            .lock()
            .unwrap()
            .nonce_failures
            .insert(call, message.to_string());
    }

    pub fn fail_gas_price(&self, call: usize) {
        self.state.lock().unwrap().gas_failures.insert(call);
    }

    pub fn sent(&self) -> Vec<SentTx> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn events(&self) -> Vec<ChainEvent> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn latest_nonce(&self, address: Address) -> u64 {
        self.state
            .lock()
            .unwrap()
            .accounts
            .get(&address)
            .map(|a| a.latest)
            .unwrap_or_default()
    }

    pub fn balance_of(&self, address: Address) -> U256 {
        self.state
            .lock()
            .unwrap()
            .accounts
            .get(&address)
            .map(|a| a.balance)
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn transaction_count(&self, address: Address, tag: NonceTag) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        let call = state.nonce_calls;
        state.nonce_calls += 1;
        state.events.push(ChainEvent::NonceQuery { address, tag });
        if let Some(message) = state.nonce_failures.remove(&call) {
            return Err(anyhow!(message));
        }
        let account = state.accounts.entry(address).or_default();
        Ok(match tag {
            NonceTag::Latest => account.latest,
            NonceTag::Pending => account.pending.max(account.latest),
        })
    }

    async fn gas_price(&self) -> Result<U256> {
        let mut state = self.state.lock().unwrap();
        let call = state.gas_calls;
        state.gas_calls += 1;
        state.events.push(ChainEvent::GasPrice);
        if state.gas_failures.contains(&call) {
            return Err(anyhow!("eth_gasPrice: upstream timeout"));
        }
        Ok(state.gas_price)
    }

    async fn balance(&self, address: Address) -> Result<U256> {
        let mut state = self.state.lock().unwrap();
        state.events.push(ChainEvent::Balance(address));
        Ok(state
            .accounts
            .get(&address)
            .map(|a| a.balance)
            .unwrap_or_default())
    }

    async fn send_transaction(&self, request: &TransferRequest<'_>) -> Result<TxHandle> {
        let mut state = self.state.lock().unwrap();
        let call = state.send_calls;
        state.send_calls += 1;

        if let Some(failure) = state.send_failures.remove(&call) {
            state.apply_latest(failure.latest_after);
            return Err(anyhow!(failure.message));
        }

        let from = request.sender.address();
        let account = state.accounts.entry(from).or_default();
        let nonce = request.nonce.unwrap_or(account.pending.max(account.latest));
        account.pending = account.pending.max(nonce + 1);

        let hash = H256::from_low_u64_be(call as u64 + 1);
        let tx = SentTx {
            hash,
            from,
            to: request.to,
            value: request.value,
            nonce,
            gas_price: request.gas_price,
            gas_limit: request.gas_limit,
        };
        state.events.push(ChainEvent::Sent {
            from,
            to: request.to,
            nonce,
        });
        state.sent.push(tx.clone());
        state.in_flight.insert(hash, tx);

        Ok(TxHandle { hash, nonce })
    }

    async fn wait_for_receipt(&self, handle: &TxHandle) -> Result<TxReceipt> {
        let mut state = self.state.lock().unwrap();
        let call = state.wait_calls;
        state.wait_calls += 1;

        let tx = state
            .in_flight
            .remove(&handle.hash)
            .ok_or_else(|| anyhow!("unknown transaction {:?}", handle.hash))?;

        if let Some(failure) = state.wait_failures.remove(&call) {
            state.apply_latest(failure.latest_after);
            return Err(anyhow!(failure.message));
        }

        {
            let sender = state.accounts.entry(tx.from).or_default();
            sender.latest = sender.latest.max(tx.nonce + 1);
            sender.balance = sender.balance.saturating_sub(tx.value);
        }
        state.accounts.entry(tx.to).or_default().balance += tx.value;
        state.block += 1;

        let receipt = TxReceipt {
            hash: tx.hash,
            block_number: state.block,
            gas_used: U256::from(MOCK_GAS_USED),
            status: Some(1),
        };
        state.events.push(ChainEvent::Confirmed {
            from: tx.from,
            to: tx.to,
            nonce: tx.nonce,
        });
        state.receipts.insert(tx.hash, receipt.clone());
        Ok(receipt)
    }

    async fn transaction_receipt(&self, hash: H256) -> Result<Option<TxReceipt>> {
        Ok(self.state.lock().unwrap().receipts.get(&hash).cloned())
    }
}
