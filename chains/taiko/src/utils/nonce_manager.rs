use anyhow::Result;
use core_logic::{with_retry, RetryConfig};
use ethers::types::Address;

use crate::client::{ChainClient, NonceTag};

/// Next nonce for one sender during one engine invocation.
///
/// Advanced only after a confirmed transfer; everything else goes back to the chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NonceCursor {
    address: Address,
    next: u64,
}

impl NonceCursor {
    pub fn new(address: Address, start: u64) -> Self {
        Self {
            address,
            next: start,
        }
    }

    pub fn current(&self) -> u64 {
        self.next
    }

    pub fn advance(&mut self) {
        self.next += 1;
    }

    /// Reset to the confirmed (`latest`) count. The cursor is untouched if every retry fails.
    pub async fn resync<C: ChainClient + ?Sized>(
        &mut self,
        client: &C,
        retry: RetryConfig,
    ) -> Result<u64> {
        let address = self.address;
        let latest = with_retry(retry, "resync latest nonce", || {
            client.transaction_count(address, NonceTag::Latest)
        })
        .await?;
        self.next = latest;
        Ok(latest)
    }
}
