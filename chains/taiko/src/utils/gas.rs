use anyhow::Result;
use core_logic::{multiplier_percent, GasConfig};
use ethers::types::U256;

use crate::client::ChainClient;

/// Turns the node's `eth_gasPrice` baseline into the legacy gas price each kind of
/// transaction is sent with.
#[derive(Clone, Debug, Default)]
pub struct GasManager {
    config: GasConfig,
}

impl GasManager {
    pub fn new(config: GasConfig) -> Self {
        Self { config }
    }

    /// `base * multiplier`, computed in integer percent so large prices stay exact.
    pub fn scaled(base: U256, multiplier: f64) -> U256 {
        base * U256::from(multiplier_percent(multiplier)) / U256::from(100u64)
    }

    pub fn transfer_price(&self, base: U256) -> U256 {
        Self::scaled(base, self.config.transfer_multiplier)
    }

    pub fn cancel_price(&self, base: U256) -> U256 {
        Self::scaled(base, self.config.cancel_multiplier)
    }

    pub async fn current_transfer_price<C: ChainClient + ?Sized>(&self, client: &C) -> Result<U256> {
        Ok(self.transfer_price(client.gas_price().await?))
    }

    pub async fn current_cancel_price<C: ChainClient + ?Sized>(&self, client: &C) -> Result<U256> {
        Ok(self.cancel_price(client.gas_price().await?))
    }

    pub fn limit_transfer(&self) -> u64 {
        self.config.limit_transfer()
    }

    pub fn config(&self) -> &GasConfig {
        &self.config
    }
}
