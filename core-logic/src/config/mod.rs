use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// RPC endpoint and display settings for one network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub name: String,
    pub rpc_url: String,
    #[serde(default)]
    pub explorer: String,
    #[serde(default = "default_gas_multiplier")]
    pub gas_multiplier: f64,
    #[serde(default = "default_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,
    /// Upper bound on a single receipt wait. Unset means wait indefinitely.
    #[serde(default)]
    pub receipt_timeout_secs: Option<u64>,
    #[serde(default)]
    pub expected_confirmation_ms: u64,
}

fn default_gas_multiplier() -> f64 {
    1.1
}

fn default_poll_interval_ms() -> u64 {
    200
}

impl NetworkConfig {
    /// Taiko preconfirmation devnet.
    pub fn preconf() -> Self {
        Self {
            name: "Taiko Preconf".to_string(),
            rpc_url: "https://rpc.helder.taiko.xyz/".to_string(),
            explorer: "https://helder-explorer-git-preconfs-taikoxyz.vercel.app/address/"
                .to_string(),
            gas_multiplier: default_gas_multiplier(),
            receipt_poll_interval_ms: 100,
            receipt_timeout_secs: None,
            expected_confirmation_ms: 200,
        }
    }

    /// Taiko Hekla testnet.
    pub fn hekla() -> Self {
        Self {
            name: "Taiko Hekla".to_string(),
            rpc_url: "https://rpc.hekla.taiko.xyz".to_string(),
            explorer: "https://hekla.taikoscan.io/address/".to_string(),
            gas_multiplier: default_gas_multiplier(),
            receipt_poll_interval_ms: 500,
            receipt_timeout_secs: None,
            expected_confirmation_ms: 2000,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.rpc_url.starts_with("http://") || self.rpc_url.starts_with("https://")) {
            return Err(ConfigError::InvalidRpcUrl {
                url: self.rpc_url.clone(),
            });
        }
        if !self.gas_multiplier.is_finite() || self.gas_multiplier < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: format!("{}.gas_multiplier", self.name),
                reason: format!("must be >= 1.0, got {}", self.gas_multiplier),
            });
        }
        if self.receipt_poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: format!("{}.receipt_poll_interval_ms", self.name),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Explorer link for an address, or `None` when no explorer is configured.
    pub fn explorer_url(&self, address: &str) -> Option<String> {
        if self.explorer.is_empty() {
            None
        } else {
            Some(format!("{}{}", self.explorer, address))
        }
    }
}

/// Where wallet keys come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WalletSource {
    /// `WALLET_MAIN`, `WALLET_2`, `WALLET_3`, ... style variables.
    Env { main_key: String, prefix: String },
    /// One hex key per line, `#` comments allowed.
    File { path: String },
}

impl Default for WalletSource {
    fn default() -> Self {
        WalletSource::Env {
            main_key: "WALLET_MAIN".to_string(),
            prefix: "WALLET_".to_string(),
        }
    }
}
