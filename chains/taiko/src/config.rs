use anyhow::Result;
use config::{Config, Environment, File};
use core_logic::{ConfigError, GasConfig, GasConfigToml, NetworkConfig, WalletSource};
use ethers::types::U256;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::engine::parse_amount;
use crate::orchestrator::FundingPolicy;

pub const DEFAULT_CONFIG_PATH: &str = "chains/taiko/config.toml";

#[derive(Debug, Deserialize, Clone)]
pub struct FundingSettings {
    #[serde(default = "default_funding_eth")]
    pub threshold_eth: String,
    #[serde(default = "default_funding_eth")]
    pub amount_eth: String,
}

impl Default for FundingSettings {
    fn default() -> Self {
        Self {
            threshold_eth: default_funding_eth(),
            amount_eth: default_funding_eth(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RobustSettings {
    #[serde(default = "default_single_amount")]
    pub single_amount: String,
    #[serde(default = "default_single_count")]
    pub single_count: usize,
    #[serde(default = "default_multi_amount")]
    pub multi_amount: String,
    #[serde(default = "default_multi_count")]
    pub multi_count: usize,
}

impl Default for RobustSettings {
    fn default() -> Self {
        Self {
            single_amount: default_single_amount(),
            single_count: default_single_count(),
            multi_amount: default_multi_amount(),
            multi_count: default_multi_count(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StressSettings {
    #[serde(default = "default_stress_amount")]
    pub amount: String,
    #[serde(default = "default_stress_count")]
    pub count: usize,
    #[serde(default)]
    pub delay_between_tx: bool,
    #[serde(default = "default_stress_delay_ms")]
    pub delay_ms: u64,
}

impl Default for StressSettings {
    fn default() -> Self {
        Self {
            amount: default_stress_amount(),
            count: default_stress_count(),
            delay_between_tx: false,
            delay_ms: default_stress_delay_ms(),
        }
    }
}

/// Everything the binary needs for a run. File values are overridden by `TAIKO__*`
/// environment variables (`TAIKO__DEFAULT_NETWORK=hekla`, `TAIKO__ROBUST__SINGLE_COUNT=10`).
#[derive(Debug, Deserialize, Clone)]
pub struct TransferConfig {
    #[serde(default = "default_network")]
    pub default_network: String,
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkConfig>,
    #[serde(default)]
    pub fees: GasConfigToml,
    #[serde(default)]
    pub funding: FundingSettings,
    #[serde(default)]
    pub robust: RobustSettings,
    #[serde(default)]
    pub stress: StressSettings,
    #[serde(default = "default_cancel_delay_ms")]
    pub cancel_submit_delay_ms: u64,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default)]
    pub database_path: Option<String>,
    #[serde(default)]
    pub wallet_file: Option<String>,
}

fn default_network() -> String {
    "preconf".to_string()
}
fn default_funding_eth() -> String {
    "0.1".to_string()
}
fn default_single_amount() -> String {
    "0.001".to_string()
}
fn default_single_count() -> usize {
    5
}
fn default_multi_amount() -> String {
    "0.0005".to_string()
}
fn default_multi_count() -> usize {
    3
}
fn default_stress_amount() -> String {
    "0.0001".to_string()
}
fn default_stress_count() -> usize {
    5
}
fn default_stress_delay_ms() -> u64 {
    500
}
fn default_cancel_delay_ms() -> u64 {
    500
}
fn default_output_dir() -> String {
    "reports".to_string()
}

impl Default for TransferConfig {
    fn default() -> Self {
        let mut config = Self {
            default_network: default_network(),
            networks: BTreeMap::new(),
            fees: GasConfigToml::default(),
            funding: FundingSettings::default(),
            robust: RobustSettings::default(),
            stress: StressSettings::default(),
            cancel_submit_delay_ms: default_cancel_delay_ms(),
            output_dir: default_output_dir(),
            database_path: None,
            wallet_file: None,
        };
        config.add_builtin_networks();
        config
    }
}

impl TransferConfig {
    /// Load `path` if it exists, then apply `TAIKO__*` overrides. A missing file is not
    /// an error: the built-in networks and defaults are used.
    pub fn load(path: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(Path::new(path).exists()))
            .add_source(
                Environment::with_prefix("TAIKO")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let mut config: TransferConfig = settings.try_deserialize()?;
        config.add_builtin_networks();
        config.validate()?;
        Ok(config)
    }

    fn add_builtin_networks(&mut self) {
        self.networks
            .entry("preconf".to_string())
            .or_insert_with(NetworkConfig::preconf);
        self.networks
            .entry("hekla".to_string())
            .or_insert_with(NetworkConfig::hekla);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for network in self.networks.values() {
            network.validate()?;
        }
        self.network(&self.default_network)?;
        self.gas_config().validate()?;
        self.funding_policy()?;

        for (field, amount) in [
            ("robust.single_amount", &self.robust.single_amount),
            ("robust.multi_amount", &self.robust.multi_amount),
            ("stress.amount", &self.stress.amount),
        ] {
            parse_amount(amount).map_err(|e| ConfigError::InvalidValue {
                field: field.to_string(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    pub fn network(&self, key: &str) -> Result<&NetworkConfig, ConfigError> {
        self.networks
            .get(key)
            .ok_or_else(|| ConfigError::UnknownNetwork {
                name: key.to_string(),
                available: self
                    .networks
                    .keys()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    pub fn gas_config(&self) -> GasConfig {
        GasConfig::from(self.fees.clone())
    }

    pub fn funding_policy(&self) -> Result<FundingPolicy, ConfigError> {
        let parse = |field: &str, value: &str| -> Result<U256, ConfigError> {
            parse_amount(value).map_err(|e| ConfigError::InvalidValue {
                field: field.to_string(),
                reason: e.to_string(),
            })
        };
        Ok(FundingPolicy {
            threshold: parse("funding.threshold_eth", &self.funding.threshold_eth)?,
            amount: parse("funding.amount_eth", &self.funding.amount_eth)?,
        })
    }

    pub fn cancel_submit_delay(&self) -> Duration {
        Duration::from_millis(self.cancel_submit_delay_ms)
    }

    pub fn wallet_source(&self) -> WalletSource {
        match &self.wallet_file {
            Some(path) => WalletSource::File { path: path.clone() },
            None => WalletSource::default(),
        }
    }
}
