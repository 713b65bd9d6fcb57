//! # Core Logic - Gas Configuration
//!
//! Fee policy shared by the network crates. The multipliers are applied to the
//! node's `eth_gasPrice` baseline; this module only holds and validates them,
//! the chain crates do the `U256` arithmetic.

use crate::error::ConfigError;
use serde::Deserialize;

/// Standard gas limits for the operations the protocol sends
#[derive(Debug, Clone, Copy)]
pub struct StandardGasLimits {
    pub transfer: u64,
}

impl Default for StandardGasLimits {
    fn default() -> Self {
        Self { transfer: 21_000 }
    }
}

/// Fee multipliers relative to the network baseline.
///
/// Ordering must hold in whole percent: `cancel > transfer > 100%`.
#[derive(Debug, Clone)]
pub struct GasConfig {
    pub transfer_multiplier: f64,
    pub cancel_multiplier: f64,
    pub limits: StandardGasLimits,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            transfer_multiplier: 2.0,
            cancel_multiplier: 5.0,
            limits: StandardGasLimits::default(),
        }
    }
}

impl GasConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transfer_multiplier(mut self, multiplier: f64) -> Self {
        self.transfer_multiplier = multiplier;
        self
    }

    pub fn with_cancel_multiplier(mut self, multiplier: f64) -> Self {
        self.cancel_multiplier = multiplier;
        self
    }

    pub fn limit_transfer(&self) -> u64 {
        self.limits.transfer
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("fees.transfer_multiplier", self.transfer_multiplier),
            ("fees.cancel_multiplier", self.cancel_multiplier),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: "must be a finite number".to_string(),
                });
            }
        }

        // Pricing works in whole percent, so the ordering must hold after rounding.
        let transfer = multiplier_percent(self.transfer_multiplier);
        let cancel = multiplier_percent(self.cancel_multiplier);

        if transfer <= 100 {
            return Err(ConfigError::InvalidValue {
                field: "fees.transfer_multiplier".to_string(),
                reason: format!(
                    "must exceed 1.0 at whole-percent precision, got {}",
                    self.transfer_multiplier
                ),
            });
        }

        if cancel <= transfer {
            return Err(ConfigError::InvalidValue {
                field: "fees.cancel_multiplier".to_string(),
                reason: format!(
                    "must exceed transfer multiplier {} ({}% vs {}%)",
                    self.transfer_multiplier, cancel, transfer
                ),
            });
        }

        if self.limits.transfer < 21_000 {
            return Err(ConfigError::InvalidValue {
                field: "fees.limit_transfer".to_string(),
                reason: format!("below intrinsic gas 21000, got {}", self.limits.transfer),
            });
        }

        Ok(())
    }
}

/// Convert a multiplier to integer percent, e.g. `1.1 -> 110`.
pub fn multiplier_percent(multiplier: f64) -> u64 {
    (multiplier * 100.0).round().max(0.0) as u64
}

/// Deserialize helper for GasConfig from TOML
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GasConfigToml {
    pub transfer_multiplier: Option<f64>,
    pub cancel_multiplier: Option<f64>,
    pub limit_transfer: Option<u64>,
}

impl From<GasConfigToml> for GasConfig {
    fn from(toml: GasConfigToml) -> Self {
        let defaults = GasConfig::default();
        Self {
            transfer_multiplier: toml
                .transfer_multiplier
                .unwrap_or(defaults.transfer_multiplier),
            cancel_multiplier: toml.cancel_multiplier.unwrap_or(defaults.cancel_multiplier),
            limits: StandardGasLimits {
                transfer: toml.limit_transfer.unwrap_or(defaults.limits.transfer),
            },
        }
    }
}
