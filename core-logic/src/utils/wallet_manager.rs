use crate::config::WalletSource;
use crate::error::{ConfigError, WalletError};
use anyhow::Result;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{info, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Highest `WALLET_<n>` index scanned from the environment.
const MAX_ENV_WALLETS: usize = 64;

/// A cleartext private key and the name it was loaded under.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct WalletSecret {
    #[zeroize(skip)]
    pub label: String,
    private_key: String,
}

impl WalletSecret {
    /// Validates the key shape (32 bytes of hex, optional `0x`).
    pub fn new(label: impl Into<String>, private_key: &str) -> Result<Self, WalletError> {
        let label = label.into();
        let trimmed = private_key.trim();
        let hex_part = trimmed.strip_prefix("0x").unwrap_or(trimmed);

        if hex_part.len() != 64 {
            return Err(WalletError::InvalidKeyLength {
                label,
                length: hex_part.len(),
            });
        }
        if hex::decode(hex_part).is_err() {
            return Err(WalletError::InvalidKeyFormat { label });
        }

        Ok(Self {
            label,
            private_key: hex_part.to_string(),
        })
    }

    /// Hex key without `0x`.
    pub fn private_key(&self) -> &str {
        &self.private_key
    }
}

impl fmt::Debug for WalletSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletSecret")
            .field("label", &self.label)
            .field("private_key", &"***REDACTED***")
            .finish()
    }
}

/// Ordered wallet keys; index 0 is the primary (funding) wallet.
#[derive(Debug)]
pub struct WalletManager {
    secrets: Vec<WalletSecret>,
}

impl WalletManager {
    pub const PV_FILE: &'static str = "pv.txt";

    /// Load from the configured source. An empty environment falls back to `pv.txt`.
    pub fn load(source: &WalletSource) -> Result<Self> {
        match source {
            WalletSource::Env { main_key, prefix } => {
                let manager =
                    Self::from_lookup(main_key, prefix, |name| std::env::var(name).ok())?;
                if manager.count() > 0 {
                    return Ok(manager);
                }

                if Path::new(Self::PV_FILE).exists() {
                    info!(
                        "[WalletManager] No wallet env vars set, loading raw keys from {}",
                        Self::PV_FILE
                    );
                    return Self::from_file(Self::PV_FILE);
                }

                Err(WalletError::NoWallets {
                    fallback: Self::PV_FILE.to_string(),
                }
                .into())
            }
            WalletSource::File { path } => Self::from_file(path),
        }
    }

    /// Collect `main_key` then `<prefix>2`, `<prefix>3`, ... through `lookup`.
    pub fn from_lookup<F>(main_key: &str, prefix: &str, lookup: F) -> Result<Self, WalletError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut secrets = Vec::new();

        let mut push = |name: String| -> Result<(), WalletError> {
            if let Some(mut value) = lookup(&name) {
                if !value.trim().is_empty() {
                    let secret = WalletSecret::new(name, &value);
                    value.zeroize();
                    secrets.push(secret?);
                }
            }
            Ok(())
        };

        push(main_key.to_string())?;
        for index in 2..=MAX_ENV_WALLETS {
            push(format!("{}{}", prefix, index))?;
        }

        if !secrets.is_empty() {
            info!("[WalletManager] Loaded {} wallet keys from environment", secrets.len());
        }

        Ok(Self { secrets })
    }

    /// One key per line; blank lines and `#` comments are skipped.
    pub fn from_file(path: &str) -> Result<Self> {
        let mut content = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.to_string(),
            msg: e.to_string(),
        })?;

        let mut secrets = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let label = format!("{}:{}", path, line_no + 1);
            match WalletSecret::new(label, trimmed) {
                Ok(secret) => secrets.push(secret),
                Err(e) => {
                    content.zeroize();
                    return Err(e.into());
                }
            }
        }
        content.zeroize();

        if secrets.is_empty() {
            warn!("[WalletManager] {} contains no keys", path);
            return Err(WalletError::NoWallets {
                fallback: path.to_string(),
            }
            .into());
        }

        info!("[WalletManager] Loaded {} wallet keys from {}", secrets.len(), path);
        Ok(Self { secrets })
    }

    /// Returns the number of available wallets
    pub fn count(&self) -> usize {
        self.secrets.len()
    }

    pub fn get(&self, index: usize) -> Result<&WalletSecret, WalletError> {
        self.secrets.get(index).ok_or(WalletError::NotFound {
            index,
            total: self.secrets.len(),
        })
    }

    pub fn secrets(&self) -> &[WalletSecret] {
        &self.secrets
    }

    pub fn labels(&self) -> Vec<&str> {
        self.secrets.iter().map(|s| s.label.as_str()).collect()
    }
}
