use core_logic::{
    multiplier_percent, ConfigError, GasConfig, GasConfigToml, NetworkConfig, WalletManager,
    WalletSource,
};
use std::io::Write;

#[test]
fn test_network_config_defaults_from_json() {
    let network: NetworkConfig = serde_json::from_str(
        r#"{ "name": "Local", "rpc_url": "http://127.0.0.1:8545" }"#,
    )
    .unwrap();

    assert_eq!(network.gas_multiplier, 1.1);
    assert_eq!(network.receipt_poll_interval_ms, 200);
    assert!(network.receipt_timeout_secs.is_none());
    assert!(network.explorer_url("0x01").is_none());
    assert!(network.validate().is_ok());
}

#[test]
fn test_preconf_polls_faster_than_hekla() {
    let preconf = NetworkConfig::preconf();
    let hekla = NetworkConfig::hekla();
    assert!(preconf.receipt_poll_interval_ms < hekla.receipt_poll_interval_ms);
    assert!(preconf.expected_confirmation_ms < hekla.expected_confirmation_ms);
}

#[test]
fn test_gas_config_defaults_are_valid() {
    let gas = GasConfig::default();
    assert_eq!(gas.transfer_multiplier, 2.0);
    assert_eq!(gas.cancel_multiplier, 5.0);
    assert_eq!(gas.limit_transfer(), 21_000);
    assert!(gas.validate().is_ok());
}

#[test]
fn test_gas_config_rejects_cancel_not_above_transfer() {
    let gas = GasConfig::new()
        .with_transfer_multiplier(3.0)
        .with_cancel_multiplier(3.0);

    match gas.validate() {
        Err(ConfigError::InvalidValue { field, .. }) => {
            assert_eq!(field, "fees.cancel_multiplier")
        }
        other => panic!("expected InvalidValue, got {:?}", other),
    }
}

#[test]
fn test_gas_config_rejects_unit_transfer_multiplier() {
    let gas = GasConfig::new().with_transfer_multiplier(1.0);
    assert!(gas.validate().is_err());
}

#[test]
fn test_gas_config_toml_partial_override() {
    let toml: GasConfigToml = serde_json::from_str(r#"{ "cancel_multiplier": 8.0 }"#).unwrap();
    let gas = GasConfig::from(toml);

    assert_eq!(gas.transfer_multiplier, 2.0);
    assert_eq!(gas.cancel_multiplier, 8.0);
    assert_eq!(gas.limit_transfer(), 21_000);
}

#[test]
fn test_multiplier_percent() {
    assert_eq!(multiplier_percent(1.1), 110);
    assert_eq!(multiplier_percent(2.0), 200);
    assert_eq!(multiplier_percent(5.0), 500);
}

#[test]
fn test_wallet_source_default_uses_wallet_env_names() {
    match WalletSource::default() {
        WalletSource::Env { main_key, prefix } => {
            assert_eq!(main_key, "WALLET_MAIN");
            assert_eq!(prefix, "WALLET_");
        }
        other => panic!("expected Env source, got {:?}", other),
    }
}

#[test]
fn test_wallet_file_source_loads_in_order() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "# primary").unwrap();
    writeln!(
        file,
        "0x00000000000000000000000000000000000000000000000000000000000000aa"
    )
    .unwrap();
    writeln!(file).unwrap();
    writeln!(
        file,
        "00000000000000000000000000000000000000000000000000000000000000bb"
    )
    .unwrap();

    let source = WalletSource::File {
        path: file.path().to_string_lossy().to_string(),
    };
    let manager = WalletManager::load(&source).unwrap();

    assert_eq!(manager.count(), 2);
    assert!(manager.get(0).unwrap().private_key().ends_with("aa"));
    assert!(manager.get(1).unwrap().private_key().ends_with("bb"));
    assert!(manager.get(2).is_err());
}

#[test]
fn test_wallet_file_rejects_short_key() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "0xdeadbeef").unwrap();

    let err = WalletManager::from_file(&file.path().to_string_lossy()).unwrap_err();
    assert!(err.to_string().contains("wrong length"));
}
