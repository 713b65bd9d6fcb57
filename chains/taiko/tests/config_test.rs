use std::io::Write;
use taiko_transfer::TransferConfig;

#[test]
fn test_load_missing_file_uses_builtin_networks() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let config = TransferConfig::load(&path.to_string_lossy()).unwrap();
    assert!(config.network("preconf").is_ok());
    assert!(config.network("hekla").is_ok());
    assert_eq!(config.gas_config().cancel_multiplier, 5.0);
}

#[test]
fn test_load_toml_overrides() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
default_network = "local"
cancel_submit_delay_ms = 50

[fees]
transfer_multiplier = 1.5

[robust]
single_count = 9

[networks.local]
name = "Local Devnet"
rpc_url = "http://127.0.0.1:8545"
"#
    )
    .unwrap();

    let config = TransferConfig::load(&file.path().to_string_lossy()).unwrap();
    assert_eq!(config.default_network, "local");
    assert_eq!(config.robust.single_count, 9);
    assert_eq!(config.robust.multi_count, 3);
    assert_eq!(config.gas_config().transfer_multiplier, 1.5);
    assert_eq!(config.cancel_submit_delay().as_millis(), 50);
    assert_eq!(config.network("local").unwrap().gas_multiplier, 1.1);
    assert!(config.network("hekla").is_ok());
}

#[test]
fn test_load_rejects_unknown_default_network() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, r#"default_network = "mainnet""#).unwrap();

    let err = TransferConfig::load(&file.path().to_string_lossy()).unwrap_err();
    assert!(err.to_string().contains("Unknown network 'mainnet'"));
}
