use super::*;
use tempfile::TempDir;

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = TempDir::new().expect("temp dir");
    let config = GatewayConfig::load(dir.path()).expect("loads");

    assert_eq!(config.server.name, "mcp-gateway");
    assert_eq!(config.cache.default_ttl_secs, 300);
    assert_eq!(config.outbound.max_retries, 3);
    assert_eq!(config.outbound.initial_delay_ms, 500);
    assert_eq!(config.base_dir, dir.path());
}

#[test]
fn save_then_load_roundtrip() {
    let dir = TempDir::new().expect("temp dir");
    let mut config = GatewayConfig {
        base_dir: dir.path().to_path_buf(),
        ..GatewayConfig::default()
    };
    config.server.name = "custom-gateway".to_string();
    config.cache.default_ttl_secs = 120;
    config.outbound.max_retries = 5;

    config.save().expect("saves");

    let loaded = GatewayConfig::load(dir.path()).expect("loads");
    assert_eq!(loaded.server.name, "custom-gateway");
    assert_eq!(loaded.cache.default_ttl_secs, 120);
    assert_eq!(loaded.outbound.max_retries, 5);
}

#[test]
fn partial_file_keeps_defaults_for_missing_sections() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(
        dir.path().join("config.toml"),
        "[outbound]\nmax_retries = 1\n",
    )
    .expect("writes");

    let config = GatewayConfig::load(dir.path()).expect("loads");
    assert_eq!(config.outbound.max_retries, 1);
    assert_eq!(config.outbound.timeout_secs, 30);
    assert_eq!(config.server.name, "mcp-gateway");
}

#[test]
fn invalid_toml_is_rejected() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join("config.toml"), "not [valid toml").expect("writes");

    assert!(GatewayConfig::load(dir.path()).is_err());
}

#[test]
fn validation_rejects_out_of_range_values() {
    let mut config = GatewayConfig::default();
    config.cache.default_ttl_secs = 0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidCacheTtl(0))
    ));

    let mut config = GatewayConfig::default();
    config.outbound.max_retries = 50;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidMaxRetries(50))
    ));

    let mut config = GatewayConfig::default();
    config.server.name = "  ".to_string();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidServerName)
    ));

    let mut config = GatewayConfig::default();
    config.outbound.initial_delay_ms = 0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidInitialDelay(0))
    ));
}

#[test]
fn out_of_range_file_fails_load() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(
        dir.path().join("config.toml"),
        "[cache]\ndefault_ttl_secs = 0\n",
    )
    .expect("writes");

    assert!(GatewayConfig::load(dir.path()).is_err());
}
