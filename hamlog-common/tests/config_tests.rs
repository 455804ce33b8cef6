//! Configuration loading tests
//!
//! Tests that touch environment variables are marked `#[serial]` so they
//! do not race each other.

use hamlog_common::config::{
    TomlConfig, ENV_ANTHROPIC_API_KEY, ENV_DATABASE, ENV_HAMQTH_PASSWORD, ENV_HAMQTH_USERNAME,
    ENV_HOST, ENV_LOG_LEVEL, ENV_PORT,
};
use hamlog_common::Error;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn clear_env() {
    for name in [
        ENV_DATABASE,
        ENV_HOST,
        ENV_PORT,
        ENV_LOG_LEVEL,
        ENV_HAMQTH_USERNAME,
        ENV_HAMQTH_PASSWORD,
        ENV_ANTHROPIC_API_KEY,
    ] {
        env::remove_var(name);
    }
}

#[test]
fn test_load_explicit_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
database_path = "/var/lib/hamlog/log.db"

[server]
host = "0.0.0.0"
rate_limit_per_minute = 0

[llm]
api_key = "sk-test"
max_tokens = 256
"#
    )
    .unwrap();

    let config = TomlConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.resolved_database_path(), PathBuf::from("/var/lib/hamlog/log.db"));
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 8000);
    assert_eq!(config.server.rate_limit_per_minute, 0);
    assert_eq!(config.llm_api_key().as_deref(), Some("sk-test"));
    assert_eq!(config.llm.max_tokens, 256);
}

#[test]
fn test_missing_explicit_file_is_error() {
    let err = TomlConfig::load(Some(std::path::Path::new("/nonexistent/hamlog.toml"))).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_malformed_file_is_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[server]\nport = \"not a number\"").unwrap();

    assert!(TomlConfig::load(Some(file.path())).is_err());
}

#[test]
#[serial]
fn test_env_overrides_toml() {
    clear_env();
    env::set_var(ENV_PORT, "9100");
    env::set_var(ENV_HAMQTH_USERNAME, "w1aw");
    env::set_var(ENV_HAMQTH_PASSWORD, "secret");
    env::set_var(ENV_ANTHROPIC_API_KEY, "sk-env");

    let mut config = TomlConfig::from_toml_str("[server]\nport = 9000\n[llm]\napi_key = \"sk-file\"").unwrap();
    config.apply_env_overrides().unwrap();

    assert_eq!(config.server.port, 9100);
    assert_eq!(config.llm_api_key().as_deref(), Some("sk-env"));
    assert_eq!(
        config.hamqth_credentials(),
        Some(("w1aw".to_string(), "secret".to_string()))
    );

    clear_env();
}

#[test]
#[serial]
fn test_blank_env_values_ignored() {
    clear_env();
    env::set_var(ENV_HOST, "   ");

    let mut config = TomlConfig::default();
    config.apply_env_overrides().unwrap();
    assert_eq!(config.server.host, "127.0.0.1");

    clear_env();
}

#[test]
#[serial]
fn test_invalid_env_port_is_error() {
    clear_env();
    env::set_var(ENV_PORT, "eighty");

    let mut config = TomlConfig::default();
    assert!(config.apply_env_overrides().is_err());

    clear_env();
}
