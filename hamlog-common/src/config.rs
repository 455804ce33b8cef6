//! Bootstrap configuration
//!
//! # Sources Priority
//!
//! 1. Command-line arguments (applied by the binary on top of [`TomlConfig`])
//! 2. Environment variables ([`TomlConfig::apply_env_overrides`])
//! 3. TOML configuration file ([`TomlConfig::load`])
//! 4. Compiled defaults (serde defaults below)
//!
//! A missing default config file is not an error: a warning is logged and
//! compiled defaults are used. A file that exists but does not parse is an error.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const ENV_CONFIG: &str = "HAMLOG_CONFIG";
pub const ENV_DATABASE: &str = "HAMLOG_DATABASE";
pub const ENV_HOST: &str = "HAMLOG_HOST";
pub const ENV_PORT: &str = "HAMLOG_PORT";
pub const ENV_LOG_LEVEL: &str = "HAMLOG_LOG_LEVEL";
pub const ENV_HAMQTH_USERNAME: &str = "HAMQTH_USERNAME";
pub const ENV_HAMQTH_PASSWORD: &str = "HAMQTH_PASSWORD";
pub const ENV_ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";

/// Top-level TOML document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// SQLite database file; `None` means [`default_database_path`]
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub hamqth: HamqthConfig,

    #[serde(default)]
    pub llm: LlmConfig,
}

/// `[server]` section
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Origins allowed by the CORS layer
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Requests per minute per client IP; 0 disables limiting
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: u32,
}

/// `[logging]` section
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// `[auth]` section
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_token_lifetime")]
    pub token_lifetime_seconds: i64,
}

/// `[hamqth]` section
#[derive(Debug, Clone, Deserialize)]
pub struct HamqthConfig {
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_hamqth_base_url")]
    pub base_url: String,
}

/// `[llm]` section
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:5173".to_string()]
}

fn default_rate_limit() -> u32 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_token_lifetime() -> i64 {
    3600
}

fn default_hamqth_base_url() -> String {
    "https://www.hamqth.com/xml.php".to_string()
}

fn default_llm_model() -> String {
    "claude-haiku-4-5-20251001".to_string()
}

fn default_llm_max_tokens() -> u32 {
    512
}

fn default_llm_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
            rate_limit_per_minute: default_rate_limit(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_lifetime_seconds: default_token_lifetime(),
        }
    }
}

impl Default for HamqthConfig {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            base_url: default_hamqth_base_url(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_llm_model(),
            max_tokens: default_llm_max_tokens(),
            base_url: default_llm_base_url(),
        }
    }
}

impl TomlConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Load configuration from `explicit`, or from [`default_config_path`]
    ///
    /// An explicit path that cannot be read is an error. A missing default
    /// file yields compiled defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            let content = std::fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
            })?;
            info!("Loaded configuration from {}", path.display());
            return Self::from_toml_str(&content);
        }

        match default_config_path() {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(&path)?;
                info!("Loaded configuration from {}", path.display());
                Self::from_toml_str(&content)
            }
            Some(path) => {
                warn!(
                    "No config file at {}, using compiled defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            None => {
                warn!("Could not determine config directory, using compiled defaults");
                Ok(Self::default())
            }
        }
    }

    /// Overlay values from environment variables
    ///
    /// Blank variables are ignored. An unparseable `HAMLOG_PORT` is an error.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(path) = env_value(ENV_DATABASE) {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(host) = env_value(ENV_HOST) {
            self.server.host = host;
        }
        if let Some(port) = env_value(ENV_PORT) {
            self.server.port = port
                .parse()
                .map_err(|_| Error::Config(format!("{} is not a valid port: {}", ENV_PORT, port)))?;
        }
        if let Some(level) = env_value(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
        if let Some(user) = env_value(ENV_HAMQTH_USERNAME) {
            self.hamqth.username = Some(user);
        }
        if let Some(pass) = env_value(ENV_HAMQTH_PASSWORD) {
            self.hamqth.password = Some(pass);
        }
        if let Some(key) = env_value(ENV_ANTHROPIC_API_KEY) {
            self.llm.api_key = Some(key);
        }
        Ok(())
    }

    /// Database path with the compiled default applied
    pub fn resolved_database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(default_database_path)
    }

    /// HamQTH credentials, if both are configured and non-blank
    pub fn hamqth_credentials(&self) -> Option<(String, String)> {
        match (
            valid_credential(self.hamqth.username.as_deref()),
            valid_credential(self.hamqth.password.as_deref()),
        ) {
            (Some(user), Some(pass)) => Some((user.to_string(), pass.to_string())),
            _ => None,
        }
    }

    /// Completion model API key, if configured and non-blank
    pub fn llm_api_key(&self) -> Option<String> {
        valid_credential(self.llm.api_key.as_deref()).map(str::to_string)
    }
}

/// A credential is usable only if it is present and not blank
pub fn valid_credential(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// `<config_dir>/hamlog/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("hamlog").join("config.toml"))
}

/// `<data_local_dir>/hamlog/hamlog.db`, or `./hamlog.db` without a home directory
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("hamlog").join("hamlog.db"))
        .unwrap_or_else(|| PathBuf::from("hamlog.db"))
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.rate_limit_per_minute, 60);
        assert_eq!(config.server.cors_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.auth.token_lifetime_seconds, 3600);
        assert_eq!(config.llm.model, "claude-haiku-4-5-20251001");
        assert_eq!(config.llm.max_tokens, 512);
        assert!(config.hamqth_credentials().is_none());
        assert!(config.llm_api_key().is_none());
    }

    #[test]
    fn test_empty_document_equals_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.hamqth.base_url, "https://www.hamqth.com/xml.php");
    }

    #[test]
    fn test_partial_sections() {
        let config = TomlConfig::from_toml_str(
            r#"
            database_path = "/tmp/log.db"

            [server]
            port = 9000

            [hamqth]
            username = "w1aw"
            password = "secret"
            "#,
        )
        .unwrap();

        assert_eq!(config.resolved_database_path(), PathBuf::from("/tmp/log.db"));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(
            config.hamqth_credentials(),
            Some(("w1aw".to_string(), "secret".to_string()))
        );
    }

    #[test]
    fn test_malformed_toml_is_error() {
        let err = TomlConfig::from_toml_str("[server\nport = ").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_blank_credentials_are_absent() {
        assert_eq!(valid_credential(None), None);
        assert_eq!(valid_credential(Some("")), None);
        assert_eq!(valid_credential(Some("   ")), None);
        assert_eq!(valid_credential(Some(" key ")), Some("key"));

        let mut config = TomlConfig::default();
        config.hamqth.username = Some("w1aw".to_string());
        config.hamqth.password = Some(" ".to_string());
        assert!(config.hamqth_credentials().is_none());
    }

    #[test]
    fn test_default_database_path_file_name() {
        let path = default_database_path();
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("hamlog.db"));
    }
}
