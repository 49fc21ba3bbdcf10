use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
use thiserror::Error;

use crate::wallet::RetryPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub rpc: RpcConfig,
    #[serde(default)]
    pub entropy: EntropyConfig,
    #[serde(default)]
    pub game: GameConfig,
}

/// Wallet node connection, the `[rpcconfig]` section of the legacy `RPC.conf`
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RpcConfig {
    pub user: String,
    pub password: String,
    #[serde(default = "default_rpc_host")]
    pub host: String,
    #[serde(default = "default_rpc_port")]
    pub port: u16,
    #[serde(default = "default_rpc_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_rpc_host() -> String {
    "localhost".to_string()
}

fn default_rpc_port() -> u16 {
    22555
}

fn default_rpc_timeout_ms() -> u64 {
    30_000
}

impl RpcConfig {
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EntropyConfig {
    /// Refetch the chain height once the cached value is older than this.
    /// `None` keeps the first height for the lifetime of the process.
    #[serde(default)]
    pub height_ttl_secs: Option<u64>,
    pub hash_cache_capacity: usize,
    pub max_draw_attempts: u32,
}

impl Default for EntropyConfig {
    fn default() -> Self {
        Self {
            height_ttl_secs: Some(60),
            hash_cache_capacity: 10_000,
            max_draw_attempts: 64,
        }
    }
}

impl EntropyConfig {
    pub fn height_ttl(&self) -> Option<Duration> {
        self.height_ttl_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GameConfig {
    #[serde(default)]
    pub player_address: Option<String>,
    #[serde(default)]
    pub pool_address: Option<String>,
    /// Addresses at or below this balance are not offered as player wallets.
    pub min_player_balance: Decimal,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            player_address: None,
            pool_address: None,
            min_player_balance: Decimal::ONE,
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_deserialize() {
        let yaml = r#"
log_level: "info"
log_dir: "./logs"
log_file: "lucky_suits.log"
use_json: false
rotation: "daily"
rpc:
  user: "lucky"
  password: "secret"
  host: "10.0.0.5"
  port: 9918
  timeout_ms: 5000
  retry:
    max_attempts: 4
    initial_backoff_ms: 100
    max_backoff_ms: 1000
entropy:
  height_ttl_secs: 30
  hash_cache_capacity: 500
  max_draw_attempts: 16
game:
  player_address: "LPlayer"
  pool_address: "LPool"
  min_player_balance: 2.5
"#;

        let config = AppConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.rpc.url(), "http://10.0.0.5:9918");
        assert_eq!(config.rpc.retry.max_attempts, 4);
        assert_eq!(config.entropy.height_ttl(), Some(Duration::from_secs(30)));
        assert_eq!(config.entropy.hash_cache_capacity, 500);
        assert_eq!(config.game.pool_address.as_deref(), Some("LPool"));
        assert_eq!(config.game.min_player_balance, Decimal::new(25, 1));
    }

    #[test]
    fn test_defaults_follow_legacy_rpc_conf() {
        let yaml = r#"
log_level: "debug"
log_dir: "./logs"
log_file: "lucky_suits.log"
use_json: true
rotation: "never"
rpc:
  user: "lucky"
  password: "secret"
entropy:
  hash_cache_capacity: 10000
  max_draw_attempts: 64
"#;

        let config = AppConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.rpc.host, "localhost");
        assert_eq!(config.rpc.port, 22555);
        assert_eq!(config.rpc.timeout_ms, 30_000);
        assert_eq!(config.rpc.retry.max_attempts, 3);
        assert_eq!(config.entropy.height_ttl(), None);
        assert_eq!(config.game.min_player_balance, Decimal::ONE);
        assert!(config.game.player_address.is_none());
    }

    #[test]
    fn test_entropy_defaults_when_section_omitted() {
        let defaults = EntropyConfig::default();
        assert_eq!(defaults.hash_cache_capacity, 10_000);
        assert_eq!(defaults.max_draw_attempts, 64);
        assert_eq!(defaults.height_ttl(), Some(Duration::from_secs(60)));

        let yaml = r#"
log_level: "info"
log_dir: "./logs"
log_file: "lucky_suits.log"
use_json: false
rotation: "never"
rpc:
  user: "lucky"
  password: "secret"
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.entropy.hash_cache_capacity, 10_000);
        assert_eq!(config.entropy.max_draw_attempts, 64);
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::load("/nonexistent/lucky_suits.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
