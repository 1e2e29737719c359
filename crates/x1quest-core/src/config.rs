//! Application configuration management.
//!
//! This module handles loading and saving the client configuration: remote
//! service roots, the sign-in challenge template, token file location and
//! request pacing.
//!
//! Configuration is stored at `~/.config/x1quest/config.json`; every field
//! has a default and the service roots can be overridden from the
//! environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "x1quest";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Token file name in the cache directory
const TOKENS_FILE: &str = "tokens.json";

/// Placeholder replaced by the wallet address in `auth_message`
pub const ADDRESS_PLACEHOLDER: &str = "{address}";

const DEFAULT_API_BASE_URL: &str = "https://testnet-api.x1.one";
const DEFAULT_FAUCET_BASE_URL: &str = "https://nft-api.x1.one";
const DEFAULT_RPC_URL: &str = "https://maculatus-rpc.x1eco.com/";
const DEFAULT_AUTH_MESSAGE: &str = "X1 AuthMessage, Address {address}";

/// HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Pause between consecutive quest completions in a batch.
const DEFAULT_QUEST_PACING_MS: u64 = 1000;

/// Total attempts for a request before giving up.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// First backoff delay; doubles after every failed attempt.
const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 2000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub faucet_base_url: String,
    pub rpc_url: String,
    /// Sign-in challenge. Must match the remote service byte-for-byte once
    /// `{address}` is substituted.
    pub auth_message: String,
    /// Explicit token file; defaults to the cache directory.
    pub tokens_file: Option<PathBuf>,
    pub request_timeout_secs: u64,
    pub quest_pacing_ms: u64,
    pub max_attempts: u32,
    pub retry_base_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            faucet_base_url: DEFAULT_FAUCET_BASE_URL.to_string(),
            rpc_url: DEFAULT_RPC_URL.to_string(),
            auth_message: DEFAULT_AUTH_MESSAGE.to_string(),
            tokens_file: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            quest_pacing_ms: DEFAULT_QUEST_PACING_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
        }
    }
}

impl Config {
    /// Load the config file (or defaults) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read `path`, falling back to defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&contents).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Write to the default config location and return it.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        debug!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Override fields from `X1_*` variables looked up through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("X1_API_BASE_URL") {
            debug!(url = %v, "Overriding API base URL from environment");
            self.api_base_url = v;
        }
        if let Some(v) = non_empty("X1_FAUCET_BASE_URL") {
            self.faucet_base_url = v;
        }
        if let Some(v) = non_empty("X1_RPC_URL") {
            self.rpc_url = v;
        }
        if let Some(v) = non_empty("X1_AUTH_MESSAGE") {
            self.auth_message = v;
        }
        if let Some(v) = non_empty("X1_TOKENS_FILE") {
            self.tokens_file = Some(PathBuf::from(v));
        }
    }

    /// Render the sign-in challenge for `address`.
    pub fn challenge_for(&self, address: &str) -> String {
        self.auth_message.replace(ADDRESS_PLACEHOLDER, address)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn quest_pacing(&self) -> Duration {
        Duration::from_millis(self.quest_pacing_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Location of the persisted session credential.
    pub fn tokens_path(&self) -> Result<PathBuf> {
        match self.tokens_file {
            Some(ref path) => Ok(path.clone()),
            None => Ok(self.cache_dir()?.join(TOKENS_FILE)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api_base_url, "https://testnet-api.x1.one");
        assert_eq!(config.faucet_base_url, "https://nft-api.x1.one");
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_base_delay(), Duration::from_millis(2000));
        assert_eq!(config.quest_pacing(), Duration::from_millis(1000));
    }

    #[test]
    fn test_challenge_substitutes_address() {
        let config = Config::default();
        assert_eq!(
            config.challenge_for("0xAbC"),
            "X1 AuthMessage, Address 0xAbC"
        );

        let fixed = Config {
            auth_message: "X1 Testnet Auth".to_string(),
            ..Config::default()
        };
        assert_eq!(fixed.challenge_for("0xAbC"), "X1 Testnet Auth");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("X1_API_BASE_URL", "http://localhost:8080"),
            ("X1_TOKENS_FILE", "/tmp/x1-tokens.json"),
            ("X1_RPC_URL", "   "),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.api_base_url, "http://localhost:8080");
        assert_eq!(config.rpc_url, DEFAULT_RPC_URL);
        assert_eq!(
            config.tokens_path().ok(),
            Some(PathBuf::from("/tmp/x1-tokens.json"))
        );
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"quest_pacing_ms": 250}"#).expect("partial config parses");
        assert_eq!(config.quest_pacing_ms, 250);
        assert_eq!(config.auth_message, DEFAULT_AUTH_MESSAGE);
    }

    #[test]
    fn test_save_then_load_from() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("x1quest").join("config.json");
        assert_eq!(Config::load_from(&path).expect("defaults").max_attempts, 3);

        let config = Config {
            quest_pacing_ms: 1500,
            auth_message: "X1 Testnet Auth".to_string(),
            ..Config::default()
        };
        config.save_to(&path).expect("save");

        let loaded = Config::load_from(&path).expect("load");
        assert_eq!(loaded.quest_pacing(), Duration::from_millis(1500));
        assert_eq!(loaded.auth_message, "X1 Testnet Auth");
        assert_eq!(loaded.api_base_url, DEFAULT_API_BASE_URL);

        std::fs::write(&path, "{ nope").expect("write");
        assert!(Config::load_from(&path).is_err());
    }
}
