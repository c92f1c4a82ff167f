//! Application configuration.
//!
//! Loaded once at startup from a TOML file or from `OKX_*` environment
//! variables, then frozen in a process-wide singleton. Components receive
//! their own sections by value and never mutate them.

use std::env;
use std::sync::OnceLock;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use okx_gateway::OkxConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub okx: OkxConfig,
    pub notify: NotifyConfig,
    pub trading: TradingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Outbound webhook for `Message` events; empty disables posting.
    pub webhook_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    pub symbols: Vec<String>,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self { symbols: vec!["BTC-USDT-SWAP".to_string()] }
    }
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {path}"))?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self> {
        let okx = OkxConfig {
            api_key: env::var("OKX_API_KEY").context("OKX_API_KEY environment variable not set")?,
            secret_key: env::var("OKX_SECRET_KEY")
                .context("OKX_SECRET_KEY environment variable not set")?,
            passphrase: env::var("OKX_PASSPHRASE")
                .context("OKX_PASSPHRASE environment variable not set")?,
            sim: env::var("OKX_SIM").unwrap_or_default().parse().unwrap_or(true),
        };
        let notify = NotifyConfig {
            webhook_url: env::var("NOTIFY_WEBHOOK_URL").unwrap_or_default(),
        };
        Ok(Self { okx, notify, trading: TradingConfig::default() })
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.okx.api_key.is_empty(), "okx api_key is required");
        ensure!(!self.okx.secret_key.is_empty(), "okx secret_key is required");
        ensure!(!self.okx.passphrase.is_empty(), "okx passphrase is required");
        ensure!(!self.trading.symbols.is_empty(), "at least one trading symbol is required");
        Ok(())
    }
}

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Freeze the configuration for the lifetime of the process. The first
/// call wins; later calls return the already-frozen value.
pub fn init(config: AppConfig) -> &'static AppConfig {
    CONFIG.get_or_init(|| config)
}

/// The frozen configuration, if [`init`] has run.
pub fn get() -> Option<&'static AppConfig> {
    CONFIG.get()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_toml_config() {
        let config: AppConfig = toml::from_str(
            r#"
            [okx]
            api_key = "key"
            secret_key = "secret"
            passphrase = "phrase"
            sim = true

            [notify]
            webhook_url = "https://example.com/hook"

            [trading]
            symbols = ["ETH-USDT-SWAP"]
            "#,
        )
        .unwrap();
        assert_eq!(config.okx.api_key, "key");
        assert!(config.okx.sim);
        assert_eq!(config.notify.webhook_url, "https://example.com/hook");
        assert_eq!(config.trading.symbols, vec!["ETH-USDT-SWAP"]);
        config.validate().unwrap();
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [okx]
            api_key = "key"
            secret_key = "secret"
            passphrase = "phrase"
            "#,
        )
        .unwrap();
        assert!(config.notify.webhook_url.is_empty());
        assert_eq!(config.trading.symbols, vec!["BTC-USDT-SWAP"]);
    }

    #[test]
    fn validation_requires_credentials() {
        let config = AppConfig::default();
        assert!(config.validate().is_err());
    }
}
