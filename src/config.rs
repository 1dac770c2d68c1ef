//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Target network; selects the address version and the default API host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

impl Network {
    pub fn address_prefix(&self) -> &'static str {
        match self {
            Network::Mainnet => "SP",
            Network::Testnet => "ST",
        }
    }

    pub fn default_api_base(&self) -> &'static str {
        match self {
            Network::Mainnet => "https://api.mainnet.hiro.so",
            Network::Testnet => "https://api.testnet.hiro.so",
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Destination address for every sweep transfer
    #[serde(default)]
    pub recipient: String,

    /// Memo attached to every transfer
    #[serde(default = "default_memo")]
    pub memo: String,

    /// Bearer token added to all outbound API requests
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub network: Network,

    /// Overrides the network's default API host
    #[serde(default)]
    pub api_base: Option<String>,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub pacing: PacingConfig,

    /// Wallet list location
    #[serde(default = "default_wallets_path")]
    pub wallets_path: String,

    /// Directory the run report is written to
    #[serde(default = "default_report_dir")]
    pub report_dir: String,

    /// Floor for the per-byte rate used by the fallback fee estimator
    #[serde(default = "default_fallback_fee_rate")]
    pub fallback_fee_rate: u64,
}

/// Reactive retry policy for rate-limited API responses
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_secs: default_backoff_secs(),
        }
    }
}

impl RetryConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }
}

/// Proactive delay between accounts, independent of the reactive retry
#[derive(Debug, Clone, Deserialize)]
pub struct PacingConfig {
    #[serde(default = "default_inter_account_delay_secs")]
    pub inter_account_delay_secs: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            inter_account_delay_secs: default_inter_account_delay_secs(),
        }
    }
}

impl PacingConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.inter_account_delay_secs)
    }
}

// Default value functions
fn default_memo() -> String {
    "102687864".to_string()
}

fn default_wallets_path() -> String {
    "wallets.json".to_string()
}

fn default_report_dir() -> String {
    ".".to_string()
}

fn default_fallback_fee_rate() -> u64 {
    1
}

fn default_max_attempts() -> u32 {
    5
}

fn default_backoff_secs() -> u64 {
    30
}

fn default_inter_account_delay_secs() -> u64 {
    5
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::from(path.as_ref()).required(false))
            // Override with environment variables (prefix SWEEPER_)
            .add_source(
                config::Environment::with_prefix("SWEEPER")
                    .separator("__")
                    .try_parsing(true),
            )
            // Legacy environment names take precedence; wallet files in
            // the wild are configured through these
            .set_override_option("recipient", std::env::var("RECIPIENT_ADDRESS").ok())?
            .set_override_option("memo", std::env::var("TRANSFER_MEMO").ok())?
            .set_override_option("api_key", std::env::var("HIRO_API_KEY").ok())?
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Resolved API base URL
    pub fn api_base(&self) -> &str {
        self.api_base
            .as_deref()
            .unwrap_or_else(|| self.network.default_api_base())
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        // The transfer memo field holds at most 34 bytes on the wire
        if self.memo.len() > 34 {
            anyhow::bail!("memo must be at most 34 bytes, got {}", self.memo.len());
        }

        if self.retry.max_attempts == 0 {
            anyhow::bail!("retry.max_attempts must be at least 1");
        }

        if let Some(base) = &self.api_base {
            if !base.starts_with("http") {
                anyhow::bail!("api_base must be an http(s) URL: {}", base);
            }
        }

        if !self.recipient.is_empty()
            && !self.recipient.starts_with(self.network.address_prefix())
        {
            anyhow::bail!(
                "recipient {} does not match the {:?} address prefix {}",
                self.recipient,
                self.network,
                self.network.address_prefix()
            );
        }

        Ok(())
    }

    /// Get masked configuration for display (hide secrets)
    pub fn masked_display(&self) -> String {
        format!(
            r#"Configuration:
  network: {:?}
  api_base: {}
  api_key: {}
  recipient: {}
  memo: {}
  retry: {} attempts, {}s backoff
  pacing: {}s between accounts
  wallets: {}
  report_dir: {}
"#,
            self.network,
            self.api_base(),
            if self.api_key.is_some() { "***" } else { "(not set)" },
            if self.recipient.is_empty() { "(not set)" } else { self.recipient.as_str() },
            self.memo,
            self.retry.max_attempts,
            self.retry.backoff_secs,
            self.pacing.inter_account_delay_secs,
            self.wallets_path,
            self.report_dir,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            recipient: String::new(),
            memo: default_memo(),
            api_key: None,
            network: Network::default(),
            api_base: None,
            retry: RetryConfig::default(),
            pacing: PacingConfig::default(),
            wallets_path: default_wallets_path(),
            report_dir: default_report_dir(),
            fallback_fee_rate: default_fallback_fee_rate(),
        }
    }
}
