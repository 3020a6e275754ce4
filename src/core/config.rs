use crate::core::rate::RateSettings;
use anyhow::{Context, Result, anyhow};
use chrono::FixedOffset;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

/// Environment variable consulted when no sheets access token is configured.
pub const SHEETS_TOKEN_ENV: &str = "EXPENSE_SYNC_SHEETS_TOKEN";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct DatabaseConfig {
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExchangeRateConfig {
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ExchangeRateConfig {
    fn default() -> Self {
        ExchangeRateConfig {
            ttl_minutes: default_ttl_minutes(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BondsProviderConfig {
    pub base_url: String,
    #[serde(default = "default_market")]
    pub market: String,
    #[serde(default = "default_asset_type")]
    pub asset_type: String,
    #[serde(default = "default_local_ticker")]
    pub local_ticker: String,
    #[serde(default = "default_reference_ticker")]
    pub reference_ticker: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SheetsProviderConfig {
    #[serde(default = "default_sheets_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub access_token: Option<String>,
}

impl Default for SheetsProviderConfig {
    fn default() -> Self {
        SheetsProviderConfig {
            base_url: default_sheets_base_url(),
            access_token: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub bonds: BondsProviderConfig,
    #[serde(default)]
    pub sheets: SheetsProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub exchange_rate: ExchangeRateConfig,
    pub providers: ProvidersConfig,
    /// Offset used to render mirrored timestamps, e.g. `-03:00`.
    #[serde(default = "default_timezone_offset")]
    pub timezone_offset: String,
}

fn default_ttl_minutes() -> u64 {
    30
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_market() -> String {
    "BCBA".to_string()
}

fn default_asset_type() -> String {
    "BOND".to_string()
}

fn default_local_ticker() -> String {
    "AL30".to_string()
}

fn default_reference_ticker() -> String {
    "AL30D".to_string()
}

fn default_sheets_base_url() -> String {
    "https://sheets.googleapis.com".to_string()
}

fn default_timezone_offset() -> String {
    "-03:00".to_string()
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("io", "expense-sync", "expense-sync")
            .context("Could not determine project directories")
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.yaml"))
    }

    pub fn default_data_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database.path {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(Self::default_data_path()?.join("expenses.db")),
        }
    }

    pub fn timezone(&self) -> Result<FixedOffset> {
        self.timezone_offset
            .parse::<FixedOffset>()
            .map_err(|e| anyhow!("Invalid timezone_offset '{}': {}", self.timezone_offset, e))
    }

    pub fn rate_settings(&self) -> RateSettings {
        RateSettings {
            local_ticker: self.providers.bonds.local_ticker.clone(),
            reference_ticker: self.providers.bonds.reference_ticker.clone(),
            ttl: Duration::from_secs(self.exchange_rate.ttl_minutes * 60),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.exchange_rate.request_timeout_secs)
    }

    /// Configured token, falling back to the environment.
    pub fn sheets_access_token(&self) -> Option<String> {
        self.providers
            .sheets
            .access_token
            .clone()
            .or_else(|| std::env::var(SHEETS_TOKEN_ENV).ok())
            .filter(|token| !token.is_empty())
    }
}
