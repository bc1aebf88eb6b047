use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::types::{VenueCredentials, VenueId};

const ENV_PREFIX: &str = "EXLINK";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExLinkConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub venues: HashMap<VenueId, VenueConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VenueConfig {
    pub enabled: bool,
    pub credentials: Option<VenueCredentials>,
    /// Overrides the venue's trading/authenticated host.
    pub trade_url: Option<String>,
    /// Overrides the venue's market-data host.
    pub market_url: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub rate_limit: Option<RateLimitConfig>,
    /// TOML file with a `[withdrawal_fees]` table.
    pub withdrawal_fees: Option<PathBuf>,
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            credentials: None,
            trade_url: None,
            market_url: None,
            request_timeout_ms: None,
            rate_limit: None,
            withdrawal_fees: None,
        }
    }
}

/// Token budgets for the two request channels, each refilled every window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub public_requests: u32,
    pub authenticated_requests: u32,
    pub window_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            public_requests: 100,
            authenticated_requests: 100,
            window_ms: 10_000,
        }
    }
}

impl ExLinkConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    pub fn from_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        for path in paths {
            builder = builder.add_source(File::from(path.as_ref()).required(false));
        }

        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(contents, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    pub fn venue(&self, venue: VenueId) -> VenueConfig {
        self.venues.get(&venue).cloned().unwrap_or_default()
    }
}
