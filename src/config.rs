//! Configuration Loader
//!
//! Loads `channel-ticker.toml`, applies environment overrides and validates
//! the result. Every key has a default from [`crate::constants`]; channel ids
//! have none and must come from the file or the environment. The bot token is
//! only ever read from the environment.

use crate::{
    aggregator::{Formula, Rounding},
    constants::*,
    error::StartupError,
    fetcher::FetchSettings,
    format::{FormatRule, LabelTemplate, PLACEHOLDER},
    metric::MetricSpec,
    types::{TargetChannel, TargetRole},
};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Main configuration structure matching channel-ticker.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub discord: DiscordSection,
    pub channels: ChannelsSection,
    pub labels: LabelsSection,
    pub token: TokenSection,
    pub endpoints: EndpointsSection,
    pub refresh: RefreshSection,
    pub fetch: FetchSection,
    pub logging: LoggingSection,
}

/// Discord API section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscordSection {
    /// REST API base URL
    pub api_url: String,
}

impl Default for DiscordSection {
    fn default() -> Self {
        Self {
            api_url: DISCORD_API_URL.to_string(),
        }
    }
}

/// Target channel ids
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChannelsSection {
    pub floor: String,
    pub market_cap: String,
    pub spot: String,
    /// 24h volume channel; skipped when absent
    pub volume: Option<String>,
}

/// Label templates, each with one `{}` placeholder
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LabelsSection {
    pub floor: String,
    pub market_cap: String,
    pub spot: String,
    pub volume: String,
}

impl Default for LabelsSection {
    fn default() -> Self {
        Self {
            floor: FLOOR_LABEL.to_string(),
            market_cap: MARKET_CAP_LABEL.to_string(),
            spot: SPOT_LABEL.to_string(),
            volume: VOLUME_LABEL.to_string(),
        }
    }
}

/// Tracked token section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TokenSection {
    /// Trading pair symbol on the exchange
    pub symbol: String,
    /// Fixed total supply used for the market cap
    pub supply: f64,
    /// Number of recent trades requested
    pub trade_limit: u32,
    /// Rounding of `price × supply`
    pub market_cap_rounding: Rounding,
}

impl Default for TokenSection {
    fn default() -> Self {
        Self {
            symbol: TOKEN_SYMBOL.to_string(),
            supply: TOKEN_SUPPLY,
            trade_limit: TRADE_LIMIT,
            market_cap_rounding: Rounding::Nearest,
        }
    }
}

/// Upstream endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EndpointsSection {
    pub floor_price: String,
    /// JSON pointer to the floor price in the response body
    pub floor_field: String,
    pub trades: String,
    pub tickers: String,
    /// Append a `t=<unix seconds>` parameter to the floor price request
    pub floor_cache_bust: bool,
}

impl Default for EndpointsSection {
    fn default() -> Self {
        Self {
            floor_price: FLOOR_PRICE_URL.to_string(),
            floor_field: FLOOR_PRICE_FIELD.to_string(),
            trades: TRADES_URL.to_string(),
            tickers: TICKERS_URL.to_string(),
            floor_cache_bust: false,
        }
    }
}

/// Timer section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefreshSection {
    /// Seconds between passes
    pub interval_secs: u64,
    /// Pause between two renames in a pass
    pub publish_pause_ms: u64,
}

impl Default for RefreshSection {
    fn default() -> Self {
        Self {
            interval_secs: REFRESH_INTERVAL_SECS,
            publish_pause_ms: PUBLISH_PAUSE_MS,
        }
    }
}

/// Fetch retry section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchSection {
    pub retries: u32,
    pub retry_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            retries: MAX_RETRY_ATTEMPTS,
            retry_delay_ms: RETRY_DELAY_MS,
            timeout_secs: REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Logging section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration
///
/// Reads the TOML file when a path is given, otherwise starts from defaults.
/// Environment overrides are applied before validation.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config = load_unvalidated(path)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration and apply environment overrides without validating
pub fn load_unvalidated(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => parse_config(&std::fs::read_to_string(path)?)?,
        None => Config::default(),
    };
    config.apply_overrides(|key| std::env::var(key).ok());
    Ok(config)
}

/// Parse configuration text without validating it
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Read the bot token from the environment
pub fn discord_token() -> Result<String, StartupError> {
    std::env::var(DISCORD_TOKEN_ENV)
        .ok()
        .filter(|t| !t.trim().is_empty())
        .ok_or(StartupError::MissingCredential(DISCORD_TOKEN_ENV))
}

impl Config {
    /// Apply channel id overrides
    ///
    /// Checks FLOOR_CHANNEL_ID, MARKET_CAP_CHANNEL_ID, SPOT_CHANNEL_ID and
    /// VOLUME_CHANNEL_ID; unset or empty variables leave the file value.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(id) = get("FLOOR_CHANNEL_ID") {
            self.channels.floor = id;
        }
        if let Some(id) = get("MARKET_CAP_CHANNEL_ID") {
            self.channels.market_cap = id;
        }
        if let Some(id) = get("SPOT_CHANNEL_ID") {
            self.channels.spot = id;
        }
        if let Some(id) = get("VOLUME_CHANNEL_ID") {
            self.channels.volume = Some(id);
        }
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_channels()?;
        self.validate_settings()
    }

    /// Validate target channel ids
    pub fn validate_channels(&self) -> Result<(), ConfigError> {
        let mut ids = HashSet::new();
        for (role, id) in self.channel_ids() {
            if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
                return Err(ConfigError::ValidationError(format!(
                    "channels.{} must be a numeric channel id, got {:?}",
                    role.name(),
                    id
                )));
            }
            if !ids.insert(id) {
                return Err(ConfigError::ValidationError(format!(
                    "channels.{} reuses channel id {}",
                    role.name(),
                    id
                )));
            }
        }
        Ok(())
    }

    /// Validate everything except the channel ids
    pub fn validate_settings(&self) -> Result<(), ConfigError> {
        for (name, template) in [
            ("floor", &self.labels.floor),
            ("market_cap", &self.labels.market_cap),
            ("spot", &self.labels.spot),
            ("volume", &self.labels.volume),
        ] {
            if !template.contains(PLACEHOLDER) {
                return Err(ConfigError::ValidationError(format!(
                    "labels.{} must contain a {} placeholder",
                    name, PLACEHOLDER
                )));
            }
        }

        if !(self.token.supply.is_finite() && self.token.supply > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "token.supply must be > 0, got {}",
                self.token.supply
            )));
        }

        if self.token.symbol.is_empty() {
            return Err(ConfigError::ValidationError(
                "token.symbol cannot be empty".to_string(),
            ));
        }

        if self.fetch.retries == 0 {
            return Err(ConfigError::ValidationError(
                "fetch.retries must be >= 1".to_string(),
            ));
        }

        if self.fetch.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "fetch.timeout_secs must be >= 1".to_string(),
            ));
        }

        if self.refresh.interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "refresh.interval_secs must be >= 1".to_string(),
            ));
        }

        for (name, url) in [
            ("floor_price", &self.endpoints.floor_price),
            ("trades", &self.endpoints.trades),
            ("tickers", &self.endpoints.tickers),
        ] {
            if url.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "endpoints.{} cannot be empty",
                    name
                )));
            }
        }

        if !self.endpoints.floor_field.starts_with('/') {
            return Err(ConfigError::ValidationError(format!(
                "endpoints.floor_field must be a JSON pointer starting with '/', got {:?}",
                self.endpoints.floor_field
            )));
        }

        if self.discord.api_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "discord.api_url cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    fn channel_ids(&self) -> Vec<(TargetRole, &str)> {
        let mut ids = vec![
            (TargetRole::Floor, self.channels.floor.as_str()),
            (TargetRole::MarketCap, self.channels.market_cap.as_str()),
            (TargetRole::Spot, self.channels.spot.as_str()),
        ];
        if let Some(volume) = &self.channels.volume {
            ids.push((TargetRole::Volume, volume.as_str()));
        }
        ids
    }

    /// Fetcher settings
    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            retries: self.fetch.retries,
            retry_delay: Duration::from_millis(self.fetch.retry_delay_ms),
            timeout: Duration::from_secs(self.fetch.timeout_secs),
        }
    }
}

/// Everything a refresh pass needs, built once at startup
#[derive(Debug, Clone)]
pub struct RefreshPlan {
    pub floor: MetricSpec,
    pub spot: MetricSpec,
    pub volume: MetricSpec,
    pub market_cap_formula: Formula,
    pub market_cap_rounding: Rounding,
    pub targets: Targets,
    pub interval: Duration,
    pub publish_pause: Duration,
}

/// Target channels of a pass
#[derive(Debug, Clone)]
pub struct Targets {
    pub floor: TargetChannel,
    pub market_cap: TargetChannel,
    pub spot: TargetChannel,
    pub volume: Option<TargetChannel>,
}

impl From<&Config> for RefreshPlan {
    fn from(config: &Config) -> Self {
        let endpoints = &config.endpoints;
        let mut floor = MetricSpec::floor_price(&endpoints.floor_price, &endpoints.floor_field);
        if endpoints.floor_cache_bust {
            floor = floor.with_cache_bust();
        }

        let labels = &config.labels;
        let targets = Targets {
            floor: TargetChannel::new(
                TargetRole::Floor,
                &config.channels.floor,
                LabelTemplate::new(&labels.floor, FormatRule::WholeUnits),
            ),
            market_cap: TargetChannel::new(
                TargetRole::MarketCap,
                &config.channels.market_cap,
                LabelTemplate::new(&labels.market_cap, FormatRule::Currency { decimals: 0 }),
            ),
            spot: TargetChannel::new(
                TargetRole::Spot,
                &config.channels.spot,
                LabelTemplate::new(&labels.spot, FormatRule::Fixed { decimals: 7 }),
            ),
            volume: config.channels.volume.as_ref().map(|id| {
                TargetChannel::new(
                    TargetRole::Volume,
                    id,
                    LabelTemplate::new(&labels.volume, FormatRule::Currency { decimals: 2 }),
                )
            }),
        };

        RefreshPlan {
            floor,
            spot: MetricSpec::spot_price(
                &config.endpoints.trades,
                &config.token.symbol,
                config.token.trade_limit,
            ),
            volume: MetricSpec::volume_24h(&config.endpoints.tickers, &config.token.symbol),
            market_cap_formula: Formula::times(config.token.supply),
            market_cap_rounding: config.token.market_cap_rounding,
            targets,
            interval: Duration::from_secs(config.refresh.interval_secs),
            publish_pause: Duration::from_millis(config.refresh.publish_pause_ms),
        }
    }
}
