//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all application settings.
//! Configuration is loaded from a TOML file; the provider API key is read from
//! the `OPTICODDS_API_KEY` environment variable and never from the file.
//!
//! # Example
//!
//! ```no_run
//! use sharpline::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;

use super::logging::LoggingConfig;
use super::market::{
    BookConfig, CatalogConfig, DetectionConfig, FilterConfig, PipelineConfig, SportsbooksConfig,
};
use super::stream::{ReconnectionConfig, SessionConfig, MAX_LEAGUES_PER_GROUP};
use crate::adapter::outbound::opticodds::settings::{OpticOddsConfig, API_KEY_ENV};
use crate::error::{ConfigError, Result};

/// Main application configuration.
///
/// Every section is optional; an empty file yields the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Logging and tracing configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Odds provider endpoints.
    #[serde(default)]
    pub feed: OpticOddsConfig,

    /// Catalog refresh behaviour.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Sports, leagues and markets to stream.
    #[serde(default)]
    pub filters: FilterConfig,

    /// Sportsbook inclusion policy.
    #[serde(default)]
    pub sportsbooks: SportsbooksConfig,

    /// League grouping and channel sizing.
    #[serde(default)]
    pub sessions: SessionConfig,

    /// Feed reconnection settings.
    ///
    /// Controls backoff delays and circuit breaker behavior.
    #[serde(default)]
    pub reconnection: ReconnectionConfig,

    /// Market book retention.
    #[serde(default)]
    pub book: BookConfig,

    /// Fair pricing and opportunity thresholds.
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Worker sharding.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// Loads the API key from the `OPTICODDS_API_KEY` environment variable.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML content is malformed or validation fails.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;

        config.feed.api_key = std::env::var(API_KEY_ENV)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML content is malformed
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Validate configuration values.
    ///
    /// Checks that all values are within acceptable ranges. The API key is
    /// checked separately by [`Config::api_key`] so offline commands work
    /// without one.
    fn validate(&self) -> Result<()> {
        if !self.logging.is_known_format() {
            return Err(invalid("format", "must be one of json, compact, pretty").into());
        }

        if self.feed.api_url.is_empty() {
            return Err(ConfigError::MissingField { field: "api_url" }.into());
        }
        if self.feed.stream_url.is_empty() {
            return Err(ConfigError::MissingField {
                field: "stream_url",
            }
            .into());
        }
        url::Url::parse(&self.feed.api_url).map_err(|e| invalid("api_url", &e.to_string()))?;
        url::Url::parse(&self.feed.stream_url)
            .map_err(|e| invalid("stream_url", &e.to_string()))?;
        if self.feed.timeout_ms == 0 {
            return Err(invalid("timeout_ms", "must be greater than 0").into());
        }

        if self.sessions.max_leagues_per_group == 0
            || self.sessions.max_leagues_per_group > MAX_LEAGUES_PER_GROUP
        {
            return Err(ConfigError::InvalidValue {
                field: "max_leagues_per_group",
                reason: format!("must be between 1 and {MAX_LEAGUES_PER_GROUP}"),
            }
            .into());
        }
        if self.sessions.channel_capacity == 0 {
            return Err(invalid("channel_capacity", "must be greater than 0").into());
        }
        if self.sessions.idle_timeout_secs == 0 {
            return Err(invalid("idle_timeout_secs", "must be greater than 0").into());
        }

        if self.reconnection.initial_delay_ms == 0 {
            return Err(invalid("initial_delay_ms", "must be greater than 0").into());
        }
        if self.reconnection.max_delay_ms < self.reconnection.initial_delay_ms {
            return Err(invalid("max_delay_ms", "must be >= initial_delay_ms").into());
        }
        if self.reconnection.backoff_multiplier < 1.0 {
            return Err(invalid("backoff_multiplier", "must be >= 1.0").into());
        }
        if self.reconnection.max_consecutive_failures == 0 {
            return Err(invalid("max_consecutive_failures", "must be greater than 0").into());
        }
        if self.reconnection.circuit_breaker_cooldown_ms == 0 {
            return Err(invalid("circuit_breaker_cooldown_ms", "must be greater than 0").into());
        }

        if self.book.staleness_secs == 0 {
            return Err(invalid("staleness_secs", "must be greater than 0").into());
        }
        if self.book.sweep_interval_secs == 0 {
            return Err(invalid("sweep_interval_secs", "must be greater than 0").into());
        }

        let detection = &self.detection;
        if !(detection.ev_threshold >= 0.0) {
            return Err(invalid("ev_threshold", "must be 0 or greater").into());
        }
        if detection.arb_safety_margin < Decimal::ZERO || detection.arb_safety_margin >= Decimal::ONE
        {
            return Err(invalid("arb_safety_margin", "must be in [0, 1)").into());
        }
        if !(detection.edge_tolerance >= 0.0) {
            return Err(invalid("edge_tolerance", "must be 0 or greater").into());
        }
        if detection.methods.is_empty() {
            return Err(ConfigError::MissingField { field: "methods" }.into());
        }
        if !detection.methods.contains(&detection.benchmark) {
            return Err(invalid("benchmark", "must be one of the configured methods").into());
        }
        if !(detection.min_reference_total > 0.0
            && detection.min_reference_total <= 1.0
            && detection.max_reference_total >= 1.0)
        {
            return Err(invalid(
                "reference_total",
                "min must be in (0, 1] and max must be >= 1",
            )
            .into());
        }

        if self.pipeline.workers == 0 {
            return Err(invalid("workers", "must be greater than 0").into());
        }
        if self.pipeline.dispatchers == 0 {
            return Err(invalid("dispatchers", "must be greater than 0").into());
        }
        if self.pipeline.worker_queue == 0 {
            return Err(invalid("worker_queue", "must be greater than 0").into());
        }
        if self.pipeline.stats_interval_secs == 0 {
            return Err(invalid("stats_interval_secs", "must be greater than 0").into());
        }
        Ok(())
    }

    /// The provider API key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when `OPTICODDS_API_KEY` is unset.
    pub fn api_key(&self) -> Result<&str> {
        self.feed.api_key.as_deref().ok_or_else(|| {
            ConfigError::MissingField {
                field: API_KEY_ENV,
            }
            .into()
        })
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fair::DevigMethod;
    use crate::error::Error;

    #[test]
    fn empty_file_yields_defaults() {
        let config = Config::parse_toml("").unwrap();
        assert_eq!(config.sessions.max_leagues_per_group, 10);
        assert_eq!(config.book.staleness_secs, 30);
        assert!(config.filters.main_lines_only);
        assert_eq!(config.detection.benchmark, DevigMethod::Multiplicative);
    }

    #[test]
    fn benchmark_must_be_configured() {
        let result = Config::parse_toml(
            r#"
[detection]
methods = ["power"]
benchmark = "multiplicative"
"#,
        );
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidValue {
                field: "benchmark",
                ..
            }))
        ));
    }

    #[test]
    fn group_size_is_capped() {
        let result = Config::parse_toml("[sessions]\nmax_leagues_per_group = 11\n");
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidValue {
                field: "max_leagues_per_group",
                ..
            }))
        ));
    }

    #[test]
    fn api_key_is_not_part_of_the_file() {
        let config = Config::parse_toml("[feed]\napi_key = \"from-file\"\n");
        // serde(skip) ignores the field entirely
        if let Ok(config) = config {
            assert_ne!(config.feed.api_key.as_deref(), Some("from-file"));
        }
    }
}
