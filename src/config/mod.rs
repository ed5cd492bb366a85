//! Configuration for Moviedex
//!
//! Settings come from three layers, later ones winning: built-in defaults,
//! an optional TOML file, and `MOVIEDEX_*` environment variables.

mod logging;
mod scheduler;
mod scraping;
mod store;

pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use scheduler::{DailyTime, SchedulerConfig};
pub use scraping::{ChartConfig, ScrapingConfig, DEFAULT_CALENDAR_URL};
pub use store::StoreConfig;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default user agent for all HTTP requests.
///
/// The upstream site serves reduced or anti-bot pages to non-browser agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Prefix shared by every environment override
pub const ENV_PREFIX: &str = "MOVIEDEX_";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Scraping configuration
    #[serde(default)]
    pub scraping: ScrapingConfig,
    /// Scheduler configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Store configuration
    #[serde(default)]
    pub store: StoreConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file, apply environment overrides, and validate.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when it exists, otherwise start from defaults.
    ///
    /// Environment overrides and validation apply in both cases.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }
        let mut config = Config::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `MOVIEDEX_*` overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides using an arbitrary variable lookup
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, name)).filter(|v| !v.trim().is_empty())
        };

        if let Some(v) = var("REQUEST_DELAY_MS") {
            self.scraping.request_delay_ms = parse_env("REQUEST_DELAY_MS", &v)?;
        }
        if let Some(v) = var("MAX_ATTEMPTS") {
            self.scraping.max_attempts = parse_env("MAX_ATTEMPTS", &v)?;
        }
        if let Some(v) = var("BACKOFF_SECS") {
            self.scraping.backoff_secs = parse_env("BACKOFF_SECS", &v)?;
        }
        if let Some(v) = var("TIMEOUT_SECS") {
            self.scraping.request_timeout_secs = parse_env("TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = var("USER_AGENT") {
            self.scraping.user_agent = v;
        }
        if let Some(v) = var("CALENDAR_URL") {
            self.scraping.calendar_url = v;
        }
        for chart in &mut self.scraping.charts {
            if let Some(url) = lookup(&chart.url_env_key()).filter(|v| !v.trim().is_empty()) {
                chart.url = url;
            }
        }

        if let Some(v) = var("INTERVAL_MINUTES") {
            let minutes: u64 = parse_env("INTERVAL_MINUTES", &v)?;
            self.scheduler.interval_minutes = (minutes > 0).then_some(minutes);
        }
        if let Some(v) = var("DAILY_AT") {
            self.scheduler.daily_at = match v.trim() {
                "off" | "none" => None,
                other => Some(other.to_string()),
            };
        }

        if let Some(v) = var("DATA_DIR") {
            self.store.data_dir = PathBuf::from(v);
        }

        if let Some(v) = var("LOG_LEVEL") {
            self.logging.level = parse_env("LOG_LEVEL", &v)?;
        }
        if let Some(v) = var("LOG_FORMAT") {
            self.logging.format = match v.trim().to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" => LogFormat::Text,
                other => anyhow::bail!("{}LOG_FORMAT: unknown format '{}'", ENV_PREFIX, other),
            };
        }

        Ok(())
    }

    /// Validate all configuration fields.
    ///
    /// Collects all validation errors and reports them together.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        // Scraping validation
        if self.scraping.max_attempts == 0 {
            errors.push("max_attempts must be at least 1".to_string());
        }
        if self.scraping.request_timeout_secs == 0 {
            errors.push("request_timeout_secs must be positive".to_string());
        }
        if self.scraping.user_agent.trim().is_empty() {
            errors.push("user_agent must not be empty".to_string());
        }
        if url::Url::parse(&self.scraping.calendar_url).is_err() {
            errors.push(format!(
                "calendar_url is not a valid URL: '{}'",
                self.scraping.calendar_url
            ));
        }

        let mut seen = HashSet::new();
        for chart in &self.scraping.charts {
            if url::Url::parse(&chart.url).is_err() {
                errors.push(format!(
                    "chart '{}' has an invalid URL: '{}'",
                    chart.source, chart.url
                ));
            }
            if chart.limit == 0 {
                errors.push(format!("chart '{}' limit must be positive", chart.source));
            }
            if scraper::Selector::parse(&chart.item_selector).is_err() {
                errors.push(format!(
                    "chart '{}' item_selector is not valid CSS: '{}'",
                    chart.source, chart.item_selector
                ));
            }
            if scraper::Selector::parse(&chart.link_selector).is_err() {
                errors.push(format!(
                    "chart '{}' link_selector is not valid CSS: '{}'",
                    chart.source, chart.link_selector
                ));
            }
            if !seen.insert(chart.source.as_str().to_string()) {
                errors.push(format!("chart '{}' is defined more than once", chart.source));
            }
        }

        // Scheduler validation
        if let Err(e) = self.scheduler.daily_time() {
            errors.push(e);
        }
        if self.scheduler.interval_minutes == Some(0) {
            errors.push("interval_minutes must be positive".to_string());
        }

        // Store validation
        if self.store.data_dir.as_os_str().is_empty() {
            errors.push("data_dir must not be empty".to_string());
        }
        if self.store.collection_file.trim().is_empty() {
            errors.push("collection_file must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

fn parse_env<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| anyhow::anyhow!("{}{}: invalid value '{}': {}", ENV_PREFIX, name, value, e))
}
