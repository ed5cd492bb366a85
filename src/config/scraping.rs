//! Scraping configuration: fetch behavior, pacing, and chart definitions

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::DEFAULT_USER_AGENT;
use crate::types::ChartSource;

/// Default IMDb release calendar (US region)
pub const DEFAULT_CALENDAR_URL: &str = "https://www.imdb.com/calendar/?region=us";

/// Web scraping configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// Delay between consecutive requests within one run (milliseconds)
    pub request_delay_ms: u64,
    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,
    /// Connection timeout (seconds)
    pub connect_timeout_secs: u64,
    /// Total attempts per URL, including the first one
    pub max_attempts: u32,
    /// Base backoff between attempts; doubles after every failure (seconds)
    pub backoff_secs: u64,
    /// Minimum backoff after an anti-bot page, scaled by attempt (seconds)
    pub captcha_backoff_secs: u64,
    /// User agent string
    pub user_agent: String,
    /// Accept-Language header value
    pub accept_language: String,
    /// Referer header value
    pub referer: String,
    /// Release calendar page for upcoming movies
    pub calendar_url: String,
    /// Charts scraped by a full catalog run, in order
    pub charts: Vec<ChartConfig>,
}

impl ScrapingConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }

    pub fn captcha_backoff(&self) -> Duration {
        Duration::from_secs(self.captcha_backoff_secs)
    }
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: 1200,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            max_attempts: 3,
            backoff_secs: 2,
            captcha_backoff_secs: 5,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            referer: "https://www.imdb.com/".to_string(),
            calendar_url: DEFAULT_CALENDAR_URL.to_string(),
            charts: ChartConfig::defaults(),
        }
    }
}

/// One chart page used to discover detail-page URLs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Tag stored on every record discovered through this chart
    pub source: ChartSource,
    /// Chart page URL
    pub url: String,
    /// CSS selector for list items
    #[serde(default = "default_item_selector")]
    pub item_selector: String,
    /// CSS selector for the title link inside an item
    #[serde(default = "default_link_selector")]
    pub link_selector: String,
    /// Maximum detail pages taken from this chart
    #[serde(default = "default_chart_limit")]
    pub limit: usize,
}

fn default_item_selector() -> String {
    "ul.ipc-metadata-list li".to_string()
}

fn default_link_selector() -> String {
    "a.ipc-title-link-wrapper".to_string()
}

fn default_chart_limit() -> usize {
    25
}

impl ChartConfig {
    /// Create a chart definition with the default IMDb list selectors
    pub fn new(source: ChartSource, url: impl Into<String>, limit: usize) -> Self {
        Self {
            source,
            url: url.into(),
            item_selector: default_item_selector(),
            link_selector: default_link_selector(),
            limit,
        }
    }

    /// The built-in chart set
    pub fn defaults() -> Vec<Self> {
        let genre = |source: ChartSource, genre: &str| {
            Self::new(
                source,
                format!(
                    "https://www.imdb.com/search/title/?title_type=feature&genres={}",
                    genre
                ),
                25,
            )
        };

        vec![
            Self::new(ChartSource::Top250, "https://www.imdb.com/chart/top/", 50),
            Self::new(ChartSource::Popular, "https://www.imdb.com/chart/moviemeter/", 25),
            Self::new(ChartSource::Trending, "https://www.imdb.com/chart/boxoffice/", 10),
            genre(ChartSource::Action, "action"),
            genre(ChartSource::Comedy, "comedy"),
            genre(ChartSource::Horror, "horror"),
        ]
    }

    /// Environment variable overriding this chart's URL, e.g. `MOVIEDEX_CHART_TOP_250_URL`
    pub fn url_env_key(&self) -> String {
        format!(
            "MOVIEDEX_CHART_{}_URL",
            self.source
                .as_str()
                .to_uppercase()
                .replace(|c: char| !c.is_ascii_alphanumeric(), "_")
        )
    }
}
