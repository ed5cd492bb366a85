//! Core movie catalog types shared by the scraper, the store adapter and readers

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Display format used for release dates ("Jul 18, 2025")
pub const RELEASE_DATE_DISPLAY_FORMAT: &str = "%b %-d, %Y";

/// Parse format matching [`RELEASE_DATE_DISPLAY_FORMAT`]
pub const RELEASE_DATE_PARSE_FORMAT: &str = "%b %d, %Y";

/// Which kind of listing produced a record.
///
/// Catalog and upcoming records live side by side in the same collection but
/// are distinct documents even when they share an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Catalog,
    Upcoming,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Catalog => "catalog",
            Self::Upcoming => "upcoming",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tag naming the chart a catalog record was discovered on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChartSource {
    Top250,
    Popular,
    Trending,
    Action,
    Comedy,
    Horror,
    /// A configured chart with a custom tag
    Other(String),
}

impl ChartSource {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Top250 => "top_250",
            Self::Popular => "popular",
            Self::Trending => "trending",
            Self::Action => "action",
            Self::Comedy => "comedy",
            Self::Horror => "horror",
            Self::Other(tag) => tag.as_str(),
        }
    }
}

impl From<String> for ChartSource {
    fn from(tag: String) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "top_250" | "top250" | "top" => Self::Top250,
            "popular" => Self::Popular,
            "trending" => Self::Trending,
            "action" => Self::Action,
            "comedy" => Self::Comedy,
            "horror" => Self::Horror,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<ChartSource> for String {
    fn from(source: ChartSource) -> Self {
        source.as_str().to_string()
    }
}

impl FromStr for ChartSource {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_string()))
    }
}

impl fmt::Display for ChartSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best-effort release date.
///
/// Upstream pages show free-form date text. When it parses we keep a real
/// date, otherwise the raw string is retained verbatim for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReleaseDate {
    Parsed(NaiveDate),
    Raw(String),
}

impl ReleaseDate {
    /// Interpret a stored display string
    pub fn from_display(value: &str) -> Self {
        let trimmed = value.trim();
        match NaiveDate::parse_from_str(trimmed, RELEASE_DATE_PARSE_FORMAT) {
            Ok(date) => Self::Parsed(date),
            Err(_) => Self::Raw(trimmed.to_string()),
        }
    }

    /// The calendar date, re-attempting a parse for raw values
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::Parsed(date) => Some(*date),
            Self::Raw(raw) => NaiveDate::parse_from_str(raw.trim(), RELEASE_DATE_PARSE_FORMAT).ok(),
        }
    }

    /// Display value stored in documents
    pub fn display(&self) -> String {
        match self {
            Self::Parsed(date) => date.format(RELEASE_DATE_DISPLAY_FORMAT).to_string(),
            Self::Raw(raw) => raw.clone(),
        }
    }
}

impl From<String> for ReleaseDate {
    fn from(value: String) -> Self {
        Self::from_display(&value)
    }
}

impl From<ReleaseDate> for String {
    fn from(date: ReleaseDate) -> Self {
        date.display()
    }
}

impl fmt::Display for ReleaseDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// Order two optional release dates: earliest first, unparseable and missing last.
pub fn cmp_release_dates(a: Option<&ReleaseDate>, b: Option<&ReleaseDate>) -> Ordering {
    let a = a.and_then(ReleaseDate::date);
    let b = b.and_then(ReleaseDate::date);
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Sort release dates in place (stable; unparseable values keep their relative order at the end)
pub fn sort_release_dates(dates: &mut [ReleaseDate]) {
    dates.sort_by(|a, b| cmp_release_dates(Some(a), Some(b)));
}

/// Canonical scraped movie record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieRecord {
    /// IMDb id (`tt…`) or, failing that, the source URL
    pub identity: String,
    pub title: String,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub cast: Vec<String>,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub plot: Option<String>,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub release_date: Option<ReleaseDate>,
    pub record_type: RecordType,
    #[serde(default)]
    pub chart_source: Option<ChartSource>,
    /// Managed by the store adapter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scraped_at: Option<DateTime<Utc>>,
    /// Managed by the store adapter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    /// Managed by the store adapter; written once on insert
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl MovieRecord {
    /// Create a record with only the required fields populated
    pub fn new(identity: impl Into<String>, title: impl Into<String>, record_type: RecordType) -> Self {
        Self {
            identity: identity.into(),
            title: title.into(),
            year: None,
            rating: None,
            genres: Vec::new(),
            cast: Vec::new(),
            director: None,
            plot: None,
            poster_url: None,
            source_url: None,
            release_date: None,
            record_type,
            chart_source: None,
            scraped_at: None,
            last_updated: None,
            created_at: None,
        }
    }

    /// Whether the rating falls outside the 0-10 scale.
    ///
    /// Out-of-range ratings are stored as scraped; readers may use this to flag them.
    pub fn has_suspect_rating(&self) -> bool {
        self.rating.is_some_and(|r| !(0.0..=10.0).contains(&r))
    }
}
