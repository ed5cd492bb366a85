//! Record normalization
//!
//! Turns loosely scraped [`RawCandidate`]s into canonical [`MovieRecord`]s.
//! A candidate without a usable title or identity is rejected; any other
//! field that cannot be interpreted is left absent.

use chrono::{Datelike, NaiveDate, Utc};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::debug;

use crate::scraping::extractor::{RawCandidate, MAX_CAST};
use crate::types::{ChartSource, MovieRecord, RecordType, ReleaseDate};
use crate::util::collapse_whitespace;

/// Genre tokens longer than this are dropped
pub const MAX_GENRE_LEN: usize = 30;

static RE_IMDB_ID: OnceLock<Regex> = OnceLock::new();
static RE_YEAR: OnceLock<Regex> = OnceLock::new();
static RE_RATING: OnceLock<Regex> = OnceLock::new();
static RE_LEADING_DATE: OnceLock<Regex> = OnceLock::new();

/// Full-date layouts tried in order
const FULL_DATE_FORMATS: &[&str] = &["%b %d, %Y", "%b %d %Y", "%B %d, %Y", "%B %d %Y", "%Y-%m-%d", "%d %b %Y", "%d %B %Y"];

/// Month-and-day layouts resolved against the current year
const PARTIAL_DATE_FORMATS: &[&str] = &["%b %d %Y", "%B %d %Y"];

/// Normalize a candidate; `None` means the candidate is rejected.
pub fn normalize(
    raw: RawCandidate,
    record_type: RecordType,
    chart_source: Option<ChartSource>,
) -> Option<MovieRecord> {
    normalize_with_year(raw, record_type, chart_source, Utc::now().year())
}

/// [`normalize`] with an explicit year for month-day-only release dates
pub fn normalize_with_year(
    raw: RawCandidate,
    record_type: RecordType,
    chart_source: Option<ChartSource>,
    current_year: i32,
) -> Option<MovieRecord> {
    let title = raw
        .title
        .as_deref()
        .map(collapse_whitespace)
        .filter(|t| !t.is_empty());
    let Some(title) = title else {
        debug!("Rejecting candidate without title ({:?})", raw.url);
        return None;
    };

    let source_url = raw
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string);
    let Some(identity) = source_url.as_deref().map(derive_identity) else {
        debug!("Rejecting '{}': no source URL to derive an identity from", title);
        return None;
    };

    let mut record = MovieRecord::new(identity, title, record_type);
    record.year = raw.year.as_deref().and_then(normalize_year);
    record.rating = raw.rating.as_deref().and_then(normalize_rating);
    record.genres = normalize_genres(&raw.genres);
    record.cast = normalize_cast(&raw.cast);
    record.director = clean_text(raw.director.as_deref());
    record.plot = clean_text(raw.plot.as_deref());
    record.poster_url = clean_text(raw.poster_url.as_deref());
    record.source_url = source_url;
    record.release_date = raw
        .release_date
        .as_deref()
        .and_then(|d| normalize_release_date(d, current_year));
    record.chart_source = match record_type {
        RecordType::Catalog => chart_source,
        RecordType::Upcoming => None,
    };

    Some(record)
}

/// Identity for a detail URL: the IMDb id when present, else the URL itself
pub fn derive_identity(url: &str) -> String {
    let re = RE_IMDB_ID.get_or_init(|| Regex::new(r"tt\d+").unwrap());
    match re.find(url) {
        Some(m) => m.as_str().to_string(),
        None => url.trim().to_string(),
    }
}

/// First 4-digit run in free text
pub fn normalize_year(text: &str) -> Option<String> {
    let re = RE_YEAR.get_or_init(|| Regex::new(r"\d{4}").unwrap());
    re.find(text).map(|m| m.as_str().to_string())
}

/// Decimal rating from text such as `"8.5"`, `"8,5/10"` or `" 7 "`.
///
/// Out-of-range values pass through unchanged.
pub fn normalize_rating(text: &str) -> Option<f64> {
    let re = RE_RATING.get_or_init(|| Regex::new(r"^\s*(\d+(?:[.,]\d+)?)").unwrap());
    let number = re.captures(text)?.get(1)?.as_str().replace(',', ".");
    number.parse::<f64>().ok().filter(|r| r.is_finite())
}

/// Lowercase, trim, drop empty and overlong tokens, keep first occurrence order
pub fn normalize_genres(genres: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    genres
        .iter()
        .map(|g| collapse_whitespace(g).to_lowercase())
        .filter(|g| !g.is_empty() && g.chars().count() <= MAX_GENRE_LEN)
        .filter(|g| seen.insert(g.clone()))
        .collect()
}

/// Trim, de-duplicate and cap cast names
pub fn normalize_cast(cast: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    cast.iter()
        .map(|c| collapse_whitespace(c))
        .filter(|c| !c.is_empty())
        .filter(|c| seen.insert(c.clone()))
        .take(MAX_CAST)
        .collect()
}

/// Best-effort release date. Unrecognized text is kept verbatim.
pub fn normalize_release_date(text: &str, current_year: i32) -> Option<ReleaseDate> {
    let cleaned = collapse_whitespace(text);
    if cleaned.is_empty() {
        return None;
    }
    Some(match parse_date(&cleaned, current_year) {
        Some(date) => ReleaseDate::Parsed(date),
        None => ReleaseDate::Raw(cleaned),
    })
}

/// Parse the supported date layouts; month-day forms take `current_year`
pub fn parse_date(text: &str, current_year: i32) -> Option<NaiveDate> {
    let cleaned = text.trim().replace('.', "");
    if let Some(date) = FULL_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&cleaned, fmt).ok())
    {
        return Some(date);
    }

    let with_year = format!("{} {}", cleaned.trim_end_matches(','), current_year);
    PARTIAL_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&with_year, fmt).ok())
}

/// Date text at the start of `text`, e.g. `"Jul 18, 2025"` in `"Jul 18, 2025 Drama"`
pub fn leading_date(text: &str) -> Option<&str> {
    let re = RE_LEADING_DATE.get_or_init(|| {
        Regex::new(
            r"(?i)^\s*((?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?\s+\d{1,2}\b(?:,?\s+\d{4})?)",
        )
        .unwrap()
    });
    re.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str())
}

fn clean_text(text: Option<&str>) -> Option<String> {
    text.map(collapse_whitespace).filter(|t| !t.is_empty())
}
