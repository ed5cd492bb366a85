//! Extraction types

use thiserror::Error;

/// Errors during extraction.
///
/// A missing selector match is not an error: the field is simply absent.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("No movie data found on {0}")]
    NoMovieData(String),
    #[error("Invalid CSS selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// Unvalidated record fields as scraped, before normalization
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCandidate {
    /// Absolute detail-page URL
    pub url: Option<String>,
    pub title: Option<String>,
    pub year: Option<String>,
    pub rating: Option<String>,
    pub genres: Vec<String>,
    pub director: Option<String>,
    pub cast: Vec<String>,
    pub plot: Option<String>,
    pub poster_url: Option<String>,
    /// Free-form release date text
    pub release_date: Option<String>,
}

impl RawCandidate {
    /// True when no movie field at all was found (the URL alone does not count)
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.year.is_none()
            && self.rating.is_none()
            && self.genres.is_empty()
            && self.director.is_none()
            && self.cast.is_empty()
            && self.plot.is_none()
            && self.poster_url.is_none()
            && self.release_date.is_none()
    }
}
