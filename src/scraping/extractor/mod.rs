//! HTML extraction for IMDb chart, title and calendar pages
//!
//! Extractors are synchronous: `scraper::Html` is not `Send`, so a parsed
//! document never lives across an `.await`. Each call parses, walks the tree
//! once, and returns owned data.

pub mod calendar;
pub mod cascade;
pub mod chart;
pub mod detail;
pub mod types;

pub use calendar::CalendarExtractor;
pub use cascade::{FieldCascade, FieldMapper};
pub use chart::{canonical_title_url, ChartExtractor};
pub use detail::{DetailExtractor, MAX_CAST};
pub use types::{ExtractError, RawCandidate};
