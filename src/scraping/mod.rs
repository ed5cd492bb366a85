//! IMDb scraping pipeline
//!
//! Chart and calendar pages are fetched politely, parsed into raw
//! candidates, normalized into [`MovieRecord`](crate::types::MovieRecord)s
//! and handed to the movie store.
//!
//! Key components:
//! - `FetchEngine`: browser-like HTTP fetching with retry and backoff
//! - `ChartExtractor` / `DetailExtractor` / `CalendarExtractor`: HTML to raw candidates
//! - `normalize`: raw candidate to canonical record
//! - `ScrapeCoordinator`: sequential full and calendar runs

pub mod coordinator;
pub mod extractor;
pub mod fetcher;
pub mod normalize;

pub use coordinator::{
    ChartSummary, CoordinatorConfig, RecordOutcome, ScrapeCoordinator, ScrapeError, ScrapeSummary,
    UpcomingSummary,
};
pub use extractor::{CalendarExtractor, ChartExtractor, DetailExtractor, ExtractError, RawCandidate};
pub use fetcher::{FetchConfig, FetchEngine, FetchError, FetchStats, PageTransport};
pub use normalize::normalize;
