//! Moviedex: scheduled IMDb chart and calendar scraper
//!
//! Fetches IMDb chart and release-calendar pages, extracts movie details
//! through ordered selector fallbacks, normalizes them into canonical
//! [`MovieRecord`]s and upserts them idempotently into a document store
//! keyed by IMDb id.
//!
//! - Polite sequential fetching with retry, backoff and anti-bot detection
//! - Selector cascades with JSON-LD fallback for detail pages
//! - Atomic upserts that preserve `createdAt` and refresh `lastUpdated`
//! - Interval and daily triggers via `tokio-cron-scheduler`

pub mod app;
pub mod config;
pub mod logging;
pub mod scheduler;
pub mod scraping;
pub mod store;
pub mod types;
pub mod util;

pub use app::App;
pub use config::Config;
pub use types::*;
