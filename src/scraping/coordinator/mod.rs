//! Scrape coordinator orchestrating the catalog and calendar pipelines
//!
//! A full run walks the configured charts in order. Each chart page yields
//! detail URLs, and each URL goes through fetch, extract, normalize and
//! upsert. Work is strictly sequential with a fixed pause between network
//! fetches. Failures are counted and skipped at every level: a bad chart
//! never stops the next one and a bad page never stops its siblings.

mod types;

pub use types::*;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

use super::extractor::{CalendarExtractor, ChartExtractor, DetailExtractor};
use super::fetcher::FetchEngine;
use super::normalize::normalize;
use crate::config::ChartConfig;
use crate::store::MovieStore;
use crate::types::{ChartSource, RecordType};

/// Scrape coordinator owning the pipeline stages
pub struct ScrapeCoordinator {
    /// Configuration
    config: CoordinatorConfig,
    /// Fetch engine (lock-free, uses internal atomics for stats)
    fetcher: Arc<FetchEngine>,
    /// Extractors (Arc for spawn_blocking sharing)
    chart_extractor: Arc<ChartExtractor>,
    detail_extractor: Arc<DetailExtractor>,
    calendar_extractor: Arc<CalendarExtractor>,
    /// Upsert adapter
    movies: MovieStore,
    /// Run lock shared by full and calendar runs
    running: Arc<AtomicBool>,
}

/// Holds the run lock; releases it on drop
struct RunGuard {
    running: Arc<AtomicBool>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Enforces the inter-request delay within one run
struct Pacer {
    delay: Duration,
    fetched_once: bool,
}

impl Pacer {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            fetched_once: false,
        }
    }

    /// Wait before a fetch; the first fetch of a run goes out immediately
    async fn before_fetch(&mut self) {
        if self.fetched_once && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.fetched_once = true;
    }
}

/// Run CPU-bound HTML parsing off the async worker threads
async fn blocking<T, F>(f: F) -> Result<T, ScrapeError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ScrapeError::Task(e.to_string()))
}

impl ScrapeCoordinator {
    /// Create a new coordinator
    pub fn new(
        config: CoordinatorConfig,
        fetcher: Arc<FetchEngine>,
        movies: MovieStore,
    ) -> Result<Self, ScrapeError> {
        Ok(Self {
            config,
            fetcher,
            chart_extractor: Arc::new(ChartExtractor::new()?),
            detail_extractor: Arc::new(DetailExtractor::new()?),
            calendar_extractor: Arc::new(CalendarExtractor::new()?),
            movies,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Whether a run currently holds the run lock
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &Arc<FetchEngine> {
        &self.fetcher
    }

    pub fn movies(&self) -> &MovieStore {
        &self.movies
    }

    fn try_lock(&self) -> Result<RunGuard, ScrapeError> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ScrapeError::AlreadyRunning)?;
        Ok(RunGuard {
            running: Arc::clone(&self.running),
        })
    }

    /// Scrape every configured chart and upsert the catalog records found.
    ///
    /// Only fails when another run is in progress; everything else is
    /// recorded in the summary.
    pub async fn run_full_scrape(&self) -> Result<ScrapeSummary, ScrapeError> {
        let _guard = self.try_lock()?;
        let start = Instant::now();
        let mut pacer = Pacer::new(self.config.request_delay);
        let mut seen: HashSet<String> = HashSet::new();
        let mut summary = ScrapeSummary::default();

        info!("Starting full scrape of {} charts", self.config.charts.len());

        for chart in &self.config.charts {
            let chart_summary = self.scrape_chart(chart, &mut pacer, &mut seen).await;
            info!(
                "Chart '{}': {} URLs, {} saved, {} skipped, {} errors",
                chart.source,
                chart_summary.urls_discovered,
                chart_summary.saved(),
                chart_summary.skipped,
                chart_summary.errors
            );
            summary.add_chart(chart_summary);
        }

        summary.duration = start.elapsed();
        info!("Full scrape finished: {}", summary);
        Ok(summary)
    }

    async fn scrape_chart(
        &self,
        chart: &ChartConfig,
        pacer: &mut Pacer,
        seen: &mut HashSet<String>,
    ) -> ChartSummary {
        let mut chart_summary = ChartSummary::new(chart.source.clone());

        let urls = match self.discover(chart, pacer).await {
            Ok(urls) => urls,
            Err(reason) => {
                warn!("Chart '{}' failed: {}", chart.source, reason);
                chart_summary.fail(reason);
                return chart_summary;
            }
        };
        if urls.is_empty() {
            warn!("Chart '{}' yielded no detail links", chart.source);
        }
        chart_summary.urls_discovered = urls.len();

        for url in urls {
            if !seen.insert(url.as_str().to_string()) {
                debug!("Already scraped {} this run", url);
                chart_summary.duplicates += 1;
                continue;
            }
            pacer.before_fetch().await;
            let outcome = self.process_detail(&url, &chart.source).await;
            if let RecordOutcome::Failed(reason) = &outcome {
                warn!("Failed {}: {}", url, reason);
            }
            chart_summary.record(&outcome);
        }

        chart_summary
    }

    async fn discover(&self, chart: &ChartConfig, pacer: &mut Pacer) -> Result<Vec<Url>, String> {
        pacer.before_fetch().await;
        let page = self
            .fetcher
            .fetch_str(&chart.url)
            .await
            .map_err(|e| e.to_string())?;

        let extractor = Arc::clone(&self.chart_extractor);
        let chart = chart.clone();
        blocking(move || extractor.extract(&page.body, &page.final_url, &chart))
            .await
            .map_err(|e| e.to_string())?
            .map_err(|e| e.to_string())
    }

    /// Fetch, extract, normalize and upsert one detail page
    async fn process_detail(&self, url: &Url, source: &ChartSource) -> RecordOutcome {
        let page = match self.fetcher.fetch(url, &[]).await {
            Ok(page) => page,
            Err(e) => return RecordOutcome::Failed(e.to_string()),
        };
        debug!(
            "Fetched {} (HTTP {}) in {:?} after {} attempt(s)",
            page.final_url, page.status_code, page.fetch_duration, page.attempts
        );

        let extractor = Arc::clone(&self.detail_extractor);
        let url_string = url.to_string();
        let extraction = blocking(move || extractor.extract(&page.body, &url_string)).await;
        let candidate = match extraction {
            Ok(Ok(candidate)) => candidate,
            Ok(Err(e)) => return RecordOutcome::Failed(e.to_string()),
            Err(e) => return RecordOutcome::Failed(e.to_string()),
        };

        let Some(record) = normalize(candidate, RecordType::Catalog, Some(source.clone())) else {
            return RecordOutcome::Skipped;
        };

        match self.movies.upsert(&record).await {
            Ok(outcome) => RecordOutcome::Saved(outcome),
            Err(e) => RecordOutcome::Failed(format!("store: {}", e)),
        }
    }

    /// Scrape the release calendar; returns the number of records written
    pub async fn run_upcoming_scrape(&self) -> Result<usize, ScrapeError> {
        Ok(self.run_upcoming_scrape_detailed().await?.saved())
    }

    /// Scrape the release calendar with a full outcome breakdown.
    ///
    /// Fails if the calendar page cannot be fetched; individual items are
    /// counted and skipped.
    pub async fn run_upcoming_scrape_detailed(&self) -> Result<UpcomingSummary, ScrapeError> {
        let _guard = self.try_lock()?;
        info!("Starting upcoming scrape of {}", self.config.calendar_url);

        let page = self.fetcher.fetch_str(&self.config.calendar_url).await?;
        let extractor = Arc::clone(&self.calendar_extractor);
        let candidates = blocking(move || extractor.extract(&page.body, &page.final_url)).await?;

        let mut summary = UpcomingSummary {
            candidates: candidates.len(),
            ..UpcomingSummary::default()
        };
        for candidate in candidates {
            let outcome = match normalize(candidate, RecordType::Upcoming, None) {
                None => RecordOutcome::Skipped,
                Some(record) => match self.movies.upsert(&record).await {
                    Ok(outcome) => RecordOutcome::Saved(outcome),
                    Err(e) => {
                        warn!("Failed to store upcoming '{}': {}", record.title, e);
                        RecordOutcome::Failed(e.to_string())
                    }
                },
            };
            summary.record(&outcome);
        }

        info!(
            "Upcoming scrape finished: {} of {} items saved, {} skipped, {} errors",
            summary.saved(),
            summary.candidates,
            summary.skipped,
            summary.errors
        );
        Ok(summary)
    }
}
