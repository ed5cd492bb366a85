//! Coordinator types: configuration, errors, and run summaries

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::config::{ChartConfig, ScrapingConfig};
use crate::scraping::extractor::ExtractError;
use crate::scraping::fetcher::FetchError;
use crate::store::UpsertOutcome;
use crate::types::ChartSource;

/// Configuration for the scrape coordinator
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Charts scraped by a full run, in order
    pub charts: Vec<ChartConfig>,
    /// Release calendar page
    pub calendar_url: String,
    /// Pause between consecutive network fetches within a run
    pub request_delay: Duration,
}

impl From<&ScrapingConfig> for CoordinatorConfig {
    fn from(config: &ScrapingConfig) -> Self {
        Self {
            charts: config.charts.clone(),
            calendar_url: config.calendar_url.clone(),
            request_delay: config.request_delay(),
        }
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::from(&ScrapingConfig::default())
    }
}

/// Errors that end a run before it produces a summary
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("A scrape run is already in progress")]
    AlreadyRunning,
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("Extraction setup failed: {0}")]
    Extract(#[from] ExtractError),
    #[error("Extraction task failed: {0}")]
    Task(String),
}

/// What happened to one detail URL or calendar item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Saved(UpsertOutcome),
    /// Rejected by normalization (no title or identity)
    Skipped,
    Failed(String),
}

/// Counts for one chart of a full run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartSummary {
    pub source: ChartSource,
    /// Detail URLs the chart page yielded
    pub urls_discovered: usize,
    /// URLs already handled by an earlier chart in the same run
    pub duplicates: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub errors: usize,
    /// Why the chart page itself could not be used, if it could not
    pub failure: Option<String>,
}

impl ChartSummary {
    pub fn new(source: ChartSource) -> Self {
        Self {
            source,
            urls_discovered: 0,
            duplicates: 0,
            inserted: 0,
            updated: 0,
            unchanged: 0,
            skipped: 0,
            errors: 0,
            failure: None,
        }
    }

    pub fn record(&mut self, outcome: &RecordOutcome) {
        match outcome {
            RecordOutcome::Saved(UpsertOutcome::Inserted) => self.inserted += 1,
            RecordOutcome::Saved(UpsertOutcome::Updated) => self.updated += 1,
            RecordOutcome::Saved(UpsertOutcome::Unchanged) => self.unchanged += 1,
            RecordOutcome::Skipped => self.skipped += 1,
            RecordOutcome::Failed(_) => self.errors += 1,
        }
    }

    /// Mark the chart page as unusable
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.failure = Some(reason.into());
        self.errors += 1;
    }

    pub fn saved(&self) -> usize {
        self.inserted + self.updated + self.unchanged
    }
}

/// Aggregate result of a full catalog run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeSummary {
    /// Per-chart breakdown, in run order
    pub charts: Vec<ChartSummary>,
    pub urls_discovered: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub errors: usize,
    pub duration: Duration,
}

impl ScrapeSummary {
    pub fn add_chart(&mut self, chart: ChartSummary) {
        self.urls_discovered += chart.urls_discovered;
        self.inserted += chart.inserted;
        self.updated += chart.updated;
        self.unchanged += chart.unchanged;
        self.skipped += chart.skipped;
        self.errors += chart.errors;
        self.charts.push(chart);
    }

    /// Records durably written during the run
    pub fn saved(&self) -> usize {
        self.inserted + self.updated + self.unchanged
    }

    pub fn total_errors(&self) -> usize {
        self.errors
    }
}

impl fmt::Display for ScrapeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} saved ({} new, {} updated, {} unchanged), {} skipped, {} errors from {} URLs in {:.1}s",
            self.saved(),
            self.inserted,
            self.updated,
            self.unchanged,
            self.skipped,
            self.errors,
            self.urls_discovered,
            self.duration.as_secs_f64()
        )
    }
}

/// Result of a calendar run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpcomingSummary {
    /// Items found on the calendar page
    pub candidates: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl UpcomingSummary {
    pub fn record(&mut self, outcome: &RecordOutcome) {
        match outcome {
            RecordOutcome::Saved(UpsertOutcome::Inserted) => self.inserted += 1,
            RecordOutcome::Saved(UpsertOutcome::Updated) => self.updated += 1,
            RecordOutcome::Saved(UpsertOutcome::Unchanged) => self.unchanged += 1,
            RecordOutcome::Skipped => self.skipped += 1,
            RecordOutcome::Failed(_) => self.errors += 1,
        }
    }

    pub fn saved(&self) -> usize {
        self.inserted + self.updated + self.unchanged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_aggregates_charts() {
        let mut top = ChartSummary::new(ChartSource::Top250);
        top.urls_discovered = 5;
        for outcome in [
            RecordOutcome::Saved(UpsertOutcome::Inserted),
            RecordOutcome::Saved(UpsertOutcome::Inserted),
            RecordOutcome::Saved(UpsertOutcome::Updated),
            RecordOutcome::Saved(UpsertOutcome::Unchanged),
            RecordOutcome::Failed("boom".to_string()),
        ] {
            top.record(&outcome);
        }

        let mut horror = ChartSummary::new(ChartSource::Horror);
        horror.fail("HTTP 404");

        let mut summary = ScrapeSummary::default();
        summary.add_chart(top);
        summary.add_chart(horror);

        assert_eq!(summary.saved(), 4);
        assert_eq!(summary.total_errors(), 2);
        assert_eq!(summary.urls_discovered, 5);
        assert_eq!(summary.charts.len(), 2);
        assert_eq!(summary.charts[1].failure.as_deref(), Some("HTTP 404"));
    }
}
