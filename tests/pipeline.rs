//! End-to-end scrape pipeline tests against an offline site

mod common;

use async_trait::async_trait;
use common::*;
use moviedex::scraping::ScrapeError;
use moviedex::store::{
    Document, DocumentStore, Filter, FindOptions, MemoryStore, StoreError, Update, UpdateResult,
};
use moviedex::types::{ChartSource, RecordType};
use moviedex::App;
use std::sync::Arc;
use std::time::Duration;

fn app_with(site: &Arc<FakeSite>, charts: &[ChartSource]) -> App {
    App::with_parts(test_config(charts), Arc::new(MemoryStore::new()), site.clone()).unwrap()
}

fn seed_chart(site: &FakeSite, source: &ChartSource, ids: &[&str]) {
    site.page(&chart_url(source), chart_page(ids));
    for id in ids {
        site.page(
            &title_url(id),
            detail_page(&format!("Movie {}", id), "1999", "8.1", &["Drama", "Crime"], &["Actor One"]),
        );
    }
}

// ============================================================================
// Full catalog runs
// ============================================================================

#[tokio::test]
async fn test_repeated_run_is_idempotent() {
    let site = Arc::new(FakeSite::new());
    seed_chart(&site, &ChartSource::Top250, &["tt0000001", "tt0000002", "tt0000003"]);
    let app = app_with(&site, &[ChartSource::Top250]);

    let first = app.scrape_full_catalog().await.unwrap();
    assert_eq!(first.inserted, 3);
    assert_eq!(first.errors, 0);
    let before = app.movies().get("tt0000002", RecordType::Catalog).await.unwrap().unwrap();

    tokio::time::sleep(Duration::from_millis(10)).await;

    let second = app.scrape_full_catalog().await.unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.unchanged, 3);
    assert_eq!(second.saved(), 3);

    assert_eq!(app.movies().count(RecordType::Catalog).await.unwrap(), 3);
    let after = app.movies().get("tt0000002", RecordType::Catalog).await.unwrap().unwrap();
    assert_eq!(before.created_at, after.created_at);
    assert_ne!(before.last_updated, after.last_updated);
    assert_eq!(after.title, "Movie tt0000002");
    assert_eq!(after.year.as_deref(), Some("1999"));
    assert_eq!(after.rating, Some(8.1));
    assert_eq!(after.genres, vec!["drama", "crime"]);
    assert_eq!(after.chart_source, Some(ChartSource::Top250));
    assert_eq!(after.source_url.as_deref(), Some("https://www.imdb.com/title/tt0000002/"));
}

#[tokio::test]
async fn test_one_broken_detail_page_does_not_stop_the_chart() {
    let site = Arc::new(FakeSite::new());
    let ids = ["tt0000001", "tt0000002", "tt0000003", "tt0000004", "tt0000005"];
    seed_chart(&site, &ChartSource::Popular, &ids);
    site.page(&title_url("tt0000003"), BROKEN_DETAIL);
    let app = app_with(&site, &[ChartSource::Popular]);

    let summary = app.scrape_full_catalog().await.unwrap();

    assert_eq!(summary.urls_discovered, 5);
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.saved(), 4);
    assert_eq!(app.movies().count(RecordType::Catalog).await.unwrap(), 4);
    assert!(app.movies().get("tt0000003", RecordType::Catalog).await.unwrap().is_none());
}

#[tokio::test]
async fn test_failed_chart_page_is_counted_and_skipped() {
    let site = Arc::new(FakeSite::new());
    site.status(&chart_url(&ChartSource::Top250), 503);
    seed_chart(&site, &ChartSource::Horror, &["tt0000010", "tt0000011"]);
    let app = app_with(&site, &[ChartSource::Top250, ChartSource::Horror]);

    let summary = app.scrape_full_catalog().await.unwrap();

    assert_eq!(summary.charts.len(), 2);
    assert!(summary.charts[0].failure.is_some());
    assert_eq!(summary.charts[0].errors, 1);
    assert_eq!(summary.charts[1].saved(), 2);
    assert_eq!(summary.total_errors(), 1);
    // 503 is transient: both attempts were used
    assert_eq!(site.hits(&chart_url(&ChartSource::Top250)), 2);
}

#[tokio::test]
async fn test_missing_detail_page_is_not_retried() {
    let site = Arc::new(FakeSite::new());
    site.page(&chart_url(&ChartSource::Comedy), chart_page(&["tt0000020"]));
    let app = app_with(&site, &[ChartSource::Comedy]);

    let summary = app.scrape_full_catalog().await.unwrap();

    assert_eq!(summary.errors, 1);
    assert_eq!(site.hits(&title_url("tt0000020")), 1);
}

#[tokio::test]
async fn test_untitled_page_never_reaches_the_store() {
    let site = Arc::new(FakeSite::new());
    seed_chart(&site, &ChartSource::Action, &["tt0000030", "tt0000031"]);
    site.page(&title_url("tt0000031"), UNTITLED_DETAIL);
    let app = app_with(&site, &[ChartSource::Action]);

    let summary = app.scrape_full_catalog().await.unwrap();

    assert_eq!(summary.saved(), 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.errors, 0);
    assert_eq!(app.movies().count(RecordType::Catalog).await.unwrap(), 1);
}

#[tokio::test]
async fn test_movie_on_two_charts_is_scraped_once() {
    let site = Arc::new(FakeSite::new());
    seed_chart(&site, &ChartSource::Top250, &["tt0000001", "tt0000002"]);
    seed_chart(&site, &ChartSource::Trending, &["tt0000002", "tt0000003"]);
    let app = app_with(&site, &[ChartSource::Top250, ChartSource::Trending]);

    let summary = app.scrape_full_catalog().await.unwrap();

    assert_eq!(summary.saved(), 3);
    assert_eq!(summary.charts[1].duplicates, 1);
    assert_eq!(site.hits(&title_url("tt0000002")), 1);
    let shared = app.movies().get("tt0000002", RecordType::Catalog).await.unwrap().unwrap();
    assert_eq!(shared.chart_source, Some(ChartSource::Top250));
}

#[tokio::test(start_paused = true)]
async fn test_requests_are_paced() {
    let site = Arc::new(FakeSite::new());
    seed_chart(&site, &ChartSource::Top250, &["tt0000001", "tt0000002"]);
    let mut config = test_config(&[ChartSource::Top250]);
    config.scraping.request_delay_ms = 1000;
    let app = App::with_parts(config, Arc::new(MemoryStore::new()), site.clone()).unwrap();

    let start = tokio::time::Instant::now();
    let summary = app.scrape_full_catalog().await.unwrap();

    assert_eq!(summary.saved(), 2);
    assert_eq!(site.requests().len(), 3);
    // Three fetches, two pauses
    assert!(start.elapsed() >= Duration::from_secs(2));
}

// ============================================================================
// Upcoming calendar runs
// ============================================================================

#[tokio::test]
async fn test_upcoming_scrape_saves_calendar_items() {
    let site = Arc::new(FakeSite::new());
    site.page(CALENDAR_URL, CALENDAR_PAGE);
    let app = app_with(&site, &[]);

    assert_eq!(app.scrape_upcoming().await.unwrap(), 3);
    assert_eq!(app.scrape_upcoming().await.unwrap(), 3);
    assert_eq!(app.movies().count(RecordType::Upcoming).await.unwrap(), 3);
    assert_eq!(app.movies().count(RecordType::Catalog).await.unwrap(), 0);

    let upcoming = app.movies().upcoming(10).await.unwrap();
    let titles: Vec<&str> = upcoming.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Eddington", "Smurfs", "Avatar: Fire and Ash"]);
    assert!(upcoming.iter().all(|r| r.chart_source.is_none()));
    assert_eq!(upcoming[2].genres, vec!["action", "adventure"]);
    assert_eq!(
        upcoming[0].release_date.as_ref().map(|d| d.display()),
        Some("Jul 18, 2025".to_string())
    );
}

#[tokio::test]
async fn test_upcoming_scrape_fails_when_calendar_unreachable() {
    let site = Arc::new(FakeSite::new());
    let app = app_with(&site, &[]);

    let err = app.scrape_upcoming().await.unwrap_err();
    assert!(matches!(err, ScrapeError::Fetch(_)));
    assert!(!app.coordinator().is_running());
}

#[tokio::test]
async fn test_catalog_and_upcoming_records_coexist() {
    let site = Arc::new(FakeSite::new());
    seed_chart(&site, &ChartSource::Popular, &["tt9603208"]);
    site.page(CALENDAR_URL, CALENDAR_PAGE);
    let app = app_with(&site, &[ChartSource::Popular]);

    app.scrape_full_catalog().await.unwrap();
    app.scrape_upcoming().await.unwrap();

    let catalog = app.movies().get("tt9603208", RecordType::Catalog).await.unwrap().unwrap();
    let upcoming = app.movies().get("tt9603208", RecordType::Upcoming).await.unwrap().unwrap();
    assert_eq!(catalog.title, "Movie tt9603208");
    assert_eq!(upcoming.title, "Eddington");
}

// ============================================================================
// Store failures and persistence
// ============================================================================

/// Store whose every operation fails, as during a database outage
struct UnreachableStore;

#[async_trait]
impl DocumentStore for UnreachableStore {
    async fn find_one(&self, _filter: &Filter) -> Result<Option<Document>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn find(&self, _filter: &Filter, _options: &FindOptions) -> Result<Vec<Document>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn update_one(&self, _filter: &Filter, _update: &Update, _upsert: bool) -> Result<UpdateResult, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn insert_one(&self, _doc: Document) -> Result<String, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn count_documents(&self, _filter: &Filter) -> Result<u64, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_store_outage_surfaces_as_errors() {
    let site = Arc::new(FakeSite::new());
    seed_chart(&site, &ChartSource::Top250, &["tt0000001", "tt0000002", "tt0000003"]);
    let app = App::with_parts(
        test_config(&[ChartSource::Top250]),
        Arc::new(UnreachableStore),
        site.clone(),
    )
    .unwrap();

    let summary = app.scrape_full_catalog().await.unwrap();
    assert_eq!(summary.errors, 3);
    assert_eq!(summary.saved(), 0);
    assert!(!app.coordinator().is_running());
}

#[tokio::test]
async fn test_scraped_records_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("movies.json");
    let site = Arc::new(FakeSite::new());
    seed_chart(&site, &ChartSource::Top250, &["tt0000001", "tt0000002"]);

    {
        let store = Arc::new(MemoryStore::open(&path).unwrap());
        let app = App::with_parts(test_config(&[ChartSource::Top250]), store, site.clone()).unwrap();
        app.scrape_full_catalog().await.unwrap();
    }

    let reopened = Arc::new(MemoryStore::open(&path).unwrap());
    let app = App::with_parts(test_config(&[ChartSource::Top250]), reopened, site.clone()).unwrap();
    assert_eq!(app.movies().count(RecordType::Catalog).await.unwrap(), 2);

    let again = app.scrape_full_catalog().await.unwrap();
    assert_eq!(again.inserted, 0);
    assert_eq!(again.unchanged, 2);
}

// ============================================================================
// Startup behavior
// ============================================================================

#[tokio::test]
async fn test_initial_scrape_only_when_catalog_empty() {
    let site = Arc::new(FakeSite::new());
    seed_chart(&site, &ChartSource::Top250, &["tt0000001"]);
    site.page(CALENDAR_URL, CALENDAR_PAGE);
    let app = app_with(&site, &[ChartSource::Top250]);

    assert!(app.scrape_if_empty().await.unwrap());
    assert_eq!(app.movies().count(RecordType::Catalog).await.unwrap(), 1);
    assert_eq!(app.movies().count(RecordType::Upcoming).await.unwrap(), 3);

    let requests = site.requests().len();
    assert!(!app.scrape_if_empty().await.unwrap());
    assert_eq!(site.requests().len(), requests);
}
