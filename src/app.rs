//! Application root
//!
//! Everything long-lived is built here once from [`Config`] and handed out
//! by reference: the document store, the fetch engine, the coordinator and
//! the scheduler.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::scheduler::ScrapeScheduler;
use crate::scraping::{
    CoordinatorConfig, FetchConfig, FetchEngine, PageTransport, ScrapeCoordinator, ScrapeError,
    ScrapeSummary,
};
use crate::store::{DocumentStore, MemoryStore, MovieStore};
use crate::types::RecordType;

pub struct App {
    config: Config,
    movies: MovieStore,
    coordinator: Arc<ScrapeCoordinator>,
    scheduler: ScrapeScheduler,
}

impl App {
    /// Build the application with the production HTTP transport
    pub fn new(config: Config) -> Result<Self> {
        let store = Self::open_store(&config)?;
        let fetcher = FetchEngine::new(FetchConfig::from(&config.scraping))
            .context("Failed to build HTTP client")?;
        Self::assemble(config, store, fetcher)
    }

    /// Build the application over caller-supplied store and transport
    pub fn with_parts(
        config: Config,
        store: Arc<dyn DocumentStore>,
        transport: Arc<dyn PageTransport>,
    ) -> Result<Self> {
        let fetcher = FetchEngine::with_transport(FetchConfig::from(&config.scraping), transport);
        Self::assemble(config, store, fetcher)
    }

    fn open_store(config: &Config) -> Result<Arc<dyn DocumentStore>> {
        if !config.store.persist {
            return Ok(Arc::new(MemoryStore::new()));
        }
        let path = config.store.collection_path();
        let store = MemoryStore::open(&path)
            .with_context(|| format!("Failed to open movie store at '{}'", path.display()))?;
        Ok(Arc::new(store))
    }

    fn assemble(config: Config, store: Arc<dyn DocumentStore>, fetcher: FetchEngine) -> Result<Self> {
        let movies = MovieStore::new(store);
        let coordinator = ScrapeCoordinator::new(
            CoordinatorConfig::from(&config.scraping),
            Arc::new(fetcher),
            movies.clone(),
        )
        .context("Failed to build scrape coordinator")?;
        let coordinator = Arc::new(coordinator);
        let scheduler = ScrapeScheduler::new(Arc::clone(&coordinator), config.scheduler.clone());

        Ok(Self {
            config,
            movies,
            coordinator,
            scheduler,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn movies(&self) -> &MovieStore {
        &self.movies
    }

    pub fn coordinator(&self) -> &Arc<ScrapeCoordinator> {
        &self.coordinator
    }

    pub fn scheduler(&self) -> &ScrapeScheduler {
        &self.scheduler
    }

    /// On-demand full catalog scrape
    pub async fn scrape_full_catalog(&self) -> Result<ScrapeSummary, ScrapeError> {
        self.coordinator.run_full_scrape().await
    }

    /// On-demand calendar scrape; returns the number of records saved
    pub async fn scrape_upcoming(&self) -> Result<usize, ScrapeError> {
        self.coordinator.run_upcoming_scrape().await
    }

    /// Scrape once when the catalog is empty, if configured to.
    ///
    /// Returns whether a scrape ran.
    pub async fn scrape_if_empty(&self) -> Result<bool> {
        if !self.config.scheduler.scrape_on_empty {
            return Ok(false);
        }
        let catalog = self.movies.count(RecordType::Catalog).await?;
        if catalog > 0 {
            return Ok(false);
        }

        info!("Catalog is empty, running initial scrape");
        let summary = self.scrape_full_catalog().await?;
        info!("Initial scrape: {}", summary);
        if self.config.scheduler.include_upcoming {
            let saved = self.scrape_upcoming().await?;
            info!("Initial upcoming scrape saved {} records", saved);
        }
        Ok(true)
    }
}
