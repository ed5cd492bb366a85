//! Periodic scrape scheduling on top of `tokio-cron-scheduler`
//!
//! Two triggers may be configured independently: a fixed interval that
//! re-runs the catalog scrape, and a daily UTC time that runs the catalog
//! scrape followed by the calendar scrape. Jobs only hold an
//! `Arc<ScrapeCoordinator>`; overlapping runs are refused by the
//! coordinator's run lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::scraping::{ScrapeCoordinator, ScrapeError};

/// How often shutdown re-checks for an in-flight run
const GRACE_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Scheduler error: {0}")]
    Cron(#[from] JobSchedulerError),
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),
    #[error("No schedule configured: set an interval or a daily time")]
    NoTriggers,
}

/// Which scrapes a trigger runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Interval,
    Daily { include_upcoming: bool },
}

struct ActiveSchedule {
    scheduler: JobScheduler,
    jobs: Vec<Uuid>,
}

/// Scheduler in one of two states: stopped, or running with its jobs registered
pub struct ScrapeScheduler {
    coordinator: Arc<ScrapeCoordinator>,
    config: SchedulerConfig,
    active: Mutex<Option<ActiveSchedule>>,
    running: AtomicBool,
}

impl ScrapeScheduler {
    pub fn new(coordinator: Arc<ScrapeCoordinator>, config: SchedulerConfig) -> Self {
        Self {
            coordinator,
            config,
            active: Mutex::new(None),
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Number of registered jobs (zero when stopped)
    pub async fn active_jobs(&self) -> usize {
        self.active.lock().await.as_ref().map_or(0, |a| a.jobs.len())
    }

    /// Register the configured triggers and start ticking.
    ///
    /// Calling this on a running scheduler does nothing.
    pub async fn start(&self) -> Result<(), SchedulerError> {
        let mut active = self.active.lock().await;
        if active.is_some() {
            info!("Scheduler already running");
            return Ok(());
        }

        let daily = self
            .config
            .daily_time()
            .map_err(SchedulerError::InvalidSchedule)?;
        let interval = self.config.interval();
        if daily.is_none() && interval.is_none() {
            return Err(SchedulerError::NoTriggers);
        }

        let scheduler = JobScheduler::new().await?;
        let mut jobs = Vec::new();

        if let Some(every) = interval {
            let coordinator = Arc::clone(&self.coordinator);
            let job = Job::new_repeated_async(every, move |_uuid, _lock| {
                let coordinator = Arc::clone(&coordinator);
                Box::pin(async move {
                    run_trigger(&coordinator, Trigger::Interval).await;
                })
            })?;
            jobs.push(scheduler.add(job).await?);
            info!("Scheduled catalog scrape every {:?}", every);
        }

        if let Some(at) = daily {
            let coordinator = Arc::clone(&self.coordinator);
            let trigger = Trigger::Daily {
                include_upcoming: self.config.include_upcoming,
            };
            let job = Job::new_async(at.cron_expression().as_str(), move |_uuid, _lock| {
                let coordinator = Arc::clone(&coordinator);
                Box::pin(async move {
                    run_trigger(&coordinator, trigger).await;
                })
            })?;
            jobs.push(scheduler.add(job).await?);
            info!("Scheduled daily scrape at {} UTC", at);
        }

        scheduler.start().await?;
        *active = Some(ActiveSchedule { scheduler, jobs });
        self.running.store(true, Ordering::Release);
        Ok(())
    }

    /// Stop triggering new runs and wait, bounded by the configured grace
    /// period, for an in-flight run to finish.
    ///
    /// Safe to call any number of times.
    pub async fn shutdown(&self) -> Result<(), SchedulerError> {
        let Some(mut schedule) = self.active.lock().await.take() else {
            return Ok(());
        };
        self.running.store(false, Ordering::Release);

        if let Err(e) = schedule.scheduler.shutdown().await {
            warn!("Job scheduler did not shut down cleanly: {}", e);
        }

        let grace = self.config.shutdown_grace();
        if self.coordinator.is_running() {
            info!("Waiting up to {:?} for the current scrape to finish", grace);
            let deadline = tokio::time::Instant::now() + grace;
            while self.coordinator.is_running() && tokio::time::Instant::now() < deadline {
                tokio::time::sleep(GRACE_POLL).await;
            }
            if self.coordinator.is_running() {
                warn!("Scrape still running after {:?}; leaving it to process exit", grace);
            }
        }

        info!("Scheduler stopped ({} jobs removed)", schedule.jobs.len());
        Ok(())
    }
}

/// Body of every scheduled job. Failures are logged only.
async fn run_trigger(coordinator: &ScrapeCoordinator, trigger: Trigger) {
    info!("Scheduled {:?} scrape starting", trigger);

    match coordinator.run_full_scrape().await {
        Ok(summary) => info!("Scheduled catalog scrape: {}", summary),
        Err(ScrapeError::AlreadyRunning) => {
            info!("Skipping scheduled scrape: another run is in progress");
            return;
        }
        Err(e) => error!("Scheduled catalog scrape failed: {}", e),
    }

    if let Trigger::Daily { include_upcoming: true } = trigger {
        match coordinator.run_upcoming_scrape().await {
            Ok(count) => info!("Scheduled upcoming scrape saved {} records", count),
            Err(e) => error!("Scheduled upcoming scrape failed: {}", e),
        }
    }
}
