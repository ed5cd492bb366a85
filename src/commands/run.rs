use anyhow::{Context, Result};
use moviedex::App;
use tracing::{error, info};

pub async fn run_scheduler(app: &App, initial_scrape: bool) -> Result<()> {
    if initial_scrape {
        // A failed first scrape should not keep the scheduler from starting
        if let Err(e) = app.scrape_if_empty().await {
            error!("Initial scrape failed: {:#}", e);
        }
    }

    app.scheduler().start().await?;
    info!("Scheduler running; press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutdown requested");

    app.scheduler().shutdown().await?;
    Ok(())
}
