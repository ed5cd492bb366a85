use anyhow::Result;
use moviedex::App;
use tracing::info;

pub async fn scrape_catalog(app: &App) -> Result<()> {
    info!("Starting catalog scrape...");
    let summary = app.scrape_full_catalog().await?;

    println!("\nCatalog Scrape Results:");
    println!("=======================");
    println!(
        "{:<12} {:>6} {:>6} {:>8} {:>10} {:>8} {:>7}",
        "chart", "urls", "new", "updated", "unchanged", "skipped", "errors"
    );
    for chart in &summary.charts {
        println!(
            "{:<12} {:>6} {:>6} {:>8} {:>10} {:>8} {:>7}",
            chart.source.as_str(),
            chart.urls_discovered,
            chart.inserted,
            chart.updated,
            chart.unchanged,
            chart.skipped,
            chart.errors
        );
        if let Some(reason) = &chart.failure {
            println!("  chart page failed: {}", reason);
        }
    }
    println!();
    println!("Saved:    {}", summary.saved());
    println!("Errors:   {}", summary.total_errors());
    println!("Duration: {:.1}s", summary.duration.as_secs_f64());

    let stats = app.coordinator().fetcher().stats();
    println!(
        "Requests: {} ({} retries, {} bot challenges)",
        stats.total_requests, stats.retries, stats.bot_challenges
    );

    Ok(())
}

pub async fn scrape_upcoming(app: &App) -> Result<()> {
    info!("Starting upcoming scrape...");
    let saved = app.scrape_upcoming().await?;
    println!("Saved {} upcoming releases", saved);
    Ok(())
}
