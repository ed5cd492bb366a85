use anyhow::Result;
use moviedex::{types::RecordType, App};
use tracing::info;

pub async fn show_stats(app: &App) -> Result<()> {
    info!("Loading store statistics...");
    let config = app.config();
    let movies = app.movies();

    let catalog = movies.count(RecordType::Catalog).await?;
    let upcoming = movies.count(RecordType::Upcoming).await?;

    println!("\nMoviedex Statistics:");
    println!("====================");
    if config.store.persist {
        println!("Store file: {}", config.store.collection_path().display());
    } else {
        println!("Store file: (in-memory)");
    }
    println!("Catalog movies:    {}", catalog);
    println!("Upcoming releases: {}", upcoming);

    println!("\nCharts:");
    for chart in &config.scraping.charts {
        let found = movies.by_chart(&chart.source, usize::MAX).await?.len();
        println!("  {:<12} {:>5}  {}", chart.source.as_str(), found, chart.url);
    }

    if let Some(latest) = movies.latest(1).await?.first() {
        if let Some(at) = latest.scraped_at {
            println!("\nLast scraped: {}", at.to_rfc3339());
        }
    }

    Ok(())
}
