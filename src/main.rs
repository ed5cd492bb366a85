//! Moviedex: scheduled IMDb chart and calendar scraper
//!
//! Command-line entry point.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use moviedex::{config::Config, logging::init_logging, App};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "moviedex")]
#[command(about = "Scrape IMDb charts and release calendars into a local movie store")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "moviedex.toml")]
    config: PathBuf,

    /// Data directory
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape every configured chart once
    Scrape,

    /// Scrape the upcoming-releases calendar once
    Upcoming,

    /// Run the scheduler in the foreground until Ctrl-C
    Run {
        /// Skip the initial scrape even when the store is empty
        #[arg(long)]
        no_initial: bool,
    },

    /// List stored movies
    List {
        /// Only records discovered on this chart (e.g. top_250, horror)
        #[arg(long, conflicts_with_all = ["genre", "upcoming", "search"])]
        chart: Option<String>,

        /// Only records tagged with this genre
        #[arg(long, conflicts_with_all = ["upcoming", "search"])]
        genre: Option<String>,

        /// Upcoming releases, soonest first
        #[arg(long, conflicts_with = "search")]
        upcoming: bool,

        /// Free-text search over title, plot, director and cast
        #[arg(short, long)]
        search: Option<String>,

        /// Maximum number of records
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show store statistics
    Stats,

    /// Write a default configuration file
    Init {
        /// Output directory
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init { path } = &cli.command {
        return commands::init::init_config(path);
    }

    let mut config = Config::load_or_default(&cli.config)?;
    if let Some(data_dir) = cli.data_dir {
        config.store.data_dir = data_dir;
    }
    init_logging(&config.logging, cli.verbose)?;

    let app = App::new(config)?;

    match cli.command {
        Commands::Scrape => commands::scrape::scrape_catalog(&app).await,
        Commands::Upcoming => commands::scrape::scrape_upcoming(&app).await,
        Commands::Run { no_initial } => commands::run::run_scheduler(&app, !no_initial).await,
        Commands::List {
            chart,
            genre,
            upcoming,
            search,
            limit,
            format,
        } => {
            let selection = if let Some(chart) = chart {
                commands::list::Selection::Chart(chart.parse()?)
            } else if let Some(genre) = genre {
                commands::list::Selection::Genre(genre)
            } else if upcoming {
                commands::list::Selection::Upcoming
            } else if let Some(text) = search {
                commands::list::Selection::Search(text)
            } else {
                commands::list::Selection::Latest
            };
            commands::list::list_movies(&app, selection, limit, &format).await
        }
        Commands::Stats => commands::stats::show_stats(&app).await,
        Commands::Init { .. } => Ok(()),
    }
}
