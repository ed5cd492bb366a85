use anyhow::Result;
use moviedex::{types::ChartSource, util::truncate_str, App, MovieRecord};

/// Which records to list
pub enum Selection {
    Latest,
    Chart(ChartSource),
    Genre(String),
    Upcoming,
    Search(String),
}

pub async fn list_movies(app: &App, selection: Selection, limit: usize, format: &str) -> Result<()> {
    let movies = app.movies();
    let records = match &selection {
        Selection::Latest => movies.latest(limit).await?,
        Selection::Chart(chart) => movies.by_chart(chart, limit).await?,
        Selection::Genre(genre) => movies.by_genre(genre, limit).await?,
        Selection::Upcoming => movies.upcoming(limit).await?,
        Selection::Search(text) => movies.search(text, limit).await?,
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&records)?),
        _ => print_text(&records, matches!(selection, Selection::Upcoming)),
    }
    Ok(())
}

fn print_text(records: &[MovieRecord], upcoming: bool) {
    if records.is_empty() {
        println!("No movies found.");
        return;
    }

    for (i, record) in records.iter().enumerate() {
        let year = record.year.as_deref().map(|y| format!(" ({})", y)).unwrap_or_default();
        println!("{:>3}. {}{}  [{}]", i + 1, record.title, year, record.identity);

        if upcoming {
            let date = record
                .release_date
                .as_ref()
                .map(|d| d.display())
                .unwrap_or_else(|| "TBA".to_string());
            println!("     Release: {}", date);
        } else if let Some(rating) = record.rating {
            let flag = if record.has_suspect_rating() { " (?)" } else { "" };
            println!("     Rating:  {:.1}{}", rating, flag);
        }
        if !record.genres.is_empty() {
            println!("     Genres:  {}", record.genres.join(", "));
        }
        if let Some(director) = &record.director {
            println!("     Director: {}", director);
        }
        if let Some(plot) = &record.plot {
            println!("     {}", truncate_str(plot, 120));
        }
    }
}
