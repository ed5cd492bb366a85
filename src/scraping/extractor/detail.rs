//! Detail page extraction
//!
//! Each field has its own selector cascade. Structured data embedded as
//! JSON-LD is consulted last, only for fields every selector missed.

use scraper::{Html, Selector};
use serde_json::Value;

use super::cascade::{css, FieldCascade, FieldMapper};
use super::types::{ExtractError, RawCandidate};

/// Maximum cast entries taken from one page
pub const MAX_CAST: usize = 10;

/// Extracts one movie from an IMDb title page
#[derive(Debug)]
pub struct DetailExtractor {
    title: FieldCascade,
    year: FieldCascade,
    rating: FieldCascade,
    plot: FieldCascade,
    genres: FieldCascade,
    director: FieldCascade,
    cast: FieldCascade,
    poster: FieldCascade,
    json_ld: Selector,
}

impl DetailExtractor {
    pub fn new() -> Result<Self, ExtractError> {
        use FieldMapper::{Attr, Text, TextList};

        Ok(Self {
            title: FieldCascade::new("title")
                .then(r#"h1[data-testid="hero__pageTitle"]"#, Text)?
                .then(r#"h1[data-testid="hero-title-block__title"]"#, Text)?
                .then("h1", Text)?
                .then(r#"meta[property="og:title"]"#, Attr("content"))?,
            year: FieldCascade::new("year")
                .then(r#"a[href*="releaseinfo"]"#, Text)?
                .then(r#"[data-testid="hero-title-block__metadata"] li"#, Text)?,
            rating: FieldCascade::new("rating")
                .then(
                    r#"div[data-testid="hero-rating-bar__aggregate-rating__score"] span"#,
                    Text,
                )?
                .then(r#"[itemprop="ratingValue"]"#, Text)?,
            plot: FieldCascade::new("plot")
                .then(r#"[data-testid="plot"] span[data-testid^="plot-"]"#, Text)?
                .then(r#"p[data-testid="plot"]"#, Text)?
                .then(r#"meta[property="og:description"]"#, Attr("content"))?,
            genres: FieldCascade::new("genres")
                .then(r#"div[data-testid="genres"] a"#, TextList)?
                .then(r#"div[data-testid="interests"] a"#, TextList)?
                .then(r#"[itemprop="genre"]"#, TextList)?,
            director: FieldCascade::new("director")
                .then(r#"a[href*="tt_ov_dr"]"#, Text)?
                .then(
                    r#"li[data-testid="title-pc-principal-credit"] a.ipc-metadata-list-item__list-content-item"#,
                    Text,
                )?,
            cast: FieldCascade::new("cast")
                .then(r#"a[data-testid="title-cast-item__actor"]"#, TextList)?
                .then(r#"[itemprop="actor"]"#, TextList)?,
            poster: FieldCascade::new("poster")
                .then(r#"img[data-testid="hero-media__poster"]"#, Attr("src"))?
                .then(r#"div[data-testid="hero-media__poster"] img"#, Attr("src"))?
                .then(r#"meta[property="og:image"]"#, Attr("content"))?,
            json_ld: css(r#"script[type="application/ld+json"]"#)?,
        })
    }

    /// Extract a candidate from a detail page.
    ///
    /// Fields no cascade can resolve stay absent. A page on which nothing at
    /// all resolves is reported as [`ExtractError::NoMovieData`].
    pub fn extract(&self, html: &str, url: &str) -> Result<RawCandidate, ExtractError> {
        let document = Html::parse_document(html);
        let root = document.root_element();

        let mut candidate = RawCandidate {
            url: Some(url.to_string()),
            title: self.title.first(root),
            year: self.year.first(root),
            rating: self.rating.first(root),
            plot: self.plot.first(root),
            genres: self.genres.values(root),
            director: self.director.first(root),
            cast: self.cast.values(root),
            poster_url: self.poster.first(root),
            release_date: None,
        };

        if let Some(movie) = self.structured_data(&document) {
            movie.fill_missing(&mut candidate);
        }

        candidate.cast.truncate(MAX_CAST);

        if candidate.is_empty() {
            tracing::warn!("No movie data found on {}", url);
            return Err(ExtractError::NoMovieData(url.to_string()));
        }
        Ok(candidate)
    }

    fn structured_data(&self, document: &Html) -> Option<JsonLdMovie> {
        document
            .select(&self.json_ld)
            .filter_map(|script| {
                let text = script.text().collect::<String>();
                match serde_json::from_str::<Value>(&text) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        tracing::debug!("Ignoring malformed JSON-LD block: {}", e);
                        None
                    }
                }
            })
            .find_map(|value| find_movie_object(&value).map(JsonLdMovie::from_object))
    }
}

/// Locate the Movie-like object in a JSON-LD value, walking `@graph` arrays
fn find_movie_object(value: &Value) -> Option<&serde_json::Map<String, Value>> {
    match value {
        Value::Object(map) => {
            let is_movie = map
                .get("@type")
                .map(|t| type_matches(t, &["Movie", "TVSeries", "TVMovie", "CreativeWork"]))
                .unwrap_or(false);
            if is_movie {
                return Some(map);
            }
            map.get("@graph").and_then(find_movie_object)
        }
        Value::Array(items) => items.iter().find_map(find_movie_object),
        _ => None,
    }
}

fn type_matches(value: &Value, wanted: &[&str]) -> bool {
    match value {
        Value::String(s) => wanted.contains(&s.as_str()),
        Value::Array(items) => items.iter().any(|v| type_matches(v, wanted)),
        _ => false,
    }
}

/// The subset of schema.org fields used as fallbacks
#[derive(Debug, Default)]
struct JsonLdMovie {
    name: Option<String>,
    date_published: Option<String>,
    rating: Option<String>,
    description: Option<String>,
    genres: Vec<String>,
    directors: Vec<String>,
    actors: Vec<String>,
    image: Option<String>,
}

impl JsonLdMovie {
    fn from_object(map: &serde_json::Map<String, Value>) -> Self {
        Self {
            name: map.get("name").and_then(scalar),
            date_published: map.get("datePublished").and_then(scalar),
            rating: map
                .get("aggregateRating")
                .and_then(|r| r.get("ratingValue"))
                .and_then(scalar),
            description: map.get("description").and_then(scalar),
            genres: map.get("genre").map(strings).unwrap_or_default(),
            directors: map.get("director").map(names).unwrap_or_default(),
            actors: map.get("actor").map(names).unwrap_or_default(),
            image: map.get("image").and_then(|v| match v {
                Value::Object(o) => o.get("url").and_then(scalar),
                other => scalar(other),
            }),
        }
    }

    fn fill_missing(self, candidate: &mut RawCandidate) {
        fn fill(slot: &mut Option<String>, value: Option<String>) {
            if slot.is_none() {
                *slot = value;
            }
        }

        fill(&mut candidate.title, self.name);
        fill(&mut candidate.year, self.date_published);
        fill(&mut candidate.rating, self.rating);
        fill(&mut candidate.plot, self.description);
        fill(&mut candidate.director, self.directors.into_iter().next());
        fill(&mut candidate.poster_url, self.image);
        if candidate.genres.is_empty() {
            candidate.genres = self.genres;
        }
        if candidate.cast.is_empty() {
            candidate.cast = self.actors;
        }
    }
}

/// A string or number rendered as trimmed text
fn scalar(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// A string or list of strings
fn strings(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(scalar).collect(),
        other => scalar(other).into_iter().collect(),
    }
}

/// Person names from an object or list of objects with a `name` key
fn names(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().flat_map(names).collect(),
        Value::Object(map) => map.get("name").and_then(scalar).into_iter().collect(),
        other => scalar(other).into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://www.imdb.com/title/tt0068646/";

    fn extractor() -> DetailExtractor {
        DetailExtractor::new().unwrap()
    }

    #[test]
    fn test_extracts_hero_markup() {
        let html = r#"
            <h1 data-testid="hero__pageTitle"><span>The Godfather</span></h1>
            <ul><li><a href="/title/tt0068646/releaseinfo">1972</a></li></ul>
            <div data-testid="hero-rating-bar__aggregate-rating__score"><span>9.2</span><span>/10</span></div>
            <div data-testid="genres"><a>Crime</a><a>Drama</a></div>
            <p data-testid="plot"><span data-testid="plot-xl">The aging patriarch of an organized crime dynasty transfers control.</span></p>
            <a href="/name/nm0000338/?ref_=tt_ov_dr">Francis Ford Coppola</a>
            <a data-testid="title-cast-item__actor">Marlon Brando</a>
            <a data-testid="title-cast-item__actor">Al Pacino</a>
            <div data-testid="hero-media__poster"><img src="https://m.media-amazon.com/godfather.jpg"></div>
        "#;

        let c = extractor().extract(html, URL).unwrap();
        assert_eq!(c.title.as_deref(), Some("The Godfather"));
        assert_eq!(c.year.as_deref(), Some("1972"));
        assert_eq!(c.rating.as_deref(), Some("9.2"));
        assert_eq!(c.genres, vec!["Crime", "Drama"]);
        assert!(c.plot.unwrap().starts_with("The aging patriarch"));
        assert_eq!(c.director.as_deref(), Some("Francis Ford Coppola"));
        assert_eq!(c.cast, vec!["Marlon Brando", "Al Pacino"]);
        assert_eq!(c.poster_url.as_deref(), Some("https://m.media-amazon.com/godfather.jpg"));
        assert_eq!(c.url.as_deref(), Some(URL));
    }

    #[test]
    fn test_cast_is_capped() {
        let actors: String = (0..25)
            .map(|i| format!(r#"<a data-testid="title-cast-item__actor">Actor {}</a>"#, i))
            .collect();
        let html = format!("<h1>Crowd</h1>{}", actors);

        let c = extractor().extract(&html, URL).unwrap();
        assert_eq!(c.cast.len(), MAX_CAST);
        assert_eq!(c.cast[0], "Actor 0");
        assert_eq!(c.cast[9], "Actor 9");
    }

    #[test]
    fn test_json_ld_fills_missing_fields() {
        let html = r#"
            <html><head>
            <script type="application/ld+json">{not json</script>
            <script type="application/ld+json">
            {"@context":"https://schema.org","@type":"Movie","name":"Heat",
             "image":"https://m.media-amazon.com/heat.jpg",
             "description":"A group of high-end professional thieves.",
             "aggregateRating":{"@type":"AggregateRating","ratingValue":8.3},
             "genre":["Action","Crime"],
             "datePublished":"1995-12-15",
             "director":[{"@type":"Person","name":"Michael Mann"}],
             "actor":[{"@type":"Person","name":"Al Pacino"},{"@type":"Person","name":"Robert De Niro"}]}
            </script></head><body></body></html>"#;

        let c = extractor().extract(html, URL).unwrap();
        assert_eq!(c.title.as_deref(), Some("Heat"));
        assert_eq!(c.rating.as_deref(), Some("8.3"));
        assert_eq!(c.genres, vec!["Action", "Crime"]);
        assert_eq!(c.year.as_deref(), Some("1995-12-15"));
        assert_eq!(c.director.as_deref(), Some("Michael Mann"));
        assert_eq!(c.cast, vec!["Al Pacino", "Robert De Niro"]);
        assert_eq!(c.poster_url.as_deref(), Some("https://m.media-amazon.com/heat.jpg"));
    }

    #[test]
    fn test_selectors_take_precedence_over_json_ld() {
        let html = r#"
            <script type="application/ld+json">{"@type":"Movie","name":"Wrong Title","genre":"Horror"}</script>
            <h1>Right Title</h1>"#;
        let c = extractor().extract(html, URL).unwrap();
        assert_eq!(c.title.as_deref(), Some("Right Title"));
        assert_eq!(c.genres, vec!["Horror"]);
    }

    #[test]
    fn test_partial_page_is_not_an_error() {
        let html = r#"<div data-testid="genres"><a>Drama</a></div>"#;
        let c = extractor().extract(html, URL).unwrap();
        assert!(c.title.is_none());
        assert_eq!(c.genres, vec!["Drama"]);
    }

    #[test]
    fn test_page_without_movie_data() {
        let err = extractor()
            .extract("<html><body><p>Service unavailable</p></body></html>", URL)
            .unwrap_err();
        assert!(matches!(err, ExtractError::NoMovieData(_)));
    }
}
