//! Shared fixtures for integration tests: an offline site and HTML builders

#![allow(dead_code)]

use async_trait::async_trait;
use moviedex::config::{ChartConfig, Config};
use moviedex::scraping::fetcher::{PageTransport, RawResponse, TransportError};
use moviedex::types::ChartSource;
use parking_lot::Mutex;
use std::collections::HashMap;
use url::Url;

pub const CALENDAR_URL: &str = "https://www.imdb.com/calendar/?region=us";

/// In-memory website keyed by absolute URL; unknown URLs answer 404
#[derive(Default)]
pub struct FakeSite {
    pages: Mutex<HashMap<String, (u16, String)>>,
    requests: Mutex<Vec<String>>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self, url: &str, html: impl Into<String>) {
        self.pages.lock().insert(url.to_string(), (200, html.into()));
    }

    pub fn status(&self, url: &str, status: u16) {
        self.pages
            .lock()
            .insert(url.to_string(), (status, format!("HTTP {}", status)));
    }

    /// Every URL requested so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    pub fn hits(&self, url: &str) -> usize {
        self.requests.lock().iter().filter(|u| u.as_str() == url).count()
    }
}

#[async_trait]
impl PageTransport for FakeSite {
    async fn get(&self, url: &Url, _headers: &[(String, String)]) -> Result<RawResponse, TransportError> {
        self.requests.lock().push(url.to_string());
        let (status, body) = self
            .pages
            .lock()
            .get(url.as_str())
            .cloned()
            .unwrap_or_else(|| (404, "not found".to_string()));
        Ok(RawResponse {
            final_url: url.clone(),
            status,
            body,
        })
    }
}

pub fn title_url(id: &str) -> String {
    format!("https://www.imdb.com/title/{}/", id)
}

pub fn chart_url(source: &ChartSource) -> String {
    format!("https://www.imdb.com/chart/{}/", source.as_str())
}

/// Chart page in the current IMDb list markup
pub fn chart_page(ids: &[&str]) -> String {
    let items: String = ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            format!(
                r#"<li class="ipc-metadata-list-summary-item"><a class="ipc-title-link-wrapper" href="/title/{}/?ref_=chttp_t_{}">{}. Movie</a></li>"#,
                id,
                i + 1,
                i + 1
            )
        })
        .collect();
    format!(
        r#"<html><body><ul class="ipc-metadata-list">{}</ul></body></html>"#,
        items
    )
}

/// Title page with hero title, year, rating, genres and cast
pub fn detail_page(title: &str, year: &str, rating: &str, genres: &[&str], cast: &[&str]) -> String {
    let genres: String = genres
        .iter()
        .map(|g| format!(r#"<a class="ipc-chip"><span>{}</span></a>"#, g))
        .collect();
    let cast: String = cast
        .iter()
        .map(|c| format!(r#"<a data-testid="title-cast-item__actor" href="/name/nm1/">{}</a>"#, c))
        .collect();
    format!(
        r#"<html><head><meta property="og:title" content="{title} ({year}) - IMDb"></head>
        <body>
          <h1 data-testid="hero__pageTitle"><span>{title}</span></h1>
          <ul><li><a href="/title/x/releaseinfo">{year}</a></li></ul>
          <div data-testid="hero-rating-bar__aggregate-rating__score"><span>{rating}</span><span>/10</span></div>
          <div data-testid="genres">{genres}</div>
          <p data-testid="plot"><span data-testid="plot-xl">A movie called {title}.</span></p>
          <section>{cast}</section>
        </body></html>"#
    )
}

/// A page with nothing a movie detail extractor can use
pub const BROKEN_DETAIL: &str = "<html><body><p>Something went wrong</p></body></html>";

/// A page with a rating but no title anywhere
pub const UNTITLED_DETAIL: &str = r#"<html><body>
    <div data-testid="hero-rating-bar__aggregate-rating__score"><span>7.1</span></div>
  </body></html>"#;

pub const CALENDAR_PAGE: &str = r#"<html><body><article>
  <section>
    <h3 class="ipc-title__text">Dec 19, 2025</h3>
    <ul class="ipc-metadata-list">
      <li class="ipc-metadata-list-summary-item">
        <a class="ipc-metadata-list-summary-item__t" href="/title/tt1757678/?ref_=rlm">Avatar: Fire and Ash (2025)</a>
        <ul class="ipc-metadata-list-summary-item__tl"><li>Action</li><li>Adventure</li></ul>
      </li>
    </ul>
  </section>
  <section>
    <h3 class="ipc-title__text">Jul 18, 2025</h3>
    <ul class="ipc-metadata-list">
      <li class="ipc-metadata-list-summary-item">
        <a class="ipc-metadata-list-summary-item__t" href="/title/tt9603208/">Eddington (2025)</a>
        <ul class="ipc-metadata-list-summary-item__stl"><li>Joaquin Phoenix</li></ul>
      </li>
      <li class="ipc-metadata-list-summary-item">
        <a class="ipc-metadata-list-summary-item__t" href="/title/tt31193180/">Smurfs (2025)</a>
      </li>
    </ul>
  </section>
</article></body></html>"#;

/// Offline-friendly configuration: no pacing, no backoff, in-memory store
pub fn test_config(charts: &[ChartSource]) -> Config {
    let mut config = Config::default();
    config.scraping.request_delay_ms = 0;
    config.scraping.backoff_secs = 0;
    config.scraping.captcha_backoff_secs = 0;
    config.scraping.max_attempts = 2;
    config.scraping.calendar_url = CALENDAR_URL.to_string();
    config.scraping.charts = charts
        .iter()
        .map(|source| ChartConfig::new(source.clone(), chart_url(source), 25))
        .collect();
    config.store.persist = false;
    config
}
