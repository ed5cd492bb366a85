//! Chart page extraction: discover detail-page URLs

use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::OnceLock;
use url::Url;

use super::cascade::css;
use super::types::ExtractError;
use crate::config::ChartConfig;

static RE_TITLE_PATH: OnceLock<Regex> = OnceLock::new();

const FALLBACK_ITEM_SELECTOR: &str = "ul.ipc-metadata-list li";
const FALLBACK_LINK_SELECTOR: &str = "a.ipc-title-link-wrapper";
const ANY_TITLE_LINK_SELECTOR: &str = r#"a[href*="/title/tt"]"#;

/// Canonical detail-page URL for an href, or `None` if it is not a title link.
///
/// Query strings and fragments are dropped and the path is reduced to
/// `/title/tt…/`, so the same movie linked with different tracking
/// parameters resolves to a single URL.
pub fn canonical_title_url(base: &Url, href: &str) -> Option<Url> {
    let re = RE_TITLE_PATH.get_or_init(|| Regex::new(r"^/title/(tt\d+)").unwrap());
    let resolved = base.join(href.trim()).ok()?;
    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }
    let id = re.captures(resolved.path())?.get(1)?.as_str().to_string();
    let mut canonical = resolved;
    canonical.set_query(None);
    canonical.set_fragment(None);
    canonical.set_path(&format!("/title/{}/", id));
    Some(canonical)
}

/// Extracts detail-page links from chart and search-result pages
#[derive(Debug)]
pub struct ChartExtractor {
    fallback_item: Selector,
    fallback_link: Selector,
    any_title_link: Selector,
}

impl ChartExtractor {
    pub fn new() -> Result<Self, ExtractError> {
        Ok(Self {
            fallback_item: css(FALLBACK_ITEM_SELECTOR)?,
            fallback_link: css(FALLBACK_LINK_SELECTOR)?,
            any_title_link: css(ANY_TITLE_LINK_SELECTOR)?,
        })
    }

    /// Up to `chart.limit` distinct detail URLs, in page order.
    ///
    /// Tries the chart's own selectors first, then the stock IMDb list
    /// markup, then any `/title/tt…` link on the page.
    pub fn extract(&self, html: &str, base: &Url, chart: &ChartConfig) -> Result<Vec<Url>, ExtractError> {
        let document = Html::parse_document(html);
        let item = css(&chart.item_selector)?;
        let link = css(&chart.link_selector)?;

        let mut urls = self.from_items(&document, base, &item, &link, chart.limit);
        if urls.is_empty() {
            tracing::debug!(
                "Chart '{}': configured selectors found nothing, trying stock list markup",
                chart.source
            );
            urls = self.from_items(
                &document,
                base,
                &self.fallback_item,
                &self.fallback_link,
                chart.limit,
            );
        }
        if urls.is_empty() {
            tracing::debug!("Chart '{}': falling back to any title link", chart.source);
            urls = collect_links(
                document.select(&self.any_title_link).filter_map(|a| a.value().attr("href")),
                base,
                chart.limit,
            );
        }

        Ok(urls)
    }

    fn from_items(
        &self,
        document: &Html,
        base: &Url,
        item: &Selector,
        link: &Selector,
        limit: usize,
    ) -> Vec<Url> {
        let hrefs = document.select(item).filter_map(|li| {
            li.select(link)
                .next()
                .and_then(|a| a.value().attr("href"))
        });
        collect_links(hrefs, base, limit)
    }
}

fn collect_links<'a>(hrefs: impl Iterator<Item = &'a str>, base: &Url, limit: usize) -> Vec<Url> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();
    for href in hrefs {
        if urls.len() >= limit {
            break;
        }
        match canonical_title_url(base, href) {
            Some(url) => {
                if seen.insert(url.as_str().to_string()) {
                    urls.push(url);
                }
            }
            None => tracing::trace!("Skipping non-title link {}", href),
        }
    }
    urls
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChartSource;

    fn base() -> Url {
        Url::parse("https://www.imdb.com/chart/top/").unwrap()
    }

    fn chart(limit: usize) -> ChartConfig {
        ChartConfig::new(ChartSource::Top250, "https://www.imdb.com/chart/top/", limit)
    }

    const CHART_HTML: &str = r#"
        <ul class="ipc-metadata-list">
          <li><a class="ipc-title-link-wrapper" href="/title/tt0111161/?ref_=chttp_t_1">1. The Shawshank Redemption</a></li>
          <li><a class="ipc-title-link-wrapper" href="/title/tt0068646/?ref_=chttp_t_2">2. The Godfather</a></li>
          <li><a class="ipc-title-link-wrapper" href="/title/tt0111161/?ref_=dup">dup</a></li>
          <li><a class="ipc-title-link-wrapper" href="/name/nm0000209/">Tim Robbins</a></li>
          <li><a class="ipc-title-link-wrapper" href="https://www.imdb.com/title/tt0468569/">3. The Dark Knight</a></li>
        </ul>"#;

    #[test]
    fn test_extracts_distinct_title_urls() {
        let urls = ChartExtractor::new()
            .unwrap()
            .extract(CHART_HTML, &base(), &chart(10))
            .unwrap();
        let shown: Vec<&str> = urls.iter().map(Url::as_str).collect();
        assert_eq!(
            shown,
            vec![
                "https://www.imdb.com/title/tt0111161/",
                "https://www.imdb.com/title/tt0068646/",
                "https://www.imdb.com/title/tt0468569/",
            ]
        );
    }

    #[test]
    fn test_respects_limit() {
        let urls = ChartExtractor::new()
            .unwrap()
            .extract(CHART_HTML, &base(), &chart(2))
            .unwrap();
        assert_eq!(urls.len(), 2);
    }

    #[test]
    fn test_falls_back_to_any_title_link() {
        let html = r#"<div class="lister"><h3><a href="/title/tt0133093/">The Matrix</a></h3>
                      <a href="/title/tt0133093/reviews">reviews</a></div>"#;
        let urls = ChartExtractor::new()
            .unwrap()
            .extract(html, &base(), &chart(10))
            .unwrap();
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].as_str(), "https://www.imdb.com/title/tt0133093/");
    }

    #[test]
    fn test_canonical_title_url_rejects_other_links() {
        assert!(canonical_title_url(&base(), "/name/nm0000209/").is_none());
        assert!(canonical_title_url(&base(), "mailto:someone@example.com").is_none());
        assert_eq!(
            canonical_title_url(&base(), "/title/tt0000001?x=1#top").unwrap().as_str(),
            "https://www.imdb.com/title/tt0000001/"
        );
    }
}
