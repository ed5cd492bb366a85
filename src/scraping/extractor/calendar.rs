//! Release calendar extraction
//!
//! The calendar page groups upcoming titles under date headings. Items are
//! located through the closest container holding only that heading, or
//! failing that, through the elements following the heading up to the next
//! heading.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use url::Url;

use super::cascade::{css, element_text, FieldCascade, FieldMapper};
use super::chart::canonical_title_url;
use super::detail::MAX_CAST;
use super::types::{ExtractError, RawCandidate};
use crate::scraping::normalize::{leading_date, parse_date};

static RE_TITLE_YEAR: OnceLock<Regex> = OnceLock::new();

/// Split `"Title (2025)"` at its last parenthesized year
pub fn split_title_year(text: &str) -> (String, Option<String>) {
    let re = RE_TITLE_YEAR.get_or_init(|| Regex::new(r"^(.*)\((\d{4})\)").unwrap());
    match re.captures(text) {
        Some(caps) => {
            let title = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
            let year = caps.get(2).map(|m| m.as_str().to_string());
            (title.to_string(), year)
        }
        None => (text.trim().to_string(), None),
    }
}

/// Extracts upcoming releases from the IMDb calendar
#[derive(Debug)]
pub struct CalendarExtractor {
    heading: Selector,
    item: Selector,
    title_link: Selector,
    any_title_link: Selector,
    genres: FieldCascade,
    cast: FieldCascade,
    poster: FieldCascade,
}

impl CalendarExtractor {
    pub fn new() -> Result<Self, ExtractError> {
        Ok(Self {
            heading: css("h3.ipc-title__text")?,
            item: css("li.ipc-metadata-list-summary-item")?,
            title_link: css("a.ipc-metadata-list-summary-item__t")?,
            any_title_link: css(r#"a[href*="/title/tt"]"#)?,
            genres: FieldCascade::new("genres")
                .then("ul.ipc-metadata-list-summary-item__tl li", FieldMapper::TextList)?,
            cast: FieldCascade::new("cast")
                .then("ul.ipc-metadata-list-summary-item__stl li", FieldMapper::TextList)?,
            poster: FieldCascade::new("poster").then("img.ipc-image", FieldMapper::Attr("src"))?,
        })
    }

    /// All titled items on the page, in document order
    pub fn extract(&self, html: &str, base: &Url) -> Vec<RawCandidate> {
        let document = Html::parse_document(html);
        let headings: Vec<ElementRef<'_>> = document.select(&self.heading).collect();
        tracing::debug!("Calendar: {} date headings", headings.len());

        let mut candidates = Vec::new();
        for heading in headings {
            let heading_text = element_text(heading);
            let items = self.items_for_heading(heading);
            if items.is_empty() {
                tracing::debug!("Calendar: no items under heading '{}'", heading_text);
                continue;
            }
            for item in items {
                match self.extract_item(item, &heading_text, base) {
                    Some(candidate) => candidates.push(candidate),
                    None => tracing::debug!("Calendar: skipping untitled item under '{}'", heading_text),
                }
            }
        }
        candidates
    }

    fn items_for_heading<'a>(&self, heading: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        // Closest ancestor owning this heading alone; a container shared with
        // other headings belongs to none of them
        let mut node = (*heading).parent();
        while let Some(el) = node.and_then(ElementRef::wrap) {
            if el.select(&self.heading).nth(1).is_some() {
                break;
            }
            let items: Vec<ElementRef<'a>> = el.select(&self.item).collect();
            if !items.is_empty() {
                return items;
            }
            node = (*el).parent();
        }

        // Headings share a container: scan forward from the heading, then from its parent
        let mut anchor = Some(heading);
        for _ in 0..2 {
            let Some(start) = anchor else { break };
            let items = self.items_after(start);
            if !items.is_empty() {
                return items;
            }
            anchor = (*start).parent().and_then(ElementRef::wrap);
        }
        Vec::new()
    }

    fn items_after<'a>(&self, start: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        let mut items = Vec::new();
        for sibling in (*start).next_siblings().filter_map(ElementRef::wrap) {
            if self.heading.matches(&sibling) || sibling.select(&self.heading).next().is_some() {
                break;
            }
            if self.item.matches(&sibling) {
                items.push(sibling);
            }
            items.extend(sibling.select(&self.item));
        }
        items
    }

    fn extract_item(&self, item: ElementRef<'_>, heading_text: &str, base: &Url) -> Option<RawCandidate> {
        let link = item
            .select(&self.title_link)
            .next()
            .or_else(|| item.select(&self.any_title_link).next())?;

        let (title, year) = split_title_year(&element_text(link));
        if title.is_empty() {
            return None;
        }

        let url = link.value().attr("href").and_then(|href| {
            canonical_title_url(base, href)
                .or_else(|| base.join(href).ok())
                .map(|u| u.to_string())
        });

        let item_text = element_text(item);
        let release_date = if parse_date(heading_text, 2000).is_some() {
            Some(heading_text.to_string())
        } else {
            leading_date(&item_text)
                .map(str::to_string)
                .or_else(|| (!heading_text.is_empty()).then(|| heading_text.to_string()))
        };

        let mut cast = self.cast.values(item);
        cast.truncate(MAX_CAST);

        Some(RawCandidate {
            url,
            title: Some(title),
            year,
            genres: self.genres.values(item),
            cast,
            poster_url: self.poster.first(item),
            release_date,
            ..RawCandidate::default()
        })
    }
}
