//! Declarative selector fallback chains
//!
//! IMDb markup changes without notice, so every field is described as an
//! ordered list of `(selector, mapper)` steps. Steps are tried in order and
//! the first one producing a non-empty value wins.

use scraper::{ElementRef, Selector};

use super::types::ExtractError;
use crate::util::collapse_whitespace;

/// Compile a CSS selector
pub fn css(selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|e| ExtractError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// Visible text of an element, whitespace-collapsed
pub fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// How a matched element is turned into a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldMapper {
    /// Text of the first match with non-empty text
    Text,
    /// Attribute of the first match carrying a non-empty value
    Attr(&'static str),
    /// Text of every match, in document order
    TextList,
}

/// Ordered fallback chain for one field
#[derive(Debug, Clone)]
pub struct FieldCascade {
    field: &'static str,
    steps: Vec<(Selector, FieldMapper)>,
}

impl FieldCascade {
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            steps: Vec::new(),
        }
    }

    /// Append a step
    pub fn then(mut self, selector: &str, mapper: FieldMapper) -> Result<Self, ExtractError> {
        self.steps.push((css(selector)?, mapper));
        Ok(self)
    }

    /// Values of the first step that yields anything
    pub fn values(&self, root: ElementRef<'_>) -> Vec<String> {
        for (idx, (selector, mapper)) in self.steps.iter().enumerate() {
            let values = apply(root, selector, mapper);
            if !values.is_empty() {
                if idx > 0 {
                    tracing::trace!("{}: matched fallback step {}", self.field, idx);
                }
                return values;
            }
        }
        Vec::new()
    }

    /// First value of the first step that yields anything
    pub fn first(&self, root: ElementRef<'_>) -> Option<String> {
        self.values(root).into_iter().next()
    }
}

fn apply(root: ElementRef<'_>, selector: &Selector, mapper: &FieldMapper) -> Vec<String> {
    let mut matches = root.select(selector);
    match mapper {
        FieldMapper::Text => matches
            .map(element_text)
            .find(|t| !t.is_empty())
            .into_iter()
            .collect(),
        FieldMapper::Attr(name) => matches
            .find_map(|el| {
                el.value()
                    .attr(name)
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
            })
            .into_iter()
            .collect(),
        FieldMapper::TextList => matches
            .map(element_text)
            .filter(|t| !t.is_empty())
            .collect(),
    }
}
