//! Document store abstraction
//!
//! The pipeline only needs a small document-database surface: filtered
//! lookups, counting, inserts, and an atomic filter-plus-write upsert.
//! [`MemoryStore`] implements it in process with optional JSON persistence.

mod memory;
mod movies;
mod query;

pub use memory::MemoryStore;
pub use movies::{MovieStore, UpsertOutcome};

use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use thiserror::Error;

/// A stored document: a JSON object
pub type Document = serde_json::Map<String, Value>;

/// Field holding the store-assigned document id
pub const ID_FIELD: &str = "_id";

/// Errors raised by a document store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

/// One predicate of a [`Filter`]
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Field equals value
    Eq(String, Value),
    /// Array field contains value, or scalar field equals it
    Contains(String, Value),
    /// Case-insensitive substring match over any of the fields (strings or string arrays)
    Text { fields: Vec<String>, needle: String },
}

/// Conjunction of clauses; the empty filter matches everything
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push(Clause::Eq(field.into(), value.into()));
        self
    }

    pub fn contains(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push(Clause::Contains(field.into(), value.into()));
        self
    }

    pub fn text<I, S>(mut self, fields: I, needle: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.clauses.push(Clause::Text {
            fields: fields.into_iter().map(Into::into).collect(),
            needle: needle.into().to_lowercase(),
        });
        self
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Equality clauses, copied into a freshly upserted document
    pub fn equalities(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.clauses.iter().filter_map(|c| match c {
            Clause::Eq(field, value) => Some((field.as_str(), value)),
            _ => None,
        })
    }

    /// Whether `doc` satisfies every clause
    pub fn matches(&self, doc: &Document) -> bool {
        self.clauses.iter().all(|clause| match clause {
            Clause::Eq(field, value) => doc.get(field).unwrap_or(&Value::Null) == value,
            Clause::Contains(field, value) => match doc.get(field) {
                Some(Value::Array(items)) => items.contains(value),
                Some(other) => other == value,
                None => false,
            },
            Clause::Text { fields, needle } => fields.iter().any(|f| match doc.get(f) {
                Some(Value::String(s)) => s.to_lowercase().contains(needle.as_str()),
                Some(Value::Array(items)) => items.iter().any(|v| {
                    v.as_str()
                        .is_some_and(|s| s.to_lowercase().contains(needle.as_str()))
                }),
                _ => false,
            }),
        })
    }
}

/// Write description for [`DocumentStore::update_one`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    /// Fields overwritten on every write; a difference counts as a modification
    pub set: Document,
    /// Fields written only when the update inserts a new document
    pub set_on_insert: Document,
    /// Fields stamped with the current time on every write (never counted as a modification)
    pub current_date: Vec<String>,
    /// Fields stamped with the current time only on insert
    pub current_date_on_insert: Vec<String>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set.insert(field.into(), value.into());
        self
    }

    pub fn set_on_insert(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_on_insert.insert(field.into(), value.into());
        self
    }

    pub fn current_date(mut self, field: impl Into<String>) -> Self {
        self.current_date.push(field.into());
        self
    }

    pub fn current_date_on_insert(mut self, field: impl Into<String>) -> Self {
        self.current_date_on_insert.push(field.into());
        self
    }
}

/// Outcome of [`DocumentStore::update_one`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
    /// Id of the inserted document when the update upserted
    pub upserted_id: Option<String>,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Options for [`DocumentStore::find`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub sort: Option<(String, SortOrder)>,
    pub limit: Option<usize>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some((field.into(), order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Order two field values. Missing and null values sort last in either direction.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>, order: SortOrder) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    let ordering = match (a, b) {
        (None, None) => return Ordering::Equal,
        (Some(_), None) => return Ordering::Less,
        (None, Some(_)) => return Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    };
    match order {
        SortOrder::Ascending => ordering,
        SortOrder::Descending => ordering.reverse(),
    }
}

/// Minimal document-database interface consumed by the pipeline
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// First document matching `filter`
    async fn find_one(&self, filter: &Filter) -> Result<Option<Document>, StoreError>;

    /// All documents matching `filter`, sorted and limited per `options`
    async fn find(&self, filter: &Filter, options: &FindOptions) -> Result<Vec<Document>, StoreError>;

    /// Update the first matching document, or insert one when `upsert` is set and nothing matches.
    ///
    /// Implementations must perform the match and the write atomically.
    async fn update_one(&self, filter: &Filter, update: &Update, upsert: bool) -> Result<UpdateResult, StoreError>;

    /// Insert a document, returning its id
    async fn insert_one(&self, doc: Document) -> Result<String, StoreError>;

    /// Number of documents matching `filter`
    async fn count_documents(&self, filter: &Filter) -> Result<u64, StoreError>;
}
