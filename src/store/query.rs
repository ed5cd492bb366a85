//! Read-side catalog queries

use tracing::warn;

use super::{Document, DocumentStore, Filter, FindOptions, MovieStore, SortOrder, StoreError};
use crate::types::{cmp_release_dates, ChartSource, MovieRecord, RecordType};

/// Fields covered by free-text search
const SEARCH_FIELDS: &[&str] = &["title", "plot", "director", "cast"];

impl MovieStore {
    /// Most recently scraped catalog records
    pub async fn latest(&self, limit: usize) -> Result<Vec<MovieRecord>, StoreError> {
        let filter = Filter::new().field("recordType", RecordType::Catalog.as_str());
        let options = FindOptions::new().sort("scrapedAt", SortOrder::Descending).limit(limit);
        self.find_records(&filter, &options).await
    }

    /// Catalog records discovered on one chart, most recently scraped first
    pub async fn by_chart(&self, chart: &ChartSource, limit: usize) -> Result<Vec<MovieRecord>, StoreError> {
        let filter = Filter::new()
            .field("recordType", RecordType::Catalog.as_str())
            .field("chartSource", chart.as_str());
        let options = FindOptions::new().sort("scrapedAt", SortOrder::Descending).limit(limit);
        self.find_records(&filter, &options).await
    }

    /// Catalog records tagged with `genre`, best rated first
    pub async fn by_genre(&self, genre: &str, limit: usize) -> Result<Vec<MovieRecord>, StoreError> {
        let filter = Filter::new()
            .field("recordType", RecordType::Catalog.as_str())
            .contains("genres", genre.trim().to_lowercase());
        let options = FindOptions::new().sort("rating", SortOrder::Descending).limit(limit);
        self.find_records(&filter, &options).await
    }

    /// Case-insensitive substring search over title, plot, director and cast
    pub async fn search(&self, text: &str, limit: usize) -> Result<Vec<MovieRecord>, StoreError> {
        let filter = Filter::new().text(SEARCH_FIELDS.iter().copied(), text.trim());
        let options = FindOptions::new().limit(limit);
        self.find_records(&filter, &options).await
    }

    /// Upcoming releases, earliest first; unparseable dates last
    pub async fn upcoming(&self, limit: usize) -> Result<Vec<MovieRecord>, StoreError> {
        let filter = Filter::new().field("recordType", RecordType::Upcoming.as_str());
        let mut records = self.find_records(&filter, &FindOptions::new()).await?;
        records.sort_by(|a, b| cmp_release_dates(a.release_date.as_ref(), b.release_date.as_ref()));
        records.truncate(limit);
        Ok(records)
    }

    /// Number of records of one type
    pub async fn count(&self, record_type: RecordType) -> Result<u64, StoreError> {
        self.documents()
            .count_documents(&Filter::new().field("recordType", record_type.as_str()))
            .await
    }

    /// One record by identity
    pub async fn get(&self, identity: &str, record_type: RecordType) -> Result<Option<MovieRecord>, StoreError> {
        let doc = self
            .documents()
            .find_one(&Self::key_filter(identity, record_type))
            .await?;
        Ok(doc.and_then(decode))
    }

    async fn find_records(&self, filter: &Filter, options: &FindOptions) -> Result<Vec<MovieRecord>, StoreError> {
        // Limit after decoding so skipped documents don't shrink the page
        let unlimited = FindOptions {
            sort: options.sort.clone(),
            limit: None,
        };
        let docs = self.documents().find(filter, &unlimited).await?;
        let records = docs.into_iter().filter_map(decode);
        Ok(match options.limit {
            Some(limit) => records.take(limit).collect(),
            None => records.collect(),
        })
    }
}

/// Decode a stored document, skipping ones that no longer fit the record shape
fn decode(doc: Document) -> Option<MovieRecord> {
    let id = doc.get(super::ID_FIELD).cloned();
    match serde_json::from_value(serde_json::Value::Object(doc)) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("Skipping malformed movie document {:?}: {}", id, e);
            None
        }
    }
}
