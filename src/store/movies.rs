//! Movie upsert adapter over a [`DocumentStore`]

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use super::{DocumentStore, Filter, StoreError, Update};
use crate::types::{MovieRecord, RecordType};

/// Fields owned by the adapter rather than taken from the record
const MANAGED_FIELDS: &[&str] = &["identity", "recordType", "scrapedAt", "lastUpdated", "createdAt"];

/// What an upsert did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpsertOutcome {
    /// No document existed; one was created
    Inserted,
    /// A document existed and at least one field changed
    Updated,
    /// A document existed and every field already matched (timestamps were still refreshed)
    Unchanged,
}

impl fmt::Display for UpsertOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Inserted => "inserted",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
        })
    }
}

/// Sole writer of movie documents.
///
/// Documents are keyed by `(identity, recordType)`, so a catalog entry and an
/// upcoming entry for the same movie are distinct.
#[derive(Clone)]
pub struct MovieStore {
    store: Arc<dyn DocumentStore>,
}

impl MovieStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Underlying document store
    pub fn documents(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Filter selecting the document for one identity and record type
    pub fn key_filter(identity: &str, record_type: RecordType) -> Filter {
        Filter::new()
            .field("identity", identity)
            .field("recordType", record_type.as_str())
    }

    /// Insert or update `record` in one atomic store call.
    ///
    /// Every mutable field is written, absent ones as `null`. `createdAt` is
    /// only written on insert; `scrapedAt` and `lastUpdated` on every call.
    pub async fn upsert(&self, record: &MovieRecord) -> Result<UpsertOutcome, StoreError> {
        let filter = Self::key_filter(&record.identity, record.record_type);

        let mut update = Update::new()
            .current_date("scrapedAt")
            .current_date("lastUpdated")
            .current_date_on_insert("createdAt");
        match serde_json::to_value(record)? {
            Value::Object(fields) => {
                for (field, value) in fields {
                    if !MANAGED_FIELDS.contains(&field.as_str()) {
                        update.set.insert(field, value);
                    }
                }
            }
            other => {
                return Err(StoreError::InvalidDocument(format!(
                    "record serialized to non-object {}",
                    other
                )))
            }
        }

        let result = self.store.update_one(&filter, &update, true).await?;
        let outcome = if result.upserted_id.is_some() {
            UpsertOutcome::Inserted
        } else if result.modified_count > 0 {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Unchanged
        };
        tracing::debug!(
            "Upsert {} [{}] '{}': {}",
            record.identity,
            record.record_type,
            record.title,
            outcome
        );
        Ok(outcome)
    }
}
