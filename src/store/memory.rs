//! In-process document store with optional JSON file persistence

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{
    compare_values, Document, DocumentStore, Filter, FindOptions, StoreError, Update,
    UpdateResult, ID_FIELD,
};

/// Document collection held behind a single lock.
///
/// Every write (including the match step of an upsert) happens under one
/// write lock, so concurrent upserts for the same filter never double-insert.
/// When a path is configured the whole collection is rewritten on each
/// write, and a write that cannot be saved is undone before the error is
/// returned.
pub struct MemoryStore {
    docs: RwLock<Vec<Document>>,
    path: Option<PathBuf>,
}

impl MemoryStore {
    /// Empty, non-persistent store
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(Vec::new()),
            path: None,
        }
    }

    /// Open a persistent store, loading `path` if it exists
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let docs: Vec<Document> = if path.exists() {
            let data = std::fs::read_to_string(&path)?;
            if data.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&data)?
            }
        } else {
            Vec::new()
        };

        info!("Opened document store {} ({} documents)", path.display(), docs.len());

        Ok(Self {
            docs: RwLock::new(docs),
            path: Some(path),
        })
    }

    /// Backing file, if persistent
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of documents held
    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }

    /// Write the collection to its backing file (no-op when not persistent)
    pub fn save(&self) -> Result<(), StoreError> {
        let docs = self.docs.read();
        self.persist(&docs)
    }

    fn persist(&self, docs: &[Document]) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let data = serde_json::to_string_pretty(docs)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, path)?;
        debug!("Saved {} documents to {}", docs.len(), path.display());
        Ok(())
    }

    fn push_saved(&self, docs: &mut Vec<Document>, doc: Document) -> Result<(), StoreError> {
        docs.push(doc);
        if let Err(e) = self.persist(docs) {
            docs.pop();
            return Err(e);
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn now_timestamp() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_one(&self, filter: &Filter) -> Result<Option<Document>, StoreError> {
        Ok(self.docs.read().iter().find(|d| filter.matches(d)).cloned())
    }

    async fn find(&self, filter: &Filter, options: &FindOptions) -> Result<Vec<Document>, StoreError> {
        let mut matched: Vec<Document> = self
            .docs
            .read()
            .iter()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect();

        if let Some((field, order)) = &options.sort {
            matched.sort_by(|a, b| compare_values(a.get(field), b.get(field), *order));
        }
        if let Some(limit) = options.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    async fn update_one(&self, filter: &Filter, update: &Update, upsert: bool) -> Result<UpdateResult, StoreError> {
        let mut docs = self.docs.write();
        let now = now_timestamp();

        if let Some(index) = docs.iter().position(|d| filter.matches(d)) {
            let mut changed = docs[index].clone();
            let mut modified = false;
            for (field, value) in &update.set {
                if changed.get(field) != Some(value) {
                    changed.insert(field.clone(), value.clone());
                    modified = true;
                }
            }
            for field in &update.current_date {
                changed.insert(field.clone(), now.clone());
            }
            let previous = std::mem::replace(&mut docs[index], changed);
            if let Err(e) = self.persist(&docs) {
                docs[index] = previous;
                return Err(e);
            }
            return Ok(UpdateResult {
                matched_count: 1,
                modified_count: u64::from(modified),
                upserted_id: None,
            });
        }

        if !upsert {
            return Ok(UpdateResult::default());
        }

        let id = new_id();
        let mut doc = Document::new();
        doc.insert(ID_FIELD.to_string(), Value::String(id.clone()));
        for (field, value) in filter.equalities() {
            doc.insert(field.to_string(), value.clone());
        }
        for (field, value) in update.set.iter().chain(update.set_on_insert.iter()) {
            doc.insert(field.clone(), value.clone());
        }
        for field in update.current_date.iter().chain(update.current_date_on_insert.iter()) {
            doc.insert(field.clone(), now.clone());
        }
        self.push_saved(&mut docs, doc)?;

        Ok(UpdateResult {
            matched_count: 0,
            modified_count: 0,
            upserted_id: Some(id),
        })
    }

    async fn insert_one(&self, mut doc: Document) -> Result<String, StoreError> {
        let id = match doc.get(ID_FIELD) {
            Some(Value::String(id)) => id.clone(),
            Some(other) => {
                return Err(StoreError::InvalidDocument(format!(
                    "{} must be a string, got {}",
                    ID_FIELD, other
                )))
            }
            None => {
                let id = new_id();
                doc.insert(ID_FIELD.to_string(), Value::String(id.clone()));
                id
            }
        };

        let mut docs = self.docs.write();
        if docs
            .iter()
            .any(|d| d.get(ID_FIELD).and_then(Value::as_str) == Some(id.as_str()))
        {
            return Err(StoreError::InvalidDocument(format!("duplicate {} '{}'", ID_FIELD, id)));
        }
        self.push_saved(&mut docs, doc)?;
        Ok(id)
    }

    async fn count_documents(&self, filter: &Filter) -> Result<u64, StoreError> {
        Ok(self.docs.read().iter().filter(|d| filter.matches(d)).count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SortOrder;
    use serde_json::json;
    use std::sync::Arc;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn key(identity: &str) -> Filter {
        Filter::new().field("identity", identity).field("recordType", "catalog")
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_updates() {
        let store = MemoryStore::new();
        let update = Update::new()
            .set("title", "Alien")
            .current_date("lastUpdated")
            .current_date_on_insert("createdAt");

        let first = store.update_one(&key("tt1"), &update, true).await.unwrap();
        assert!(first.upserted_id.is_some());

        let inserted = store.find_one(&key("tt1")).await.unwrap().unwrap();
        assert_eq!(inserted["identity"], "tt1");
        assert_eq!(inserted["recordType"], "catalog");
        assert_eq!(inserted["createdAt"], inserted["lastUpdated"]);

        let same = store.update_one(&key("tt1"), &update, true).await.unwrap();
        assert_eq!((same.matched_count, same.modified_count), (1, 0));
        assert!(same.upserted_id.is_none());

        let changed = Update::new().set("title", "Aliens").current_date("lastUpdated");
        let result = store.update_one(&key("tt1"), &changed, true).await.unwrap();
        assert_eq!((result.matched_count, result.modified_count), (1, 1));

        let updated = store.find_one(&key("tt1")).await.unwrap().unwrap();
        assert_eq!(updated["title"], "Aliens");
        assert_eq!(updated["createdAt"], inserted["createdAt"]);
        assert_eq!(store.count_documents(&Filter::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_without_upsert_does_not_insert() {
        let store = MemoryStore::new();
        let result = store
            .update_one(&key("tt9"), &Update::new().set("title", "X"), false)
            .await
            .unwrap();
        assert_eq!(result, UpdateResult::default());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_upserts_insert_once() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .update_one(&key("tt42"), &Update::new().set("title", "Same"), true)
                    .await
                    .unwrap()
            }));
        }
        let mut inserts = 0;
        for handle in handles {
            if handle.await.unwrap().upserted_id.is_some() {
                inserts += 1;
            }
        }
        assert_eq!(inserts, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_find_sort_and_limit() {
        let store = MemoryStore::new();
        for (id, score) in [("a", 3), ("b", 9), ("c", 5)] {
            store.insert_one(doc(json!({"identity": id, "score": score}))).await.unwrap();
        }
        store.insert_one(doc(json!({"identity": "d"}))).await.unwrap();

        let options = FindOptions::new().sort("score", SortOrder::Descending).limit(3);
        let found = store.find(&Filter::new(), &options).await.unwrap();
        let ids: Vec<&str> = found.iter().map(|d| d["identity"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let store = MemoryStore::new();
        let id = store.insert_one(doc(json!({"title": "x"}))).await.unwrap();
        let err = store
            .insert_one(doc(json!({"_id": id, "title": "y"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidDocument(_)));
    }

    #[tokio::test]
    async fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("movies.json");

        {
            let store = MemoryStore::open(&path).unwrap();
            store
                .update_one(&key("tt7"), &Update::new().set("title", "Se7en"), true)
                .await
                .unwrap();
        }

        let reopened = MemoryStore::open(&path).unwrap();
        let found = reopened.find_one(&key("tt7")).await.unwrap().unwrap();
        assert_eq!(found["title"], "Se7en");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_failed_save_leaves_collection_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movies.json");
        let store = MemoryStore::open(&path).unwrap();
        store
            .update_one(&key("tt1"), &Update::new().set("title", "Alien"), true)
            .await
            .unwrap();

        // A directory where the temp file goes makes every save fail
        std::fs::create_dir_all(path.with_extension("json.tmp")).unwrap();

        let update = Update::new().set("title", "Aliens");
        assert!(store.update_one(&key("tt1"), &update, true).await.is_err());
        let kept = store.find_one(&key("tt1")).await.unwrap().unwrap();
        assert_eq!(kept["title"], "Alien");

        let insert = Update::new().set("title", "Predator");
        assert!(store.update_one(&key("tt2"), &insert, true).await.is_err());
        assert!(store.find_one(&key("tt2")).await.unwrap().is_none());

        assert!(store.insert_one(doc(json!({"title": "x"}))).await.is_err());
        assert_eq!(store.len(), 1);

        let reopened = MemoryStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 1);
    }
}
