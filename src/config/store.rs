//! Document store configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where scraped documents are kept
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Data directory
    pub data_dir: PathBuf,
    /// Collection file name inside the data directory
    pub collection_file: String,
    /// Persist every write to disk (false keeps the collection in memory only)
    pub persist: bool,
}

impl StoreConfig {
    /// Full path of the collection file
    pub fn collection_path(&self) -> PathBuf {
        self.data_dir.join(&self.collection_file)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".moviedex"),
            collection_file: "movies.json".to_string(),
            persist: true,
        }
    }
}
