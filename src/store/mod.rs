//! Persisted tracking store.
//!
//! The pipeline only needs two operations: look up records by exact title and
//! company, and append a new record. Records are never updated or deleted.

pub mod json_file;
#[cfg(test)]
pub mod memory;
pub mod notion;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::config::{Config, NotionCredentials, StoreBackend};
use crate::models::{JobCandidate, PersistedRecord};

pub use json_file::JsonFileStore;
pub use notion::NotionStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Store API returned {status}: {body}")]
    Api { status: u16, body: String },
}

/// Backend holding the jobs that have already been tracked
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Records whose title and company both equal the arguments exactly.
    async fn find(&self, title: &str, company: &str) -> Result<Vec<PersistedRecord>, StoreError>;

    /// Append a record for `job`.
    async fn insert(&self, job: &JobCandidate) -> Result<(), StoreError>;

    fn backend_name(&self) -> &'static str;
}

/// Build the backend selected in the configuration.
pub fn from_config(config: &Config) -> Result<Arc<dyn JobStore>> {
    match config.store.backend {
        StoreBackend::Notion => {
            let creds = NotionCredentials::from_env()?;
            let store = NotionStore::new(creds, config.notion.properties.clone())?;
            Ok(Arc::new(store))
        }
        StoreBackend::Json => Ok(Arc::new(JsonFileStore::new(&config.store.path))),
    }
}
