use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::{JobStore, StoreError};
use crate::models::{JobCandidate, PersistedRecord};

/// Tracking store kept as a pretty-printed JSON array on disk.
///
/// Useful for offline runs without a Notion workspace. The whole file is
/// rewritten on every insert.
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Vec<PersistedRecord>, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) if raw.trim().is_empty() => Ok(Vec::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl JobStore for JsonFileStore {
    async fn find(&self, title: &str, company: &str) -> Result<Vec<PersistedRecord>, StoreError> {
        let _guard = self.lock.lock().await;
        let records = self.load().await?;
        Ok(records
            .into_iter()
            .filter(|r| r.title == title && r.company == company)
            .collect())
    }

    async fn insert(&self, job: &JobCandidate) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        records.push(PersistedRecord::from(job));

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(&records)?;
        tokio::fs::write(&self.path, json).await?;
        debug!("Wrote {} records to {}", records.len(), self.path.display());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "json"
    }
}
