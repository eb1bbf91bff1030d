use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{JobStore, StoreError};
use crate::models::{JobCandidate, PersistedRecord};

/// In-memory store for tests, with switches to simulate outages
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<PersistedRecord>>,
    pub fail_queries: AtomicBool,
    pub fail_inserts: AtomicBool,
}

impl MemoryStore {
    pub fn with_records(records: Vec<PersistedRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Default::default()
        }
    }

    pub fn records(&self) -> Vec<PersistedRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn set_fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn find(&self, title: &str, company: &str) -> Result<Vec<PersistedRecord>, StoreError> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(StoreError::Api {
                status: 503,
                body: "simulated query outage".to_string(),
            });
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.title == title && r.company == company)
            .cloned()
            .collect())
    }

    async fn insert(&self, job: &JobCandidate) -> Result<(), StoreError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Api {
                status: 503,
                body: "simulated write outage".to_string(),
            });
        }
        self.records.lock().unwrap().push(PersistedRecord::from(job));
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
