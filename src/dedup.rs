//! Duplicate detection against the tracking store.

use std::sync::Arc;

use tracing::warn;

use crate::config::DedupPolicy;
use crate::models::PersistedRecord;
use crate::normalize::normalize_url;
use crate::store::JobStore;

/// Decide whether `url` identifies one of `records`.
///
/// `records` must already match on title and company. An empty query URL, or a
/// record stored without a URL, degrades identity to title and company alone.
pub fn is_duplicate(records: &[PersistedRecord], url: &str) -> bool {
    let wanted = normalize_url(url);
    if wanted.is_empty() {
        return !records.is_empty();
    }
    records.iter().any(|record| match record.url.as_deref() {
        None => true,
        Some(stored) => {
            let stored = normalize_url(stored);
            stored.is_empty() || stored == wanted
        }
    })
}

/// Checks candidates against the store before they are written
pub struct DedupGate {
    store: Arc<dyn JobStore>,
    policy: DedupPolicy,
}

impl DedupGate {
    pub fn new(store: Arc<dyn JobStore>, policy: DedupPolicy) -> Self {
        Self { store, policy }
    }

    /// Returns true when a matching record is already tracked.
    ///
    /// A failed store query is resolved by the configured [`DedupPolicy`].
    pub async fn exists(&self, title: &str, company: &str, url: &str) -> bool {
        match self.store.find(title, company).await {
            Ok(records) => is_duplicate(&records, url),
            Err(e) => {
                let duplicate = self.policy == DedupPolicy::FailClosed;
                warn!(
                    error = %e,
                    policy = ?self.policy,
                    "❌ Error querying store for '{}' at '{}'",
                    title,
                    company
                );
                duplicate
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn record(url: Option<&str>) -> PersistedRecord {
        PersistedRecord {
            title: "PM Intern".to_string(),
            company: "Acme".to_string(),
            location: "Chicago, IL".to_string(),
            url: url.map(str::to_string),
            added_at: None,
        }
    }

    fn gate_with(records: Vec<PersistedRecord>, policy: DedupPolicy) -> (Arc<MemoryStore>, DedupGate) {
        let store = Arc::new(MemoryStore::with_records(records));
        let gate = DedupGate::new(store.clone(), policy);
        (store, gate)
    }

    #[tokio::test]
    async fn test_trailing_slash_is_duplicate_other_url_is_not() {
        let (_, gate) = gate_with(vec![record(Some("https://acme.com/job/1"))], DedupPolicy::FailOpen);
        assert!(gate.exists("PM Intern", "Acme", "https://acme.com/job/1/").await);
        assert!(!gate.exists("PM Intern", "Acme", "https://acme.com/job/2").await);
    }

    #[tokio::test]
    async fn test_empty_query_url_matches_record_without_url() {
        let (_, gate) = gate_with(vec![record(None)], DedupPolicy::FailOpen);
        assert!(gate.exists("PM Intern", "Acme", "").await);
    }

    #[tokio::test]
    async fn test_title_and_company_must_match_exactly() {
        let (_, gate) = gate_with(vec![record(Some("https://acme.com/job/1"))], DedupPolicy::FailOpen);
        assert!(!gate.exists("PM Intern", "ACME", "").await);
        assert!(!gate.exists("PM intern", "Acme", "https://acme.com/job/1").await);
    }

    #[tokio::test]
    async fn test_query_error_follows_policy() {
        let (store, open) = gate_with(vec![record(None)], DedupPolicy::FailOpen);
        store.set_fail_queries(true);
        assert!(!open.exists("PM Intern", "Acme", "").await);

        let (store, closed) = gate_with(vec![], DedupPolicy::FailClosed);
        store.set_fail_queries(true);
        assert!(closed.exists("PM Intern", "Acme", "https://acme.com/job/9").await);
    }

    #[test]
    fn test_is_duplicate_url_identity() {
        let records = vec![record(Some("HTTPS://Acme.com:443/job/1"))];
        assert!(is_duplicate(&records, "https://acme.com/job/1"));
        assert!(!is_duplicate(&records, "https://acme.com/job/1?ref=x"));
        // Either side lacking a URL means title/company identity.
        assert!(is_duplicate(&records, ""));
        assert!(is_duplicate(&[record(None)], "https://acme.com/job/3"));
        assert!(!is_duplicate(&[], ""));
    }
}
