use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Company sentinel used when a listing does not expose an employer.
pub const UNKNOWN_COMPANY: &str = "Unknown";
/// Location sentinel used when a listing does not expose a location.
pub const UNKNOWN_LOCATION: &str = "N/A";

/// Site a job listing was scraped from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// University career-services portal (12twenty)
    Cms,
    /// General job board (Built In)
    Builtin,
    /// Professional network guest search (LinkedIn)
    Linkedin,
    /// Career platform (Handshake)
    Handshake,
}

impl Source {
    /// Fixed run order: portal, board, network, platform.
    pub const ALL: [Source; 4] = [Source::Cms, Source::Builtin, Source::Linkedin, Source::Handshake];

    /// Key used in config files and JSON summaries.
    pub fn key(self) -> &'static str {
        match self {
            Source::Cms => "cms",
            Source::Builtin => "builtin",
            Source::Linkedin => "linkedin",
            Source::Handshake => "handshake",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Source::Cms => "CMS (12twenty)",
            Source::Builtin => "BuiltIn",
            Source::Linkedin => "LinkedIn",
            Source::Handshake => "Handshake",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A scraped posting that has not been persisted yet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobCandidate {
    pub title: String,
    pub company: String,
    pub location: String,
    /// Absolute listing URL, empty when the listing had no link
    pub url: String,
    pub source: Source,
    pub scraped_at: DateTime<Utc>,
}

impl JobCandidate {
    pub fn new(source: Source, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            company: UNKNOWN_COMPANY.to_string(),
            location: UNKNOWN_LOCATION.to_string(),
            url: String::new(),
            source,
            scraped_at: Utc::now(),
        }
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = company.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Title and company are both required before a candidate may be stored.
    pub fn is_complete(&self) -> bool {
        !self.title.trim().is_empty() && !self.company.trim().is_empty()
    }
}

/// The tracking store's view of an already recorded job
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PersistedRecord {
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub location: String,
    /// Stored URL; `None` when the record was written without one
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
}

impl From<&JobCandidate> for PersistedRecord {
    fn from(job: &JobCandidate) -> Self {
        Self {
            title: job.title.clone(),
            company: job.company.clone(),
            location: job.location.clone(),
            url: (!job.url.is_empty()).then(|| job.url.clone()),
            added_at: Some(Utc::now()),
        }
    }
}

/// Outcome of one scrape-and-store pass
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunSummary {
    pub cms_jobs: usize,
    pub builtin_jobs: usize,
    pub linkedin_jobs: usize,
    pub handshake_jobs: usize,
    pub total_scraped: usize,
    pub total_added: usize,
}

impl RunSummary {
    pub fn set_count(&mut self, source: Source, count: usize) {
        match source {
            Source::Cms => self.cms_jobs = count,
            Source::Builtin => self.builtin_jobs = count,
            Source::Linkedin => self.linkedin_jobs = count,
            Source::Handshake => self.handshake_jobs = count,
        }
    }

    pub fn count(&self, source: Source) -> usize {
        match source {
            Source::Cms => self.cms_jobs,
            Source::Builtin => self.builtin_jobs,
            Source::Linkedin => self.linkedin_jobs,
            Source::Handshake => self.handshake_jobs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_defaults_to_sentinels() {
        let job = JobCandidate::new(Source::Builtin, "Product Intern");
        assert_eq!(job.company, UNKNOWN_COMPANY);
        assert_eq!(job.location, UNKNOWN_LOCATION);
        assert!(job.url.is_empty());
        assert!(job.is_complete());
    }

    #[test]
    fn test_incomplete_candidates() {
        assert!(!JobCandidate::new(Source::Cms, "").is_complete());
        assert!(!JobCandidate::new(Source::Cms, "PM Intern").with_company("  ").is_complete());
    }

    #[test]
    fn test_record_from_candidate_drops_empty_url() {
        let job = JobCandidate::new(Source::Linkedin, "PM Intern").with_company("Acme");
        let record = PersistedRecord::from(&job);
        assert_eq!(record.url, None);

        let job = job.with_url("https://acme.com/job/1");
        let record = PersistedRecord::from(&job);
        assert_eq!(record.url.as_deref(), Some("https://acme.com/job/1"));
    }

    #[test]
    fn test_source_serializes_as_key() {
        for source in Source::ALL {
            let json = serde_json::to_string(&source).unwrap();
            assert_eq!(json, format!("\"{}\"", source.key()));
        }
    }
}
