//! Runtime configuration.
//!
//! `config.yaml` is read once at startup into a [`Config`] value that is then
//! shared by `Arc`. Secrets never live in the file; they come from the process
//! environment (optionally seeded from `.env`).

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::filter::{default_groups, KeywordGroup, TitleFilter};
use crate::models::Source;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub job_search: JobSearchConfig,
    pub scrapers: BTreeMap<String, ScraperSettings>,
    pub notion: NotionConfig,
    pub store: StoreConfig,
    pub dedup: DedupConfig,
    pub scheduler: SchedulerConfig,
    pub server: ServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        let scrapers = Source::ALL
            .iter()
            .map(|source| (source.key().to_string(), ScraperSettings::enabled()))
            .collect();
        Self {
            job_search: JobSearchConfig::default(),
            scrapers,
            notion: NotionConfig::default(),
            store: StoreConfig::default(),
            dedup: DedupConfig::default(),
            scheduler: SchedulerConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// Read `path`, falling back to the built-in defaults when the file is
    /// missing or is not valid YAML.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(raw) => match Self::from_yaml(&raw) {
                Ok(config) => {
                    info!("📄 Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!(error = %e, "❌ Error parsing {}; using default configuration", path.display());
                    Self::default()
                }
            },
            Err(_) => {
                warn!("⚠️ {} not found; using default configuration", path.display());
                Self::default()
            }
        }
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw).context("Failed to parse configuration YAML")
    }

    /// A source absent from the `scrapers` table is disabled.
    pub fn is_scraper_enabled(&self, source: Source) -> bool {
        self.scrapers
            .get(source.key())
            .map(|s| s.enabled)
            .unwrap_or(false)
    }

    /// Override search URL for a source, if one is configured.
    pub fn scraper_url(&self, source: Source) -> Option<&str> {
        self.scrapers
            .get(source.key())
            .and_then(|s| s.search_url.as_deref())
            .filter(|url| !url.trim().is_empty())
    }

    pub fn title_filter(&self) -> TitleFilter {
        TitleFilter::new(self.job_search.title_keywords.clone())
    }
}

// ── Sections ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JobSearchConfig {
    /// OR-combined keyword groups; an explicit empty list matches nothing
    pub title_keywords: Vec<KeywordGroup>,
    /// Target locations used to build per-location search URLs
    pub locations: Vec<String>,
    /// Free-text query sent to sources that take one
    pub search_keywords: String,
}

impl Default for JobSearchConfig {
    fn default() -> Self {
        Self {
            title_keywords: default_groups(),
            locations: vec![
                "San Francisco, CA".to_string(),
                "New York, NY".to_string(),
                "Chicago, IL".to_string(),
            ],
            search_keywords: "Product Manager Intern".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ScraperSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub search_url: Option<String>,
}

impl ScraperSettings {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            search_url: None,
        }
    }
}

/// Store property names, keyed by logical field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FieldMapping {
    pub title: String,
    pub company: String,
    pub location: String,
    pub url: String,
    /// Optional date property stamped on insert
    pub date_added: Option<String>,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            title: "Job Title".to_string(),
            company: "Company".to_string(),
            location: "Location".to_string(),
            url: "Application URL".to_string(),
            date_added: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct NotionConfig {
    pub properties: FieldMapping,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Notion,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// File used by the JSON backend
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Notion,
            path: "tracked_jobs.json".to_string(),
        }
    }
}

/// What the dedup gate does when the store query itself fails
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    /// Treat the candidate as new and write it
    #[default]
    FailOpen,
    /// Treat the candidate as a duplicate and skip it
    FailClosed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct DedupConfig {
    pub on_query_error: DedupPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SchedulerConfig {
    pub cron: String,
    pub timezone: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cron: "0 9 * * *".to_string(),
            timezone: "America/New_York".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
        }
    }
}

// ── Secrets ───────────────────────────────────────────────────

/// Username/password pair for an authenticated source
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// Login email for sources that ask for one before SSO
    pub email: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("email", &self.email)
            .finish()
    }
}

impl Credentials {
    /// Portal credentials from `CMS_USERNAME` / `CMS_PASSWORD`.
    pub fn cms_from_env() -> Option<Self> {
        Some(Self {
            username: env_opt("CMS_USERNAME")?,
            password: env_opt("CMS_PASSWORD")?,
            email: None,
        })
    }

    /// Platform credentials; each variable falls back to its portal counterpart.
    pub fn handshake_from_env() -> Option<Self> {
        let username = env_opt("HANDSHAKE_USERNAME").or_else(|| env_opt("CMS_USERNAME"))?;
        let password = env_opt("HANDSHAKE_PASSWORD").or_else(|| env_opt("CMS_PASSWORD"))?;
        let email = env_opt("HANDSHAKE_EMAIL")
            .unwrap_or_else(|| format!("{}@kellogg.northwestern.edu", username));
        Some(Self {
            username,
            password,
            email: Some(email),
        })
    }
}

/// Notion integration secrets
#[derive(Clone)]
pub struct NotionCredentials {
    pub api_key: String,
    pub database_id: String,
}

impl fmt::Debug for NotionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotionCredentials")
            .field("api_key", &"<redacted>")
            .field("database_id", &self.database_id)
            .finish()
    }
}

impl NotionCredentials {
    pub fn from_env() -> Result<Self> {
        let api_key = env_opt("NOTION_API_KEY")
            .or_else(|| env_opt("NOTION_TOKEN"))
            .context("NOTION_API_KEY (or NOTION_TOKEN) is not set")?;
        let database_id = env_opt("NOTION_DATABASE_ID").context("NOTION_DATABASE_ID is not set")?;
        Ok(Self { api_key, database_id })
    }
}
