//! One scrape-and-store pass over every source.
//!
//! Sources run sequentially in a fixed order. Each source's output is filtered
//! by title, then everything is aggregated before the first store write, so a
//! run that aborts during aggregation has written nothing.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::Config;
use crate::dedup::DedupGate;
use crate::filter::TitleFilter;
use crate::models::{JobCandidate, RunSummary, Source};
use crate::scrapers::ScraperTrait;
use crate::store::JobStore;

#[derive(Error, Debug)]
pub enum RunError {
    #[error("a scraper run is already in progress")]
    AlreadyRunning,

    #[error("{site} scraper crashed: {message}")]
    SourceCrashed { site: Source, message: String },
}

/// Filtered candidates from every source, in source-then-discovery order
#[derive(Debug, Default)]
pub struct Aggregate {
    counts: Vec<(Source, usize)>,
    jobs: Vec<JobCandidate>,
}

impl Aggregate {
    pub fn push(&mut self, source: Source, jobs: Vec<JobCandidate>) {
        self.counts.push((source, jobs.len()));
        self.jobs.extend(jobs);
    }

    pub fn total(&self) -> usize {
        self.jobs.len()
    }

    pub fn jobs(&self) -> &[JobCandidate] {
        &self.jobs
    }

    fn summary(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        for (source, count) in &self.counts {
            summary.set_count(*source, *count);
        }
        summary.total_scraped = self.total();
        summary
    }
}

/// Runs the pipeline; at most one run is in flight at a time.
pub struct JobRunner {
    config: Arc<Config>,
    scrapers: Vec<Arc<dyn ScraperTrait>>,
    store: Arc<dyn JobStore>,
    dedup: DedupGate,
    filter: TitleFilter,
    running: Mutex<()>,
}

impl JobRunner {
    pub fn new(config: Arc<Config>, scrapers: Vec<Arc<dyn ScraperTrait>>, store: Arc<dyn JobStore>) -> Self {
        let dedup = DedupGate::new(store.clone(), config.dedup.on_query_error);
        let filter = config.title_filter();
        Self {
            config,
            scrapers,
            store,
            dedup,
            filter,
            running: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn run(&self) -> Result<RunSummary, RunError> {
        let _guard = self.running.try_lock().map_err(|_| RunError::AlreadyRunning)?;
        info!("🚀 Running job scraper...");

        let aggregate = self.aggregate().await?;
        let mut summary = aggregate.summary();
        for source in Source::ALL {
            info!("📊 Scraped {} jobs from {}.", summary.count(source), source);
        }
        info!("🔢 Total jobs scraped: {}", summary.total_scraped);

        summary.total_added = self.persist(aggregate.jobs()).await;

        info!(
            "✅ Finished run. Total new jobs added to {}: {}",
            self.store.backend_name(),
            summary.total_added
        );
        Ok(summary)
    }

    /// Scrape, filter and concatenate every enabled source.
    pub async fn aggregate(&self) -> Result<Aggregate, RunError> {
        let mut aggregate = Aggregate::default();

        for source in Source::ALL {
            if !self.config.is_scraper_enabled(source) {
                info!("⏭️ {} scraper disabled in config", source);
                aggregate.push(source, Vec::new());
                continue;
            }
            let Some(scraper) = self.scrapers.iter().find(|s| s.source() == source).cloned() else {
                warn!("No scraper registered for {}", source);
                aggregate.push(source, Vec::new());
                continue;
            };

            info!("🔍 Running {} scraper...", source);
            // A panic inside a scraper surfaces here as a JoinError.
            let outcome = tokio::spawn(async move { scraper.scrape().await }).await;
            let scraped = match outcome {
                Ok(Ok(jobs)) => jobs,
                Ok(Err(e)) => {
                    warn!("❌ {} scraper failed: {:#}", source, e);
                    Vec::new()
                }
                Err(e) => {
                    return Err(RunError::SourceCrashed {
                        site: source,
                        message: e.to_string(),
                    });
                }
            };

            let found = scraped.len();
            let matched: Vec<_> = scraped
                .into_iter()
                .filter(|job| self.filter.matches(&job.title))
                .collect();
            if matched.len() < found {
                info!("⏭️ {} of {} {} jobs did not match the title filter", found - matched.len(), found, source);
            }
            aggregate.push(source, matched);
        }

        Ok(aggregate)
    }

    /// Dedup and write each candidate; returns how many were added.
    async fn persist(&self, jobs: &[JobCandidate]) -> usize {
        let mut added = 0;
        for job in jobs {
            if !job.is_complete() {
                warn!(
                    "⚠️ Skipping job with missing fields: title='{}' company='{}' url='{}'",
                    job.title, job.company, job.url
                );
                continue;
            }

            if self.dedup.exists(&job.title, &job.company, &job.url).await {
                info!("🟡 Skipping duplicate: {} at {}", job.title, job.company);
                continue;
            }

            info!("🆕 Adding job: {} at {} ({})", job.title, job.company, job.location);
            if job.url.is_empty() {
                warn!("⚠️ No URL available for this job");
            }
            match self.store.insert(job).await {
                Ok(()) => added += 1,
                Err(e) => warn!("❌ Failed to add job '{}' at '{}': {}", job.title, job.company, e),
            }
        }
        added
    }
}
