use crate::models::{JobCandidate, Source};
use anyhow::Result;
use async_trait::async_trait;

/// Common trait for all job listing scrapers
#[async_trait]
pub trait ScraperTrait: Send + Sync {
    /// Scrape candidate postings from the source
    async fn scrape(&self) -> Result<Vec<JobCandidate>>;

    /// Which site this scraper reads
    fn source(&self) -> Source;
}
