pub mod browser;
pub mod builtin;
pub mod cms;
pub mod handshake;
pub mod linkedin;
pub mod selectors;
pub mod traits;
pub mod types;

use std::sync::Arc;

use anyhow::Result;

use crate::config::{Config, Credentials};
use crate::models::Source;

pub use builtin::BuiltinScraper;
pub use cms::CmsScraper;
pub use handshake::HandshakeScraper;
pub use linkedin::LinkedinScraper;
pub use traits::ScraperTrait;

pub(crate) const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// One scraper per source, in run order.
pub fn build_all(config: &Config) -> Result<Vec<Arc<dyn ScraperTrait>>> {
    let scrapers: Vec<Arc<dyn ScraperTrait>> = vec![
        Arc::new(CmsScraper::new(
            Credentials::cms_from_env(),
            config.scraper_url(Source::Cms),
        )),
        Arc::new(BuiltinScraper::new(config.scraper_url(Source::Builtin))?),
        Arc::new(LinkedinScraper::new(
            config.scraper_url(Source::Linkedin),
            &config.job_search.search_keywords,
            &config.job_search.locations,
        )?),
        Arc::new(HandshakeScraper::new(
            Credentials::handshake_from_env(),
            config.scraper_url(Source::Handshake),
            &config.job_search.search_keywords,
            &config.job_search.locations,
            config.title_filter(),
        )?),
    ];
    Ok(scrapers)
}
