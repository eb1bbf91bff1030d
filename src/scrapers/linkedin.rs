use crate::models::{JobCandidate, Source, UNKNOWN_COMPANY, UNKNOWN_LOCATION};
use crate::normalize::{absolutize, normalize_url};
use crate::scrapers::selectors::{first_non_empty, first_with_attr, first_with_text, text_of};
use crate::scrapers::traits::ScraperTrait;
use crate::scrapers::USER_AGENT;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use scraper::Html;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

const BASE_URL: &str = "https://www.linkedin.com";
const SEARCH_URL: &str = "https://www.linkedin.com/jobs/search/";
/// geoId for the United States, used when no target location is configured
const US_GEO_ID: &str = "103644278";

const CARD_SELECTORS: &[&str] = &[
    "ul.jobs-search__results-list li",
    "li.jobs-search-results__list-item",
    "div.base-card",
];
const TITLE_SELECTORS: &[&str] = &["h3.base-search-card__title", "h3"];
const COMPANY_SELECTORS: &[&str] = &["h4.base-search-card__subtitle", "h4"];
const LOCATION_SELECTORS: &[&str] = &[".job-search-card__location"];
const LINK_SELECTORS: &[&str] = &["a.base-card__full-link", "a"];

/// LinkedIn public job search scraper (static HTML, no login)
pub struct LinkedinScraper {
    client: Client,
    search_urls: Vec<String>,
}

impl LinkedinScraper {
    /// One search page is fetched per target location unless `override_url`
    /// pins a single search.
    pub fn new(override_url: Option<&str>, keywords: &str, locations: &[String]) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        let search_urls = match override_url {
            Some(url) => vec![url.to_string()],
            None => search_urls(keywords, locations)?,
        };

        Ok(Self { client, search_urls })
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        debug!("Fetching URL: {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to fetch LinkedIn page")?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to fetch LinkedIn page: {}", response.status());
        }
        response.text().await.context("Failed to read response body")
    }
}

/// Internship searches, one per location (or one nationwide search).
pub fn search_urls(keywords: &str, locations: &[String]) -> Result<Vec<String>> {
    let base = [("keywords", keywords), ("f_JT", "I"), ("f_TPR", "r2592000")];

    if locations.is_empty() {
        let mut params = base.to_vec();
        params.push(("geoId", US_GEO_ID));
        let url = Url::parse_with_params(SEARCH_URL, &params).context("Invalid LinkedIn search URL")?;
        return Ok(vec![url.to_string()]);
    }

    locations
        .iter()
        .map(|location| {
            let mut params = base.to_vec();
            params.push(("location", location.as_str()));
            Url::parse_with_params(SEARCH_URL, &params)
                .map(|u| u.to_string())
                .context("Invalid LinkedIn search URL")
        })
        .collect()
}

/// Posting links carry per-search tracking parameters (`refId`, `trackingId`,
/// `position`), so `/jobs/view/` URLs are reduced to scheme, host and path.
pub fn canonical_job_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) if parsed.path().starts_with("/jobs/view/") => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            parsed.to_string()
        }
        _ => url.to_string(),
    }
}

/// Parse job cards from a LinkedIn guest search results page.
pub fn parse_listings(html: &str) -> Vec<JobCandidate> {
    let document = Html::parse_document(html);
    let Some((selector, cards)) = first_non_empty(&document, CARD_SELECTORS) else {
        warn!("No LinkedIn job cards found");
        return Vec::new();
    };
    info!("🔍 Found {} LinkedIn job cards via '{}'", cards.len(), selector);

    cards
        .into_iter()
        .filter_map(|card| {
            let title = first_with_text(card, TITLE_SELECTORS).map(text_of)?;
            let company = first_with_text(card, COMPANY_SELECTORS)
                .map(text_of)
                .unwrap_or_else(|| UNKNOWN_COMPANY.to_string());
            let location = first_with_text(card, LOCATION_SELECTORS)
                .map(text_of)
                .unwrap_or_else(|| UNKNOWN_LOCATION.to_string());
            let url = first_with_attr(card, LINK_SELECTORS, "href")
                .and_then(|a| a.value().attr("href"))
                .map(|href| canonical_job_url(&absolutize(BASE_URL, href)))
                .unwrap_or_default();

            debug!("✅ {} at {} | {}", title, company, location);
            Some(
                JobCandidate::new(Source::Linkedin, title)
                    .with_company(company)
                    .with_location(location)
                    .with_url(url),
            )
        })
        .collect()
}

/// Append `found` to `jobs`, dropping postings already seen by URL. The same
/// posting shows up under several location searches.
fn keep_unseen(seen: &mut HashSet<String>, jobs: &mut Vec<JobCandidate>, found: Vec<JobCandidate>) {
    for job in found {
        let key = normalize_url(&job.url);
        if !key.is_empty() && !seen.insert(key) {
            continue;
        }
        jobs.push(job);
    }
}

#[async_trait]
impl ScraperTrait for LinkedinScraper {
    async fn scrape(&self) -> Result<Vec<JobCandidate>> {
        info!("Starting LinkedIn scrape ({} searches)", self.search_urls.len());

        let mut jobs = Vec::new();
        let mut seen = HashSet::new();

        for url in &self.search_urls {
            let html = match self.fetch(url).await {
                Ok(html) => html,
                Err(e) => {
                    warn!(error = %e, "LinkedIn search failed; skipping {}", url);
                    continue;
                }
            };

            keep_unseen(&mut seen, &mut jobs, parse_listings(&html));
        }

        info!("✅ Scraped {} jobs from LinkedIn", jobs.len());
        Ok(jobs)
    }

    fn source(&self) -> Source {
        Source::Linkedin
    }
}
