use crate::models::{JobCandidate, Source, UNKNOWN_COMPANY, UNKNOWN_LOCATION};
use crate::normalize::absolutize;
use crate::scrapers::selectors::{first_non_empty, first_with_text, text_of};
use crate::scrapers::traits::ScraperTrait;
use crate::scrapers::USER_AGENT;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, info, warn};

const BASE_URL: &str = "https://builtin.com";
const DEFAULT_SEARCH_URL: &str =
    "https://builtin.com/jobs/hybrid/office/product?search=Product+Manager%2C+Intern&country=USA&allLocations=true";

const CARD_SELECTORS: &[&str] = &[
    r#"div[data-id="job-card"]"#,
    r#"[data-id="job-card"]"#,
    "div.job-bounded-responsive",
];
const TITLE_SELECTORS: &[&str] = &[r#"a[data-id="job-card-title"]"#, "h2 a", "a[href*='/job/']"];
const COMPANY_SELECTORS: &[&str] = &[r#"a[data-id="company-title"] span"#, r#"a[data-id="company-title"]"#];

/// Built In job board scraper (static HTML)
pub struct BuiltinScraper {
    client: Client,
    search_url: String,
}

impl BuiltinScraper {
    pub fn new(search_url: Option<&str>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            search_url: search_url.unwrap_or(DEFAULT_SEARCH_URL).to_string(),
        })
    }
}

/// Parse job cards out of a Built In search results page.
pub fn parse_listings(html: &str) -> Vec<JobCandidate> {
    let document = Html::parse_document(html);
    let Some((selector, cards)) = first_non_empty(&document, CARD_SELECTORS) else {
        warn!("No BuiltIn job cards found");
        return Vec::new();
    };
    info!("🔍 Found {} BuiltIn job cards via '{}'", cards.len(), selector);

    let tooltip = Selector::parse(r#"span[data-bs-toggle="tooltip"]"#).ok();
    let mut jobs = Vec::new();

    for (idx, card) in cards.into_iter().enumerate() {
        let Some(title_el) = first_with_text(card, TITLE_SELECTORS) else {
            debug!("Skipped BuiltIn card {}: no title", idx);
            continue;
        };
        let title = text_of(title_el);
        let url = title_el
            .value()
            .attr("href")
            .map(|href| absolutize(BASE_URL, href))
            .unwrap_or_default();

        let company = first_with_text(card, COMPANY_SELECTORS)
            .map(text_of)
            .unwrap_or_else(|| UNKNOWN_COMPANY.to_string());

        let location = tooltip
            .as_ref()
            .and_then(|sel| card.select(sel).next())
            .and_then(|el| el.value().attr("data-bs-title"))
            .map(tooltip_locations)
            .filter(|loc| !loc.is_empty())
            .unwrap_or_else(|| UNKNOWN_LOCATION.to_string());

        debug!("✅ {} at {} ({})", title, company, location);
        jobs.push(
            JobCandidate::new(Source::Builtin, title)
                .with_company(company)
                .with_location(location)
                .with_url(url),
        );
    }

    jobs
}

/// The location tooltip carries an HTML fragment with one `div` per location.
fn tooltip_locations(fragment: &str) -> String {
    let doc = Html::parse_fragment(fragment);
    let Ok(div) = Selector::parse("div") else {
        return String::new();
    };
    doc.select(&div)
        .map(text_of)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

#[async_trait]
impl ScraperTrait for BuiltinScraper {
    async fn scrape(&self) -> Result<Vec<JobCandidate>> {
        info!("Starting BuiltIn scrape");
        debug!("Fetching URL: {}", self.search_url);

        let response = self
            .client
            .get(&self.search_url)
            .send()
            .await
            .context("Failed to fetch BuiltIn page")?;

        if !response.status().is_success() {
            warn!("BuiltIn returned status: {}", response.status());
            anyhow::bail!("Failed to fetch BuiltIn page: {}", response.status());
        }

        let html = response.text().await.context("Failed to read response body")?;
        debug!("Downloaded {} bytes of HTML", html.len());

        let jobs = parse_listings(&html);
        info!("✅ Scraped {} jobs from BuiltIn", jobs.len());
        Ok(jobs)
    }

    fn source(&self) -> Source {
        Source::Builtin
    }
}
