use crate::config::Credentials;
use crate::filter::TitleFilter;
use crate::models::{JobCandidate, Source, UNKNOWN_COMPANY, UNKNOWN_LOCATION};
use crate::normalize::{absolutize, normalize_url};
use crate::scrapers::browser::BrowserSession;
use crate::scrapers::selectors::{first_non_empty, resolve_field, text_of, FieldStrategy};
use crate::scrapers::traits::ScraperTrait;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use scraper::Html;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

const BASE_URL: &str = "https://app.joinhandshake.com";
const LOGIN_URL: &str = "https://app.joinhandshake.com/login";
const SEARCH_URL: &str = "https://app.joinhandshake.com/job-search";
/// Radius applied to every location filter
const LOCATION_RADIUS: &str = "50mi";

/// Places with known search coordinates, matched by prefix of the configured
/// location: (prefix, filter type, "lat,lon").
const KNOWN_PLACES: &[(&str, &str, &str)] = &[
    ("san francisco", "place", "37.774929,-122.419415"),
    ("new york", "place", "40.712784,-74.005941"),
    ("chicago", "place", "41.881953,-87.632362"),
    ("california", "region", "37.07436,-119.699375"),
];

const LISTING_SELECTORS: &[&str] = &["a[href*='/job-search/']", "a[href*='/jobs/']"];

const EMAIL_INPUTS: &[&str] = &[
    "#email-address-identifier",
    "input[type='email']",
    "input[name='email']",
    "input[id*='email']",
];
const USERNAME_INPUTS: &[&str] = &["#txtUsername", "input[name='username']", "input[id*='user']"];
const PASSWORD_INPUTS: &[&str] = &["#txtPassword", "input[name='password']", "input[type='password']"];
const SUBMIT_BUTTONS: &[&str] = &["#btnLogin", "button[type='submit']", "input[type='submit']"];

const COMPANY_STRATEGIES: &[FieldStrategy] = &[
    FieldStrategy::Css("[data-testid*='company']"),
    FieldStrategy::Css("[data-testid*='employer']"),
    FieldStrategy::Labeled { tag: "h3", label: "Company" },
    FieldStrategy::Labeled { tag: "h4", label: "Company" },
    FieldStrategy::Css(".company-name"),
    FieldStrategy::Css(".employer-name"),
    FieldStrategy::Css("a[href*='/employers/']"),
    FieldStrategy::Labeled { tag: "span", label: "Company" },
    FieldStrategy::Labeled { tag: "div", label: "Company" },
];

const LOCATION_STRATEGIES: &[FieldStrategy] = &[
    FieldStrategy::Css("[data-testid*='location']"),
    FieldStrategy::Labeled { tag: "h3", label: "Location" },
    FieldStrategy::Labeled { tag: "h4", label: "Location" },
    FieldStrategy::Css(".location"),
    FieldStrategy::Css(".job-location"),
    FieldStrategy::Labeled { tag: "span", label: "Location" },
    FieldStrategy::Labeled { tag: "div", label: "Location" },
    FieldStrategy::Css("[class*='location']"),
];

/// Handshake scraper (SSO login + headless browser, one detail page per job)
pub struct HandshakeScraper {
    credentials: Option<Credentials>,
    search_url: String,
    filter: TitleFilter,
}

impl HandshakeScraper {
    /// Searches `keywords` within the configured locations unless
    /// `override_url` pins the search page.
    pub fn new(
        credentials: Option<Credentials>,
        override_url: Option<&str>,
        keywords: &str,
        locations: &[String],
        filter: TitleFilter,
    ) -> Result<Self> {
        let search_url = match override_url {
            Some(url) => url.to_string(),
            None => search_url(keywords, locations)?,
        };
        Ok(Self {
            credentials,
            search_url,
            filter,
        })
    }

    fn login(session: &BrowserSession, creds: &Credentials) -> Result<()> {
        info!("🔐 Navigating to Handshake login...");
        session.goto(LOGIN_URL)?;
        session.pause(Duration::from_secs(3));

        let email = creds.email.as_deref().unwrap_or(&creds.username);
        session
            .fill_first(EMAIL_INPUTS, email, Duration::from_secs(10))
            .context("Could not find email input field")?;
        session.blur_active();
        session.pause(Duration::from_secs(1));
        session
            .click_first(
                &["button[type='submit']", "input[type='submit']"],
                &[
                    "//button[contains(normalize-space(.), 'Next')]",
                    "//button[contains(normalize-space(.), 'Continue')]",
                ],
            )
            .context("Could not find or click next button")?;
        session.pause(Duration::from_secs(3));

        session
            .click_first(
                &["[data-testid*='northwestern']"],
                &[
                    "//button[contains(., 'Northwestern University Student NetID Login')]",
                    "//a[contains(., 'Northwestern University Student NetID Login')]",
                    "//button[contains(., 'Northwestern')]",
                    "//a[contains(., 'Northwestern')]",
                ],
            )
            .context("Could not find Northwestern University login button")?;
        session.pause(Duration::from_secs(3));
        debug!("Current URL after SSO selection: {}", session.current_url());

        session
            .fill_first(USERNAME_INPUTS, &creds.username, Duration::from_secs(3))
            .context("Could not find username input field")?;
        session
            .fill_first(PASSWORD_INPUTS, &creds.password, Duration::from_secs(3))
            .context("Could not find password input field")?;
        session
            .click_first(SUBMIT_BUTTONS, &["//button[contains(., 'Login')]", "//button[contains(., 'Sign in')]"])
            .context("Could not find login button")?;
        session.pause(Duration::from_secs(5));

        if session.current_url().contains("/login") {
            return Err(anyhow!("Still on the login page after submitting credentials"));
        }
        info!("✅ Logged in to Handshake");
        Ok(())
    }

    fn scrape_blocking(creds: &Credentials, search_url: &str, filter: &TitleFilter) -> Result<Vec<JobCandidate>> {
        let session = BrowserSession::launch()?;
        Self::login(&session, creds)?;

        info!("🔍 Navigating to job search page...");
        session.goto(search_url)?;
        session.pause(Duration::from_secs(5));
        session.dismiss_cookie_banner();

        for selector in LISTING_SELECTORS {
            if session.scroll_until_settled(selector)? > 0 {
                break;
            }
        }

        let listings = parse_listings(&session.html()?);
        info!("🔍 Final job count: {}", listings.len());

        // Detail pages are visited one at a time.
        let mut jobs = Vec::new();
        for (i, job) in listings.into_iter().enumerate() {
            if !filter.matches(&job.title) {
                debug!("⏭️ Skipped job {} (doesn't match filter): {}", i + 1, job.title);
                continue;
            }
            let (company, location) = match visit_detail(&session, &job.url) {
                Ok(fields) => fields,
                Err(e) => {
                    warn!("❌ Error extracting job details from {}: {:#}", job.url, e);
                    (UNKNOWN_COMPANY.to_string(), UNKNOWN_LOCATION.to_string())
                }
            };
            debug!("📝 {} | 🏢 {} | 📍 {}", job.title, company, location);
            jobs.push(job.with_company(company).with_location(location));
        }
        Ok(jobs)
    }
}

/// Handshake's `locationFilter` value for one configured location.
fn location_filter(location: &str) -> Value {
    let lower = location.trim().to_lowercase();
    let known = KNOWN_PLACES.iter().find(|(prefix, _, _)| lower.starts_with(prefix));
    let text = location.split(',').next().unwrap_or(location).trim();
    json!({
        "distance": LOCATION_RADIUS,
        "label": location.trim(),
        "type": known.map(|(_, kind, _)| *kind).unwrap_or("place"),
        "point": known.map(|(_, _, point)| *point),
        "text": text,
    })
}

/// Onsite or hybrid internship search, one `locationFilter` per location.
pub fn search_url(keywords: &str, locations: &[String]) -> Result<String> {
    let query = keywords.to_lowercase();
    let filters: Vec<String> = locations
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| location_filter(l).to_string())
        .collect();

    let mut params = vec![
        ("query", query.as_str()),
        ("pay[salaryType]", "1"),
        ("jobType", "3"),
        ("jobRoleGroups", "34"),
        ("remoteWork", "onsite"),
        ("remoteWork", "hybrid"),
    ];
    params.extend(filters.iter().map(|f| ("locationFilter", f.as_str())));
    params.extend([("page", "1"), ("per_page", "25")]);

    let url = Url::parse_with_params(SEARCH_URL, &params).context("Invalid Handshake search URL")?;
    Ok(url.to_string())
}

fn visit_detail(session: &BrowserSession, url: &str) -> Result<(String, String)> {
    if url.is_empty() {
        return Ok((UNKNOWN_COMPANY.to_string(), UNKNOWN_LOCATION.to_string()));
    }
    session.goto(url)?;
    session.pause(Duration::from_secs(2));
    Ok(resolve_details(&session.html()?))
}

/// Job links on a Handshake search page. Company and location are left as
/// sentinels; they live on the detail page.
pub fn parse_listings(html: &str) -> Vec<JobCandidate> {
    let document = Html::parse_document(html);
    let Some((_, links)) = first_non_empty(&document, LISTING_SELECTORS) else {
        warn!("No Handshake job links found");
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut jobs = Vec::new();
    for link in links {
        let aria = link.value().attr("aria-label").unwrap_or("").trim();
        let title = match aria.strip_prefix("View ") {
            Some(rest) => rest.trim().to_string(),
            None if !aria.is_empty() => aria.to_string(),
            None => text_of(link),
        };
        if title.is_empty() {
            continue;
        }

        let url = link
            .value()
            .attr("href")
            .map(|href| absolutize(BASE_URL, href))
            .unwrap_or_default();
        // A job card often carries more than one link to the same posting.
        if !url.is_empty() && !seen.insert(normalize_url(&url)) {
            continue;
        }

        jobs.push(JobCandidate::new(Source::Handshake, title).with_url(url));
    }
    jobs
}

/// Company and location from a job detail page, first plausible match wins.
pub fn resolve_details(html: &str) -> (String, String) {
    let document = Html::parse_document(html);
    let company = resolve_field(&document, COMPANY_STRATEGIES).unwrap_or_else(|| UNKNOWN_COMPANY.to_string());
    let location = resolve_field(&document, LOCATION_STRATEGIES).unwrap_or_else(|| UNKNOWN_LOCATION.to_string());
    (company, location)
}

#[async_trait]
impl ScraperTrait for HandshakeScraper {
    async fn scrape(&self) -> Result<Vec<JobCandidate>> {
        let Some(creds) = self.credentials.clone() else {
            warn!("Handshake credentials are not configured; skipping Handshake");
            return Ok(Vec::new());
        };
        let search_url = self.search_url.clone();
        let filter = self.filter.clone();

        let result = tokio::task::spawn_blocking(move || Self::scrape_blocking(&creds, &search_url, &filter))
            .await
            .context("Handshake browser task failed")?;

        match result {
            Ok(jobs) => {
                info!("✅ Scraped {} jobs from Handshake", jobs.len());
                Ok(jobs)
            }
            Err(e) => {
                warn!("❌ Handshake scrape aborted: {:#}", e);
                Ok(Vec::new())
            }
        }
    }

    fn source(&self) -> Source {
        Source::Handshake
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_listings_uses_aria_label() {
        let html = r#"
        <div>
          <a href="/job-search/111?page=1" aria-label="View Product Manager Intern">card</a>
          <a href="/job-search/111?page=1">Product Manager Intern</a>
          <a href="/job-search/222">Product Design Intern</a>
          <a href="/job-search/333" aria-label="  "></a>
          <a href="/employers/9">Acme</a>
        </div>"#;
        let jobs = parse_listings(html);
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].title, "Product Manager Intern");
        assert_eq!(jobs[0].url, "https://app.joinhandshake.com/job-search/111?page=1");
        assert_eq!(jobs[0].company, UNKNOWN_COMPANY);
        assert_eq!(jobs[1].title, "Product Design Intern");
    }

    #[test]
    fn test_resolve_details_strategy_order() {
        let html = r#"
        <main>
          <a href="/employers/42">Acme Robotics</a>
          <div data-testid="job-location">Chicago, IL</div>
          <h4>Company</h4><p>Acme Labs</p>
        </main>"#;
        let (company, location) = resolve_details(html);
        // The labelled h4 strategy ranks above the employer link.
        assert_eq!(company, "Acme Labs");
        assert_eq!(location, "Chicago, IL");
    }

    #[test]
    fn test_resolve_details_fallbacks() {
        let html = r#"<a href="/employers/42">Acme Robotics</a><span class="job-location-text">Remote</span>"#;
        assert_eq!(
            resolve_details(html),
            ("Acme Robotics".to_string(), "Remote".to_string())
        );
        assert_eq!(
            resolve_details("<p>nothing here</p>"),
            (UNKNOWN_COMPANY.to_string(), UNKNOWN_LOCATION.to_string())
        );
    }

    fn location_filters(url: &str) -> Vec<Value> {
        Url::parse(url)
            .unwrap()
            .query_pairs()
            .filter(|(k, _)| k == "locationFilter")
            .map(|(_, v)| serde_json::from_str(&v).unwrap())
            .collect()
    }

    #[test]
    fn test_search_url_filters_configured_locations() {
        let locations = vec!["San Francisco, CA".to_string(), "Austin, TX".to_string()];
        let url = search_url("Product Manager Intern", &locations).unwrap();

        assert!(url.starts_with("https://app.joinhandshake.com/job-search?query=product+manager+intern"));
        assert!(url.contains("remoteWork=onsite&remoteWork=hybrid"));

        let filters = location_filters(&url);
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0]["label"], "San Francisco, CA");
        assert_eq!(filters[0]["point"], "37.774929,-122.419415");
        assert_eq!(filters[0]["distance"], "50mi");
        assert_eq!(filters[1]["label"], "Austin, TX");
        assert_eq!(filters[1]["text"], "Austin");
        assert!(filters[1]["point"].is_null());
    }

    #[test]
    fn test_search_url_without_locations_is_nationwide() {
        let url = search_url("PM Intern", &[]).unwrap();
        assert!(location_filters(&url).is_empty());
    }

    #[test]
    fn test_override_url_wins() {
        let scraper = HandshakeScraper::new(
            None,
            Some("https://app.joinhandshake.com/job-search?query=x"),
            "PM",
            &["Chicago, IL".to_string()],
            TitleFilter::default(),
        )
        .unwrap();
        assert_eq!(scraper.search_url, "https://app.joinhandshake.com/job-search?query=x");
    }

    #[tokio::test]
    async fn test_scrape_without_credentials_is_empty() {
        let scraper = HandshakeScraper::new(None, None, "PM", &[], TitleFilter::default()).unwrap();
        assert!(scraper.scrape().await.unwrap().is_empty());
    }
}
