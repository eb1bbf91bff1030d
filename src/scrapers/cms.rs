use crate::config::Credentials;
use crate::models::{JobCandidate, Source, UNKNOWN_COMPANY, UNKNOWN_LOCATION};
use crate::normalize::absolutize;
use crate::scrapers::browser::BrowserSession;
use crate::scrapers::selectors::{first_non_empty, first_with_attr, first_with_text, text_of};
use crate::scrapers::traits::ScraperTrait;
use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, info, warn};

const BASE_URL: &str = "https://kellogg-northwestern.12twenty.com";
const SSO_URL: &str = "https://12twenty-sso.kellogg.northwestern.edu/";
const DEFAULT_POSTINGS_URL: &str = "https://kellogg-northwestern.12twenty.com/jobPostings";

const ROW_SELECTORS: &[&str] = &["tr.job-posting", "tbody tr", "tr", "table tr"];
const TITLE_SELECTORS: &[&str] = &[
    "span.primary-item-text",
    "a.job-title",
    "span",
    "a",
    "[class*='title']",
];
const LINK_SELECTORS: &[&str] = &["a.job-title", "a"];

/// Substrings that make a cell look like a location. Deliberately loose.
const LOCATION_HINTS: &[&str] = &["city", "state", "ca", "ny", "il", "tx", "wa", "ma", "remote", "hybrid"];

/// Cells longer than this are never company or location.
const MAX_CELL_LEN: usize = 100;
/// Company cells must be shorter than this.
const MAX_COMPANY_LEN: usize = 50;

/// 12twenty career-services portal scraper (login + headless browser)
pub struct CmsScraper {
    credentials: Option<Credentials>,
    postings_url: String,
}

impl CmsScraper {
    pub fn new(credentials: Option<Credentials>, postings_url: Option<&str>) -> Self {
        Self {
            credentials,
            postings_url: postings_url.unwrap_or(DEFAULT_POSTINGS_URL).to_string(),
        }
    }

    fn scrape_blocking(creds: &Credentials, postings_url: &str) -> Result<Vec<JobCandidate>> {
        let session = BrowserSession::launch()?;

        info!("🔐 Logging in to 12twenty...");
        session.goto(SSO_URL)?;
        session
            .click_first(&[], &["//p[contains(normalize-space(.), 'Student Login')]"])
            .context("Student Login entry not found")?;
        session.fill_first(&["#txtUsername"], &creds.username, Duration::from_secs(15))?;
        session.fill_first(&["#txtPassword"], &creds.password, Duration::from_secs(5))?;
        session.click_first(&["#btnLogin"], &[])?;
        session.pause(Duration::from_secs(3));

        session.goto(postings_url)?;
        session
            .wait_for("table#jobPostingsContent", Duration::from_secs(20))
            .context("Job postings table did not load")?;
        info!("📄 Job postings table loaded");
        session.pause(Duration::from_secs(3));

        for selector in ROW_SELECTORS {
            let count = session.scroll_until_settled(selector)?;
            if count > 0 {
                info!("✅ Using selector '{}' - found {} rows", selector, count);
                break;
            }
        }

        let html = session.html()?;
        Ok(parse_postings(&html))
    }
}

/// Cell text with its column index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub index: usize,
    pub text: String,
}

/// Guess company and location from a row's cells.
///
/// Approximate by nature: there is no ground truth to check it against. Cells
/// with URLs or long text are ignored. The first short, comma-free cell
/// without a location hint becomes the company; otherwise the first cell with a
/// comma, a location hint, or past the second column becomes the location.
/// Neither is reassigned once set.
pub fn score_cells(cells: &[Cell], title: &str) -> (String, String) {
    let mut company: Option<&str> = None;
    let mut location: Option<&str> = None;

    if cells.len() < 2 {
        return (UNKNOWN_COMPANY.to_string(), UNKNOWN_LOCATION.to_string());
    }

    for cell in cells {
        let text = cell.text.as_str();
        if text.is_empty() || text == title {
            continue;
        }
        let len = text.chars().count();
        let lower = text.to_lowercase();
        if lower.contains("http") || len > MAX_CELL_LEN {
            continue;
        }

        let has_comma = text.contains(',');
        let looks_like_location = LOCATION_HINTS.iter().any(|hint| lower.contains(hint));

        if company.is_none() && !has_comma && !looks_like_location && len < MAX_COMPANY_LEN {
            company = Some(text);
        } else if location.is_none() && (has_comma || looks_like_location || cell.index > 1) {
            location = Some(text);
        }
    }

    (
        company.unwrap_or(UNKNOWN_COMPANY).to_string(),
        location.unwrap_or(UNKNOWN_LOCATION).to_string(),
    )
}

fn row_cells(row: ElementRef<'_>, td: &Selector) -> Vec<Cell> {
    row.select(td)
        .enumerate()
        .map(|(index, cell)| Cell {
            index,
            text: text_of(cell),
        })
        .collect()
}

/// Parse the job postings table out of a rendered 12twenty page.
pub fn parse_postings(html: &str) -> Vec<JobCandidate> {
    let document = Html::parse_document(html);
    let Ok(td) = Selector::parse("td") else {
        return Vec::new();
    };

    let Some((selector, rows)) = first_non_empty(&document, ROW_SELECTORS) else {
        warn!("❌ No rows found with any selector");
        return Vec::new();
    };
    debug!("Parsing {} rows matched by '{}'", rows.len(), selector);

    let mut jobs = Vec::new();
    for (i, row) in rows.into_iter().enumerate() {
        let Some(title_el) = first_with_text(row, TITLE_SELECTORS) else {
            debug!("Skipping row {} - no title", i + 1);
            continue;
        };
        let title = text_of(title_el);

        let url = first_with_attr(row, LINK_SELECTORS, "href")
            .and_then(|a| a.value().attr("href"))
            .map(|href| absolutize(BASE_URL, href))
            .unwrap_or_default();
        if url.is_empty() {
            debug!("Row {} has no link; keeping it without a URL", i + 1);
        }

        let (company, location) = score_cells(&row_cells(row, &td), &title);
        debug!("📝 {} | 🏢 {} | 📍 {}", title, company, location);

        jobs.push(
            JobCandidate::new(Source::Cms, title)
                .with_company(company)
                .with_location(location)
                .with_url(url),
        );
    }
    jobs
}

#[async_trait]
impl ScraperTrait for CmsScraper {
    async fn scrape(&self) -> Result<Vec<JobCandidate>> {
        let Some(creds) = self.credentials.clone() else {
            warn!("CMS credentials are not configured; skipping 12twenty");
            return Ok(Vec::new());
        };
        let postings_url = self.postings_url.clone();

        let result = tokio::task::spawn_blocking(move || Self::scrape_blocking(&creds, &postings_url))
            .await
            .context("12twenty browser task failed")?;

        // Login and navigation failures end this source only.
        match result {
            Ok(jobs) => {
                info!("✅ Scraped {} jobs from 12twenty", jobs.len());
                Ok(jobs)
            }
            Err(e) => {
                warn!("❌ 12twenty scrape aborted: {:#}", e);
                Ok(Vec::new())
            }
        }
    }

    fn source(&self) -> Source {
        Source::Cms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(texts: &[&str]) -> Vec<Cell> {
        texts
            .iter()
            .enumerate()
            .map(|(index, text)| Cell {
                index,
                text: text.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_score_cells_company_then_location() {
        let (company, location) =
            score_cells(&cells(&["Product Manager Intern", "Globex", "Chicago, IL"]), "Product Manager Intern");
        assert_eq!(company, "Globex");
        assert_eq!(location, "Chicago, IL");
    }

    #[test]
    fn test_score_cells_rejects_urls_and_long_text() {
        let long = "y".repeat(120);
        let (company, location) = score_cells(
            &cells(&["PM Intern", "https://globex.com", &long, "Globex", "Remote"]),
            "PM Intern",
        );
        assert_eq!(company, "Globex");
        assert_eq!(location, "Remote");
    }

    #[test]
    fn test_score_cells_first_match_wins() {
        let (company, location) = score_cells(
            &cells(&["Title", "Initech", "Hooli", "Austin, TX", "Boston, MA"]),
            "Title",
        );
        assert_eq!(company, "Initech");
        // "Hooli" is at a later column and company is already taken.
        assert_eq!(location, "Hooli");
    }

    #[test]
    fn test_score_cells_location_hint_blocks_company() {
        // "ca" inside "Capital" reads as a location hint.
        let (company, location) = score_cells(&cells(&["Title", "Capital One"]), "Title");
        assert_eq!(company, UNKNOWN_COMPANY);
        assert_eq!(location, "Capital One");
    }

    #[test]
    fn test_score_cells_too_few_cells() {
        assert_eq!(
            score_cells(&cells(&["Only"]), "x"),
            (UNKNOWN_COMPANY.to_string(), UNKNOWN_LOCATION.to_string())
        );
    }

    const PAGE: &str = r#"
    <html><body>
    <table id="jobPostingsContent">
      <thead><tr><th>Title</th><th>Company</th><th>Location</th></tr></thead>
      <tbody>
        <tr class="job-posting">
          <td><a class="job-title" href="/jobPostings/123"><span class="primary-item-text">Product Management Intern</span></a></td>
          <td>Acme</td>
          <td>New York, NY</td>
        </tr>
        <tr class="job-posting">
          <td><span class="primary-item-text">Product Strategy Intern</span></td>
          <td>Globex</td>
        </tr>
        <tr class="job-posting"><td></td></tr>
      </tbody>
    </table>
    </body></html>
    "#;

    #[test]
    fn test_parse_postings() {
        let jobs = parse_postings(PAGE);
        assert_eq!(jobs.len(), 2);

        assert_eq!(jobs[0].title, "Product Management Intern");
        assert_eq!(jobs[0].company, "Acme");
        assert_eq!(jobs[0].location, "New York, NY");
        assert_eq!(jobs[0].url, "https://kellogg-northwestern.12twenty.com/jobPostings/123");

        assert_eq!(jobs[1].title, "Product Strategy Intern");
        assert_eq!(jobs[1].company, "Globex");
        assert_eq!(jobs[1].location, UNKNOWN_LOCATION);
        assert_eq!(jobs[1].url, "");
    }

    #[tokio::test]
    async fn test_scrape_without_credentials_is_empty() {
        let scraper = CmsScraper::new(None, None);
        assert!(scraper.scrape().await.unwrap().is_empty());
    }
}
