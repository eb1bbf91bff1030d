use crate::scrapers::types::{ScrollPoller, ScrollStep};
use anyhow::{anyhow, Context, Result};
use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default wait for elements and navigations.
const ELEMENT_TIMEOUT: Duration = Duration::from_secs(15);
/// Pause after each scroll so lazily loaded rows can render.
const SCROLL_PAUSE: Duration = Duration::from_millis(1500);

/// Headless Chrome session with the handful of page operations the
/// authenticated scrapers need.
///
/// All calls block; run them on the blocking pool.
pub struct BrowserSession {
    // Keeps the Chrome process alive for as long as the tab is used.
    _browser: Browser,
    tab: Arc<Tab>,
}

impl BrowserSession {
    /// Launch headless Chrome and open a single tab.
    pub fn launch() -> Result<Self> {
        info!("Launching headless Chrome...");

        let options = LaunchOptions::default_builder()
            .headless(true)
            .idle_browser_timeout(Duration::from_secs(300))
            .build()
            .context("Failed to build launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome browser")?;
        let tab = browser.new_tab().context("Failed to create new browser tab")?;
        tab.set_default_timeout(ELEMENT_TIMEOUT);

        Ok(Self { _browser: browser, tab })
    }

    pub fn goto(&self, url: &str) -> Result<()> {
        debug!("Navigating to {}", url);
        self.tab
            .navigate_to(url)
            .with_context(|| format!("Failed to navigate to {}", url))?;
        self.tab
            .wait_until_navigated()
            .with_context(|| format!("Timed out loading {}", url))?;
        Ok(())
    }

    pub fn current_url(&self) -> String {
        self.tab.get_url()
    }

    pub fn pause(&self, duration: Duration) {
        thread::sleep(duration);
    }

    pub fn wait_for(&self, selector: &str, timeout: Duration) -> Result<Element<'_>> {
        self.tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .with_context(|| format!("Element '{}' did not appear", selector))
    }

    /// First element matched by any selector in `selectors`, each given `timeout`.
    pub fn wait_for_any(&self, selectors: &[&str], timeout: Duration) -> Option<(String, Element<'_>)> {
        selectors.iter().find_map(|selector| {
            match self.tab.wait_for_element_with_custom_timeout(selector, timeout) {
                Ok(element) => {
                    debug!("✅ Found element with selector: {}", selector);
                    Some((selector.to_string(), element))
                }
                Err(_) => None,
            }
        })
    }

    /// Type `text` into the first input matched by `selectors`.
    pub fn fill_first(&self, selectors: &[&str], text: &str, timeout: Duration) -> Result<String> {
        let (selector, element) = self
            .wait_for_any(selectors, timeout)
            .ok_or_else(|| anyhow!("No input matched any of {:?}", selectors))?;
        element.click().context("Failed to focus input")?;
        element.type_into(text).context("Failed to type into input")?;
        Ok(selector)
    }

    /// Click the first element matched by the CSS selectors, then the XPath
    /// expressions (used for matching on button text).
    pub fn click_first(&self, selectors: &[&str], xpaths: &[&str]) -> Result<String> {
        for selector in selectors {
            if let Ok(element) = self.tab.find_element(selector) {
                if element.click().is_ok() {
                    debug!("✅ Clicked element with selector: {}", selector);
                    return Ok(selector.to_string());
                }
            }
        }
        for xpath in xpaths {
            if let Ok(element) = self.tab.find_element_by_xpath(xpath) {
                if element.click().is_ok() {
                    debug!("✅ Clicked element with xpath: {}", xpath);
                    return Ok(xpath.to_string());
                }
            }
        }
        Err(anyhow!("Nothing clickable matched {:?} / {:?}", selectors, xpaths))
    }

    /// Blur the active element so forms that validate on blur enable submit.
    pub fn blur_active(&self) {
        let _ = self
            .tab
            .evaluate("document.activeElement && document.activeElement.blur()", false);
    }

    /// Accept cookie banners if present
    pub fn dismiss_cookie_banner(&self) {
        let _ = self.tab.evaluate(
            r#"
            const button = document.querySelector('button[id*="accept"], button[id*="cookie"]');
            if (button) button.click();
            "#,
            false,
        );
    }

    /// Full rendered page HTML.
    pub fn html(&self) -> Result<String> {
        let result = self.tab.evaluate("document.documentElement.outerHTML", false)?;
        match result.value.as_ref().and_then(|v| v.as_str()) {
            Some(html) => Ok(html.to_string()),
            None => {
                warn!("Could not get HTML from page");
                Ok(String::new())
            }
        }
    }

    /// Number of elements currently matching `selector`.
    pub fn count(&self, selector: &str) -> Result<usize> {
        let selector = serde_json::to_string(selector)?;
        let expr = format!("document.querySelectorAll({}).length", selector);
        let result = self.tab.evaluate(&expr, false)?;
        Ok(result
            .value
            .as_ref()
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as usize)
    }

    /// Scroll to the bottom until the number of `selector` matches settles.
    pub fn scroll_until_settled(&self, selector: &str) -> Result<usize> {
        let mut poller = ScrollPoller::default();
        loop {
            let count = self.count(selector)?;
            debug!("Scroll {}: found {} '{}' elements", poller.polls() + 1, count, selector);

            match poller.observe(count) {
                ScrollStep::Continue => {
                    self.tab
                        .evaluate("window.scrollTo(0, document.body.scrollHeight)", false)?;
                    thread::sleep(SCROLL_PAUSE);
                }
                ScrollStep::Settled => {
                    info!("✅ All rows loaded ({} '{}')", count, selector);
                    return Ok(count);
                }
                ScrollStep::Exhausted => {
                    warn!("Stopped scrolling after {} polls ({} '{}')", poller.polls(), count, selector);
                    return Ok(count);
                }
            }
        }
    }
}
