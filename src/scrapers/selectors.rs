//! Ordered selector fallbacks.
//!
//! Listing markup changes without notice, so every lookup is a list of
//! strategies tried in order; the first one that yields something wins.

use scraper::{ElementRef, Html, Selector};
use tracing::warn;

/// Upper bound on a text field resolved from a detail page.
pub const MAX_FIELD_LEN: usize = 100;

fn parse(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            warn!("Invalid selector '{}': {:?}", css, e);
            None
        }
    }
}

/// Whitespace-collapsed text content of an element.
pub fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Elements matched by the first selector that matches anything.
///
/// Returns the winning selector alongside its matches.
pub fn first_non_empty<'a>(document: &'a Html, selectors: &[&'static str]) -> Option<(&'static str, Vec<ElementRef<'a>>)> {
    selectors.iter().find_map(|css| {
        let selector = parse(css)?;
        let found: Vec<_> = document.select(&selector).collect();
        (!found.is_empty()).then_some((*css, found))
    })
}

/// First element under `root` with non-empty text, trying selectors in order.
pub fn first_with_text<'a>(root: ElementRef<'a>, selectors: &[&str]) -> Option<ElementRef<'a>> {
    selectors.iter().find_map(|css| {
        let selector = parse(css)?;
        root.select(&selector).find(|el| !text_of(*el).is_empty())
    })
}

/// First element under `root` carrying a non-empty `attr`, trying selectors in order.
pub fn first_with_attr<'a>(root: ElementRef<'a>, selectors: &[&str], attr: &str) -> Option<ElementRef<'a>> {
    selectors.iter().find_map(|css| {
        let selector = parse(css)?;
        root.select(&selector)
            .find(|el| el.value().attr(attr).is_some_and(|v| !v.trim().is_empty()))
    })
}

/// One way of locating a field on a detail page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldStrategy {
    /// Text of the first element matching a CSS selector
    Css(&'static str),
    /// Text of the element following a `tag` whose own text is `label`,
    /// e.g. `<h4>Company</h4><div>Acme</div>`
    Labeled { tag: &'static str, label: &'static str },
}

impl FieldStrategy {
    pub fn extract(&self, document: &Html) -> Option<String> {
        match self {
            FieldStrategy::Css(css) => {
                let selector = parse(css)?;
                document.select(&selector).next().map(text_of)
            }
            FieldStrategy::Labeled { tag, label } => {
                let selector = parse(tag)?;
                document
                    .select(&selector)
                    .filter(|el| text_of(*el).eq_ignore_ascii_case(label))
                    .find_map(|el| el.next_siblings().find_map(ElementRef::wrap))
                    .map(text_of)
            }
        }
    }
}

/// Resolve a field with the first strategy producing plausible text.
pub fn resolve_field(document: &Html, strategies: &[FieldStrategy]) -> Option<String> {
    strategies.iter().find_map(|strategy| {
        strategy
            .extract(document)
            .filter(|text| !text.is_empty() && text.chars().count() < MAX_FIELD_LEN)
    })
}
