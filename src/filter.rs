//! Title keyword filtering.
//!
//! Keywords inside a group are AND-combined, groups are OR-combined. Matching
//! is plain case-insensitive substring containment.

use serde::{Deserialize, Serialize};

/// A set of keywords that must all appear in a title
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeywordGroup {
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl KeywordGroup {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
        }
    }

    fn matches_lowered(&self, title_lower: &str) -> bool {
        self.keywords
            .iter()
            .all(|keyword| title_lower.contains(&keyword.to_lowercase()))
    }
}

/// Built-in group used when no keywords are configured.
pub fn default_groups() -> Vec<KeywordGroup> {
    vec![KeywordGroup::new(["product", "intern"])]
}

/// Returns true when at least one group has every keyword in `title`.
pub fn matches(title: &str, groups: &[KeywordGroup]) -> bool {
    let title_lower = title.to_lowercase();
    groups.iter().any(|group| group.matches_lowered(&title_lower))
}

/// Owned filter handed to the pipeline and to scrapers that want to skip
/// expensive work for titles that would be rejected anyway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleFilter {
    groups: Vec<KeywordGroup>,
}

impl TitleFilter {
    pub fn new(groups: Vec<KeywordGroup>) -> Self {
        Self { groups }
    }

    pub fn matches(&self, title: &str) -> bool {
        matches(title, &self.groups)
    }
}

impl Default for TitleFilter {
    fn default() -> Self {
        Self::new(default_groups())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_group_matches_case_insensitively() {
        let filter = TitleFilter::default();
        assert!(filter.matches("Product Management Intern"));
        assert!(filter.matches("PRODUCT INTERNSHIP - Summer 2026"));
        assert!(!filter.matches("Product Manager"));
        assert!(!filter.matches("Software Engineering Intern"));
    }

    #[test]
    fn test_groups_are_or_combined() {
        let groups = vec![
            KeywordGroup::new(["product", "intern"]),
            KeywordGroup::new(["strategy", "Associate"]),
        ];
        assert!(matches("Strategy & Operations associate", &groups));
        assert!(matches("Associate Product Intern", &groups));
        assert!(!matches("Strategy Intern", &groups));
    }

    #[test]
    fn test_empty_group_list_matches_nothing() {
        assert!(!matches("Product Intern", &[]));
        assert!(!TitleFilter::new(Vec::new()).matches(""));
    }

    #[test]
    fn test_group_without_keywords_matches_everything() {
        let groups = vec![KeywordGroup::new(Vec::<String>::new())];
        assert!(matches("Anything at all", &groups));
    }

    #[test]
    fn test_matches_iff_some_group_fully_contained() {
        let titles = ["Product Intern", "intern, product", "Prod Intern", "", "PRODUCTINTERN"];
        let groups = vec![
            KeywordGroup::new(["product", "intern"]),
            KeywordGroup::new(["prod"]),
        ];
        for title in titles {
            let lower = title.to_lowercase();
            let expected = groups
                .iter()
                .any(|g| g.keywords.iter().all(|k| lower.contains(&k.to_lowercase())));
            assert_eq!(matches(title, &groups), expected, "title {title:?}");
        }
    }
}
