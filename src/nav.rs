//! Top-level navigation entries.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A top-level navigation entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavEntry {
    pub text: String,
    pub link: String,
    /// Pattern used only to highlight the entry for the current page.
    #[serde(
        rename(serialize = "activeMatch", deserialize = "active_match"),
        alias = "activeMatch"
    )]
    pub active_match: String,
}

impl NavEntry {
    pub fn new(
        text: impl Into<String>,
        link: impl Into<String>,
        active_match: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            link: link.into(),
            active_match: active_match.into(),
        }
    }

    /// Whether this entry should be highlighted on `page_path`.
    ///
    /// `active_match` is read as a regular expression; one that fails to compile
    /// is treated as a literal prefix.
    pub fn is_active(&self, page_path: &str) -> bool {
        match Regex::new(&self.active_match) {
            Ok(re) => re.is_match(page_path),
            Err(_) => page_path.starts_with(&self.active_match),
        }
    }
}

/// Ordered navigation bar, fixed once constructed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NavModel(Vec<NavEntry>);

impl NavModel {
    pub fn new(entries: Vec<NavEntry>) -> Self {
        Self(entries)
    }

    pub fn entries(&self) -> &[NavEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every entry highlighted on `page_path`, in bar order.
    pub fn active_entries<'a>(&'a self, page_path: &'a str) -> impl Iterator<Item = &'a NavEntry> {
        self.0.iter().filter(move |entry| entry.is_active(page_path))
    }
}

impl FromIterator<NavEntry> for NavModel {
    fn from_iter<T: IntoIterator<Item = NavEntry>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_nav() -> NavModel {
        NavModel::new(vec![
            NavEntry::new("Guide", "/guide/getting-started", "/guide/"),
            NavEntry::new("Config", "/config/site", "/config/"),
            NavEntry::new("Reference", "/config/reference", "/config/"),
        ])
    }

    #[test]
    fn test_order_is_preserved() {
        let nav = sample_nav();
        let texts: Vec<_> = nav.entries().iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["Guide", "Config", "Reference"]);
    }

    #[test]
    fn test_shared_active_match_is_allowed() {
        let nav = sample_nav();
        let active: Vec<_> = nav.active_entries("/config/site").map(|e| e.text.as_str()).collect();
        assert_eq!(active, vec!["Config", "Reference"]);
        assert_eq!(nav.active_entries("/blog/").count(), 0);
    }

    #[test]
    fn test_invalid_pattern_falls_back_to_prefix() {
        let entry = NavEntry::new("Odd", "/odd(/", "/odd(/");
        assert!(entry.is_active("/odd(/page"));
        assert!(!entry.is_active("/even/"));
    }

    #[test]
    fn test_serializes_active_match_camel_case() {
        let json = serde_json::to_value(sample_nav()).unwrap();
        assert_eq!(json[0]["activeMatch"], "/guide/");
        assert_eq!(json[0]["link"], "/guide/getting-started");
    }

    #[test]
    fn test_deserializes_snake_case() {
        let entry: NavEntry = toml::from_str(
            r#"
text = "Guide"
link = "/guide/"
active_match = "/guide/"
"#,
        )
        .unwrap();
        assert_eq!(entry.active_match, "/guide/");
    }
}
