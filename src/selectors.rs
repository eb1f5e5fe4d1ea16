//! Configurable CSS selector candidates for scraping targets.
//!
//! Sites change their markup without notice, so every extraction point is
//! a list of candidates tried in order. Users can override any list from a
//! JSON file; a field left out (or empty) falls back to the built-in
//! candidates for that field only, so a partial override never loses the
//! defaults for everything else.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Selector candidates for Google search result pages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct GoogleSearchSelectors {
    pub result_item: Vec<String>,
    pub title: Vec<String>,
    pub link: Vec<String>,
    pub snippet: Vec<String>,
    pub fallback_wait: Vec<String>,
}

impl GoogleSearchSelectors {
    pub fn defaults() -> Self {
        Self {
            result_item: strings(&["div.g", "div.rc", "div.Gx5Zad"]),
            title: strings(&["h3", "h3.LC20lb", "div.v9i61e"]),
            link: strings(&["a", "a[href]", "a[ping]"]),
            snippet: strings(&["div.VwiC3b", "div.s", "div.BNeawe"]),
            fallback_wait: strings(&["div#search", "div.g", "body"]),
        }
    }

    fn fill_empty(&mut self) {
        let defaults = Self::defaults();
        fill(&mut self.result_item, defaults.result_item);
        fill(&mut self.title, defaults.title);
        fill(&mut self.link, defaults.link);
        fill(&mut self.snippet, defaults.snippet);
        fill(&mut self.fallback_wait, defaults.fallback_wait);
    }
}

/// Selector candidates for the Hacker News front page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct HackerNewsSelectors {
    pub main_table: Vec<String>,
    pub title_link: Vec<String>,
    pub score: Vec<String>,
    pub author: Vec<String>,
    pub time: Vec<String>,
    pub comments: Vec<String>,
    pub fallback_wait: Vec<String>,
}

impl HackerNewsSelectors {
    pub fn defaults() -> Self {
        Self {
            main_table: strings(&["table.itemlist", "table#hnmain", "table"]),
            title_link: strings(&["span.titleline > a", "a.storylink", "td.title > a"]),
            score: strings(&[".score", ".subtext .score"]),
            author: strings(&[".hnuser", ".subtext a.hnuser", "td.subtext a[href*=\"user?id=\"]"]),
            time: strings(&["span.age a", "span.age", ".subtext .age"]),
            comments: strings(&["td.subtext > a:last-child", "a[href*=\"item?id=\"]"]),
            fallback_wait: strings(&["table.itemlist", "body"]),
        }
    }

    fn fill_empty(&mut self) {
        let defaults = Self::defaults();
        fill(&mut self.main_table, defaults.main_table);
        fill(&mut self.title_link, defaults.title_link);
        fill(&mut self.score, defaults.score);
        fill(&mut self.author, defaults.author);
        fill(&mut self.time, defaults.time);
        fill(&mut self.comments, defaults.comments);
        fill(&mut self.fallback_wait, defaults.fallback_wait);
    }
}

/// All selector groups known to the tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct SelectorConfig {
    pub google_search: GoogleSearchSelectors,
    pub hacker_news: HackerNewsSelectors,
}

impl SelectorConfig {
    pub fn defaults() -> Self {
        Self {
            google_search: GoogleSearchSelectors::defaults(),
            hacker_news: HackerNewsSelectors::defaults(),
        }
    }

    /// Load selectors, merging user overrides over the defaults.
    ///
    /// `None` or a missing file yields the defaults. A file that exists
    /// but does not parse is an error, so a typo cannot silently revert
    /// the user's overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::defaults());
        };

        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "selector config not found, using defaults");
                return Ok(Self::defaults());
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to read selector config {}", path.display())
                });
            }
        };

        let mut config: Self = serde_json::from_str(&data)
            .with_context(|| format!("invalid selector config {}", path.display()))?;
        config.google_search.fill_empty();
        config.hacker_news.fill_empty();
        info!(path = %path.display(), "loaded selector config");
        Ok(config)
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn fill(field: &mut Vec<String>, default: Vec<String>) {
    if field.is_empty() {
        *field = default;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_path_yields_defaults() {
        let config = SelectorConfig::load(None).unwrap();
        assert_eq!(config, SelectorConfig::defaults());
        assert_eq!(config.google_search.result_item[0], "div.g");
        assert_eq!(config.hacker_news.title_link[0], "span.titleline > a");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = SelectorConfig::load(Some(&tmp.path().join("nope.json"))).unwrap();
        assert_eq!(config, SelectorConfig::defaults());
    }

    #[test]
    fn partial_override_keeps_defaults_for_other_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("selectors.json");
        std::fs::write(
            &path,
            r#"{"google_search": {"title": ["h2.custom"]}}"#,
        )
        .unwrap();

        let config = SelectorConfig::load(Some(&path)).unwrap();
        assert_eq!(config.google_search.title, vec!["h2.custom".to_string()]);
        // Untouched fields fall back, per field.
        assert_eq!(
            config.google_search.result_item,
            GoogleSearchSelectors::defaults().result_item
        );
        assert_eq!(config.hacker_news, HackerNewsSelectors::defaults());
    }

    #[test]
    fn empty_list_falls_back_to_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("selectors.json");
        std::fs::write(&path, r#"{"hacker_news": {"score": []}}"#).unwrap();

        let config = SelectorConfig::load(Some(&path)).unwrap();
        assert_eq!(config.hacker_news.score, HackerNewsSelectors::defaults().score);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("selectors.json");
        std::fs::write(&path, b"{broken").unwrap();
        assert!(SelectorConfig::load(Some(&path)).is_err());
    }
}
