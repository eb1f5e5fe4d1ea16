//! Google search scraping with per-strategy extraction.
//!
//! Each result-container candidate is a complete strategy: all fields of
//! a result row are read relative to the container that candidate
//! matched. A strategy that matches containers but yields zero valid
//! rows is abandoned in favor of the next candidate, so a layout change
//! degrades to the fallback selectors instead of producing garbage rows
//! stitched from mismatched strategies.

use anyhow::{Context, Result};
use chromiumoxide::{Element, Page};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::resolve::{ScrapeError, resolve_first, wait_for_any};
use crate::retry::{RetryPolicy, execute};
use crate::selectors::GoogleSearchSelectors;
use crate::utils::normalize_whitespace;

/// One search result row. `content` is only populated by enrichment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Run a Google search and extract up to `limit` results.
pub async fn search(
    page: &Page,
    query: &str,
    limit: usize,
    selectors: &GoogleSearchSelectors,
    cancel: &CancellationToken,
) -> Result<Vec<SearchResult>> {
    let search_url = url::Url::parse_with_params(
        "https://www.google.com/search",
        &[("q", query)],
    )
    .context("invalid argument: could not build search URL")?;

    let policy = RetryPolicy::navigation();
    execute(
        &policy,
        cancel,
        |attempt, err| warn!(attempt, error = %err, "search navigation failed, retrying"),
        || async {
            page.goto(search_url.as_str()).await?;
            page.wait_for_navigation().await?;
            Ok(())
        },
    )
    .await
    .context("failed to load search results page")?;

    wait_for_any(page, "search results", &selectors.fallback_wait, cancel).await?;

    // Strategy loop over container candidates.
    for container_selector in &selectors.result_item {
        let items = match page.find_elements(container_selector.as_str()).await {
            Ok(items) if !items.is_empty() => items,
            _ => continue,
        };
        debug!(
            selector = %container_selector,
            count = items.len(),
            "trying result container candidate"
        );

        let mut results = Vec::new();
        for item in &items {
            if results.len() >= limit {
                break;
            }
            match extract_result(item, selectors).await {
                Some(result) => results.push(result),
                None => debug!(selector = %container_selector, "skipping incomplete result row"),
            }
        }

        if !results.is_empty() {
            info!(query, count = results.len(), "search extracted results");
            return Ok(results);
        }
        // Containers matched but produced nothing usable; the layout this
        // candidate targets is gone. Fall through to the next one.
        warn!(selector = %container_selector, "container matched but yielded no valid rows");
    }

    Err(ScrapeError::NoMatch {
        field: "search results".to_string(),
    }
    .into())
}

/// Extract one row, reading every field relative to its container.
/// Returns `None` when the row lacks a usable title or link.
async fn extract_result(
    item: &Element,
    selectors: &GoogleSearchSelectors,
) -> Option<SearchResult> {
    let (_, title) = resolve_first("result title", &selectors.title, |sel| async move {
        let text = item.find_element(&sel).await.ok()?.inner_text().await.ok()??;
        let text = normalize_whitespace(&text);
        (!text.is_empty()).then_some(text)
    })
    .await
    .ok()?;

    let (_, link) = resolve_first("result link", &selectors.link, |sel| async move {
        let href = item
            .find_element(&sel)
            .await
            .ok()?
            .attribute("href")
            .await
            .ok()??;
        href.starts_with("http").then_some(href)
    })
    .await
    .ok()?;

    // Snippets are frequently absent; an empty one never disqualifies a row.
    let snippet = resolve_first("result snippet", &selectors.snippet, |sel| async move {
        let text = item.find_element(&sel).await.ok()?.inner_text().await.ok()??;
        Some(normalize_whitespace(&text))
    })
    .await
    .map(|(_, text)| text)
    .unwrap_or_default();

    Some(SearchResult {
        title,
        link,
        snippet,
        content: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_field_is_omitted_when_absent() {
        let result = SearchResult {
            title: "Rust".into(),
            link: "https://www.rust-lang.org/".into(),
            snippet: "A language".into(),
            content: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("content").is_none());
        assert_eq!(json["title"], "Rust");
    }

    #[test]
    fn content_field_is_present_when_enriched() {
        let result = SearchResult {
            title: "Rust".into(),
            link: "https://www.rust-lang.org/".into(),
            snippet: String::new(),
            content: Some("page text".into()),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["content"], "page text");
    }
}
