//! Ordered selector fallback.
//!
//! Every extraction point takes a list of selector candidates and commits
//! to the first one that matches. Resolution is per field: a page may
//! match its container with the first candidate and its titles with the
//! third. What resolution never does is mix values from different
//! candidates of the same field within one item.

use anyhow::{Context, Result};
use chromiumoxide::{Element, Page};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::utils::constants::{PAGE_WAIT_POLL_INTERVAL, PAGE_WAIT_TIMEOUT};

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("not found: no selector candidate matched for {field}")]
    NoMatch { field: String },

    #[error("invalid argument: no selector candidates configured for {field}")]
    EmptyCandidates { field: String },
}

/// Try `probe` against each candidate in order; return the first hit
/// together with the selector that produced it.
pub async fn resolve_first<T, F, Fut>(
    field: &str,
    candidates: &[String],
    mut probe: F,
) -> Result<(String, T), ScrapeError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Option<T>>,
{
    if candidates.is_empty() {
        return Err(ScrapeError::EmptyCandidates {
            field: field.to_string(),
        });
    }

    for selector in candidates {
        if let Some(value) = probe(selector.clone()).await {
            trace!(field, selector, "selector candidate matched");
            return Ok((selector.clone(), value));
        }
        trace!(field, selector, "selector candidate missed");
    }

    Err(ScrapeError::NoMatch {
        field: field.to_string(),
    })
}

/// Resolve a single element on `page` via candidate fallback.
pub async fn resolve_element(
    page: &Page,
    field: &str,
    candidates: &[String],
) -> Result<(String, Element), ScrapeError> {
    resolve_first(field, candidates, |selector| async move {
        page.find_element(&selector).await.ok()
    })
    .await
}

/// Resolve a non-empty element list on `page` via candidate fallback.
pub async fn resolve_elements(
    page: &Page,
    field: &str,
    candidates: &[String],
) -> Result<(String, Vec<Element>), ScrapeError> {
    resolve_first(field, candidates, |selector| async move {
        match page.find_elements(&selector).await {
            Ok(elements) if !elements.is_empty() => Some(elements),
            _ => None,
        }
    })
    .await
}

/// Poll until any of the candidate selectors appears on the page, or the
/// page-wait ceiling elapses. Used after navigation, before extraction,
/// so slow-rendering pages do not read as "no results".
pub async fn wait_for_any(
    page: &Page,
    field: &str,
    candidates: &[String],
    cancel: &CancellationToken,
) -> Result<String> {
    let selector = wait_until(field, cancel, || async {
        for selector in candidates {
            if page.find_element(selector).await.is_ok() {
                return Some(selector.clone());
            }
        }
        None
    })
    .await
    .with_context(|| format!("tried {candidates:?}"))?;

    debug!(field, selector, "page content is present");
    Ok(selector)
}

/// Run `probe` at the page-wait poll interval until it yields a value,
/// the ceiling elapses, or `cancel` fires during a sleep.
async fn wait_until<T, F, Fut>(field: &str, cancel: &CancellationToken, mut probe: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = tokio::time::Instant::now() + PAGE_WAIT_TIMEOUT;
    loop {
        if let Some(value) = probe().await {
            return Ok(value);
        }
        if tokio::time::Instant::now() >= deadline {
            anyhow::bail!("timeout waiting for page content ({field})");
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                anyhow::bail!("canceled while waiting for page content ({field})");
            }
            _ = tokio::time::sleep(PAGE_WAIT_POLL_INTERVAL) => {}
        }
    }
}

static FIRST_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d+").unwrap_or_else(|_| unreachable!("static regex is valid"))
});

/// First run of digits in `text`, or 0 when there is none. "123 points"
/// and "discuss" both parse without an error path.
pub fn first_number(text: &str) -> u32 {
    FIRST_NUMBER
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}
