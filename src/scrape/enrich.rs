//! Bounded parallel content enrichment for search results.
//!
//! Every link is fetched concurrently under a semaphore so a large result
//! set cannot open unbounded pages against one browser. Enrichment is
//! best-effort per item: a link that fails to load leaves its result
//! without content and never fails the batch.

use std::sync::Arc;

use anyhow::Result;
use chromiumoxide::browser::Browser;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::search::SearchResult;
use crate::utils::constants::{CONTENT_TRUNCATE_LEN, DEFAULT_ENRICH_CONCURRENCY, TRUNCATION_MARKER};
use crate::utils::truncate_with_marker;

/// Fetch content for each link with at most `max_concurrent` in flight.
///
/// Returns one slot per link, in order: `Some` holds fetched content
/// truncated to the enrichment ceiling, `None` marks a failed or
/// canceled fetch.
pub async fn enrich_with<F, Fut>(
    links: &[String],
    max_concurrent: usize,
    cancel: &CancellationToken,
    fetch: F,
) -> Vec<Option<String>>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<String>>,
{
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let fetch = &fetch;

    let tasks = links.iter().map(|link| {
        let semaphore = semaphore.clone();
        let link = link.clone();
        async move {
            // Both waiting for admission and the fetch itself must yield
            // to cancellation; a slow page load cannot hold the batch open.
            let _permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                permit = semaphore.acquire() => permit.ok()?,
            };
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                result = fetch(link.clone()) => result,
            };
            match result {
                Ok(content) => {
                    Some(truncate_with_marker(&content, CONTENT_TRUNCATE_LEN, TRUNCATION_MARKER))
                }
                Err(err) => {
                    warn!(%link, error = %err, "content fetch failed, leaving result unenriched");
                    None
                }
            }
        }
    });

    join_all(tasks).await
}

/// Fill in `content` for each search result by loading its link in a
/// fresh page.
pub async fn enrich_results(
    browser: &Browser,
    results: &mut [SearchResult],
    max_concurrent: Option<usize>,
    cancel: &CancellationToken,
) -> Result<()> {
    let links: Vec<String> = results.iter().map(|r| r.link.clone()).collect();
    let max_concurrent = max_concurrent.unwrap_or(DEFAULT_ENRICH_CONCURRENCY);
    debug!(count = links.len(), max_concurrent, "enriching search results");

    let contents = enrich_with(&links, max_concurrent, cancel, |link| async move {
        let page = browser.new_page(link.as_str()).await?;
        let fetched = async {
            page.wait_for_navigation().await?;
            let text: String = page
                .evaluate("document.body ? document.body.innerText : ''")
                .await?
                .into_value()?;
            anyhow::Ok(text)
        }
        .await;
        // The page must go away whether or not the fetch worked.
        if let Err(err) = page.close().await {
            warn!(error = %err, "failed to close enrichment page");
        }
        fetched
    })
    .await;

    let enriched = contents.iter().filter(|c| c.is_some()).count();
    debug!(enriched, total = results.len(), "enrichment finished");

    for (result, content) in results.iter_mut().zip(contents) {
        result.content = content;
    }
    Ok(())
}
