//! Hacker News front page scraping.
//!
//! The container is resolved first via candidate fallback, and every row
//! is extracted relative to that one container. Row pairing walks from
//! each title row to its adjacent subtext row in the DOM, so titles and
//! scores can never drift out of alignment the way independent parallel
//! queries can.

use anyhow::{Context, Result, anyhow};
use chromiumoxide::Page;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::resolve::{first_number, resolve_element, wait_for_any};
use crate::retry::{RetryPolicy, execute};
use crate::selectors::HackerNewsSelectors;

const FRONT_PAGE_URL: &str = "https://news.ycombinator.com/";

/// One front-page submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Submission {
    pub id: String,
    pub title: String,
    pub url: String,
    pub points: u32,
    pub author: String,
    pub time: String,
    pub comments: u32,
    #[serde(rename = "hnUrl")]
    pub hn_url: String,
}

/// Raw row text as extracted in the page; numbers are parsed on this side.
#[derive(Debug, Deserialize)]
struct RawRow {
    id: String,
    title: String,
    url: String,
    points: String,
    author: String,
    time: String,
    comments: String,
}

/// Scrape up to `limit` submissions from the front page.
pub async fn scrape_front_page(
    page: &Page,
    limit: usize,
    selectors: &HackerNewsSelectors,
    cancel: &CancellationToken,
) -> Result<Vec<Submission>> {
    let policy = RetryPolicy::navigation();
    execute(
        &policy,
        cancel,
        |attempt, err| warn!(attempt, error = %err, "front page navigation failed, retrying"),
        || async {
            page.goto(FRONT_PAGE_URL).await?;
            page.wait_for_navigation().await?;
            Ok(())
        },
    )
    .await
    .context("failed to load Hacker News front page")?;

    wait_for_any(page, "front page", &selectors.fallback_wait, cancel).await?;

    let (container_selector, _) =
        resolve_element(page, "submission table", &selectors.main_table).await?;
    debug!(selector = %container_selector, "resolved submission container");

    let script = row_extraction_script(&container_selector, limit, selectors)?;
    let raw_rows: Vec<RawRow> = page
        .evaluate(script)
        .await
        .context("failed to extract submission rows")?
        .into_value()
        .map_err(|e| anyhow!("submission row extraction returned invalid data: {e}"))?;

    let submissions: Vec<Submission> = raw_rows
        .into_iter()
        .filter(|row| !row.title.is_empty())
        .map(|row| {
            let hn_url = format!("https://news.ycombinator.com/item?id={}", row.id);
            let url = if row.url.is_empty() {
                // Ask HN and similar text posts have no external URL.
                hn_url.clone()
            } else {
                row.url
            };
            Submission {
                id: row.id,
                title: row.title,
                url,
                points: first_number(&row.points),
                author: row.author,
                time: row.time,
                comments: first_number(&row.comments),
                hn_url,
            }
        })
        .collect();

    if submissions.is_empty() {
        anyhow::bail!("not found: no submissions extracted from the front page");
    }
    info!(count = submissions.len(), "scraped front page submissions");
    Ok(submissions)
}

/// Build the in-page extraction script, scoped to the already-resolved
/// container. Selector lists are JSON-encoded so arbitrary candidate
/// strings cannot break out of the script.
fn row_extraction_script(
    container_selector: &str,
    limit: usize,
    selectors: &HackerNewsSelectors,
) -> Result<String> {
    let container = serde_json::to_string(container_selector)?;
    let title_link = serde_json::to_string(&selectors.title_link)?;
    let score = serde_json::to_string(&selectors.score)?;
    let author = serde_json::to_string(&selectors.author)?;
    let time = serde_json::to_string(&selectors.time)?;
    let comments = serde_json::to_string(&selectors.comments)?;

    Ok(format!(
        r#"
        (() => {{
            const container = document.querySelector({container});
            if (!container) return [];

            const pickText = (root, candidates) => {{
                for (const sel of candidates) {{
                    const el = root.querySelector(sel);
                    if (el) return el.textContent.trim();
                }}
                return '';
            }};

            const rows = [];
            for (const candidate of {title_link}) {{
                const links = container.querySelectorAll(candidate);
                if (links.length === 0) continue;

                for (const link of links) {{
                    if (rows.length >= {limit}) break;
                    const titleRow = link.closest('tr');
                    if (!titleRow) continue;
                    const subtext = titleRow.nextElementSibling;

                    rows.push({{
                        id: titleRow.id || '',
                        title: link.textContent.trim(),
                        url: link.getAttribute('href') || '',
                        points: subtext ? pickText(subtext, {score}) : '',
                        author: subtext ? pickText(subtext, {author}) : '',
                        time: subtext ? pickText(subtext, {time}) : '',
                        comments: subtext ? pickText(subtext, {comments}) : '',
                    }});
                }}
                break;
            }}
            return rows;
        }})()
        "#
    ))
}
