//! Page content extraction in text, markdown, or raw HTML form.

use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use chromiumoxide::Page;
use htmd::HtmlToMarkdown;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::retry::{RetryPolicy, execute};
use crate::utils::normalize_whitespace;

/// Output shape requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentFormat {
    Text,
    Markdown,
    Html,
}

impl FromStr for ContentFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "markdown" | "md" => Ok(Self::Markdown),
            "html" => Ok(Self::Html),
            other => Err(anyhow!(
                "invalid argument: unsupported format {other:?} (expected text, markdown, or html)"
            )),
        }
    }
}

/// Extracted page content plus where it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageContent {
    pub title: String,
    pub content: String,
    pub format: ContentFormat,
    pub url: String,
}

/// Extract the current page's content, optionally navigating first.
///
/// With `url = None` the page is read as-is, so content can be pulled
/// from wherever a previous command navigated the persistent browser.
pub async fn extract(
    page: &Page,
    url: Option<&str>,
    format: ContentFormat,
    cancel: &CancellationToken,
) -> Result<PageContent> {
    if let Some(url) = url {
        let policy = RetryPolicy::navigation();
        execute(
            &policy,
            cancel,
            |attempt, err| warn!(attempt, error = %err, "navigation failed, retrying"),
            || async {
                page.goto(url).await?;
                page.wait_for_navigation().await?;
                Ok(())
            },
        )
        .await
        .with_context(|| format!("failed to navigate to {url}"))?;
    }

    let title = page.get_title().await?.unwrap_or_default();
    let current_url = page
        .url()
        .await?
        .unwrap_or_else(|| url.unwrap_or_default().to_string());

    let html = page.content().await.context("failed to read page HTML")?;
    let content = match format {
        ContentFormat::Html => html,
        ContentFormat::Markdown => html_to_markdown(&html)?,
        ContentFormat::Text => html_to_text(&html),
    };

    debug!(url = %current_url, ?format, bytes = content.len(), "extracted page content");
    Ok(PageContent {
        title,
        content,
        format,
        url: current_url,
    })
}

/// Flatten an HTML document to its visible text, skipping script and
/// style content.
pub fn html_to_text(html: &str) -> String {
    let document = scraper::Html::parse_document(html);
    let skip: &[&str] = &["script", "style", "noscript"];

    let mut parts: Vec<&str> = Vec::new();
    let root = document
        .select(&body_selector())
        .next()
        .unwrap_or_else(|| document.root_element());
    collect_text(root, skip, &mut parts);
    normalize_whitespace(&parts.join(" "))
}

fn body_selector() -> scraper::Selector {
    scraper::Selector::parse("body").unwrap_or_else(|_| unreachable!("static selector is valid"))
}

fn collect_text<'a>(element: scraper::ElementRef<'a>, skip: &[&str], out: &mut Vec<&'a str>) {
    if skip.contains(&element.value().name()) {
        return;
    }
    for child in element.children() {
        match child.value() {
            scraper::Node::Text(text) => out.push(&text.text),
            scraper::Node::Element(_) => {
                if let Some(child_ref) = scraper::ElementRef::wrap(child) {
                    collect_text(child_ref, skip, out);
                }
            }
            _ => {}
        }
    }
}

/// Convert an HTML document to markdown, dropping non-content tags.
pub fn html_to_markdown(html: &str) -> Result<String> {
    let converter = HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "noscript", "iframe"])
        .build();
    converter
        .convert(html)
        .map_err(|e| anyhow!("markdown conversion failed: {e}"))
}
