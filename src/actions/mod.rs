//! Direct page actions: navigate, screenshot, element picking, script
//! evaluation, and cookie inspection.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::retry::{RetryPolicy, execute};

/// Where a navigation ended up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationOutcome {
    pub url: String,
    pub title: String,
}

/// Navigate the page, retrying transient load failures.
pub async fn navigate(
    page: &Page,
    url: &str,
    cancel: &CancellationToken,
) -> Result<NavigationOutcome> {
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

    let final_url = page.url().await?.unwrap_or_else(|| url.to_string());
    let title = page.get_title().await?.unwrap_or_default();
    info!(url = %final_url, "navigation complete");
    Ok(NavigationOutcome {
        url: final_url,
        title,
    })
}

/// Capture a PNG screenshot, optionally beyond the viewport.
///
/// Without an explicit output path the image lands in a uniquely named
/// file under the system temp directory, and that path is returned so
/// the caller can report it.
pub async fn screenshot(page: &Page, output: Option<&Path>, full_page: bool) -> Result<PathBuf> {
    let params = ScreenshotParams::builder()
        .format(CaptureScreenshotFormat::Png)
        .full_page(full_page)
        .build();
    let bytes = page
        .screenshot(params)
        .await
        .context("failed to capture screenshot")?;

    let path = match output {
        Some(path) => validate_screenshot_path(path)?,
        None => {
            let file = tempfile::Builder::new()
                .prefix("browser-tools-")
                .suffix(".png")
                .tempfile()
                .context("failed to create screenshot file")?;
            let (_, path) = file.keep().context("failed to keep screenshot file")?;
            path
        }
    };
    std::fs::write(&path, &bytes)
        .with_context(|| format!("failed to write screenshot to {}", path.display()))?;
    info!(path = %path.display(), bytes = bytes.len(), "screenshot saved");
    Ok(path)
}

/// Check a caller-supplied screenshot path and force a `.png` extension.
///
/// Paths that could escape the caller's intent are rejected: embedded
/// NUL bytes, `..` components, and `~` segments (the shell expands `~`;
/// one that survives into the argument is a literal directory name the
/// caller almost certainly did not mean).
fn validate_screenshot_path(path: &Path) -> Result<PathBuf> {
    let raw = path.as_os_str();
    if raw.is_empty() {
        anyhow::bail!("invalid argument: screenshot path is empty");
    }
    if raw.as_encoded_bytes().contains(&0) {
        anyhow::bail!("invalid argument: screenshot path contains a NUL byte");
    }
    for component in path.components() {
        match component {
            std::path::Component::ParentDir => {
                anyhow::bail!(
                    "invalid argument: screenshot path must not contain '..' ({})",
                    path.display()
                );
            }
            std::path::Component::Normal(part) if part.as_encoded_bytes().starts_with(b"~") => {
                anyhow::bail!(
                    "invalid argument: screenshot path must not contain '~' segments ({})",
                    path.display()
                );
            }
            _ => {}
        }
    }

    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext.eq_ignore_ascii_case("png")) != Some(true) {
        path.set_extension("png");
    }
    Ok(path)
}

/// Bounding box of a picked element, in CSS pixels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Shape of one element matched by `pick`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementInfo {
    pub tag: String,
    pub text: String,
    pub attrs: HashMap<String, String>,
    pub rect: ElementRect,
}

/// Describe up to `limit` elements matching `selector`.
pub async fn pick_elements(page: &Page, selector: &str, limit: usize) -> Result<Vec<ElementInfo>> {
    let selector_json = serde_json::to_string(selector)?;
    let script = format!(
        r#"
        (() => {{
            const out = [];
            for (const el of document.querySelectorAll({selector_json})) {{
                if (out.length >= {limit}) break;
                const rect = el.getBoundingClientRect();
                const attrs = {{}};
                for (const attr of el.attributes) {{
                    attrs[attr.name] = attr.value;
                }}
                out.push({{
                    tag: el.tagName.toLowerCase(),
                    text: (el.textContent || '').trim().slice(0, 200),
                    attrs,
                    rect: {{ x: rect.x, y: rect.y, width: rect.width, height: rect.height }},
                }});
            }}
            return out;
        }})()
        "#
    );

    let infos: Vec<ElementInfo> = page
        .evaluate(script)
        .await
        .with_context(|| format!("failed to inspect elements matching {selector:?}"))?
        .into_value()
        .map_err(|e| anyhow!("element inspection returned invalid data: {e}"))?;

    if infos.is_empty() {
        anyhow::bail!("not found: no elements match selector {selector:?}");
    }
    Ok(infos)
}

/// Evaluate a JavaScript expression and return its JSON value.
/// Expressions yielding `undefined` come back as `null`.
pub async fn evaluate(page: &Page, expression: &str) -> Result<serde_json::Value> {
    let result = page
        .evaluate(expression)
        .await
        .context("script evaluation failed")?;
    Ok(result
        .into_value()
        .unwrap_or(serde_json::Value::Null))
}

/// Dump all cookies visible to the current page.
pub async fn cookies(page: &Page) -> Result<serde_json::Value> {
    let cookies = page.get_cookies().await.context("failed to read cookies")?;
    Ok(serde_json::to_value(cookies)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screenshot_path_gains_a_png_extension() {
        assert_eq!(
            validate_screenshot_path(Path::new("shot")).unwrap(),
            PathBuf::from("shot.png")
        );
        assert_eq!(
            validate_screenshot_path(Path::new("shot.jpeg")).unwrap(),
            PathBuf::from("shot.png")
        );
        assert_eq!(
            validate_screenshot_path(Path::new("out/shot.png")).unwrap(),
            PathBuf::from("out/shot.png")
        );
    }

    #[test]
    fn screenshot_path_rejects_traversal() {
        for bad in ["../shot.png", "out/../../shot.png", "~/shot.png", "a/~b/c.png", ""] {
            let err = validate_screenshot_path(Path::new(bad)).unwrap_err();
            assert!(err.to_string().contains("invalid argument"), "{bad}: {err}");
        }
    }

    #[test]
    fn element_info_deserializes_from_page_shape() {
        let json = serde_json::json!({
            "tag": "a",
            "text": "Click me",
            "attrs": {"href": "https://example.com/", "class": "link"},
            "rect": {"x": 10.0, "y": 20.5, "width": 100.0, "height": 16.0}
        });
        let info: ElementInfo = serde_json::from_value(json).unwrap();
        assert_eq!(info.tag, "a");
        assert_eq!(info.attrs["href"], "https://example.com/");
        assert_eq!(info.rect.y, 20.5);
    }
}
