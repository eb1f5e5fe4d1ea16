//! Shared configuration constants for browser-tools
//!
//! This module contains default values used throughout the codebase to
//! ensure consistency and avoid magic numbers.

use std::time::Duration;

/// Default remote debugging port for the persistent browser.
pub const DEFAULT_DEBUG_PORT: u16 = 9222;

/// How long `start` waits for a freshly spawned browser to accept
/// TCP connections on the debugging port before giving up.
pub const DEFAULT_READY_WAIT: Duration = Duration::from_secs(5);

/// Interval between readiness probes against the debugging endpoint.
pub const READINESS_POLL_INTERVAL: Duration = Duration::from_millis(150);

/// Per-probe TCP connect timeout during readiness polling.
pub const READINESS_DIAL_TIMEOUT: Duration = Duration::from_secs(1);

/// Maximum time to wait for a page's wait-selector to appear after navigation.
///
/// Search pages render results via JavaScript after the HTTP response
/// arrives, so navigation completing does not mean the DOM is ready.
pub const PAGE_WAIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Interval between DOM polls while waiting for a selector.
pub const PAGE_WAIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Fetched page content longer than this is truncated.
///
/// Bounds both memory usage and the size of the JSON payload when
/// `search --content` enriches every result with page text.
pub const CONTENT_TRUNCATE_LEN: usize = 2000;

/// Marker appended to truncated content.
pub const TRUNCATION_MARKER: &str = "...";

/// Default concurrency cap for fetching content of search results.
pub const DEFAULT_ENRICH_CONCURRENCY: usize = 3;

/// Chrome user agent string presented by temporary browser instances.
///
/// Chrome releases new stable versions ~every 4 weeks; update quarterly
/// to stay within a reasonable version window.
///
/// Reference: https://chromiumdash.appspot.com/schedule
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";
