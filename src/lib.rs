pub mod actions;
pub mod cli;
pub mod retry;
pub mod scrape;
pub mod selectors;
pub mod session;
pub mod utils;

pub use actions::{ElementInfo, ElementRect, NavigationOutcome};
pub use retry::{RetryError, RetryPolicy, default_is_retryable};
pub use scrape::{ContentFormat, PageContent, ScrapeError, SearchResult, Submission};
pub use selectors::{GoogleSearchSelectors, HackerNewsSelectors, SelectorConfig};
pub use session::{
    CloseOutcome, SessionContext, SessionError, SessionRecord, SessionStore, close, start,
    wait_for_endpoint,
};
