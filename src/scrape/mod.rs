//! Scraping operations: selector resolution, search, Hacker News, page
//! content, and bounded parallel enrichment.

pub mod content;
pub mod enrich;
pub mod hn;
pub mod resolve;
pub mod search;

pub use content::{ContentFormat, PageContent, extract};
pub use enrich::{enrich_results, enrich_with};
pub use hn::{Submission, scrape_front_page};
pub use resolve::{ScrapeError, first_number, resolve_element, resolve_elements, resolve_first};
pub use search::{SearchResult, search};
