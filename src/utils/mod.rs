pub mod constants;
pub mod text;

pub use constants::*;
pub use text::{normalize_whitespace, safe_truncate_chars, truncate_with_marker};
