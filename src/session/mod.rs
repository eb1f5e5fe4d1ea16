//! Browser session management: process lifecycle, readiness polling, the
//! on-disk session record, and per-invocation browser connections.

pub mod context;
pub mod lifecycle;
pub mod readiness;
pub mod store;

pub use context::SessionContext;
pub use lifecycle::{CloseOutcome, close, find_browser_executable, start};
pub use readiness::wait_for_endpoint;
pub use store::{SessionError, SessionRecord, SessionStore};
