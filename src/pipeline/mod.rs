//! Pipeline entry points for cache operations.
//!
//! - `run_page`: Fetch one page, cached or live
//! - `run_warm`: Prime the cache with the root and navigation pages

pub mod page;
pub mod warm;

pub use page::{PageSummary, run_page};
pub use warm::{WarmStats, run_warm};
