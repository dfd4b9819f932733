//! Pipeline entry points for crawler operations.
//!
//! - `pool`: bounded-concurrency executor every phase runs on
//! - `meta`: per-department metadata collection and merge
//! - `detail`: per-course detail collection and merge
//! - `crawl`: drives both phases per target and writes adapter output

pub mod crawl;
pub mod detail;
pub mod meta;
pub mod pool;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use crate::services::CourseSource;
use crate::storage::LocalStorage;

pub use crawl::{CrawlOptions, CrawlReport, Crawler, OutputOutcome, TargetPhase, TargetReport, run_crawler};
pub use detail::collect_details;
pub use meta::collect_metadata;
pub use pool::{PoolHandle, TaskPool};

/// Everything a collection phase needs besides its input.
#[derive(Clone)]
pub struct CrawlContext {
    pub source: Arc<dyn CourseSource>,
    pub storage: LocalStorage,
    /// Units allowed in flight at once
    pub concurrency: usize,
    /// Ignore and overwrite existing cache entries
    pub force: bool,
}
