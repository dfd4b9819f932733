// src/pipeline/detail.rs

//! Detail phase: one unit per unique course.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;

use crate::error::{AppError, Result};
use crate::models::{CourseDetail, CourseKey, CourseMeta, CrawlCounters, Target};
use crate::pipeline::{CrawlContext, TaskPool};
use crate::storage::{self, Cached};
use crate::utils::report;

/// Completed units between two progress lines.
const PROGRESS_EVERY: usize = 50;

/// Obtain the detail record of every course in `metas`.
///
/// Cached details count as skipped, fetched ones as parsed. A course whose
/// detail cannot be obtained counts as failed and is left out of the result.
/// Courses that map to a cache path already claimed by an earlier course are
/// not fetched: they count as skipped and are left out.
///
/// Only a pool misconfiguration is returned as an error.
pub async fn collect_details(
    ctx: &CrawlContext,
    target: Target,
    metas: Vec<CourseMeta>,
    counters: &Arc<CrawlCounters>,
) -> Result<Vec<CourseDetail>> {
    let pool = TaskPool::new(ctx.concurrency)?;
    let started = Instant::now();
    let total = metas.len();

    let mut claimed: HashMap<String, u32> = HashMap::new();
    for meta in metas {
        let key = match storage::detail_key(&target, &meta) {
            Ok(key) => key,
            Err(e) => {
                log::error!("{}: {e}", meta.label());
                counters.failed();
                continue;
            }
        };

        if let Some(owner) = claimed.get(&key) {
            log::warn!(
                "{}: serial {} shares cache path {key} with serial {owner}, not fetched",
                meta.label(),
                meta.serial,
            );
            counters.skipped();
            continue;
        }
        claimed.insert(key.clone(), meta.serial);

        let source = Arc::clone(&ctx.source);
        let cache = ctx.storage.clone();
        let counters = Arc::clone(counters);
        let force = ctx.force;

        pool.submit(async move {
            let label = meta.label();
            let fetched = {
                let source = &source;
                let meta = &meta;
                cache
                    .get_or_fetch(&key, force, move || async move {
                        let detail = source.fetch_detail(meta).await?;
                        if detail.key() != meta.key() {
                            return Err(AppError::fetch(
                                meta.label(),
                                format!(
                                    "detail is for {}-{} serial {}",
                                    detail.meta.year, detail.meta.term, detail.meta.serial
                                ),
                            ));
                        }
                        Ok(detail)
                    })
                    .await
            };

            let detail = match fetched {
                Ok(Cached::Hit(detail)) => {
                    counters.skipped();
                    Some(detail)
                }
                Ok(Cached::Fetched(detail)) => {
                    counters.parsed();
                    Some(detail)
                }
                Err(e) => {
                    counters.failed();
                    if e.is_not_found() {
                        log::warn!("{label}: {e}");
                    } else {
                        log::error!("{label}: {e}");
                    }
                    None
                }
            };

            let stats = counters.snapshot();
            let done = stats.parsed + stats.skipped + stats.failed;
            if done % PROGRESS_EVERY == 0 || done == total {
                report::progress(
                    "detail",
                    started.elapsed(),
                    &format!(
                        "{target} Parsed: {}, Skipped: {}, Failed: {} ({done}/{total})",
                        stats.parsed, stats.skipped, stats.failed
                    ),
                );
            }

            Ok(detail)
        });
    }

    let results = pool.run_all().await;

    let mut merged: IndexMap<CourseKey, CourseDetail> = IndexMap::new();
    for result in results {
        match result {
            Ok(Some(detail)) => {
                merged.entry(detail.key()).or_insert(detail);
            }
            Ok(None) => {}
            Err(e) => {
                counters.failed();
                log::error!("{target}: {e}");
            }
        }
    }

    let stats = counters.snapshot();
    log::info!(
        "{target}: {} details (parsed {}, skipped {}, failed {})",
        merged.len(),
        stats.parsed,
        stats.skipped,
        stats.failed,
    );

    Ok(merged.into_values().collect())
}
