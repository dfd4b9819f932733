// src/pipeline/meta.rs

//! Metadata phase: one unit per department, merged by course identity.

use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;
use indexmap::map::Entry;

use crate::error::Result;
use crate::models::{CourseKey, CourseMeta, CrawlCounters, Target};
use crate::pipeline::{CrawlContext, TaskPool};
use crate::storage;
use crate::utils::report;

/// Obtain every department's course list for `target` and merge them.
///
/// Departments are served from the cache when possible. A department that
/// cannot be obtained is logged and contributes nothing. Records sharing a
/// (year, term, serial) key keep the one from the earliest department in
/// `departments`.
///
/// Only a pool misconfiguration is returned as an error.
pub async fn collect_metadata(
    ctx: &CrawlContext,
    target: Target,
    departments: &[String],
    counters: &Arc<CrawlCounters>,
) -> Result<Vec<CourseMeta>> {
    let pool = TaskPool::new(ctx.concurrency)?;
    let started = Instant::now();
    let total = departments.len();

    for department in departments {
        let source = Arc::clone(&ctx.source);
        let cache = ctx.storage.clone();
        let counters = Arc::clone(counters);
        let force = ctx.force;
        let department = department.clone();

        pool.submit(async move {
            let fetched = match storage::meta_key(&target, &department) {
                Ok(key) => {
                    let source = &source;
                    let name = department.as_str();
                    cache
                        .get_or_fetch(&key, force, move || source.fetch_meta(target, name))
                        .await
                }
                Err(e) => Err(e),
            };

            match fetched {
                Ok(list) => {
                    let origin = if list.is_hit() { "cached" } else { "fetched" };
                    let list = list.into_inner();
                    counters.department_done();
                    report::progress(
                        "meta",
                        started.elapsed(),
                        &format!(
                            "{target} {department}: {} courses {origin} ({}/{total} departments)",
                            list.len(),
                            counters.snapshot().meta_departments,
                        ),
                    );
                    Ok(Some(list))
                }
                Err(e) if e.is_not_found() => {
                    log::warn!("{target} {department}: skipped, {e}");
                    Ok(None)
                }
                Err(e) => {
                    log::error!("{target} {department}: skipped, {e}");
                    Ok(None)
                }
            }
        });
    }

    let results = pool.run_all().await;

    let mut merged: IndexMap<CourseKey, CourseMeta> = IndexMap::new();
    for (department, result) in departments.iter().zip(results) {
        let list = match result {
            Ok(Some(list)) => list,
            Ok(None) => continue,
            Err(e) => {
                log::error!("{target} {department}: {e}");
                continue;
            }
        };

        for meta in list {
            match merged.entry(meta.key()) {
                Entry::Vacant(slot) => {
                    slot.insert(meta);
                }
                Entry::Occupied(_) => {
                    log::debug!("{target} {department}: duplicate course {}", meta.label());
                }
            }
        }
    }

    counters.add_meta(merged.len());
    log::info!(
        "{target}: {} unique courses from {}/{total} departments",
        merged.len(),
        counters.snapshot().meta_departments,
    );

    Ok(merged.into_values().collect())
}
