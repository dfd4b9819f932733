// src/pipeline/crawl.rs

//! Course crawling pipeline.

use std::sync::Arc;
use std::time::{Duration, Instant};

use indexmap::IndexSet;
use serde::Serialize;

use crate::adapters;
use crate::error::{AppError, Result};
use crate::models::{CourseDetail, CrawlCounters, CrawlStats, Target};
use crate::pipeline::{CrawlContext, collect_details, collect_metadata};
use crate::services::CourseSource;
use crate::storage::{self, LocalStorage};
use crate::utils::report;

/// What to crawl and how the result is shaped.
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub targets: Vec<Target>,
    pub departments: Vec<String>,
    pub adapter: String,
    pub concurrency: usize,
    pub force: bool,
}

/// Where one target is in its crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TargetPhase {
    Idle,
    CollectingMetadata,
    CollectingDetail,
    Done,
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetReport {
    pub target: Target,
    pub phase: TargetPhase,
    pub stats: CrawlStats,
    /// Detail records this target contributed to the aggregate
    pub details: usize,
}

impl TargetReport {
    fn new(target: Target) -> Self {
        Self {
            target,
            phase: TargetPhase::Idle,
            stats: CrawlStats::default(),
            details: 0,
        }
    }

    fn advance(&mut self, phase: TargetPhase) {
        log::debug!("{}: {:?} -> {:?}", self.target, self.phase, phase);
        self.phase = phase;
    }
}

/// What happened to the adapter step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputOutcome {
    Written { adapter: String, key: String },
    AdapterNotFound(String),
}

/// Summary of a whole run.
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub targets: Vec<TargetReport>,
    /// Length of the aggregate handed to the adapter
    pub total: usize,
    pub output: OutputOutcome,
    pub elapsed: Duration,
}

impl CrawlReport {
    /// Counters summed over every target.
    pub fn totals(&self) -> CrawlStats {
        self.targets
            .iter()
            .fold(CrawlStats::default(), |acc, t| CrawlStats {
                meta: acc.meta + t.stats.meta,
                meta_departments: acc.meta_departments + t.stats.meta_departments,
                parsed: acc.parsed + t.stats.parsed,
                skipped: acc.skipped + t.stats.skipped,
                failed: acc.failed + t.stats.failed,
            })
    }

    /// Log the final summary.
    pub fn log_summary(&self) {
        let totals = self.totals();
        let targets: Vec<String> = self.targets.iter().map(|t| t.target.to_string()).collect();
        let output = match &self.output {
            OutputOutcome::Written { key, .. } => key.clone(),
            OutputOutcome::AdapterNotFound(id) => format!("not written (unknown adapter {id})"),
        };

        report::summary(
            "Crawl complete",
            &[
                ("Targets", targets.join(", ")),
                ("Courses", self.total.to_string()),
                ("Metadata", totals.meta.to_string()),
                ("Departments", totals.meta_departments.to_string()),
                ("Parsed", totals.parsed.to_string()),
                ("Skipped", totals.skipped.to_string()),
                ("Failed", totals.failed.to_string()),
                ("Output", output),
                ("Elapsed", report::format_elapsed(self.elapsed)),
            ],
        );
    }
}

/// Drives both phases for each target and writes the adapter output.
pub struct Crawler {
    source: Arc<dyn CourseSource>,
    storage: LocalStorage,
}

impl Crawler {
    pub fn new(source: Arc<dyn CourseSource>, storage: LocalStorage) -> Self {
        Self { source, storage }
    }

    /// Crawl every target in order, then hand the aggregate to the adapter.
    ///
    /// Per-course and per-department failures only show up in the counters.
    /// An unknown adapter leaves the cache populated and is reported in
    /// [`CrawlReport::output`]. Errors are returned for a zero concurrency,
    /// an empty target list, an adapter failure or a failed output write.
    pub async fn run(&self, options: &CrawlOptions) -> Result<CrawlReport> {
        let started = Instant::now();
        if options.targets.is_empty() {
            return Err(AppError::validation("at least one target is required"));
        }

        let departments = unique_departments(&options.departments);

        let ctx = CrawlContext {
            source: Arc::clone(&self.source),
            storage: self.storage.clone(),
            concurrency: options.concurrency,
            force: options.force,
        };

        let mut reports = Vec::with_capacity(options.targets.len());
        let mut aggregate: Vec<CourseDetail> = Vec::new();

        for (index, &target) in options.targets.iter().enumerate() {
            report::step(
                index + 1,
                options.targets.len(),
                &format!("Crawling {target} ({} departments)", departments.len()),
            );

            let mut target_report = TargetReport::new(target);
            let counters = Arc::new(CrawlCounters::new());

            target_report.advance(TargetPhase::CollectingMetadata);
            let metas = collect_metadata(&ctx, target, &departments, &counters).await?;

            target_report.advance(TargetPhase::CollectingDetail);
            let details = collect_details(&ctx, target, metas, &counters).await?;

            target_report.advance(TargetPhase::Done);
            target_report.stats = counters.snapshot();
            target_report.details = details.len();
            reports.push(target_report);

            aggregate.extend(details);
        }

        let total = aggregate.len();
        let output = self.write_output(&options.adapter, &options.targets, aggregate).await?;

        Ok(CrawlReport {
            targets: reports,
            total,
            output,
            elapsed: started.elapsed(),
        })
    }

    async fn write_output(
        &self,
        adapter_id: &str,
        targets: &[Target],
        courses: Vec<CourseDetail>,
    ) -> Result<OutputOutcome> {
        let adapter = match adapters::create(adapter_id) {
            Ok(adapter) => adapter,
            Err(e) => {
                let known: Vec<&str> = adapters::ids().collect();
                log::error!("{e}; available adapters: {}", known.join(", "));
                return Ok(OutputOutcome::AdapterNotFound(adapter_id.to_string()));
            }
        };

        let key = storage::output_key(adapter.id(), targets)?;
        let document = adapter.process(courses)?;
        self.storage.write_json_compact(&key, &document).await?;
        log::info!("Saved {} output to {}", adapter.id(), self.storage.path(&key).display());

        Ok(OutputOutcome::Written {
            adapter: adapter.id().to_string(),
            key,
        })
    }
}

/// Department codes in first-seen order, each once.
///
/// Comparison is case-sensitive, matching the cache layout.
fn unique_departments(departments: &[String]) -> Vec<String> {
    let mut seen: IndexSet<&str> = IndexSet::with_capacity(departments.len());
    for department in departments {
        if !seen.insert(department.as_str()) {
            log::warn!("Department {department} listed more than once; crawling it once");
        }
    }
    seen.into_iter().map(String::from).collect()
}

/// Run the course crawler.
pub async fn run_crawler(
    source: Arc<dyn CourseSource>,
    storage: LocalStorage,
    options: &CrawlOptions,
) -> Result<CrawlReport> {
    report::header("Course crawler starting");
    let crawl_report = Crawler::new(source, storage).run(options).await?;
    crawl_report.log_summary();
    Ok(crawl_report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::StubSource;
    use serde_json::Value;
    use tempfile::TempDir;

    const FALL: Target = Target { year: 110, term: 1 };
    const SPRING: Target = Target { year: 110, term: 2 };

    fn options(targets: &[Target], departments: &[&str], adapter: &str) -> CrawlOptions {
        CrawlOptions {
            targets: targets.to_vec(),
            departments: departments.iter().map(|d| d.to_string()).collect(),
            adapter: adapter.to_string(),
            concurrency: 2,
            force: false,
        }
    }

    fn crawler(source: &Arc<StubSource>, tmp: &TempDir) -> Crawler {
        Crawler::new(Arc::clone(source) as _, LocalStorage::new(tmp.path()))
    }

    async fn output(tmp: &TempDir, key: &str) -> Value {
        LocalStorage::new(tmp.path())
            .read_json(key)
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_two_departments_end_to_end() {
        let tmp = TempDir::new().unwrap();
        let source = Arc::new(
            StubSource::new()
                .with_department(FALL, "CS", &[("CSU0001", 1001)])
                .with_department(FALL, "MATH", &[("MAU0001", 1002)]),
        );

        let report = crawler(&source, &tmp)
            .run(&options(&[FALL], &["CS", "MATH"], "squash"))
            .await
            .unwrap();

        assert!(tmp.path().join("110-1/meta/CS.json").exists());
        assert!(tmp.path().join("110-1/meta/MATH.json").exists());
        assert_eq!(report.targets[0].stats.meta, 2);
        assert_eq!(report.targets[0].phase, TargetPhase::Done);
        assert_eq!(source.detail_calls(), 2);
        assert_eq!(report.total, 2);

        let document = output(&tmp, "squash/110-1.json").await;
        assert_eq!(document.as_array().unwrap().len(), 2);
        assert_eq!(
            report.output,
            OutputOutcome::Written {
                adapter: "squash".into(),
                key: "squash/110-1.json".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_repeated_department_is_crawled_once() {
        let tmp = TempDir::new().unwrap();
        let source = Arc::new(
            StubSource::new()
                .with_department(FALL, "CS", &[("CSU0001", 1001)])
                .with_department(FALL, "cs", &[("CSU0001", 2001)]),
        );
        let mut opts = options(&[FALL], &["CS", "cs", "CS"], "squash");
        opts.force = true;

        let report = crawler(&source, &tmp).run(&opts).await.unwrap();

        assert_eq!(source.meta_calls(), 2);
        assert_eq!(source.detail_calls(), 2);
        assert_eq!(report.targets[0].stats.meta_departments, 2);
        assert_eq!(report.total, 2);
    }

    #[test]
    fn test_unique_departments_keeps_first_order() {
        let input: Vec<String> = ["MATH", "CS", "MATH", "cs"].iter().map(|d| d.to_string()).collect();
        assert_eq!(unique_departments(&input), vec!["MATH", "CS", "cs"]);
    }

    #[tokio::test]
    async fn test_targets_are_concatenated() {
        let tmp = TempDir::new().unwrap();
        let source = Arc::new(
            StubSource::new()
                .with_department(FALL, "CS", &[("CSU0001", 1001), ("CSU0002", 1002)])
                .with_department(SPRING, "CS", &[("CSU0001", 3001)]),
        );

        let report = crawler(&source, &tmp)
            .run(&options(&[FALL, SPRING], &["CS"], "squash"))
            .await
            .unwrap();

        assert_eq!(report.targets[0].details, 2);
        assert_eq!(report.targets[1].details, 1);
        assert_eq!(report.total, 3);
        assert!(tmp.path().join("110-2/info/CS/CSU0001-X.json").exists());

        let document = output(&tmp, "squash/110-1$110-2.json").await;
        assert_eq!(document.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_same_course_in_two_terms_is_kept_twice() {
        let tmp = TempDir::new().unwrap();
        let source = Arc::new(
            StubSource::new()
                .with_department(FALL, "CS", &[("CSU0001", 1001)])
                .with_department(SPRING, "CS", &[("CSU0001", 1001)]),
        );

        let report = crawler(&source, &tmp)
            .run(&options(&[FALL, SPRING], &["CS"], "squash"))
            .await
            .unwrap();

        assert_eq!(report.total, 2);
    }

    #[tokio::test]
    async fn test_second_run_fetches_nothing() {
        let tmp = TempDir::new().unwrap();
        let source = Arc::new(
            StubSource::new()
                .with_department(FALL, "CS", &[("CSU0001", 1001)])
                .with_department(FALL, "MATH", &[("MAU0001", 1002)]),
        );
        let opts = options(&[FALL], &["CS", "MATH"], "squash");

        crawler(&source, &tmp).run(&opts).await.unwrap();
        let first = output(&tmp, "squash/110-1.json").await;
        let calls = (source.meta_calls(), source.detail_calls());

        let report = crawler(&source, &tmp).run(&opts).await.unwrap();
        assert_eq!((source.meta_calls(), source.detail_calls()), calls);
        assert_eq!(report.targets[0].stats.skipped, 2);
        assert_eq!(output(&tmp, "squash/110-1.json").await, first);
    }

    #[tokio::test]
    async fn test_force_refetches_everything() {
        let tmp = TempDir::new().unwrap();
        let source = Arc::new(StubSource::new().with_department(FALL, "CS", &[("CSU0001", 1001)]));
        let mut opts = options(&[FALL], &["CS"], "squash");

        crawler(&source, &tmp).run(&opts).await.unwrap();
        opts.force = true;
        let report = crawler(&source, &tmp).run(&opts).await.unwrap();

        assert_eq!(source.meta_calls(), 2);
        assert_eq!(source.detail_calls(), 2);
        assert_eq!(report.targets[0].stats.parsed, 1);
    }

    #[tokio::test]
    async fn test_detail_failure_degrades_gracefully() {
        let tmp = TempDir::new().unwrap();
        let source = Arc::new(
            StubSource::new()
                .with_department(FALL, "CS", &[("CSU0001", 1001), ("CSU0002", 1002)])
                .failing_detail(1001),
        );

        let report = crawler(&source, &tmp)
            .run(&options(&[FALL], &["CS", "GONE"], "squash"))
            .await
            .unwrap();

        let target = &report.targets[0];
        assert_eq!(target.phase, TargetPhase::Done);
        assert_eq!(target.stats.failed, 1);
        assert_eq!(target.stats.parsed, 1);
        assert_eq!(target.stats.meta_departments, 1);
        assert_eq!(report.total, 1);
    }

    #[tokio::test]
    async fn test_case_variant_departments_do_not_share_paths() {
        let tmp = TempDir::new().unwrap();
        let source = Arc::new(
            StubSource::new()
                .with_department(FALL, "CS", &[("CSU0001", 1001)])
                .with_department(FALL, "cs", &[("CSU0001", 2001)]),
        );

        let report = crawler(&source, &tmp)
            .run(&options(&[FALL], &["CS", "cs"], "squash"))
            .await
            .unwrap();

        assert_eq!(source.detail_calls(), 2);
        assert_eq!(report.total, 2);
        assert!(tmp.path().join("110-1/info/CS/CSU0001-X.json").exists());
        assert!(tmp.path().join("110-1/info/cs/CSU0001-X.json").exists());
    }

    #[tokio::test]
    async fn test_unknown_adapter_keeps_cache() {
        let tmp = TempDir::new().unwrap();
        let source = Arc::new(StubSource::new().with_department(FALL, "CS", &[("CSU0001", 1001)]));

        let report = crawler(&source, &tmp)
            .run(&options(&[FALL], &["CS"], "unicourse"))
            .await
            .unwrap();

        assert_eq!(report.output, OutputOutcome::AdapterNotFound("unicourse".into()));
        assert!(tmp.path().join("110-1/meta/CS.json").exists());
        assert!(tmp.path().join("110-1/info/CS/CSU0001-X.json").exists());
        assert!(!tmp.path().join("unicourse").exists());
    }

    #[tokio::test]
    async fn test_course_pack_output() {
        let tmp = TempDir::new().unwrap();
        let source = Arc::new(StubSource::new().with_department(FALL, "CS", &[("CSU0001", 1001)]));

        crawler(&source, &tmp)
            .run(&options(&[FALL], &["CS"], "course-pack"))
            .await
            .unwrap();

        let document = output(&tmp, "course-pack/110-1.json").await;
        assert_eq!(document["entities"][0]["children"][0]["name"], "CS");
    }

    #[tokio::test]
    async fn test_zero_concurrency_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let source = Arc::new(StubSource::new());
        let mut opts = options(&[FALL], &["CS"], "squash");
        opts.concurrency = 0;

        let result = crawler(&source, &tmp).run(&opts).await;
        assert!(matches!(result, Err(AppError::PoolConfiguration(_))));
    }

    #[tokio::test]
    async fn test_no_targets_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let source = Arc::new(StubSource::new());

        let result = crawler(&source, &tmp).run(&options(&[], &["CS"], "squash")).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(!tmp.path().join("squash").exists());
    }
}
