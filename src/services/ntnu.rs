// src/services/ntnu.rs

//! HTTP course source for the NTNU course catalogue.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{CourseDetail, CourseMeta, CrawlerConfig, Target};
use crate::services::{CourseSource, MetaGrid, parse_syllabus};
use crate::utils::http;

const GRID_ENDPOINT: &str = "CofopdlCtrl";
const SYLLABUS_ENDPOINT: &str = "SyllabusCtrl";

/// Fetches course lists and syllabus pages over HTTP.
pub struct NtnuSource {
    client: reqwest::Client,
    base_url: Url,
    delay: Duration,
}

impl NtnuSource {
    /// Create a source using the crawler settings.
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }

        Ok(Self {
            client: http::create_async_client(config)?,
            base_url: Url::parse(&base)?,
            delay: Duration::from_millis(config.request_delay_ms),
        })
    }

    fn grid_url(&self, target: Target, department: &str) -> Result<Url> {
        let year = target.year.to_string();
        let term = target.term.to_string();
        let mut url = self.base_url.join(GRID_ENDPOINT)?;
        url.query_pairs_mut().extend_pairs([
            ("_dc", ""),
            ("acadmYear", year.as_str()),
            ("acadmTerm", term.as_str()),
            ("chn", ""),
            ("engTeach", "N"),
            ("moocs", "N"),
            ("remoteCourse", "N"),
            ("digital", "N"),
            ("adsl", "N"),
            ("deptCode", department),
            ("zuDept", ""),
            ("classCode", ""),
            ("kind", "3"),
            ("generalCore", ""),
            ("teacher", ""),
            ("serial_number", ""),
            ("course_code", ""),
            ("language", "chinese"),
            ("action", "showGrid"),
            ("start", "0"),
            ("limit", "99999"),
            ("page", "1"),
        ]);
        Ok(url)
    }

    fn syllabus_url(&self, meta: &CourseMeta) -> Result<Url> {
        let year = meta.year.to_string();
        let term = meta.term.to_string();
        let mut url = self.base_url.join(SYLLABUS_ENDPOINT)?;
        url.query_pairs_mut().extend_pairs([
            ("year", year.as_str()),
            ("term", term.as_str()),
            ("courseCode", meta.code.as_str()),
            ("courseGroup", meta.group.as_str()),
            ("deptCode", meta.department.as_str()),
            ("formS", meta.form_s.as_str()),
            ("classes1", meta.classes.as_str()),
            ("deptGroup", meta.dept_group.as_str()),
        ]);
        Ok(url)
    }

    async fn cooldown(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl CourseSource for NtnuSource {
    async fn fetch_meta(&self, target: Target, department: &str) -> Result<Vec<CourseMeta>> {
        let context = format!("{target} {department}");
        let url = self.grid_url(target, department)?;
        log::debug!("Fetching course list {url}");

        let response = http::get(&self.client, url, &context).await;
        self.cooldown().await;

        let grid: MetaGrid = response?
            .json()
            .await
            .map_err(|e| AppError::fetch(&context, e))?;
        log::debug!("{context}: grid reports {} courses", grid.count);

        Ok(grid
            .list
            .into_iter()
            .filter_map(|raw| {
                raw.into_meta()
                    .inspect_err(|e| log::warn!("{context}: skipping row: {e}"))
                    .ok()
            })
            .collect())
    }

    async fn fetch_detail(&self, meta: &CourseMeta) -> Result<CourseDetail> {
        let context = meta.label();
        let url = self.syllabus_url(meta)?;
        log::debug!("Fetching syllabus {url}");

        let response = http::get(&self.client, url, &context).await;
        self.cooldown().await;

        let html = response?
            .text()
            .await
            .map_err(|e| AppError::fetch(&context, e))?;
        parse_syllabus(meta, &html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures;

    fn source() -> NtnuSource {
        NtnuSource::new(&CrawlerConfig {
            base_url: "https://catalogue.example/acadmOpenCourse".into(),
            ..CrawlerConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_grid_url() {
        let url = source().grid_url(Target::new(110, 1), "CS").unwrap();

        assert_eq!(url.path(), "/acadmOpenCourse/CofopdlCtrl");
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("acadmYear".into(), "110".into())));
        assert!(query.contains(&("acadmTerm".into(), "1".into())));
        assert!(query.contains(&("deptCode".into(), "CS".into())));
        assert!(query.contains(&("action".into(), "showGrid".into())));
    }

    #[test]
    fn test_syllabus_url() {
        let meta = fixtures::meta("CS", "CSU0001", 1001);
        let url = source().syllabus_url(&meta).unwrap();

        assert_eq!(url.path(), "/acadmOpenCourse/SyllabusCtrl");
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("courseCode".into(), "CSU0001".into())));
        assert!(query.contains(&("courseGroup".into(), "".into())));
        assert!(query.contains(&("formS".into(), "1".into())));
    }
}
