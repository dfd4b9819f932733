// src/pipeline/testing.rs

//! In-memory course source for pipeline tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{CourseDetail, CourseMeta, Target, fixtures};
use crate::services::CourseSource;

/// Serves canned metadata per (target, department) and synthesizes details.
#[derive(Default)]
pub struct StubSource {
    metas: HashMap<(Target, String), Vec<CourseMeta>>,
    failing_details: HashSet<u32>,
    wrong_identity: HashSet<u32>,
    meta_calls: AtomicUsize,
    detail_calls: AtomicUsize,
    detail_log: Mutex<Vec<u32>>,
}

impl StubSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Department `department` offers one course per `(code, serial)`.
    pub fn with_department(mut self, target: Target, department: &str, courses: &[(&str, u32)]) -> Self {
        let metas = courses
            .iter()
            .map(|&(code, serial)| {
                let mut meta = fixtures::meta(department, code, serial);
                meta.year = target.year;
                meta.term = target.term;
                meta
            })
            .collect();
        self.metas.insert((target, department.to_string()), metas);
        self
    }

    /// Department `department` offers exactly these records.
    pub fn with_metas(mut self, target: Target, department: &str, metas: Vec<CourseMeta>) -> Self {
        self.metas.insert((target, department.to_string()), metas);
        self
    }

    /// Detail fetches for `serial` fail.
    pub fn failing_detail(mut self, serial: u32) -> Self {
        self.failing_details.insert(serial);
        self
    }

    /// Detail fetches for `serial` return a record with another serial.
    pub fn wrong_identity(mut self, serial: u32) -> Self {
        self.wrong_identity.insert(serial);
        self
    }

    pub fn meta_calls(&self) -> usize {
        self.meta_calls.load(Ordering::SeqCst)
    }

    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    /// Serials whose detail was requested, in call order.
    pub fn detail_log(&self) -> Vec<u32> {
        self.detail_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl CourseSource for StubSource {
    async fn fetch_meta(&self, target: Target, department: &str) -> Result<Vec<CourseMeta>> {
        self.meta_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.metas
            .get(&(target, department.to_string()))
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("{target} {department}")))
    }

    async fn fetch_detail(&self, meta: &CourseMeta) -> Result<CourseDetail> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.detail_log.lock().unwrap().push(meta.serial);
        tokio::task::yield_now().await;

        if self.failing_details.contains(&meta.serial) {
            return Err(AppError::fetch(meta.label(), "connection reset"));
        }

        let mut detail = fixtures::detail(meta);
        if self.wrong_identity.contains(&meta.serial) {
            detail.meta.serial += 1;
        }
        Ok(detail)
    }
}
