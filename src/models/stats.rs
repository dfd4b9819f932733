// src/models/stats.rs

//! Run counters.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

/// Counters shared by every unit of one run.
///
/// Each field is bumped once per event by the unit that observed it; readers
/// only ever take a [`CrawlStats`] snapshot.
#[derive(Debug, Default)]
pub struct CrawlCounters {
    meta: AtomicUsize,
    meta_departments: AtomicUsize,
    parsed: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
}

impl CrawlCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_meta(&self, count: usize) {
        self.meta.fetch_add(count, Ordering::Relaxed);
    }

    pub fn department_done(&self) {
        self.meta_departments.fetch_add(1, Ordering::Relaxed);
    }

    pub fn parsed(&self) {
        self.parsed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CrawlStats {
        CrawlStats {
            meta: self.meta.load(Ordering::Relaxed),
            meta_departments: self.meta_departments.load(Ordering::Relaxed),
            parsed: self.parsed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`CrawlCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    /// Unique metadata records merged
    pub meta: usize,
    /// Departments whose metadata was obtained
    pub meta_departments: usize,
    /// Details fetched from the source
    pub parsed: usize,
    /// Details served from cache
    pub skipped: usize,
    /// Details that could not be obtained
    pub failed: usize,
}
