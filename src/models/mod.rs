// src/models/mod.rs

//! Domain models for the course crawler.

mod config;
mod course;
mod stats;
mod target;

// Re-export all public types
pub use config::{Config, CrawlerConfig, PathsConfig};
pub use course::{CourseDetail, CourseKey, CourseMeta, GradingPolicy, Methodology, Quota, ScheduleSlot};
pub use stats::{CrawlCounters, CrawlStats};
pub use target::Target;

#[cfg(test)]
pub(crate) use course::fixtures;
