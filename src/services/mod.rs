//! Service layer for the course crawler.
//!
//! This module contains the fetch collaborators:
//! - `CourseSource`: the seam the pipeline fetches through
//! - `NtnuSource`: the HTTP implementation against the NTNU catalogue
//! - `meta` / `syllabus`: response parsing for the two endpoints

mod meta;
mod ntnu;
mod syllabus;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CourseDetail, CourseMeta, Target};

pub use meta::{MetaGrid, RawCourseMeta, parse_programs, parse_schedule};
pub use ntnu::NtnuSource;
pub use syllabus::parse_syllabus;

/// Where course data comes from when the cache does not have it.
///
/// Failures are reported as `AppError::Fetch`/`AppError::Http` for transport
/// problems and `AppError::NotFound` when the catalogue says the department
/// or course does not exist.
#[async_trait]
pub trait CourseSource: Send + Sync {
    /// Every course a department offers in the target term.
    async fn fetch_meta(&self, target: Target, department: &str) -> Result<Vec<CourseMeta>>;

    /// The syllabus detail of one course.
    async fn fetch_detail(&self, meta: &CourseMeta) -> Result<CourseDetail>;
}
