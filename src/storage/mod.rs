//! On-disk cache for crawled course data.
//!
//! The cache doubles as the resume signal: a file that exists is trusted and
//! short-circuits the fetch unless a refresh is forced. Files are written to
//! a temporary sibling and renamed into place, so an interrupted run never
//! leaves a partial file under a cache key.
//!
//! ## Directory Structure
//!
//! ```text
//! data/
//! ├── 110-1/
//! │   ├── meta/
//! │   │   ├── CS.json            # Vec<CourseMeta> for one department
//! │   │   └── MATH.json
//! │   └── info/
//! │       └── CS/
//! │           └── CSU0001-X.json # CourseDetail, group "X" when empty
//! └── squash/
//!     └── 110-1$110-2.json       # Adapter output for a target list
//! ```
//!
//! Department codes, course codes and groups are used verbatim, so keys are
//! case-sensitive: `cs` and `CS` are different cache entries.

pub mod local;

use crate::error::{AppError, Result};
use crate::models::{CourseMeta, Target};

// Re-export for convenience
pub use local::LocalStorage;

/// Outcome of a cache lookup that may have fallen through to a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cached<T> {
    /// Served from an existing cache entry
    Hit(T),
    /// Obtained from the source and written to the cache
    Fetched(T),
}

impl<T> Cached<T> {
    pub fn is_hit(&self) -> bool {
        matches!(self, Cached::Hit(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Cached::Hit(value) | Cached::Fetched(value) => value,
        }
    }
}

/// Cache key of one department's metadata list.
pub fn meta_key(target: &Target, department: &str) -> Result<String> {
    Ok(format!(
        "{target}/meta/{}.json",
        segment("department", department)?
    ))
}

/// Cache key of one course's detail record.
pub fn detail_key(target: &Target, meta: &CourseMeta) -> Result<String> {
    Ok(format!(
        "{target}/info/{}/{}-{}.json",
        segment("department", &meta.department)?,
        segment("code", &meta.code)?,
        segment("group", meta.group_or_sentinel())?
    ))
}

/// Key of the document an adapter produces for a list of targets.
pub fn output_key(adapter: &str, targets: &[Target]) -> Result<String> {
    if targets.is_empty() {
        return Err(AppError::validation("no targets to name the output after"));
    }
    Ok(format!(
        "{}/{}.json",
        segment("adapter", adapter)?,
        Target::join(targets)
    ))
}

/// Reject values that would escape or collapse a path segment.
fn segment<'a>(kind: &str, value: &'a str) -> Result<&'a str> {
    let unsafe_segment = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\', '\0']);

    if unsafe_segment {
        return Err(AppError::validation(format!(
            "{kind} '{value}' cannot be used as a cache path segment"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures;

    #[test]
    fn test_meta_key() {
        let target = Target::new(110, 1);
        assert_eq!(meta_key(&target, "CS").unwrap(), "110-1/meta/CS.json");
    }

    #[test]
    fn test_detail_key_uses_group_sentinel() {
        let target = Target::new(110, 1);
        let mut meta = fixtures::meta("CS", "CSU0001", 1001);
        assert_eq!(
            detail_key(&target, &meta).unwrap(),
            "110-1/info/CS/CSU0001-X.json"
        );

        meta.group = "B".into();
        assert_eq!(
            detail_key(&target, &meta).unwrap(),
            "110-1/info/CS/CSU0001-B.json"
        );
    }

    #[test]
    fn test_keys_are_case_sensitive() {
        let target = Target::new(110, 1);
        let upper = meta_key(&target, "CS").unwrap();
        let lower = meta_key(&target, "cs").unwrap();
        assert_ne!(upper, lower);
    }

    #[test]
    fn test_output_key() {
        let targets = [Target::new(110, 1), Target::new(110, 2)];
        assert_eq!(
            output_key("squash", &targets).unwrap(),
            "squash/110-1$110-2.json"
        );
        assert!(output_key("squash", &[]).is_err());
    }

    #[test]
    fn test_unsafe_segments_rejected() {
        let target = Target::new(110, 1);
        assert!(meta_key(&target, "").is_err());
        assert!(meta_key(&target, "..").is_err());
        assert!(meta_key(&target, "CS/../x").is_err());

        let meta = fixtures::meta("CS", "a\\b", 1);
        assert!(detail_key(&target, &meta).is_err());
    }
}
