// src/models/course.rs

//! Course metadata and detail records.
//!
//! Field names follow the JSON layout of the cache files, so a cached
//! `CourseDetail` is its `CourseMeta` with the syllabus fields appended.

use serde::{Deserialize, Serialize};

/// Canonical identity of one offering: (year, term, serial).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CourseKey {
    pub year: u16,
    pub term: u8,
    pub serial: u32,
}

/// Enrollment quota.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    /// Regular seats
    pub limit: u32,

    /// Seats granted through authorization codes
    pub additional: u32,
}

/// One weekly meeting: day, period range and location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSlot {
    /// 1-7 for Monday-Sunday, `-1` for intensive courses, `0` when unparsed
    pub day: i8,

    /// First period; periods A-D are 10-13, `-1` when unparsed
    pub from: i8,

    /// Last period, same encoding as `from`
    pub to: i8,

    pub campus: String,
    pub classroom: String,
}

impl ScheduleSlot {
    pub const INTENSIVE_DAY: i8 = -1;
    pub const UNPARSED_DAY: i8 = 0;

    /// Slot recorded for intensive/irregular courses.
    pub fn intensive() -> Self {
        Self {
            day: Self::INTENSIVE_DAY,
            from: 0,
            to: 0,
            campus: String::new(),
            classroom: String::new(),
        }
    }

    pub fn is_intensive(&self) -> bool {
        self.day == Self::INTENSIVE_DAY
    }

    pub fn is_unparsed(&self) -> bool {
        self.day == Self::UNPARSED_DAY
    }
}

/// Lightweight record identifying one course offering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseMeta {
    pub year: u16,
    pub term: u8,
    pub name: String,
    #[serde(default)]
    pub teachers: Vec<String>,
    pub department: String,
    pub credit: u8,
    pub code: String,
    pub serial: u32,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub quota: Quota,
    #[serde(default)]
    pub schedule: Vec<ScheduleSlot>,
    #[serde(default)]
    pub programs: Vec<String>,

    // Passed back verbatim when querying the syllabus page.
    #[serde(default)]
    pub form_s: String,
    #[serde(default)]
    pub classes: String,
    #[serde(default)]
    pub dept_group: String,
}

impl CourseMeta {
    /// Canonical identity used for deduplication.
    pub fn key(&self) -> CourseKey {
        CourseKey {
            year: self.year,
            term: self.term,
            serial: self.serial,
        }
    }

    /// Group code used in cache paths; `X` stands in for an empty group.
    pub fn group_or_sentinel(&self) -> &str {
        if self.group.is_empty() {
            "X"
        } else {
            &self.group
        }
    }

    /// Human readable label used in log lines: `DEP-CODE-GROUP`.
    pub fn label(&self) -> String {
        format!(
            "{}-{}-{}",
            self.department,
            self.code,
            self.group_or_sentinel()
        )
    }
}

/// Lecturing methodology entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Methodology {
    #[serde(rename = "type")]
    pub kind: String,
    pub note: String,
}

/// Grading policy entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradingPolicy {
    #[serde(rename = "type")]
    pub kind: String,
    pub weight: u32,
    pub note: String,
}

/// A course with its syllabus page parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub meta: CourseMeta,

    /// Actual weekly hours
    pub hours: u32,
    pub description: String,
    #[serde(default)]
    pub goals: Vec<String>,

    /// Syllabus rendered as Markdown
    pub syllabus: String,
    #[serde(default)]
    pub methodologies: Vec<Methodology>,
    #[serde(default)]
    pub grading: Vec<GradingPolicy>,
}

impl CourseDetail {
    pub fn key(&self) -> CourseKey {
        self.meta.key()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{detail, meta};
    use super::*;

    #[test]
    fn test_group_sentinel() {
        let mut course = meta("CS", "CSU0001", 1001);
        assert_eq!(course.group_or_sentinel(), "X");
        assert_eq!(course.label(), "CS-CSU0001-X");

        course.group = "A".to_string();
        assert_eq!(course.group_or_sentinel(), "A");
    }

    #[test]
    fn test_detail_is_flat_json() {
        let course = meta("CS", "CSU0001", 1001);
        let value = serde_json::to_value(detail(&course)).unwrap();

        assert_eq!(value["serial"], 1001);
        assert_eq!(value["department"], "CS");
        assert_eq!(value["grading"][0]["type"], "期末考");
        assert!(value.get("meta").is_none());
    }

    #[test]
    fn test_key_ignores_department() {
        let a = meta("CS", "CSU0001", 1001);
        let b = meta("MATH", "MAU0001", 1001);
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_intensive_slot() {
        let slot = ScheduleSlot::intensive();
        assert!(slot.is_intensive());
        assert!(!slot.is_unparsed());
    }
}
