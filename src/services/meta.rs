// src/services/meta.rs

//! Course list grid parsing.
//!
//! The catalogue's grid endpoint answers `{ "Count": n, "List": [...] }`
//! where every row field is a string (numbers occasionally arrive unquoted).

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{CourseMeta, Quota, ScheduleSlot};

static TIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([一二三四五六日]) ([\dA-D]0?)(?:-([\dA-D]0?))*").expect("valid time regex")
});

static PROGRAM_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[ ?學分學程：([^\]]+) ?]").expect("valid program regex"));

const WEEKDAYS: [char; 7] = ['一', '二', '三', '四', '五', '六', '日'];
const INTENSIVE_MARK: &str = "◎密集課程";

/// Response envelope of the grid endpoint.
#[derive(Debug, Deserialize)]
pub struct MetaGrid {
    #[serde(rename = "Count", default)]
    pub count: u64,
    #[serde(rename = "List", default)]
    pub list: Vec<RawCourseMeta>,
}

/// One grid row as sent by the catalogue.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawCourseMeta {
    #[serde(deserialize_with = "loose_string")]
    pub acadm_year: String,
    #[serde(deserialize_with = "loose_string")]
    pub acadm_term: String,
    #[serde(deserialize_with = "loose_string")]
    pub chn_name: String,
    #[serde(deserialize_with = "loose_string")]
    pub teacher: String,
    #[serde(deserialize_with = "loose_string")]
    pub dept_code: String,
    #[serde(deserialize_with = "loose_string")]
    pub course_code: String,
    #[serde(deserialize_with = "loose_string")]
    pub credit: String,
    #[serde(deserialize_with = "loose_string")]
    pub serial_no: String,
    #[serde(deserialize_with = "loose_string")]
    pub course_group: String,
    #[serde(deserialize_with = "loose_string")]
    pub limit_count_h: String,
    #[serde(deserialize_with = "loose_string")]
    pub authorize_p: String,
    #[serde(deserialize_with = "loose_string")]
    pub time_inf: String,
    #[serde(deserialize_with = "loose_string")]
    pub form_s: String,
    #[serde(deserialize_with = "loose_string")]
    pub classes: String,
    #[serde(deserialize_with = "loose_string")]
    pub dept_group: String,
}

impl RawCourseMeta {
    /// Convert into a `CourseMeta`.
    ///
    /// Year, term and serial identify the course, so a value that does not
    /// fit its field rejects the row. Credit and quota saturate instead.
    pub fn into_meta(self) -> Result<CourseMeta> {
        let year = identity("acadm_year", &self.acadm_year)?;
        let term = identity("acadm_term", &self.acadm_term)?;
        let serial = identity("serial_no", &self.serial_no)?;

        let mut title = self.chn_name.split("</br>");
        let name = title.next().unwrap_or_default().trim().to_string();
        let programs = parse_programs(title.next().unwrap_or_default().trim());

        Ok(CourseMeta {
            year,
            term,
            name,
            teachers: self
                .teacher
                .split(' ')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect(),
            department: self.dept_code.trim().to_string(),
            credit: saturating(&self.credit),
            code: self.course_code.trim().to_string(),
            serial,
            group: self.course_group.trim().to_string(),
            quota: Quota {
                limit: saturating(&self.limit_count_h),
                additional: saturating(&self.authorize_p),
            },
            schedule: parse_schedule(&self.time_inf),
            programs,
            form_s: self.form_s.trim().to_string(),
            classes: self.classes.trim().to_string(),
            dept_group: self.dept_group.trim().to_string(),
        })
    }
}

fn identity<T: TryFrom<i64>>(field: &str, raw: &str) -> Result<T> {
    T::try_from(leading_int(raw))
        .map_err(|_| AppError::validation(format!("{field} '{}' is out of range", raw.trim())))
}

/// Leading integer clamped into `T`.
pub(crate) fn saturating<T: TryFrom<i64> + Bounded>(raw: &str) -> T {
    T::try_from(leading_int(raw)).unwrap_or_else(|_| {
        log::warn!("'{}' does not fit its field; clamped", raw.trim());
        T::MAX
    })
}

/// Upper bound used when a count is clamped.
pub(crate) trait Bounded {
    const MAX: Self;
}

impl Bounded for u8 {
    const MAX: Self = u8::MAX;
}

impl Bounded for u32 {
    const MAX: Self = u32::MAX;
}

/// Parse a comma-separated schedule such as `二 3-4 本部 G101, 四 A 公館 S201`.
pub fn parse_schedule(raw: &str) -> Vec<ScheduleSlot> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(parse_slot)
        .collect()
}

fn parse_slot(entry: &str) -> ScheduleSlot {
    if entry == INTENSIVE_MARK {
        return ScheduleSlot::intensive();
    }

    let time = TIME_PATTERN.captures(entry);
    let remainder = TIME_PATTERN.replace(entry, "");
    let location: Vec<&str> = remainder
        .split(' ')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let (day, from, to) = match &time {
        Some(caps) => {
            let day = caps
                .get(1)
                .and_then(|m| m.as_str().chars().next())
                .and_then(|c| WEEKDAYS.iter().position(|w| *w == c))
                .map_or(ScheduleSlot::UNPARSED_DAY, |i| i as i8 + 1);
            let from = caps.get(2).map_or(-1, |m| period(m.as_str()));
            let to = caps.get(3).or(caps.get(2)).map_or(-1, |m| period(m.as_str()));
            (day, from, to)
        }
        None => (ScheduleSlot::UNPARSED_DAY, -1, -1),
    };

    let (campus, classroom) = match location.as_slice() {
        [campus, classroom] => (campus.to_string(), classroom.to_string()),
        rest => (String::new(), rest.join(" ")),
    };

    ScheduleSlot {
        day,
        from,
        to,
        campus,
        classroom,
    }
}

/// Period code to number: `0`-`10` are literal, `A`-`D` are 10-13.
fn period(code: &str) -> i8 {
    match code {
        "A" | "B" | "C" | "D" => i8::from_str_radix(code, 16).unwrap_or(-1),
        _ => code.parse().unwrap_or(-1),
    }
}

/// Credit-program tags from a `[學分學程：A B]` suffix.
pub fn parse_programs(raw: &str) -> Vec<String> {
    PROGRAM_PATTERN
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| {
            m.as_str()
                .split(' ')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

/// Leading decimal integer of a string, `0` if there is none and
/// `i64::MAX` if it does not fit.
pub(crate) fn leading_int(raw: &str) -> i64 {
    let digits: String = raw
        .trim()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    if digits.is_empty() {
        return 0;
    }
    digits.parse().unwrap_or(i64::MAX)
}

fn loose_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}
