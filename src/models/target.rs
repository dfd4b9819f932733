// src/models/target.rs

//! Academic term targets.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Offset between the Gregorian and ROC calendar years.
const ROC_OFFSET: i32 = 1911;

/// One academic term to crawl, written `YEAR-TERM` (e.g. `110-1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Target {
    pub year: u16,
    pub term: u8,
}

impl Target {
    pub fn new(year: u16, term: u8) -> Self {
        Self { year, term }
    }

    /// The term in session on the given date.
    ///
    /// Term 1 runs August through January, term 2 February through July.
    pub fn for_date(date: NaiveDate) -> Self {
        let roc_year = date.year() - ROC_OFFSET;
        let (year, term) = match date.month() {
            8..=12 => (roc_year, 1),
            1 => (roc_year - 1, 1),
            _ => (roc_year - 1, 2),
        };
        Self {
            year: year.max(0) as u16,
            term,
        }
    }

    /// The term in session today.
    pub fn current() -> Self {
        Self::for_date(Local::now().date_naive())
    }

    /// Join several targets into the name used for adapter output files.
    pub fn join(targets: &[Target]) -> String {
        targets
            .iter()
            .map(Target::to_string)
            .collect::<Vec<_>>()
            .join("$")
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.year, self.term)
    }
}

impl FromStr for Target {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::validation(format!("invalid target '{s}', expected YEAR-TERM"));

        let (year, term) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year: u16 = year.parse().map_err(|_| invalid())?;
        let term: u8 = term.parse().map_err(|_| invalid())?;
        if term == 0 {
            return Err(invalid());
        }

        Ok(Self { year, term })
    }
}
