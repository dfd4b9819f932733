// src/adapters/squash.rs

use serde_json::Value;

use crate::adapters::Adapter;
use crate::error::Result;
use crate::models::CourseDetail;

/// Every detail record in one array, sorted by (year, term, serial).
pub struct SquashAdapter;

impl SquashAdapter {
    pub const ID: &'static str = "squash";
}

impl Adapter for SquashAdapter {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn process(&self, mut courses: Vec<CourseDetail>) -> Result<Value> {
        courses.sort_by_key(CourseDetail::key);
        Ok(serde_json::to_value(courses)?)
    }
}
