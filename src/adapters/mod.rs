//! Output adapters.
//!
//! An adapter turns the aggregated detail list of a run into one serializable
//! document. Adapters are looked up by id in a static registry:
//!
//! | id            | output                                             |
//! |---------------|----------------------------------------------------|
//! | `squash`      | the detail list sorted by (year, term, serial)     |
//! | `course-pack` | normalized teachers/programs and a department tree |

mod course_pack;
mod squash;

use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::CourseDetail;

pub use course_pack::CoursePackAdapter;
pub use squash::SquashAdapter;

/// A pure transformation from aggregated courses to an output document.
pub trait Adapter: Send + Sync {
    /// Registry id, also the output directory name.
    fn id(&self) -> &'static str;

    fn process(&self, courses: Vec<CourseDetail>) -> Result<Value>;
}

type Factory = fn() -> Box<dyn Adapter>;

fn squash() -> Box<dyn Adapter> {
    Box::new(SquashAdapter)
}

fn course_pack() -> Box<dyn Adapter> {
    Box::new(CoursePackAdapter::default())
}

static REGISTRY: &[(&str, Factory)] = &[
    (SquashAdapter::ID, squash as Factory),
    (CoursePackAdapter::ID, course_pack as Factory),
];

/// Ids of every registered adapter, in registration order.
pub fn ids() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|(id, _)| *id)
}

/// Build the adapter registered under `id`.
pub fn create(id: &str) -> Result<Box<dyn Adapter>> {
    REGISTRY
        .iter()
        .find(|(registered, _)| *registered == id)
        .map(|(_, factory)| factory())
        .ok_or_else(|| AppError::AdapterNotFound(id.to_string()))
}
