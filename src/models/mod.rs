//! Timetable domain models.
//!
//! Provides the data types for describing a slot-based timetable and
//! its current assignment.
//!
//! # Domain Mappings
//!
//! | u-timetable | School | Clinic | Workshop |
//! |-------------|--------|--------|----------|
//! | Resource | Classroom | Consulting room | Workbench |
//! | Task | Lesson | Appointment | Job |
//! | Leader | Teacher | Doctor | Technician |
//! | Slot | Room × period | Room × hour | Bench × shift |

mod problem;
mod resource;
mod schedule;
mod slot;
mod task;

pub use problem::Problem;
pub use resource::Resource;
pub use schedule::{Assignment, AssignmentDelta, Change, Move, Schedule};
pub use slot::{Placement, Slot};
pub use task::{Task, TimeWindow};
