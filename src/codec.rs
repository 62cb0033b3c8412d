//! Schedule file codec.
//!
//! Schedules are stored as TOML documents:
//!
//! ```toml
//! horizon = 6
//!
//! [[resources]]
//! id = "room-a"
//! capabilities = ["projector"]
//! capacity = 1
//!
//! [[tasks]]
//! id = "algebra"
//! requires = ["projector"]
//! duration = 2
//! leader = "smith"
//! preferred = "room-a"
//! window = { start = 0, end = 4 }
//! slot = { resource = "room-a", start = 0 }
//! ```
//!
//! `capabilities` and `requires` default to empty, `capacity` and
//! `duration` to 1. A task without `slot` is unassigned.
//!
//! [`parse`] rejects anything it cannot turn into a [`Schedule`] with
//! [`Error::Format`], listing every problem found. A parsed schedule may
//! still violate constraints; that is reported as cost, not as an error.
//! For every schedule built from unique identifiers,
//! `parse(&serialize(&s)?)? == s`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{Assignment, Placement, Problem, Resource, Schedule, Task, TimeWindow};
use crate::validation::{validate_document, ValidationError};

fn one() -> u32 {
    1
}

fn is_one(value: &u32) -> bool {
    *value == 1
}

/// Top-level schedule document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleDocument {
    /// Number of time buckets.
    pub horizon: u32,
    #[serde(default)]
    pub resources: Vec<ResourceEntry>,
    #[serde(default)]
    pub tasks: Vec<TaskEntry>,
}

/// A `[[resources]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub capabilities: BTreeSet<String>,
    #[serde(default = "one")]
    pub capacity: u32,
}

/// A `[[tasks]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub requires: BTreeSet<String>,
    #[serde(default = "one", skip_serializing_if = "is_one")]
    pub duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leader: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<WindowEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<SlotRef>,
}

/// `window = { start, end }`: half-open bucket range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowEntry {
    pub start: u32,
    pub end: u32,
}

/// `slot = { resource, start }`: where a task is assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlotRef {
    pub resource: String,
    pub start: u32,
}

impl ScheduleDocument {
    /// Captures a schedule, assignment included.
    pub fn from_schedule(schedule: &Schedule) -> Self {
        let problem = schedule.problem();
        let resources = problem
            .resources()
            .iter()
            .map(|r| ResourceEntry {
                id: r.id.clone(),
                capabilities: r.capabilities.clone(),
                capacity: r.capacity,
            })
            .collect();
        let tasks = problem
            .tasks()
            .iter()
            .enumerate()
            .map(|(i, t)| TaskEntry {
                id: t.id.clone(),
                requires: t.requires.clone(),
                duration: t.duration,
                leader: t.leader.clone(),
                preferred: t.preferred.clone(),
                window: t.window.map(|w| WindowEntry {
                    start: w.start,
                    end: w.end,
                }),
                slot: schedule.placement(i).map(|p| SlotRef {
                    resource: problem.resources()[p.resource].id.clone(),
                    start: p.start,
                }),
            })
            .collect();
        Self {
            horizon: problem.horizon(),
            resources,
            tasks,
        }
    }

    /// Validates the document and builds the schedule it describes.
    pub fn into_schedule(self) -> Result<Schedule> {
        validate_document(&self).map_err(format_error)?;

        let resources: Vec<Resource> = self
            .resources
            .into_iter()
            .map(|r| Resource {
                id: r.id,
                capabilities: r.capabilities,
                capacity: r.capacity,
            })
            .collect();

        let mut tasks = Vec::with_capacity(self.tasks.len());
        let mut slots = Vec::with_capacity(self.tasks.len());
        for entry in self.tasks {
            slots.push(entry.slot);
            tasks.push(Task {
                id: entry.id,
                requires: entry.requires,
                duration: entry.duration,
                window: entry.window.map(|w| TimeWindow::new(w.start, w.end)),
                leader: entry.leader,
                preferred: entry.preferred,
            });
        }

        let problem = Problem::new(self.horizon, resources, tasks);
        let placements = slots
            .into_iter()
            .map(|slot| {
                slot.map(|s| {
                    problem
                        .resource_by_id(&s.resource)
                        .map(|r| Placement::new(r, s.start))
                        .ok_or_else(|| {
                            Error::Format(format!("unknown resource '{}' in slot", s.resource))
                        })
                })
                .transpose()
            })
            .collect::<Result<Vec<_>>>()?;

        Schedule::with_assignment(problem, Assignment::from_placements(placements))
            .map_err(|err| Error::Format(err.to_string()))
    }
}

/// Decodes a schedule file.
pub fn parse(bytes: &[u8]) -> Result<Schedule> {
    let text = std::str::from_utf8(bytes)
        .map_err(|err| Error::Format(format!("input is not valid UTF-8: {err}")))?;
    let document: ScheduleDocument = toml::from_str(text)?;
    let schedule = document.into_schedule()?;
    debug!(
        tasks = schedule.problem().task_count(),
        resources = schedule.problem().resource_count(),
        horizon = schedule.problem().horizon(),
        assigned = schedule.assignment().assigned_count(),
        "schedule decoded"
    );
    Ok(schedule)
}

/// Encodes a schedule file.
pub fn serialize(schedule: &Schedule) -> Result<Vec<u8>> {
    let document = ScheduleDocument::from_schedule(schedule);
    let text = toml::to_string_pretty(&document)
        .map_err(|err| Error::Format(format!("cannot encode schedule: {err}")))?;
    Ok(text.into_bytes())
}

fn format_error(errors: Vec<ValidationError>) -> Error {
    let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
    Error::Format(messages.join("; "))
}
