//! Problem definition: the immutable part of a schedule.
//!
//! Holds the horizon, resources, and tasks plus lookup tables derived
//! from them. Shared between working and best-found schedule copies.

use std::collections::HashMap;

use super::{Placement, Resource, Task};

/// Horizon, resources, and tasks of one loaded timetable.
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    horizon: u32,
    resources: Vec<Resource>,
    tasks: Vec<Task>,
    resource_index: HashMap<String, usize>,
    task_index: HashMap<String, usize>,
    /// Distinct leader names, sorted.
    leaders: Vec<String>,
    /// Per task: index into `leaders`.
    task_leader: Vec<Option<usize>>,
    /// Per task: indices of resources covering its requirements.
    capable: Vec<Vec<usize>>,
}

impl Problem {
    /// Builds a problem and its lookup tables.
    ///
    /// Identifiers are assumed unique; the codec validates input before
    /// calling this. With duplicates the last occurrence wins lookups.
    pub fn new(horizon: u32, resources: Vec<Resource>, tasks: Vec<Task>) -> Self {
        let resource_index = resources
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();
        let task_index = tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();

        let mut leaders: Vec<String> = tasks.iter().filter_map(|t| t.leader.clone()).collect();
        leaders.sort();
        leaders.dedup();
        let task_leader = tasks
            .iter()
            .map(|t| {
                t.leader
                    .as_ref()
                    .and_then(|l| leaders.binary_search(l).ok())
            })
            .collect();

        let capable = tasks
            .iter()
            .map(|t| {
                resources
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| r.covers(&t.requires))
                    .map(|(i, _)| i)
                    .collect()
            })
            .collect();

        Self {
            horizon,
            resources,
            tasks,
            resource_index,
            task_index,
            leaders,
            task_leader,
            capable,
        }
    }

    /// Number of time buckets.
    #[inline]
    pub fn horizon(&self) -> u32 {
        self.horizon
    }

    /// All resources.
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// All tasks.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Number of tasks.
    #[inline]
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Number of resources.
    #[inline]
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Looks up a resource index by id.
    pub fn resource_by_id(&self, id: &str) -> Option<usize> {
        self.resource_index.get(id).copied()
    }

    /// Looks up a task index by id.
    pub fn task_by_id(&self, id: &str) -> Option<usize> {
        self.task_index.get(id).copied()
    }

    /// Distinct leader names.
    pub fn leaders(&self) -> &[String] {
        &self.leaders
    }

    /// Leader index of a task.
    #[inline]
    pub fn leader_of(&self, task: usize) -> Option<usize> {
        self.task_leader[task]
    }

    /// Resources able to host a task (capability-wise).
    pub fn capable_resources(&self, task: usize) -> &[usize] {
        &self.capable[task]
    }

    /// Whether `resource` covers the requirements of `task`.
    pub fn is_capable(&self, task: usize, resource: usize) -> bool {
        self.capable[task].binary_search(&resource).is_ok()
    }

    /// Whether the task has no capability-compatible resource or cannot fit its window.
    pub fn is_infeasible(&self, task: usize) -> bool {
        self.capable[task].is_empty() || self.tasks[task].start_range(self.horizon).is_empty()
    }

    /// Whether `placement` respects the task's capability and window
    /// requirements and stays inside the horizon. Capacity is not checked.
    pub fn admits(&self, task: usize, placement: Placement) -> bool {
        let t = &self.tasks[task];
        placement.resource < self.resources.len()
            && self.is_capable(task, placement.resource)
            && t.start_range(self.horizon).contains(&placement.start)
    }

    /// Every placement [`admits`](Self::admits) accepts, resource-major, ascending start.
    pub fn candidate_placements(&self, task: usize) -> impl Iterator<Item = Placement> + '_ {
        let starts = self.tasks[task].start_range(self.horizon);
        self.capable[task]
            .iter()
            .flat_map(move |&r| starts.clone().map(move |s| Placement::new(r, s)))
    }
}
