//! Schedule (solution) model.
//!
//! A schedule is the problem definition plus the current assignment of
//! tasks to placements. The assignment holds at most one placement per
//! task by construction, and move application refuses any change that
//! would push a slot past its resource's capacity.

use std::sync::Arc;

use super::{Placement, Problem, Slot};
use crate::error::MoveError;

/// Task → placement mapping. Index = task index, `None` = unassigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment(Vec<Option<Placement>>);

impl Assignment {
    /// All tasks unassigned.
    pub fn unassigned(task_count: usize) -> Self {
        Self(vec![None; task_count])
    }

    /// Wraps a per-task placement vector.
    pub fn from_placements(placements: Vec<Option<Placement>>) -> Self {
        Self(placements)
    }

    /// Placement of a task.
    #[inline]
    pub fn get(&self, task: usize) -> Option<Placement> {
        self.0.get(task).copied().flatten()
    }

    /// Iterates `(task, placement)` over every task.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Option<Placement>)> + '_ {
        self.0.iter().copied().enumerate()
    }

    /// Number of tasks covered (assigned or not).
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no tasks.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of tasks with a placement.
    pub fn assigned_count(&self) -> usize {
        self.0.iter().filter(|p| p.is_some()).count()
    }

    fn set(&mut self, task: usize, placement: Option<Placement>) {
        self.0[task] = placement;
    }
}

/// Occupied task count per slot, resource-major.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Occupancy {
    horizon: u32,
    counts: Vec<u32>,
}

impl Occupancy {
    fn new(resources: usize, horizon: u32) -> Self {
        Self {
            horizon,
            counts: vec![0; resources * horizon as usize],
        }
    }

    #[inline]
    fn index(&self, slot: Slot) -> usize {
        slot.resource * self.horizon as usize + slot.bucket as usize
    }

    #[inline]
    fn get(&self, slot: Slot) -> u32 {
        self.counts[self.index(slot)]
    }

    fn add(&mut self, placement: Placement, duration: u32) {
        for slot in placement.slots(duration) {
            let i = self.index(slot);
            self.counts[i] += 1;
        }
    }

    fn remove(&mut self, placement: Placement, duration: u32) {
        for slot in placement.slots(duration) {
            let i = self.index(slot);
            self.counts[i] = self.counts[i].saturating_sub(1);
        }
    }
}

/// A local modification of an assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Move {
    /// Move one task to a placement.
    Reassign { task: usize, to: Placement },
    /// Exchange the placements of two tasks.
    Swap { a: usize, b: usize },
    /// Replace the placements of several tasks at once.
    Kick(Vec<(usize, Placement)>),
}

/// One task's placement before and after a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Change {
    pub task: usize,
    pub before: Option<Placement>,
    pub after: Option<Placement>,
}

/// The assignment changes a move made, enough to undo it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentDelta {
    pub changes: Vec<Change>,
}

impl AssignmentDelta {
    /// Whether the move changed nothing.
    pub fn is_empty(&self) -> bool {
        self.changes.iter().all(|c| c.before == c.after)
    }

    /// Tasks touched by the move.
    pub fn tasks(&self) -> impl Iterator<Item = usize> + '_ {
        self.changes.iter().map(|c| c.task)
    }
}

/// A problem together with its current assignment.
///
/// Cloning shares the problem and copies only the assignment and slot
/// occupancy, so keeping a working copy beside a best-found copy is cheap.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    problem: Arc<Problem>,
    assignment: Assignment,
    occupancy: Occupancy,
}

impl Schedule {
    /// Creates a schedule with every task unassigned.
    pub fn new(problem: Problem) -> Self {
        let assignment = Assignment::unassigned(problem.task_count());
        let occupancy = Occupancy::new(problem.resource_count(), problem.horizon());
        Self {
            problem: Arc::new(problem),
            assignment,
            occupancy,
        }
    }

    /// Creates a schedule from a loaded assignment.
    ///
    /// Placements must reference known resources and stay inside the
    /// horizon. Capacity is not enforced here: an overbooked input is
    /// accepted and reported by the evaluator.
    pub fn with_assignment(problem: Problem, assignment: Assignment) -> Result<Self, MoveError> {
        if assignment.len() != problem.task_count() {
            return Err(MoveError::UnknownTask(assignment.len()));
        }
        let mut schedule = Self::new(problem);
        for (task, placement) in assignment.iter() {
            if let Some(p) = placement {
                schedule.check_bounds(task, p)?;
                let duration = schedule.duration(task);
                schedule.occupancy.add(p, duration);
            }
        }
        schedule.assignment = assignment;
        Ok(schedule)
    }

    /// The shared problem definition.
    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    /// The current assignment.
    pub fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    /// Placement of a task.
    #[inline]
    pub fn placement(&self, task: usize) -> Option<Placement> {
        self.assignment.get(task)
    }

    /// Number of tasks occupying a slot.
    #[inline]
    pub fn occupancy(&self, slot: Slot) -> u32 {
        self.occupancy.get(slot)
    }

    /// Remaining room in a slot (0 when full or overbooked).
    #[inline]
    pub fn free_capacity(&self, slot: Slot) -> u32 {
        self.problem.resources()[slot.resource]
            .capacity
            .saturating_sub(self.occupancy.get(slot))
    }

    /// Tasks whose placement covers `slot`.
    pub fn tasks_at(&self, slot: Slot) -> Vec<usize> {
        self.assignment
            .iter()
            .filter_map(|(task, p)| {
                let p = p?;
                (p.resource == slot.resource && p.covers(self.duration(task), slot.bucket))
                    .then_some(task)
            })
            .collect()
    }

    /// Whether a task fits at `placement` given current occupancy,
    /// ignoring the task's own current placement.
    pub fn fits(&self, task: usize, placement: Placement) -> bool {
        if self.check_bounds(task, placement).is_err() {
            return false;
        }
        let duration = self.duration(task);
        let own = self.placement(task);
        let capacity = self.problem.resources()[placement.resource].capacity;
        placement.slots(duration).all(|slot| {
            let mut used = self.occupancy.get(slot);
            if let Some(o) = own {
                if o.resource == slot.resource && o.covers(duration, slot.bucket) {
                    used = used.saturating_sub(1);
                }
            }
            used < capacity
        })
    }

    /// Applies a move atomically.
    ///
    /// Returns the delta needed to [`revert`](Self::revert) it. On error
    /// the schedule is unchanged. Cost is not recomputed.
    pub fn apply(&mut self, mv: &Move) -> Result<AssignmentDelta, MoveError> {
        let targets: Vec<(usize, Option<Placement>)> = match mv {
            Move::Reassign { task, to } => vec![(*task, Some(*to))],
            Move::Swap { a, b } => {
                self.check_task(*a)?;
                self.check_task(*b)?;
                if a == b {
                    return Err(MoveError::DuplicateTask(*a));
                }
                vec![(*a, self.placement(*b)), (*b, self.placement(*a))]
            }
            Move::Kick(entries) => entries.iter().map(|&(t, p)| (t, Some(p))).collect(),
        };

        for (i, &(task, placement)) in targets.iter().enumerate() {
            self.check_task(task)?;
            if targets[..i].iter().any(|&(t, _)| t == task) {
                return Err(MoveError::DuplicateTask(task));
            }
            if let Some(p) = placement {
                self.check_bounds(task, p)?;
            }
        }

        let changes: Vec<Change> = targets
            .iter()
            .map(|&(task, after)| Change {
                task,
                before: self.placement(task),
                after,
            })
            .collect();

        for c in &changes {
            if let Some(p) = c.before {
                self.occupancy.remove(p, self.duration(c.task));
            }
        }

        let mut added = 0;
        let mut overflow = None;
        'outer: for c in &changes {
            if let Some(p) = c.after {
                let duration = self.duration(c.task);
                let capacity = self.problem.resources()[p.resource].capacity;
                for slot in p.slots(duration) {
                    if self.occupancy.get(slot) >= capacity {
                        overflow = Some(slot);
                        break 'outer;
                    }
                }
                self.occupancy.add(p, duration);
            }
            added += 1;
        }

        if let Some(slot) = overflow {
            for c in &changes[..added] {
                if let Some(p) = c.after {
                    self.occupancy.remove(p, self.duration(c.task));
                }
            }
            for c in &changes {
                if let Some(p) = c.before {
                    self.occupancy.add(p, self.duration(c.task));
                }
            }
            return Err(MoveError::CapacityExceeded {
                resource: slot.resource,
                bucket: slot.bucket,
            });
        }

        for c in &changes {
            self.assignment.set(c.task, c.after);
        }
        Ok(AssignmentDelta { changes })
    }

    /// Undoes a delta returned by [`apply`](Self::apply) on this schedule.
    pub fn revert(&mut self, delta: &AssignmentDelta) {
        for c in &delta.changes {
            if let Some(p) = c.after {
                self.occupancy.remove(p, self.duration(c.task));
            }
        }
        for c in &delta.changes {
            if let Some(p) = c.before {
                self.occupancy.add(p, self.duration(c.task));
            }
            self.assignment.set(c.task, c.before);
        }
    }

    /// Removes a task's placement. Always succeeds.
    pub fn unassign(&mut self, task: usize) -> Option<Placement> {
        let previous = self.placement(task)?;
        self.occupancy.remove(previous, self.duration(task));
        self.assignment.set(task, None);
        Some(previous)
    }

    #[inline]
    fn duration(&self, task: usize) -> u32 {
        self.problem.tasks()[task].duration
    }

    fn check_task(&self, task: usize) -> Result<(), MoveError> {
        if task < self.problem.task_count() {
            Ok(())
        } else {
            Err(MoveError::UnknownTask(task))
        }
    }

    fn check_bounds(&self, task: usize, placement: Placement) -> Result<(), MoveError> {
        self.check_task(task)?;
        if placement.resource >= self.problem.resource_count() {
            return Err(MoveError::UnknownResource(placement.resource));
        }
        if placement.end(self.duration(task)) > self.problem.horizon() {
            return Err(MoveError::OutsideHorizon {
                task,
                start: placement.start,
            });
        }
        Ok(())
    }
}
