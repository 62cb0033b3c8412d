//! Constraint evaluation.
//!
//! Computes the cost of a schedule as the weighted sum of violated
//! constraints. Evaluation is a pure function of the assignment: the
//! same assignment always yields the same cost and breakdown.
//!
//! # Constraints
//!
//! | Kind | Class | Unit |
//! |------|-------|------|
//! | Overbooking | hard | task above capacity in one slot |
//! | CapabilityMismatch | hard | task on a resource lacking a requirement |
//! | Unassigned | hard | free task without a placement |
//! | WindowMissed | hard | windowed task unplaced or outside its window |
//! | LeaderClash | hard | pair of same-leader tasks sharing a bucket |
//! | Preference | soft | task off its preferred resource |

use serde::{Deserialize, Serialize};

use crate::models::{Schedule, Slot};

/// Schedule cost. Zero means every constraint is satisfied.
pub type Cost = u64;

/// Classification of constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// Slot hosts more tasks than its resource's capacity.
    Overbooking,
    /// Task placed on a resource lacking a required capability.
    CapabilityMismatch,
    /// Task without a fixed window left unassigned.
    Unassigned,
    /// Task with a fixed window unassigned or placed outside it.
    WindowMissed,
    /// Tasks sharing a leader overlap in time.
    LeaderClash,
    /// Task placed away from its preferred resource.
    Preference,
}

impl ConstraintKind {
    /// All kinds, in evaluation order.
    pub const ALL: [ConstraintKind; 6] = [
        ConstraintKind::Overbooking,
        ConstraintKind::CapabilityMismatch,
        ConstraintKind::Unassigned,
        ConstraintKind::WindowMissed,
        ConstraintKind::LeaderClash,
        ConstraintKind::Preference,
    ];

    /// Whether the constraint must reach zero for an acceptable schedule.
    pub fn is_hard(self) -> bool {
        !matches!(self, ConstraintKind::Preference)
    }
}

/// Penalty per violation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintWeights {
    /// Weight of every hard constraint unit.
    pub hard: Cost,
    /// Weight of every soft constraint unit.
    pub soft: Cost,
}

impl Default for ConstraintWeights {
    fn default() -> Self {
        Self { hard: 100, soft: 1 }
    }
}

impl ConstraintWeights {
    /// Weight of one unit of `kind`.
    #[inline]
    pub fn of(&self, kind: ConstraintKind) -> Cost {
        if kind.is_hard() {
            self.hard
        } else {
            self.soft
        }
    }
}

/// A violated constraint attributed to one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Which constraint.
    pub kind: ConstraintKind,
    /// Task id, resource id, or leader name the violation belongs to.
    pub entity_id: String,
    /// Bucket of slot- or leader-level violations.
    pub bucket: Option<u32>,
    /// Violation units (excess tasks, clashing pairs, or 1).
    pub units: u64,
    /// Weighted contribution to the total cost.
    pub penalty: Cost,
    /// Human-readable description.
    pub message: String,
}

/// Cost of a schedule with its per-constraint breakdown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// Weighted sum of all violations.
    pub total: Cost,
    /// Every violation found, in evaluation order.
    pub violations: Vec<Violation>,
}

impl CostBreakdown {
    /// Whether no hard constraint is violated.
    pub fn is_feasible(&self) -> bool {
        self.violations.iter().all(|v| !v.kind.is_hard())
    }

    /// Total units of hard violations.
    pub fn hard_units(&self) -> u64 {
        self.violations
            .iter()
            .filter(|v| v.kind.is_hard())
            .map(|v| v.units)
            .sum()
    }

    /// Total units of soft violations.
    pub fn soft_units(&self) -> u64 {
        self.violations
            .iter()
            .filter(|v| !v.kind.is_hard())
            .map(|v| v.units)
            .sum()
    }

    /// Total units of one kind.
    pub fn units_of(&self, kind: ConstraintKind) -> u64 {
        self.violations
            .iter()
            .filter(|v| v.kind == kind)
            .map(|v| v.units)
            .sum()
    }

    /// Violations attributed to an entity.
    pub fn for_entity(&self, entity_id: &str) -> Vec<&Violation> {
        self.violations
            .iter()
            .filter(|v| v.entity_id == entity_id)
            .collect()
    }

    /// Summed penalty attributed to an entity.
    pub fn penalty_for(&self, entity_id: &str) -> Cost {
        self.for_entity(entity_id).iter().map(|v| v.penalty).sum()
    }
}

/// What a raw violation is attached to during a scan.
#[derive(Debug, Clone, Copy)]
enum Subject {
    Task(usize),
    Slot(Slot),
    Leader { leader: usize, bucket: u32 },
}

/// Scores schedules against the constraint catalogue.
///
/// # Example
///
/// ```
/// use u_timetable::evaluator::ConstraintEvaluator;
/// use u_timetable::models::{Problem, Resource, Schedule, Task};
///
/// let problem = Problem::new(2, vec![Resource::new("R1")], vec![Task::new("T1")]);
/// let schedule = Schedule::new(problem);
///
/// // T1 is unassigned: one hard violation at the default weight
/// let evaluator = ConstraintEvaluator::new();
/// assert_eq!(evaluator.cost(&schedule), 100);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConstraintEvaluator {
    weights: ConstraintWeights,
}

impl ConstraintEvaluator {
    /// Creates an evaluator with default weights.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the constraint weights.
    pub fn with_weights(mut self, weights: ConstraintWeights) -> Self {
        self.weights = weights;
        self
    }

    /// The weights in use.
    pub fn weights(&self) -> ConstraintWeights {
        self.weights
    }

    /// Cost of a schedule. Allocation-free counterpart of [`evaluate`](Self::evaluate).
    pub fn cost(&self, schedule: &Schedule) -> Cost {
        let mut total: Cost = 0;
        self.scan(schedule, |kind, _, units| {
            total += self.weights.of(kind) * units;
        });
        total
    }

    /// Cost of a schedule with every violation spelled out.
    pub fn evaluate(&self, schedule: &Schedule) -> CostBreakdown {
        let problem = schedule.problem();
        let mut breakdown = CostBreakdown::default();

        self.scan(schedule, |kind, subject, units| {
            let penalty = self.weights.of(kind) * units;
            let (entity_id, bucket, message) = match subject {
                Subject::Task(t) => {
                    let task = &problem.tasks()[t];
                    let message = match kind {
                        ConstraintKind::CapabilityMismatch => format!(
                            "Task '{}' placed on a resource lacking {:?}",
                            task.id, task.requires
                        ),
                        ConstraintKind::Unassigned if problem.is_infeasible(t) => {
                            format!("Task '{}' has no feasible slot", task.id)
                        }
                        ConstraintKind::Unassigned => format!("Task '{}' is unassigned", task.id),
                        ConstraintKind::WindowMissed => {
                            format!("Task '{}' is not placed inside its window", task.id)
                        }
                        ConstraintKind::Preference => format!(
                            "Task '{}' is not on its preferred resource '{}'",
                            task.id,
                            task.preferred.as_deref().unwrap_or_default()
                        ),
                        _ => format!("Task '{}' violates {:?}", task.id, kind),
                    };
                    (task.id.clone(), None, message)
                }
                Subject::Slot(slot) => {
                    let resource = &problem.resources()[slot.resource];
                    let message = format!(
                        "Resource '{}' holds {} task(s) over capacity at bucket {}",
                        resource.id, units, slot.bucket
                    );
                    (resource.id.clone(), Some(slot.bucket), message)
                }
                Subject::Leader { leader, bucket } => {
                    let name = &problem.leaders()[leader];
                    let message = format!(
                        "Leader '{}' has {} clashing pair(s) at bucket {}",
                        name, units, bucket
                    );
                    (name.clone(), Some(bucket), message)
                }
            };

            breakdown.total += penalty;
            breakdown.violations.push(Violation {
                kind,
                entity_id,
                bucket,
                units,
                penalty,
                message,
            });
        });

        breakdown
    }

    /// Walks every violation, reporting `(kind, subject, units)`.
    fn scan<F>(&self, schedule: &Schedule, mut sink: F)
    where
        F: FnMut(ConstraintKind, Subject, u64),
    {
        let problem = schedule.problem();
        let horizon = problem.horizon();

        // Overbooking
        for (r, resource) in problem.resources().iter().enumerate() {
            for bucket in 0..horizon {
                let slot = Slot {
                    resource: r,
                    bucket,
                };
                let excess = schedule.occupancy(slot).saturating_sub(resource.capacity);
                if excess > 0 {
                    sink(ConstraintKind::Overbooking, Subject::Slot(slot), excess as u64);
                }
            }
        }

        // Task-level constraints
        let mut leader_load = vec![0u64; problem.leaders().len() * horizon as usize];
        for (t, task) in problem.tasks().iter().enumerate() {
            let Some(p) = schedule.placement(t) else {
                let kind = if task.is_windowed() {
                    ConstraintKind::WindowMissed
                } else {
                    ConstraintKind::Unassigned
                };
                sink(kind, Subject::Task(t), 1);
                continue;
            };

            if !problem.is_capable(t, p.resource) {
                sink(ConstraintKind::CapabilityMismatch, Subject::Task(t), 1);
            }
            if let Some(window) = task.window {
                if !window.contains_run(p.start, task.duration) {
                    sink(ConstraintKind::WindowMissed, Subject::Task(t), 1);
                }
            }
            if let Some(preferred) = &task.preferred {
                if problem.resource_by_id(preferred) != Some(p.resource) {
                    sink(ConstraintKind::Preference, Subject::Task(t), 1);
                }
            }
            if let Some(l) = problem.leader_of(t) {
                let row = l * horizon as usize;
                for bucket in p.start..p.end(task.duration).min(horizon) {
                    leader_load[row + bucket as usize] += 1;
                }
            }
        }

        // Leader clashes: n tasks in one bucket form n·(n−1)/2 pairs
        for (i, &n) in leader_load.iter().enumerate() {
            if n > 1 {
                let leader = i / horizon as usize;
                let bucket = (i % horizon as usize) as u32;
                sink(
                    ConstraintKind::LeaderClash,
                    Subject::Leader { leader, bucket },
                    n * (n - 1) / 2,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Assignment, Placement, Problem, Resource, Task};

    fn schedule_with(
        resources: Vec<Resource>,
        tasks: Vec<Task>,
        placements: Vec<Option<Placement>>,
    ) -> Schedule {
        let problem = Problem::new(4, resources, tasks);
        Schedule::with_assignment(problem, Assignment::from_placements(placements)).unwrap()
    }

    #[test]
    fn test_valid_schedule_costs_zero() {
        let s = schedule_with(
            vec![Resource::new("R1").with_capability("lab"), Resource::new("R2")],
            vec![
                Task::new("T1").with_requirement("lab").with_leader("ann"),
                Task::new("T2").with_leader("ann").with_duration(2),
            ],
            vec![Some(Placement::new(0, 0)), Some(Placement::new(1, 1))],
        );
        let eval = ConstraintEvaluator::new();
        assert_eq!(eval.cost(&s), 0);

        let breakdown = eval.evaluate(&s);
        assert!(breakdown.is_feasible());
        assert!(breakdown.violations.is_empty());
    }

    #[test]
    fn test_unassigned_and_window_missed() {
        let s = schedule_with(
            vec![Resource::new("R1")],
            vec![
                Task::new("free"),
                Task::new("pinned").with_window(0, 2),
                Task::new("late").with_window(0, 2),
            ],
            vec![None, None, Some(Placement::new(0, 3))],
        );
        let b = ConstraintEvaluator::new().evaluate(&s);
        assert_eq!(b.units_of(ConstraintKind::Unassigned), 1);
        assert_eq!(b.units_of(ConstraintKind::WindowMissed), 2);
        assert_eq!(b.total, 300);
        assert_eq!(b.for_entity("free")[0].kind, ConstraintKind::Unassigned);
    }

    #[test]
    fn test_capability_mismatch() {
        let s = schedule_with(
            vec![Resource::new("R1")],
            vec![Task::new("T1").with_requirement("lab")],
            vec![Some(Placement::new(0, 0))],
        );
        let b = ConstraintEvaluator::new().evaluate(&s);
        assert_eq!(b.units_of(ConstraintKind::CapabilityMismatch), 1);
        assert_eq!(b.penalty_for("T1"), 100);
    }

    #[test]
    fn test_overbooking_counts_excess() {
        let s = schedule_with(
            vec![Resource::new("R1").with_capacity(1)],
            vec![Task::new("A"), Task::new("B"), Task::new("C")],
            vec![
                Some(Placement::new(0, 0)),
                Some(Placement::new(0, 0)),
                Some(Placement::new(0, 0)),
            ],
        );
        let b = ConstraintEvaluator::new().evaluate(&s);
        assert_eq!(b.units_of(ConstraintKind::Overbooking), 2);
        let v = &b.for_entity("R1")[0];
        assert_eq!(v.bucket, Some(0));
        assert_eq!(v.penalty, 200);
    }

    #[test]
    fn test_leader_clash_counts_pairs() {
        let s = schedule_with(
            vec![
                Resource::new("R1"),
                Resource::new("R2"),
                Resource::new("R3"),
            ],
            vec![
                Task::new("A").with_leader("ann").with_duration(2),
                Task::new("B").with_leader("ann"),
                Task::new("C").with_leader("ann"),
            ],
            vec![
                Some(Placement::new(0, 0)),
                Some(Placement::new(1, 0)),
                Some(Placement::new(2, 1)),
            ],
        );
        // Bucket 0: A, B → 1 pair; bucket 1: A, C → 1 pair
        let b = ConstraintEvaluator::new().evaluate(&s);
        assert_eq!(b.units_of(ConstraintKind::LeaderClash), 2);
        assert_eq!(b.for_entity("ann").len(), 2);
    }

    #[test]
    fn test_preference_is_soft() {
        let s = schedule_with(
            vec![Resource::new("R1"), Resource::new("R2")],
            vec![Task::new("T1").with_preferred("R2")],
            vec![Some(Placement::new(0, 0))],
        );
        let eval = ConstraintEvaluator::new();
        let b = eval.evaluate(&s);
        assert!(b.is_feasible());
        assert_eq!(b.soft_units(), 1);
        assert_eq!(b.hard_units(), 0);
        assert_eq!(eval.cost(&s), 1);
    }

    #[test]
    fn test_cost_matches_breakdown_total() {
        let s = schedule_with(
            vec![Resource::new("R1"), Resource::new("R2")],
            vec![
                Task::new("A").with_leader("x").with_preferred("R2"),
                Task::new("B").with_leader("x").with_requirement("lab"),
                Task::new("C").with_window(2, 4),
            ],
            vec![Some(Placement::new(0, 1)), Some(Placement::new(1, 1)), None],
        );
        let eval = ConstraintEvaluator::new();
        assert_eq!(eval.cost(&s), eval.evaluate(&s).total);
        assert_eq!(eval.cost(&s), eval.cost(&s.clone()));
    }

    #[test]
    fn test_custom_weights() {
        let s = schedule_with(vec![Resource::new("R1")], vec![Task::new("T1")], vec![None]);
        let eval = ConstraintEvaluator::new().with_weights(ConstraintWeights { hard: 7, soft: 1 });
        assert_eq!(eval.cost(&s), 7);
    }

    #[test]
    fn test_infeasible_task_message() {
        let s = schedule_with(
            vec![Resource::new("R1")],
            vec![Task::new("T1").with_requirement("pool")],
            vec![None],
        );
        let b = ConstraintEvaluator::new().evaluate(&s);
        assert!(b.violations[0].message.contains("no feasible slot"));
    }

    #[test]
    fn test_breakdown_serializes() {
        let s = schedule_with(vec![Resource::new("R1")], vec![Task::new("T1")], vec![None]);
        let b = ConstraintEvaluator::new().evaluate(&s);
        let json = serde_json::to_string(&b).unwrap();
        assert!(json.contains("\"Unassigned\""));
        let back: CostBreakdown = serde_json::from_str(&json).unwrap();
        assert_eq!(back, b);
    }
}
