//! Greedy construction.
//!
//! # Algorithm
//!
//! 1. Release unresolved tasks: unassigned ones, ones placed where their
//!    capabilities or window are not met, ones on overbooked slots, and
//!    ones whose leader is already busy in one of their buckets (the
//!    lowest-indexed task of each leader keeps its place).
//! 2. Order them by capability scarcity (fewest capable resources first),
//!    ties broken by task id.
//! 3. Place each at the free feasible placement with the lowest resulting
//!    cost; ties go to the first candidate (resource order, then start).
//!
//! Tasks with no free feasible placement stay unassigned.
//!
//! # Complexity
//! O(u · c · e) where u = unresolved tasks, c = candidate placements per
//! task, e = one cost evaluation.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::evaluator::{ConstraintEvaluator, Cost};
use crate::models::{Move, Placement, Schedule};

/// Outcome of a greedy construction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstructionReport {
    /// Tasks released for re-placement.
    pub released: usize,
    /// Released tasks that received a placement.
    pub placed: usize,
    /// Ids of released tasks left unassigned.
    pub unplaced: Vec<String>,
}

/// Tasks whose current placement must be redone.
pub fn unresolved_tasks(schedule: &Schedule) -> Vec<usize> {
    let problem = schedule.problem();
    // (leader, bucket) pairs claimed by a task that keeps its placement
    let mut busy: HashSet<(usize, u32)> = HashSet::new();
    (0..problem.task_count())
        .filter(|&t| {
            let Some(p) = schedule.placement(t) else {
                return true;
            };
            let duration = problem.tasks()[t].duration;
            let capacity = problem.resources()[p.resource].capacity;
            if !problem.admits(t, p)
                || p.slots(duration).any(|s| schedule.occupancy(s) > capacity)
            {
                return true;
            }
            let Some(leader) = problem.leader_of(t) else {
                return false;
            };
            let buckets = p.start..p.end(duration);
            if buckets.clone().any(|b| busy.contains(&(leader, b))) {
                return true;
            }
            busy.extend(buckets.map(|b| (leader, b)));
            false
        })
        .collect()
}

/// Runs greedy construction on `schedule` in place.
pub fn construct(schedule: &mut Schedule, evaluator: &ConstraintEvaluator) -> ConstructionReport {
    let mut pending = unresolved_tasks(schedule);
    {
        let problem = schedule.problem();
        pending.sort_by(|&a, &b| {
            problem
                .capable_resources(a)
                .len()
                .cmp(&problem.capable_resources(b).len())
                .then_with(|| problem.tasks()[a].id.cmp(&problem.tasks()[b].id))
        });
    }

    for &task in &pending {
        schedule.unassign(task);
    }

    let mut report = ConstructionReport {
        released: pending.len(),
        ..ConstructionReport::default()
    };

    for task in pending {
        match best_placement(schedule, evaluator, task) {
            Some((to, cost)) => {
                if schedule.apply(&Move::Reassign { task, to }).is_ok() {
                    report.placed += 1;
                    debug!(
                        task = %schedule.problem().tasks()[task].id,
                        resource = to.resource,
                        start = to.start,
                        cost,
                        "greedy placement"
                    );
                }
            }
            None => {
                let id = schedule.problem().tasks()[task].id.clone();
                warn!(task = %id, "no feasible slot for task");
                report.unplaced.push(id);
            }
        }
    }

    report
}

/// Lowest-cost free placement for an unassigned task.
fn best_placement(
    schedule: &mut Schedule,
    evaluator: &ConstraintEvaluator,
    task: usize,
) -> Option<(Placement, Cost)> {
    let candidates: Vec<Placement> = schedule
        .problem()
        .candidate_placements(task)
        .filter(|&p| schedule.fits(task, p))
        .collect();

    let mut best: Option<(Placement, Cost)> = None;
    for to in candidates {
        let Ok(delta) = schedule.apply(&Move::Reassign { task, to }) else {
            continue;
        };
        let cost = evaluator.cost(schedule);
        schedule.revert(&delta);
        if best.map_or(true, |(_, c)| cost < c) {
            best = Some((to, cost));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Assignment, Problem, Resource, Task};

    #[test]
    fn test_construct_places_everything_feasible() {
        let problem = Problem::new(
            2,
            vec![
                Resource::new("R1").with_capability("lab"),
                Resource::new("R2"),
            ],
            vec![
                Task::new("A").with_leader("ann"),
                Task::new("B").with_leader("ann"),
                Task::new("C").with_requirement("lab"),
            ],
        );
        let mut schedule = Schedule::new(problem);
        let eval = ConstraintEvaluator::new();

        let report = construct(&mut schedule, &eval);
        assert_eq!(report.released, 3);
        assert_eq!(report.placed, 3);
        assert!(report.unplaced.is_empty());
        assert_eq!(eval.cost(&schedule), 0);
    }

    #[test]
    fn test_scarce_tasks_go_first() {
        // Only R1 has the lab; C must get it before A grabs bucket 0 there.
        let problem = Problem::new(
            1,
            vec![
                Resource::new("R1").with_capability("lab"),
                Resource::new("R2"),
            ],
            vec![Task::new("A"), Task::new("C").with_requirement("lab")],
        );
        let mut schedule = Schedule::new(problem);
        construct(&mut schedule, &ConstraintEvaluator::new());
        assert_eq!(schedule.placement(1), Some(Placement::new(0, 0)));
        assert_eq!(schedule.placement(0), Some(Placement::new(1, 0)));
    }

    #[test]
    fn test_valid_schedule_is_untouched() {
        let problem = Problem::new(
            2,
            vec![Resource::new("R1")],
            vec![Task::new("A"), Task::new("B")],
        );
        let assignment = Assignment::from_placements(vec![
            Some(Placement::new(0, 1)),
            Some(Placement::new(0, 0)),
        ]);
        let mut schedule = Schedule::with_assignment(problem, assignment).unwrap();
        let before = schedule.clone();

        let report = construct(&mut schedule, &ConstraintEvaluator::new());
        assert_eq!(report.released, 0);
        assert_eq!(schedule, before);
    }

    #[test]
    fn test_infeasible_task_reported() {
        let problem = Problem::new(
            2,
            vec![Resource::new("R1")],
            vec![Task::new("A"), Task::new("X").with_requirement("pool")],
        );
        let mut schedule = Schedule::new(problem);
        let report = construct(&mut schedule, &ConstraintEvaluator::new());
        assert_eq!(report.placed, 1);
        assert_eq!(report.unplaced, vec!["X".to_string()]);
    }

    #[test]
    fn test_leader_clash_is_released() {
        let problem = Problem::new(
            2,
            vec![Resource::new("R1"), Resource::new("R2")],
            vec![
                Task::new("A").with_leader("ann"),
                Task::new("B").with_leader("ann"),
            ],
        );
        let assignment = Assignment::from_placements(vec![
            Some(Placement::new(0, 0)),
            Some(Placement::new(1, 0)),
        ]);
        let mut schedule = Schedule::with_assignment(problem, assignment).unwrap();
        let eval = ConstraintEvaluator::new();
        assert_eq!(eval.cost(&schedule), 100);
        assert_eq!(unresolved_tasks(&schedule), vec![1]);

        let report = construct(&mut schedule, &eval);
        assert_eq!(report.released, 1);
        assert_eq!(report.placed, 1);
        assert_eq!(schedule.placement(0), Some(Placement::new(0, 0)));
        assert_eq!(eval.cost(&schedule), 0);
    }

    #[test]
    fn test_long_task_clash_is_released() {
        // A spans buckets 0..2; B at bucket 1 shares its leader.
        let problem = Problem::new(
            3,
            vec![Resource::new("R1"), Resource::new("R2")],
            vec![
                Task::new("A").with_leader("ann").with_duration(2),
                Task::new("B").with_leader("ann"),
                Task::new("C").with_leader("bob"),
            ],
        );
        let assignment = Assignment::from_placements(vec![
            Some(Placement::new(0, 0)),
            Some(Placement::new(1, 1)),
            Some(Placement::new(1, 0)),
        ]);
        let mut schedule = Schedule::with_assignment(problem, assignment).unwrap();
        assert_eq!(unresolved_tasks(&schedule), vec![1]);

        let eval = ConstraintEvaluator::new();
        construct(&mut schedule, &eval);
        assert_eq!(eval.cost(&schedule), 0);
        assert_eq!(schedule.placement(1).map(|p| p.start), Some(2));
    }

    #[test]
    fn test_misplaced_and_overbooked_tasks_are_released() {
        let problem = Problem::new(
            2,
            vec![Resource::new("R1"), Resource::new("R2").with_capability("lab")],
            vec![
                Task::new("A"),
                Task::new("B"),
                Task::new("L").with_requirement("lab"),
            ],
        );
        // A and B share R1 bucket 0 (capacity 1); L sits on R1 without a lab
        let assignment = Assignment::from_placements(vec![
            Some(Placement::new(0, 0)),
            Some(Placement::new(0, 0)),
            Some(Placement::new(0, 1)),
        ]);
        let mut schedule = Schedule::with_assignment(problem, assignment).unwrap();
        assert_eq!(unresolved_tasks(&schedule), vec![0, 1, 2]);

        let eval = ConstraintEvaluator::new();
        construct(&mut schedule, &eval);
        assert_eq!(eval.cost(&schedule), 0);
    }
}
