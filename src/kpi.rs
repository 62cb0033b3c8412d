//! Schedule quality metrics (KPIs).
//!
//! Computes descriptive indicators for a schedule. They complement the
//! cost breakdown: cost says what is wrong, KPIs say how the schedule
//! uses its resources.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Assigned / Unassigned | Tasks with and without a placement |
//! | Makespan | One past the last occupied bucket |
//! | Utilization | Occupied slot units / (capacity × horizon), per resource |
//! | Avg Utilization | Mean over resources |
//! | Window Rate | Fraction of windowed, assigned tasks inside their window |
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 1.2: Performance Measures

use std::collections::HashMap;

use serde::Serialize;

use crate::models::{Schedule, Slot};

/// Schedule performance indicators.
///
/// Time values are in buckets.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleKpi {
    /// Tasks with a placement.
    pub assigned: usize,
    /// Tasks without a placement.
    pub unassigned: usize,
    /// One past the last occupied bucket (0 when nothing is assigned).
    pub makespan: u32,
    /// Average resource utilization (0.0..1.0).
    pub avg_utilization: f64,
    /// Per-resource utilization, keyed by resource ID.
    pub utilization_by_resource: HashMap<String, f64>,
    /// Fraction of assigned windowed tasks running inside their window.
    pub window_rate: f64,
}

impl ScheduleKpi {
    /// Computes KPIs for a schedule.
    pub fn calculate(schedule: &Schedule) -> Self {
        let problem = schedule.problem();
        let horizon = problem.horizon();

        let mut makespan = 0;
        let mut windowed = 0usize;
        let mut in_window = 0usize;
        for (task, placement) in schedule.assignment().iter() {
            let Some(p) = placement else { continue };
            let spec = &problem.tasks()[task];
            makespan = makespan.max(p.end(spec.duration));
            if let Some(w) = spec.window {
                windowed += 1;
                if w.contains_run(p.start, spec.duration) {
                    in_window += 1;
                }
            }
        }

        // Overbooked slots count as full, not beyond.
        let utilization_by_resource: HashMap<String, f64> = problem
            .resources()
            .iter()
            .enumerate()
            .map(|(r, res)| {
                let total = u64::from(res.capacity) * u64::from(horizon);
                let used: u64 = (0..horizon)
                    .map(|bucket| {
                        let slot = Slot { resource: r, bucket };
                        u64::from(schedule.occupancy(slot).min(res.capacity))
                    })
                    .sum();
                let util = if total == 0 {
                    0.0
                } else {
                    used as f64 / total as f64
                };
                (res.id.clone(), util)
            })
            .collect();

        let avg_utilization = if utilization_by_resource.is_empty() {
            0.0
        } else {
            let sum: f64 = utilization_by_resource.values().sum();
            sum / utilization_by_resource.len() as f64
        };

        let window_rate = if windowed == 0 {
            1.0
        } else {
            in_window as f64 / windowed as f64
        };

        let assigned = schedule.assignment().assigned_count();
        Self {
            assigned,
            unassigned: problem.task_count() - assigned,
            makespan,
            avg_utilization,
            utilization_by_resource,
            window_rate,
        }
    }

    /// Whether every task is placed and resources are used at least `min_utilization` on average.
    pub fn meets_thresholds(&self, min_utilization: f64) -> bool {
        self.unassigned == 0 && self.avg_utilization >= min_utilization
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Assignment, Placement, Problem, Resource, Task};

    fn sample() -> Schedule {
        let problem = Problem::new(
            4,
            vec![Resource::new("R1"), Resource::new("R2").with_capacity(2)],
            vec![
                Task::new("A").with_duration(2),
                Task::new("B").with_window(0, 2),
                Task::new("C").with_window(0, 1),
                Task::new("D"),
            ],
        );
        let assignment = Assignment::from_placements(vec![
            Some(Placement::new(0, 0)),
            Some(Placement::new(1, 1)),
            Some(Placement::new(1, 2)),
            None,
        ]);
        Schedule::with_assignment(problem, assignment).unwrap()
    }

    #[test]
    fn test_kpi_basic() {
        let kpi = ScheduleKpi::calculate(&sample());
        assert_eq!(kpi.assigned, 3);
        assert_eq!(kpi.unassigned, 1);
        assert_eq!(kpi.makespan, 3);
        assert!((kpi.utilization_by_resource["R1"] - 0.5).abs() < 1e-10);
        assert!((kpi.utilization_by_resource["R2"] - 0.25).abs() < 1e-10);
        assert!((kpi.avg_utilization - 0.375).abs() < 1e-10);
        assert!((kpi.window_rate - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_kpi_empty_schedule() {
        let problem = Problem::new(3, vec![Resource::new("R1")], vec![Task::new("A")]);
        let kpi = ScheduleKpi::calculate(&Schedule::new(problem));
        assert_eq!(kpi.assigned, 0);
        assert_eq!(kpi.makespan, 0);
        assert_eq!(kpi.avg_utilization, 0.0);
        assert_eq!(kpi.window_rate, 1.0);
    }

    #[test]
    fn test_overbooking_caps_utilization() {
        let problem = Problem::new(1, vec![Resource::new("R1")], vec![Task::new("A"), Task::new("B")]);
        let assignment =
            Assignment::from_placements(vec![Some(Placement::new(0, 0)), Some(Placement::new(0, 0))]);
        let schedule = Schedule::with_assignment(problem, assignment).unwrap();
        let kpi = ScheduleKpi::calculate(&schedule);
        assert_eq!(kpi.utilization_by_resource["R1"], 1.0);
    }

    #[test]
    fn test_thresholds() {
        let kpi = ScheduleKpi::calculate(&sample());
        assert!(!kpi.meets_thresholds(0.1));
    }
}
