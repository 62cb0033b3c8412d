//! Optimizer engine: greedy construction followed by local search.
//!
//! # Algorithm
//!
//! 1. Copy the input schedule into a private working copy.
//! 2. If `greedily`, run greedy construction on the working copy.
//! 3. Loop until a termination condition holds:
//!    - propose a feasible move and apply it to the working copy;
//!    - keep it if cost does not rise, otherwise keep it with the aging
//!      acceptance probability, else undo it;
//!    - replace the best-found copy whenever the working copy beats it;
//!    - if `shuffling` and staleness reaches the threshold, shuffle-kick
//!      the working copy and reset staleness.
//! 4. Return the best-found copy.
//!
//! Termination: best cost 0, iteration budget, time budget, staleness
//! ceiling (only without shuffling), or a monitor asking to stop.
//!
//! Given the same schedule, config, and seed, a run is fully
//! reproducible unless a time limit cuts it short.

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use super::acceptance::AgingAcceptance;
use super::config::OptimizerConfig;
use super::construct::{construct, ConstructionReport};
use super::monitor::{EngineState, NoOpMonitor, SearchCommand, SearchMonitor, SearchProgress};
use crate::error::Result;
use crate::evaluator::{ConstraintEvaluator, Cost, CostBreakdown};
use crate::models::Schedule;
use crate::moves::MoveGenerator;

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// Best cost reached zero.
    Optimal,
    /// Iteration budget exhausted.
    IterationLimit,
    /// Time budget exhausted.
    TimeLimit,
    /// Staleness ceiling hit with shuffling disabled.
    Stagnation,
    /// A monitor requested termination.
    Interrupted,
}

/// Counters collected during a run.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchStats {
    /// Search iterations executed.
    pub iterations: u64,
    /// Moves kept (improving, sideways, or worsening).
    pub accepted: u64,
    /// Worsening moves kept by the aging criterion.
    pub worsening_accepted: u64,
    /// Worsening moves undone.
    pub rejected: u64,
    /// Iterations where no feasible move was found.
    pub infeasible_attempts: u64,
    /// Shuffle-kicks applied.
    pub kicks: u64,
    /// Times the best-found copy was replaced.
    pub improvements: u64,
    /// Cost before search (after construction, if any).
    pub initial_cost: Cost,
    /// Greedy construction outcome, when enabled.
    pub construction: Option<ConstructionReport>,
    /// Why the run stopped.
    pub reason: TerminationReason,
    /// Wall-clock duration.
    pub elapsed: Duration,
}

/// Result of one optimization run.
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    /// Best-found schedule.
    pub schedule: Schedule,
    /// Its cost.
    pub cost: Cost,
    /// Its per-constraint breakdown.
    pub breakdown: CostBreakdown,
    /// Run counters.
    pub stats: SearchStats,
}

/// Runs construction and local search over schedules.
///
/// # Example
///
/// ```
/// use u_timetable::models::{Problem, Resource, Schedule, Task};
/// use u_timetable::optimizer::{Optimizer, OptimizerConfig};
///
/// let problem = Problem::new(
///     2,
///     vec![Resource::new("R1"), Resource::new("R2")],
///     vec![
///         Task::new("A").with_leader("ann"),
///         Task::new("B").with_leader("ann"),
///     ],
/// );
/// let schedule = Schedule::new(problem);
///
/// let mut optimizer = Optimizer::new();
/// let result = optimizer
///     .run(&schedule, &OptimizerConfig::new(1.0, true, true))
///     .unwrap();
/// assert_eq!(result.cost, 0);
/// ```
#[derive(Debug, Clone)]
pub struct Optimizer {
    evaluator: ConstraintEvaluator,
    state: EngineState,
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Optimizer {
    /// Creates an idle optimizer with the default evaluator.
    pub fn new() -> Self {
        Self {
            evaluator: ConstraintEvaluator::new(),
            state: EngineState::Idle,
        }
    }

    /// Sets the evaluator.
    pub fn with_evaluator(mut self, evaluator: ConstraintEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// The evaluator in use.
    pub fn evaluator(&self) -> &ConstraintEvaluator {
        &self.evaluator
    }

    /// Current engine state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Optimizes a copy of `schedule`. The input is never modified.
    pub fn run(&mut self, schedule: &Schedule, config: &OptimizerConfig) -> Result<OptimizationResult> {
        self.run_with_monitor(schedule, config, &mut NoOpMonitor)
    }

    /// Like [`run`](Self::run), reporting to `monitor`.
    pub fn run_with_monitor(
        &mut self,
        schedule: &Schedule,
        config: &OptimizerConfig,
        monitor: &mut dyn SearchMonitor,
    ) -> Result<OptimizationResult> {
        config.validate()?;
        let started = Instant::now();
        let mut rng = StdRng::seed_from_u64(config.seed);
        let generator = MoveGenerator::new().with_kick_fraction(config.kick_fraction);
        let acceptance = AgingAcceptance::new(config.aging, config.lambda);

        self.state = EngineState::Idle;
        let mut working = schedule.clone();

        let construction = if config.greedily {
            self.transition(EngineState::Constructing, monitor);
            let report = construct(&mut working, &self.evaluator);
            debug!(
                released = report.released,
                placed = report.placed,
                unplaced = report.unplaced.len(),
                "greedy construction finished"
            );
            Some(report)
        } else {
            None
        };

        self.transition(EngineState::Searching, monitor);

        let mut current = self.evaluator.cost(&working);
        let mut best = working.clone();
        let mut best_cost = current;
        let initial_cost = current;

        let mut stats = SearchStats {
            iterations: 0,
            accepted: 0,
            worsening_accepted: 0,
            rejected: 0,
            infeasible_attempts: 0,
            kicks: 0,
            improvements: 0,
            initial_cost,
            construction,
            reason: TerminationReason::IterationLimit,
            elapsed: Duration::ZERO,
        };
        let mut staleness: u64 = 0;
        let mut epoch: u64 = 0;
        let mut interrupted = false;

        let reason = loop {
            if best_cost == 0 {
                break TerminationReason::Optimal;
            }
            if interrupted {
                break TerminationReason::Interrupted;
            }
            if stats.iterations >= config.max_iterations {
                break TerminationReason::IterationLimit;
            }
            if config.time_limit.is_some_and(|limit| started.elapsed() >= limit) {
                break TerminationReason::TimeLimit;
            }
            if !config.shuffling && staleness >= config.staleness_ceiling {
                break TerminationReason::Stagnation;
            }

            stats.iterations += 1;
            epoch += 1;

            match generator.propose(&working, &mut rng) {
                None => {
                    stats.infeasible_attempts += 1;
                    staleness += 1;
                }
                Some(mv) => match working.apply(&mv) {
                    Err(_) => {
                        stats.infeasible_attempts += 1;
                        staleness += 1;
                    }
                    Ok(delta) => {
                        let cost = self.evaluator.cost(&working);
                        let keep = cost <= current
                            || acceptance.accept(cost - current, staleness, epoch, &mut rng);
                        if keep {
                            stats.accepted += 1;
                            if cost > current {
                                stats.worsening_accepted += 1;
                            }
                            if cost < current {
                                staleness = 0;
                            } else {
                                staleness += 1;
                            }
                            current = cost;
                        } else {
                            working.revert(&delta);
                            stats.rejected += 1;
                            staleness += 1;
                        }
                    }
                },
            }

            if current < best_cost {
                best = working.clone();
                best_cost = current;
                stats.improvements += 1;
            }

            if config.shuffling && staleness >= config.shuffle_threshold {
                if let Some(kick) = generator.shuffle_kick(&working, &mut rng) {
                    if working.apply(&kick).is_ok() {
                        current = self.evaluator.cost(&working);
                        stats.kicks += 1;
                        debug!(iteration = stats.iterations, cost = current, "shuffle-kick");
                        if current < best_cost {
                            best = working.clone();
                            best_cost = current;
                            stats.improvements += 1;
                        }
                    }
                }
                staleness = 0;
                epoch = 0;
            }

            let progress = SearchProgress {
                iteration: stats.iterations,
                staleness,
                current_cost: current,
                best_cost,
                temperature: acceptance.temperature(staleness, epoch),
            };
            if monitor.on_iteration(&progress) == SearchCommand::Terminate {
                interrupted = true;
            }
        };

        stats.reason = reason;
        stats.elapsed = started.elapsed();
        self.transition(EngineState::Done, monitor);

        let breakdown = self.evaluator.evaluate(&best);
        info!(
            cost = best_cost,
            initial_cost,
            iterations = stats.iterations,
            kicks = stats.kicks,
            reason = ?reason,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "optimization finished"
        );

        Ok(OptimizationResult {
            schedule: best,
            cost: best_cost,
            breakdown,
            stats,
        })
    }

    fn transition(&mut self, state: EngineState, monitor: &mut dyn SearchMonitor) {
        debug!(from = ?self.state, to = ?state, "engine state");
        self.state = state;
        monitor.on_state(state);
    }
}
