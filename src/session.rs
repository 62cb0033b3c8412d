//! Process-wide schedule session.
//!
//! A [`Session`] holds at most one loaded schedule and at most one
//! optimization result. Lifecycle:
//!
//! ```text
//! empty ──select_file──▶ loaded ──optimize──▶ optimized ──optimize──▶ …
//!                          ▲                      │
//!                          └─────select_file──────┘
//! ```
//!
//! # Concurrency
//!
//! One run at a time. `select_file` and the `optimize*` methods claim an
//! in-flight flag for their whole duration; a second claim fails with
//! [`Error::Busy`] instead of waiting. The run works on a private copy of
//! the schedule, so the state lock is only held to read or commit.
//! `download_file` never claims the flag and always sees the last
//! committed state.
//!
//! Failed operations leave the session as it was.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use tracing::info;

use crate::codec;
use crate::error::{Error, Result};
use crate::evaluator::{ConstraintEvaluator, Cost, CostBreakdown};
use crate::kpi::ScheduleKpi;
use crate::models::Schedule;
use crate::optimizer::{
    CompositeMonitor, InterruptMonitor, NoOpMonitor, OptimizationResult, Optimizer,
    OptimizerConfig, SearchMonitor,
};

#[derive(Debug, Default)]
struct SessionState {
    loaded: Option<Schedule>,
    optimized: Option<OptimizationResult>,
}

impl SessionState {
    /// The best available schedule: optimized if a run finished, else as loaded.
    fn current(&self) -> Option<&Schedule> {
        self.optimized
            .as_ref()
            .map(|r| &r.schedule)
            .or(self.loaded.as_ref())
    }
}

/// Releases the in-flight flag when dropped.
struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Shared holder of the current schedule and last optimization result.
#[derive(Debug, Default)]
pub struct Session {
    state: Mutex<SessionState>,
    running: AtomicBool,
    stop: AtomicBool,
    defaults: OptimizerConfig,
}

impl Session {
    /// Creates an empty session with default optimizer settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the settings `optimize_schedule` starts from (seed, budgets).
    pub fn with_defaults(mut self, defaults: OptimizerConfig) -> Self {
        self.defaults = defaults;
        self
    }

    /// The process-wide session.
    pub fn global() -> &'static Session {
        static GLOBAL: OnceLock<Session> = OnceLock::new();
        GLOBAL.get_or_init(Session::new)
    }

    /// Whether a load or run is in flight.
    pub fn is_busy(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Asks the in-flight run to stop at its next iteration. The run
    /// commits its best-found schedule as usual.
    ///
    /// Only affects a run already in flight: every run clears the request
    /// when it starts, so a `cancel` issued while the session is idle is
    /// dropped rather than carried over to the next run.
    pub fn cancel(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Parses `bytes` and makes the result the current schedule,
    /// discarding any previous optimization result.
    pub fn select_file(&self, bytes: &[u8]) -> Result<()> {
        let _guard = self.claim()?;
        let schedule = codec::parse(bytes)?;
        info!(
            tasks = schedule.problem().task_count(),
            resources = schedule.problem().resource_count(),
            horizon = schedule.problem().horizon(),
            "schedule loaded"
        );
        let mut state = self.lock();
        state.loaded = Some(schedule);
        state.optimized = None;
        Ok(())
    }

    /// Runs one optimization pass with the session defaults and the
    /// three command-surface options. Returns the best-found cost.
    pub fn optimize_schedule(&self, aging: f64, shuffling: bool, greedily: bool) -> Result<Cost> {
        let config = OptimizerConfig {
            aging,
            shuffling,
            greedily,
            ..self.defaults.clone()
        };
        self.optimize(&config)
    }

    /// Runs one optimization pass with explicit settings.
    pub fn optimize(&self, config: &OptimizerConfig) -> Result<Cost> {
        self.optimize_with(config, &mut NoOpMonitor)
    }

    /// Runs one optimization pass, reporting to `monitor`.
    ///
    /// The pass starts from the current schedule and, on success,
    /// replaces it with the best-found one.
    pub fn optimize_with(
        &self,
        config: &OptimizerConfig,
        monitor: &mut dyn SearchMonitor,
    ) -> Result<Cost> {
        let _guard = self.claim()?;
        let schedule = self
            .lock()
            .current()
            .cloned()
            .ok_or(Error::NoScheduleLoaded)?;

        let mut monitors = CompositeMonitor::new();
        monitors.add_monitor(monitor);
        monitors.add_monitor(InterruptMonitor::new(&self.stop));

        let result = Optimizer::new().run_with_monitor(&schedule, config, &mut monitors)?;
        let cost = result.cost;
        info!(
            cost,
            reason = ?result.stats.reason,
            iterations = result.stats.iterations,
            "optimization committed"
        );
        self.lock().optimized = Some(result);
        Ok(cost)
    }

    /// Serializes the best available schedule.
    pub fn download_file(&self) -> Result<Vec<u8>> {
        let schedule = self
            .lock()
            .current()
            .cloned()
            .ok_or(Error::NoScheduleLoaded)?;
        let bytes = codec::serialize(&schedule)?;
        info!(bytes = bytes.len(), "schedule exported");
        Ok(bytes)
    }

    /// A copy of the best available schedule.
    pub fn schedule(&self) -> Result<Schedule> {
        self.lock().current().cloned().ok_or(Error::NoScheduleLoaded)
    }

    /// The last committed optimization result, if any since the last load.
    pub fn last_result(&self) -> Option<OptimizationResult> {
        self.lock().optimized.clone()
    }

    /// Per-constraint cost of the best available schedule.
    pub fn breakdown(&self) -> Result<CostBreakdown> {
        let schedule = self.schedule()?;
        Ok(ConstraintEvaluator::new().evaluate(&schedule))
    }

    /// KPIs of the best available schedule.
    pub fn kpi(&self) -> Result<ScheduleKpi> {
        let schedule = self.schedule()?;
        Ok(ScheduleKpi::calculate(&schedule))
    }

    fn claim(&self) -> Result<RunGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| Error::Busy)?;
        self.stop.store(false, Ordering::Relaxed);
        Ok(RunGuard {
            flag: &self.running,
        })
    }

    // A panic inside a run never leaves the state half-written, so a
    // poisoned lock still holds consistent data.
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::ConstraintKind;
    use crate::optimizer::{SearchCommand, SearchProgress, TerminationReason};
    use std::sync::mpsc::{channel, Receiver, Sender};

    const CLASHING: &str = r#"
horizon = 2

[[resources]]
id = "R1"

[[resources]]
id = "R2"

[[tasks]]
id = "A"
leader = "ann"
slot = { resource = "R1", start = 0 }

[[tasks]]
id = "B"
leader = "ann"
slot = { resource = "R2", start = 0 }
"#;

    const INFEASIBLE: &str = r#"
horizon = 3

[[resources]]
id = "R1"
capabilities = ["lab"]

[[resources]]
id = "R2"

[[tasks]]
id = "A"
requires = ["lab"]

[[tasks]]
id = "B"

[[tasks]]
id = "X"
requires = ["pool"]
"#;

    /// Pauses the run at its first iteration until released.
    #[derive(Debug)]
    struct Gate {
        started: Sender<()>,
        release: Receiver<()>,
        opened: bool,
    }

    impl SearchMonitor for Gate {
        fn on_iteration(&mut self, _progress: &SearchProgress) -> SearchCommand {
            if !self.opened {
                self.opened = true;
                let _ = self.started.send(());
                let _ = self.release.recv();
            }
            SearchCommand::Continue
        }
    }

    #[test]
    fn test_operations_need_a_schedule() {
        let session = Session::new();
        assert!(matches!(session.download_file(), Err(Error::NoScheduleLoaded)));
        assert!(matches!(
            session.optimize_schedule(0.0, false, false),
            Err(Error::NoScheduleLoaded)
        ));
        assert!(!session.is_busy());
    }

    #[test]
    fn test_select_optimize_download() {
        let session = Session::new();
        session.select_file(CLASHING.as_bytes()).unwrap();
        assert_eq!(session.breakdown().unwrap().units_of(ConstraintKind::LeaderClash), 1);

        let cost = session.optimize_schedule(1.0, true, true).unwrap();
        assert_eq!(cost, 0);

        let exported = session.download_file().unwrap();
        let reloaded = codec::parse(&exported).unwrap();
        assert_eq!(ConstraintEvaluator::new().cost(&reloaded), 0);
    }

    #[test]
    fn test_download_before_optimize_returns_loaded() {
        let session = Session::new();
        session.select_file(CLASHING.as_bytes()).unwrap();
        let loaded = codec::parse(CLASHING.as_bytes()).unwrap();
        assert_eq!(codec::parse(&session.download_file().unwrap()).unwrap(), loaded);
        assert!(session.last_result().is_none());
    }

    #[test]
    fn test_failed_select_keeps_prior_state() {
        let session = Session::new();
        session.select_file(CLASHING.as_bytes()).unwrap();
        session.optimize_schedule(1.0, true, true).unwrap();
        let before = session.download_file().unwrap();

        assert!(matches!(session.select_file(b"horizon = ["), Err(Error::Format(_))));
        assert_eq!(session.download_file().unwrap(), before);
        assert!(session.last_result().is_some());
    }

    #[test]
    fn test_select_clears_result() {
        let session = Session::new();
        session.select_file(CLASHING.as_bytes()).unwrap();
        session.optimize_schedule(1.0, true, true).unwrap();
        session.select_file(INFEASIBLE.as_bytes()).unwrap();
        assert!(session.last_result().is_none());
        assert_eq!(session.schedule().unwrap().assignment().assigned_count(), 0);
    }

    #[test]
    fn test_second_run_after_zero_stays_zero() {
        let session = Session::new();
        session.select_file(CLASHING.as_bytes()).unwrap();
        assert_eq!(session.optimize_schedule(2.0, true, true).unwrap(), 0);
        assert_eq!(session.optimize_schedule(0.0, false, false).unwrap(), 0);
        assert_eq!(
            session.last_result().unwrap().stats.reason,
            TerminationReason::Optimal
        );
    }

    #[test]
    fn test_infeasible_task_reported_as_cost() {
        let session = Session::new()
            .with_defaults(OptimizerConfig::default().with_max_iterations(1_000));
        session.select_file(INFEASIBLE.as_bytes()).unwrap();
        let cost = session.optimize_schedule(1.0, true, true).unwrap();
        assert!(cost > 0);
        let breakdown = session.breakdown().unwrap();
        assert_eq!(breakdown.penalty_for("X"), cost);
        assert_eq!(session.kpi().unwrap().unassigned, 1);
    }

    #[test]
    fn test_invalid_config_leaves_state() {
        let session = Session::new();
        session.select_file(CLASHING.as_bytes()).unwrap();
        let err = session.optimize_schedule(-1.0, false, false).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        assert!(session.last_result().is_none());
        assert!(!session.is_busy());
    }

    #[test]
    fn test_oversized_file_keeps_prior_state() {
        let session = Session::new();
        session.select_file(CLASHING.as_bytes()).unwrap();
        let before = session.download_file().unwrap();

        let huge = "horizon = 4000000000\n[[resources]]\nid = \"R1\"\n[[resources]]\nid = \"R2\"\n";
        assert!(matches!(session.select_file(huge.as_bytes()), Err(Error::Format(_))));
        assert_eq!(session.download_file().unwrap(), before);
        assert!(!session.is_busy());
    }

    #[test]
    fn test_cancel_while_idle_is_dropped() {
        let session = Session::new()
            .with_defaults(OptimizerConfig::default().with_max_iterations(200));
        session.select_file(INFEASIBLE.as_bytes()).unwrap();
        session.cancel();
        session.optimize_schedule(1.0, true, true).unwrap();
        let stats = session.last_result().unwrap().stats;
        assert_eq!(stats.reason, TerminationReason::IterationLimit);
        assert_eq!(stats.iterations, 200);
    }

    #[test]
    fn test_busy_while_running() {
        let session = Session::new();
        session.select_file(INFEASIBLE.as_bytes()).unwrap();
        let before = session.download_file().unwrap();

        let (started_tx, started_rx) = channel();
        let (release_tx, release_rx) = channel();
        let config = OptimizerConfig::new(1.0, true, false).with_max_iterations(50);

        std::thread::scope(|s| {
            let run = s.spawn(|| {
                let mut gate = Gate {
                    started: started_tx,
                    release: release_rx,
                    opened: false,
                };
                session.optimize_with(&config, &mut gate)
            });

            started_rx.recv().unwrap();
            assert!(session.is_busy());
            assert!(matches!(session.select_file(CLASHING.as_bytes()), Err(Error::Busy)));
            assert!(matches!(
                session.optimize_schedule(0.0, false, false),
                Err(Error::Busy)
            ));
            // Reads see the last committed state while the run is in flight.
            assert_eq!(session.download_file().unwrap(), before);

            release_tx.send(()).unwrap();
            assert!(run.join().unwrap().is_ok());
        });

        assert!(!session.is_busy());
        session.select_file(CLASHING.as_bytes()).unwrap();
    }

    #[test]
    fn test_cancel_commits_best_found() {
        let session = Session::new();
        session.select_file(INFEASIBLE.as_bytes()).unwrap();

        let (started_tx, started_rx) = channel();
        let (release_tx, release_rx) = channel();
        let config = OptimizerConfig::new(1.0, true, false);

        std::thread::scope(|s| {
            let run = s.spawn(|| {
                let mut gate = Gate {
                    started: started_tx,
                    release: release_rx,
                    opened: false,
                };
                session.optimize_with(&config, &mut gate)
            });
            started_rx.recv().unwrap();
            session.cancel();
            release_tx.send(()).unwrap();
            assert!(run.join().unwrap().is_ok());
        });

        let result = session.last_result().unwrap();
        assert_eq!(result.stats.reason, TerminationReason::Interrupted);
        assert_eq!(result.stats.iterations, 1);
    }
}
