//! Search observation and cancellation hooks.

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::evaluator::Cost;

/// Phases of an optimization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    /// No run started.
    Idle,
    /// Greedy construction in progress.
    Constructing,
    /// Local search in progress.
    Searching,
    /// Run finished; the best-found schedule is final.
    Done,
}

/// Instruction returned by a monitor after each iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchCommand {
    Continue,
    Terminate,
}

/// Snapshot handed to monitors after each search iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchProgress {
    /// Iterations completed.
    pub iteration: u64,
    /// Consecutive non-improving iterations.
    pub staleness: u64,
    /// Cost of the working copy.
    pub current_cost: Cost,
    /// Cost of the best-found copy.
    pub best_cost: Cost,
    /// Acceptance temperature at this iteration.
    pub temperature: f64,
}

/// Observes an optimization run.
///
/// Both hooks default to no-ops. Returning [`SearchCommand::Terminate`]
/// from `on_iteration` ends the run at the next loop check and commits
/// the best-found copy.
pub trait SearchMonitor: Debug {
    /// Called on every state transition.
    fn on_state(&mut self, _state: EngineState) {}

    /// Called after every search iteration.
    fn on_iteration(&mut self, _progress: &SearchProgress) -> SearchCommand {
        SearchCommand::Continue
    }
}

impl<M: SearchMonitor + ?Sized> SearchMonitor for &mut M {
    fn on_state(&mut self, state: EngineState) {
        (**self).on_state(state);
    }

    fn on_iteration(&mut self, progress: &SearchProgress) -> SearchCommand {
        (**self).on_iteration(progress)
    }
}

/// Monitor that observes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMonitor;

impl SearchMonitor for NoOpMonitor {}

/// Records every state transition and working-copy cost. Used in tests
/// and diagnostics.
#[derive(Debug, Clone, Default)]
pub struct TraceMonitor {
    pub states: Vec<EngineState>,
    pub costs: Vec<Cost>,
}

impl SearchMonitor for TraceMonitor {
    fn on_state(&mut self, state: EngineState) {
        self.states.push(state);
    }

    fn on_iteration(&mut self, progress: &SearchProgress) -> SearchCommand {
        self.costs.push(progress.current_cost);
        SearchCommand::Continue
    }
}

/// Terminates the run after a fixed number of iterations.
#[derive(Debug, Clone, Copy)]
pub struct IterationLimitMonitor {
    limit: u64,
}

impl IterationLimitMonitor {
    pub fn new(limit: u64) -> Self {
        Self { limit }
    }
}

impl SearchMonitor for IterationLimitMonitor {
    fn on_iteration(&mut self, progress: &SearchProgress) -> SearchCommand {
        if progress.iteration >= self.limit {
            SearchCommand::Terminate
        } else {
            SearchCommand::Continue
        }
    }
}

/// Terminates the run once a shared flag is raised.
#[derive(Debug, Clone, Copy)]
pub struct InterruptMonitor<'a> {
    stop_flag: &'a AtomicBool,
}

impl<'a> InterruptMonitor<'a> {
    pub fn new(stop_flag: &'a AtomicBool) -> Self {
        Self { stop_flag }
    }
}

impl SearchMonitor for InterruptMonitor<'_> {
    fn on_iteration(&mut self, _progress: &SearchProgress) -> SearchCommand {
        if self.stop_flag.load(Ordering::Relaxed) {
            SearchCommand::Terminate
        } else {
            SearchCommand::Continue
        }
    }
}

/// Forwards events to several monitors. Terminates when any of them asks to.
#[derive(Debug, Default)]
pub struct CompositeMonitor<'a> {
    monitors: Vec<Box<dyn SearchMonitor + 'a>>,
}

impl<'a> CompositeMonitor<'a> {
    pub fn new() -> Self {
        Self {
            monitors: Vec::new(),
        }
    }

    /// Adds a monitor.
    pub fn add_monitor<M: SearchMonitor + 'a>(&mut self, monitor: M) {
        self.monitors.push(Box::new(monitor));
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }
}

impl SearchMonitor for CompositeMonitor<'_> {
    fn on_state(&mut self, state: EngineState) {
        for m in &mut self.monitors {
            m.on_state(state);
        }
    }

    fn on_iteration(&mut self, progress: &SearchProgress) -> SearchCommand {
        let mut command = SearchCommand::Continue;
        for m in &mut self.monitors {
            if m.on_iteration(progress) == SearchCommand::Terminate {
                command = SearchCommand::Terminate;
            }
        }
        command
    }
}
