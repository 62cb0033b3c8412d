//! Schedule optimization.
//!
//! Greedy construction, aging-weighted local search with optional
//! shuffle-kicks, and the hooks for observing or interrupting a run.
//!
//! # Components
//!
//! | Module | Role |
//! |--------|------|
//! | `config` | [`OptimizerConfig`]: run options and budgets |
//! | `acceptance` | [`AgingAcceptance`]: worsening-move acceptance |
//! | `construct` | [`construct`]: greedy placement of unresolved tasks |
//! | `monitor` | [`SearchMonitor`] and built-in monitors |
//! | `engine` | [`Optimizer`]: the run loop |

mod acceptance;
mod config;
mod construct;
mod engine;
mod monitor;

pub use acceptance::AgingAcceptance;
pub use config::{
    OptimizerConfig, DEFAULT_MAX_ITERATIONS, DEFAULT_SEED, DEFAULT_SHUFFLE_THRESHOLD,
    DEFAULT_STALENESS_CEILING,
};
pub use construct::{construct, unresolved_tasks, ConstructionReport};
pub use engine::{OptimizationResult, Optimizer, SearchStats, TerminationReason};
pub use monitor::{
    CompositeMonitor, EngineState, InterruptMonitor, IterationLimitMonitor, NoOpMonitor,
    SearchCommand, SearchMonitor, SearchProgress, TraceMonitor,
};
