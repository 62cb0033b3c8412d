//! Command surface over the process-wide session.
//!
//! Thin entry points for a UI or dispatch layer. Each call goes to
//! [`Session::global`]; see [`Session`] for semantics and the busy policy.

use crate::error::Result;
use crate::evaluator::Cost;
use crate::session::Session;

/// Loads a schedule file, replacing the current schedule.
pub fn select_file(file: &[u8]) -> Result<()> {
    Session::global().select_file(file)
}

/// Optimizes the current schedule and returns the best-found cost.
pub fn optimize_schedule(aging: f64, shuffling: bool, greedily: bool) -> Result<Cost> {
    Session::global().optimize_schedule(aging, shuffling, greedily)
}

/// Serializes the best available schedule.
pub fn download_file() -> Result<Vec<u8>> {
    Session::global().download_file()
}
