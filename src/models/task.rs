//! Task model.
//!
//! A task is a unit of work that occupies one resource for a number of
//! consecutive time buckets. Tasks may require capabilities, be pinned
//! to a fixed time window, share a leader with other tasks, or prefer
//! a particular resource.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Half-open range of buckets `[start, end)` a task must run inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// First allowed bucket.
    pub start: u32,
    /// One past the last allowed bucket.
    pub end: u32,
}

impl TimeWindow {
    /// Creates a window `[start, end)`.
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Number of buckets in the window.
    #[inline]
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Whether the window contains no buckets.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a run of `duration` buckets beginning at `start` lies inside.
    #[inline]
    pub fn contains_run(&self, start: u32, duration: u32) -> bool {
        start >= self.start && start.saturating_add(duration) <= self.end
    }
}

/// A task to be placed on a resource.
///
/// Immutable once a schedule is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: String,
    /// Capabilities the hosting resource must offer.
    pub requires: BTreeSet<String>,
    /// Number of consecutive buckets the task occupies (default: 1).
    pub duration: u32,
    /// Fixed window the task must run inside. `None` = anywhere in the horizon.
    pub window: Option<TimeWindow>,
    /// Person or entity leading the task. Tasks with the same leader
    /// cannot share a bucket.
    pub leader: Option<String>,
    /// Resource the task would rather run on (soft).
    pub preferred: Option<String>,
}

impl Task {
    /// Creates a one-bucket task with no requirements.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            requires: BTreeSet::new(),
            duration: 1,
            window: None,
            leader: None,
            preferred: None,
        }
    }

    /// Adds a required capability.
    pub fn with_requirement(mut self, capability: impl Into<String>) -> Self {
        self.requires.insert(capability.into());
        self
    }

    /// Sets the duration in buckets.
    pub fn with_duration(mut self, duration: u32) -> Self {
        self.duration = duration;
        self
    }

    /// Pins the task to a window `[start, end)`.
    pub fn with_window(mut self, start: u32, end: u32) -> Self {
        self.window = Some(TimeWindow::new(start, end));
        self
    }

    /// Sets the leader.
    pub fn with_leader(mut self, leader: impl Into<String>) -> Self {
        self.leader = Some(leader.into());
        self
    }

    /// Sets the preferred resource.
    pub fn with_preferred(mut self, resource_id: impl Into<String>) -> Self {
        self.preferred = Some(resource_id.into());
        self
    }

    /// Whether the task has a fixed window.
    #[inline]
    pub fn is_windowed(&self) -> bool {
        self.window.is_some()
    }

    /// Range of start buckets that keep the task inside its window and the horizon.
    ///
    /// Empty when the task cannot fit at all.
    pub fn start_range(&self, horizon: u32) -> std::ops::Range<u32> {
        let (lo, hi) = match self.window {
            Some(w) => (w.start, w.end.min(horizon)),
            None => (0, horizon),
        };
        match hi.checked_sub(self.duration) {
            Some(last) if last >= lo => lo..last + 1,
            _ => 0..0,
        }
    }
}
