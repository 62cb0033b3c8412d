//! Resource model.
//!
//! Resources are the entities that host tasks: rooms, machines, workers,
//! vehicles. Each resource offers a set of capabilities and can hold a
//! fixed number of tasks in any single time bucket.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A resource that tasks can be placed on.
///
/// Immutable once a schedule is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Unique resource identifier.
    pub id: String,
    /// Capabilities offered (e.g., "projector", "lab", "forklift").
    pub capabilities: BTreeSet<String>,
    /// Number of tasks one slot of this resource can host simultaneously (default: 1).
    pub capacity: u32,
}

impl Resource {
    /// Creates a resource with capacity 1 and no capabilities.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            capabilities: BTreeSet::new(),
            capacity: 1,
        }
    }

    /// Adds a capability.
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.insert(capability.into());
        self
    }

    /// Sets the per-slot capacity.
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    /// Whether this resource offers a given capability.
    pub fn has_capability(&self, name: &str) -> bool {
        self.capabilities.contains(name)
    }

    /// Whether this resource offers every capability in `required`.
    pub fn covers(&self, required: &BTreeSet<String>) -> bool {
        required.is_subset(&self.capabilities)
    }
}
