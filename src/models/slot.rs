//! Slots and placements.
//!
//! A slot is one time bucket on one resource. A placement is where a task
//! starts; together with the task's duration it covers a run of slots.

use serde::{Deserialize, Serialize};

/// One bucket of capacity on one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Slot {
    /// Resource index.
    pub resource: usize,
    /// Time bucket.
    pub bucket: u32,
}

/// The resource and start bucket a task is assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Placement {
    /// Resource index.
    pub resource: usize,
    /// First occupied bucket.
    pub start: u32,
}

impl Placement {
    /// Creates a placement.
    pub fn new(resource: usize, start: u32) -> Self {
        Self { resource, start }
    }

    /// One past the last occupied bucket for a task of `duration`.
    #[inline]
    pub fn end(&self, duration: u32) -> u32 {
        self.start.saturating_add(duration)
    }

    /// Slots covered by a task of `duration` placed here.
    pub fn slots(self, duration: u32) -> impl Iterator<Item = Slot> {
        let resource = self.resource;
        (self.start..self.end(duration)).map(move |bucket| Slot { resource, bucket })
    }

    /// Whether the run covers `bucket`.
    #[inline]
    pub fn covers(&self, duration: u32, bucket: u32) -> bool {
        bucket >= self.start && bucket < self.end(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placement_slots() {
        let p = Placement::new(1, 3);
        let slots: Vec<Slot> = p.slots(2).collect();
        assert_eq!(
            slots,
            vec![
                Slot { resource: 1, bucket: 3 },
                Slot { resource: 1, bucket: 4 },
            ]
        );
        assert_eq!(p.end(2), 5);
    }

    #[test]
    fn test_placement_covers() {
        let p = Placement::new(0, 2);
        assert!(!p.covers(3, 1));
        assert!(p.covers(3, 2));
        assert!(p.covers(3, 4));
        assert!(!p.covers(3, 5));
    }
}
