//! Move generation.
//!
//! Proposes local edits to an assignment: reassign one task, swap two
//! tasks, or shuffle-kick a random subset. Every proposed move is
//! feasible with respect to capabilities, windows, the horizon, and slot
//! capacity, so applying it never fails on a schedule in the state the
//! generator saw.
//!
//! All randomness comes from the caller's RNG; the generator holds no state
//! beyond its settings.

use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;

use crate::models::{Move, Placement, Schedule};

/// Number of random pairs tried before a swap proposal gives up.
const SWAP_ATTEMPTS: usize = 8;

/// Proposes feasible moves for a schedule.
#[derive(Debug, Clone)]
pub struct MoveGenerator {
    /// Probability of trying a swap before a reassign.
    swap_rate: f64,
    /// Fraction of tasks a shuffle-kick re-places.
    kick_fraction: f64,
}

impl Default for MoveGenerator {
    fn default() -> Self {
        Self {
            swap_rate: 0.5,
            kick_fraction: 0.25,
        }
    }
}

impl MoveGenerator {
    /// Creates a generator with default rates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the probability of proposing a swap (clamped to `[0, 1]`).
    pub fn with_swap_rate(mut self, rate: f64) -> Self {
        self.swap_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Sets the fraction of tasks a shuffle-kick touches (clamped to `[0, 1]`).
    pub fn with_kick_fraction(mut self, fraction: f64) -> Self {
        self.kick_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    /// Proposes a reassign or swap. `None` when the random pick has no
    /// feasible alternative; the caller moves on to the next iteration.
    pub fn propose<R: Rng>(&self, schedule: &Schedule, rng: &mut R) -> Option<Move> {
        if schedule.problem().task_count() == 0 {
            return None;
        }
        if rng.random_bool(self.swap_rate) {
            if let Some(mv) = self.propose_swap(schedule, rng) {
                return Some(mv);
            }
        }
        self.propose_reassign(schedule, rng)
    }

    /// Moves a random task to a different feasible placement.
    pub fn propose_reassign<R: Rng>(&self, schedule: &Schedule, rng: &mut R) -> Option<Move> {
        let task = rng.random_range(0..schedule.problem().task_count());
        let current = schedule.placement(task);
        let options: Vec<Placement> = schedule
            .problem()
            .candidate_placements(task)
            .filter(|&p| Some(p) != current && schedule.fits(task, p))
            .collect();
        let to = *options.choose(rng)?;
        Some(Move::Reassign { task, to })
    }

    /// Exchanges the placements of two assigned tasks when both can run
    /// at the other's placement.
    pub fn propose_swap<R: Rng>(&self, schedule: &Schedule, rng: &mut R) -> Option<Move> {
        let assigned: Vec<usize> = schedule
            .assignment()
            .iter()
            .filter_map(|(t, p)| p.map(|_| t))
            .collect();
        if assigned.len() < 2 {
            return None;
        }

        for _ in 0..SWAP_ATTEMPTS {
            let picked: Vec<&usize> = assigned.choose_multiple(rng, 2).collect();
            let (a, b) = (*picked[0], *picked[1]);
            if self.swap_is_feasible(schedule, a, b) {
                return Some(Move::Swap { a, b });
            }
        }
        None
    }

    /// Re-places a random subset of tasks at random feasible placements.
    ///
    /// Tasks are drawn from the whole problem, so unassigned tasks may be
    /// placed too. A task without any free feasible placement keeps its
    /// current one. `None` when nothing could be moved.
    pub fn shuffle_kick<R: Rng>(&self, schedule: &Schedule, rng: &mut R) -> Option<Move> {
        let n = schedule.problem().task_count();
        if n == 0 {
            return None;
        }
        let size = ((n as f64 * self.kick_fraction).ceil() as usize).clamp(1, n);

        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(rng);
        order.truncate(size);

        // Plan on a scratch copy so later picks see earlier ones.
        let mut scratch = schedule.clone();
        let mut entries = Vec::with_capacity(order.len());
        for task in order {
            let options: Vec<Placement> = scratch
                .problem()
                .candidate_placements(task)
                .filter(|&p| scratch.fits(task, p))
                .collect();
            let Some(&to) = options.choose(rng) else {
                continue;
            };
            if scratch.apply(&Move::Reassign { task, to }).is_ok() {
                entries.push((task, to));
            }
        }

        (!entries.is_empty()).then_some(Move::Kick(entries))
    }

    fn swap_is_feasible(&self, schedule: &Schedule, a: usize, b: usize) -> bool {
        let (Some(pa), Some(pb)) = (schedule.placement(a), schedule.placement(b)) else {
            return false;
        };
        if pa == pb {
            return false;
        }
        let problem = schedule.problem();
        if !problem.admits(a, pb) || !problem.admits(b, pa) {
            return false;
        }
        let mut scratch = schedule.clone();
        scratch.apply(&Move::Swap { a, b }).is_ok()
    }
}
