//! Aging-weighted acceptance of worsening moves.
//!
//! A simulated-annealing-style criterion whose temperature grows with the
//! number of consecutive non-improving iterations instead of starting hot:
//!
//! $$ T = \text{aging} \cdot \ln(1 + \text{staleness}) \cdot \lambda^{\text{epoch}} $$
//!
//! A move that raises cost by `Δ > 0` is accepted with probability
//! `exp(−Δ / T)`. With `aging = 0`, or while the search is still
//! improving (`staleness = 0`), the search is a strict descent.
//! `epoch` counts iterations since the run started or since the last
//! shuffle-kick.
//!
//! # Reference
//! Kirkpatrick et al. (1983), "Optimization by Simulated Annealing"

use rand::Rng;

use crate::evaluator::Cost;

/// Temperatures at or below this are treated as frozen.
const FROZEN: f64 = 1e-12;

/// Acceptance rule driven by `aging`, staleness, and optional cooling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgingAcceptance {
    aging: f64,
    lambda: f64,
}

impl AgingAcceptance {
    /// Creates the rule. `lambda = 1` disables cooling.
    pub fn new(aging: f64, lambda: f64) -> Self {
        Self { aging, lambda }
    }

    /// Temperature after `staleness` stale iterations, `epoch` iterations into the current heat.
    pub fn temperature(&self, staleness: u64, epoch: u64) -> f64 {
        if self.aging <= 0.0 || staleness == 0 {
            return 0.0;
        }
        let cooling = if self.lambda < 1.0 {
            self.lambda.powf(epoch as f64)
        } else {
            1.0
        };
        self.aging * (1.0 + staleness as f64).ln() * cooling
    }

    /// Probability of accepting a cost increase of `delta`.
    pub fn probability(&self, delta: Cost, staleness: u64, epoch: u64) -> f64 {
        if delta == 0 {
            return 1.0;
        }
        let t = self.temperature(staleness, epoch);
        if t <= FROZEN {
            return 0.0;
        }
        let p = (-(delta as f64) / t).exp();
        if p.is_finite() {
            p.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Draws the accept/reject decision for a worsening move.
    ///
    /// Consumes randomness only when the probability is strictly between
    /// 0 and 1, keeping runs with `aging = 0` free of extra draws.
    pub fn accept<R: Rng>(&self, delta: Cost, staleness: u64, epoch: u64, rng: &mut R) -> bool {
        let p = self.probability(delta, staleness, epoch);
        if p <= 0.0 {
            false
        } else if p >= 1.0 {
            true
        } else {
            rng.random_bool(p)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_zero_aging_is_strict_descent() {
        let rule = AgingAcceptance::new(0.0, 1.0);
        assert_eq!(rule.probability(1, 1_000_000, 0), 0.0);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(!rule.accept(1, 1_000, 0, &mut rng));
    }

    #[test]
    fn test_fresh_search_rejects_worsening() {
        let rule = AgingAcceptance::new(50.0, 1.0);
        assert_eq!(rule.probability(10, 0, 0), 0.0);
    }

    #[test]
    fn test_zero_delta_always_accepted() {
        let rule = AgingAcceptance::new(0.0, 1.0);
        assert_eq!(rule.probability(0, 0, 0), 1.0);
    }

    #[test]
    fn test_monotonic_in_staleness() {
        let rule = AgingAcceptance::new(10.0, 1.0);
        let mut last = 0.0;
        for staleness in [1, 2, 5, 10, 100, 1_000, 10_000] {
            let p = rule.probability(100, staleness, 0);
            assert!(p >= last, "p={p} < {last} at staleness {staleness}");
            last = p;
        }
        assert!(last > 0.0);
    }

    #[test]
    fn test_monotonic_in_aging() {
        let mut last = 0.0;
        for aging in [0.0, 0.5, 1.0, 10.0, 100.0, 1_000.0] {
            let p = AgingAcceptance::new(aging, 1.0).probability(100, 50, 0);
            assert!(p >= last);
            last = p;
        }
    }

    #[test]
    fn test_cooling_lowers_temperature() {
        let rule = AgingAcceptance::new(10.0, 0.9);
        assert!(rule.temperature(20, 10) < rule.temperature(20, 0));
        assert_eq!(
            AgingAcceptance::new(10.0, 1.0).temperature(20, 10),
            AgingAcceptance::new(10.0, 1.0).temperature(20, 0)
        );
    }

    #[test]
    fn test_accept_is_reproducible() {
        let rule = AgingAcceptance::new(20.0, 1.0);
        let draw = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..64)
                .map(|i| rule.accept(100, 10 + i, 0, &mut rng))
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(3), draw(3));
    }
}
