//! Optimizer configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Default RNG seed.
pub const DEFAULT_SEED: u64 = 0x5EED;
/// Default iteration budget.
pub const DEFAULT_MAX_ITERATIONS: u64 = 100_000;
/// Staleness at which a shuffle-kick fires (when enabled).
pub const DEFAULT_SHUFFLE_THRESHOLD: u64 = 500;
/// Staleness at which the search gives up when shuffling is disabled.
pub const DEFAULT_STALENESS_CEILING: u64 = 5_000;

/// Settings for one optimization run.
///
/// `aging`, `shuffling`, and `greedily` are the options exposed to the
/// command surface; the rest bound and tune the search.
///
/// # Example
///
/// ```
/// use u_timetable::optimizer::OptimizerConfig;
///
/// let config = OptimizerConfig::new(5.0, true, true)
///     .with_seed(42)
///     .with_max_iterations(10_000);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// How quickly worsening moves become acceptable as the search stalls.
    /// `0` = never accept a worsening move.
    pub aging: f64,
    /// Enable shuffle-kicks on stagnation.
    pub shuffling: bool,
    /// Run greedy construction before local search.
    pub greedily: bool,
    /// Seed of the run's random stream.
    pub seed: u64,
    /// Iteration budget.
    pub max_iterations: u64,
    /// Wall-clock budget. `None` = unlimited.
    pub time_limit: Option<Duration>,
    /// Per-iteration cooling factor in `(0, 1]`; `1` disables cooling.
    pub lambda: f64,
    /// Staleness that triggers a shuffle-kick.
    pub shuffle_threshold: u64,
    /// Staleness that ends a run without shuffling.
    pub staleness_ceiling: u64,
    /// Fraction of tasks one shuffle-kick re-places, in `(0, 1]`.
    pub kick_fraction: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            aging: 0.0,
            shuffling: false,
            greedily: false,
            seed: DEFAULT_SEED,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            time_limit: None,
            lambda: 1.0,
            shuffle_threshold: DEFAULT_SHUFFLE_THRESHOLD,
            staleness_ceiling: DEFAULT_STALENESS_CEILING,
            kick_fraction: 0.25,
        }
    }
}

impl OptimizerConfig {
    /// Creates a config from the three command-surface options.
    pub fn new(aging: f64, shuffling: bool, greedily: bool) -> Self {
        Self {
            aging,
            shuffling,
            greedily,
            ..Self::default()
        }
    }

    /// Sets the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the iteration budget.
    pub fn with_max_iterations(mut self, max_iterations: u64) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the wall-clock budget.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Sets the cooling factor.
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.lambda = lambda;
        self
    }

    /// Sets the shuffle-kick trigger.
    pub fn with_shuffle_threshold(mut self, threshold: u64) -> Self {
        self.shuffle_threshold = threshold;
        self
    }

    /// Sets the stagnation ceiling.
    pub fn with_staleness_ceiling(mut self, ceiling: u64) -> Self {
        self.staleness_ceiling = ceiling;
        self
    }

    /// Sets the shuffle-kick size.
    pub fn with_kick_fraction(mut self, fraction: f64) -> Self {
        self.kick_fraction = fraction;
        self
    }

    /// Checks that every setting is in range.
    pub fn validate(&self) -> Result<()> {
        if !self.aging.is_finite() || self.aging < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "aging must be a finite number >= 0, got {}",
                self.aging
            )));
        }
        if !(self.lambda > 0.0 && self.lambda <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "lambda must be in (0, 1], got {}",
                self.lambda
            )));
        }
        if !(self.kick_fraction > 0.0 && self.kick_fraction <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "kick_fraction must be in (0, 1], got {}",
                self.kick_fraction
            )));
        }
        if self.shuffle_threshold == 0 || self.staleness_ceiling == 0 {
            return Err(Error::InvalidConfig(
                "shuffle_threshold and staleness_ceiling must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let c = OptimizerConfig::default();
        assert_eq!(c.aging, 0.0);
        assert!(!c.shuffling);
        assert!(!c.greedily);
        assert_eq!(c.seed, DEFAULT_SEED);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let c = OptimizerConfig::new(3.0, true, false)
            .with_seed(9)
            .with_max_iterations(50)
            .with_time_limit(Duration::from_secs(2))
            .with_lambda(0.99)
            .with_shuffle_threshold(10)
            .with_staleness_ceiling(20)
            .with_kick_fraction(0.5);
        assert_eq!(c.seed, 9);
        assert_eq!(c.max_iterations, 50);
        assert_eq!(c.time_limit, Some(Duration::from_secs(2)));
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(OptimizerConfig::new(-1.0, false, false).validate().is_err());
        assert!(OptimizerConfig::new(f64::NAN, false, false).validate().is_err());
        assert!(OptimizerConfig::default().with_lambda(0.0).validate().is_err());
        assert!(OptimizerConfig::default().with_lambda(1.5).validate().is_err());
        assert!(OptimizerConfig::default()
            .with_kick_fraction(0.0)
            .validate()
            .is_err());
        assert!(OptimizerConfig::default()
            .with_shuffle_threshold(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_config_from_partial_json() {
        let c: OptimizerConfig =
            serde_json::from_str(r#"{"aging": 2.5, "greedily": true}"#).unwrap();
        assert_eq!(c.aging, 2.5);
        assert!(c.greedily);
        assert!(!c.shuffling);
        assert_eq!(c.max_iterations, DEFAULT_MAX_ITERATIONS);
    }
}
