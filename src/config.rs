//! Tuning knobs of a [SkipList](crate::SkipList).

use crate::error::{Error, Result};
use crate::internal::utils::HEIGHT;

/// Configuration of a list. All fields are fixed for the lifetime of the list.
///
/// ```
/// use skipindex::Config;
///
/// let config = Config::default().max_level(12).level_probability(0.25);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Height of the head tower, and therefore the highest level a node can reach.
    pub max_level: usize,
    /// Chance that a node present on level `n` is also present on level `n + 1`.
    pub level_probability: f64,
    /// How often a write re-runs its search after a failed validation before it gives
    /// up with [Error::Contention].
    pub retry_budget: usize,
}

impl Config {
    pub const DEFAULT_MAX_LEVEL: usize = HEIGHT;

    pub const DEFAULT_LEVEL_PROBABILITY: f64 = 0.5;

    pub const DEFAULT_RETRY_BUDGET: usize = 64;

    pub fn max_level(mut self, max_level: usize) -> Self {
        self.max_level = max_level;
        self
    }

    pub fn level_probability(mut self, level_probability: f64) -> Self {
        self.level_probability = level_probability;
        self
    }

    pub fn retry_budget(mut self, retry_budget: usize) -> Self {
        self.retry_budget = retry_budget;
        self
    }

    /// Checks that every field lies within the range the list can work with.
    pub fn validate(&self) -> Result<()> {
        if self.max_level == 0 || self.max_level > HEIGHT {
            return Err(Error::InvalidMaxLevel {
                max_level: self.max_level,
                limit: HEIGHT,
            });
        }

        // `!(p > 0.0 && p < 1.0)` also rejects NaN.
        if !(self.level_probability > 0.0 && self.level_probability < 1.0) {
            return Err(Error::InvalidProbability(self.level_probability));
        }

        if self.retry_budget == 0 {
            return Err(Error::ZeroRetryBudget);
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_level: Self::DEFAULT_MAX_LEVEL,
            level_probability: Self::DEFAULT_LEVEL_PROBABILITY,
            retry_budget: Self::DEFAULT_RETRY_BUDGET,
        }
    }
}

#[cfg(test)]
mod config_test {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = Config::default();
        assert_eq!(config.max_level, 32);
        assert_eq!(config.level_probability, 0.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_levels() {
        assert_eq!(
            Config::default().max_level(0).validate(),
            Err(Error::InvalidMaxLevel {
                max_level: 0,
                limit: HEIGHT
            })
        );
        assert!(Config::default().max_level(HEIGHT + 1).validate().is_err());
        assert!(Config::default().max_level(1).validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_probability() {
        for p in [0.0, 1.0, -0.5, 2.0, f64::NAN] {
            assert!(matches!(
                Config::default().level_probability(p).validate(),
                Err(Error::InvalidProbability(_))
            ));
        }
    }

    #[test]
    fn test_rejects_zero_budget() {
        assert_eq!(
            Config::default().retry_budget(0).validate(),
            Err(Error::ZeroRetryBudget)
        );
    }
}
