//! Errors surfaced by the index.

use thiserror::Error;

/// Everything that can cross the public boundary of a [SkipList](crate::SkipList).
///
/// A missing key is not an error; lookups and removals report it as `None`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The optimistic validation of a write kept failing because other writers were
    /// restructuring the same predecessors.
    #[error("write abandoned after {attempts} attempts: predecessors kept changing under contention")]
    Contention { attempts: usize },

    /// The configured maximum level does not fit into a node tower.
    #[error("max level must lie within 1..={limit}, got {max_level}")]
    InvalidMaxLevel { max_level: usize, limit: usize },

    /// The level probability has to be a proper probability excluding both ends.
    #[error("level probability must lie strictly between 0 and 1, got {0}")]
    InvalidProbability(f64),

    /// A write has to be attempted at least once.
    #[error("retry budget must be at least 1")]
    ZeroRetryBudget,
}

/// Convenient Result type alias.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod error_test {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            Error::Contention { attempts: 3 }.to_string(),
            "write abandoned after 3 attempts: predecessors kept changing under contention"
        );
        assert_eq!(
            Error::InvalidMaxLevel {
                max_level: 40,
                limit: 32
            }
            .to_string(),
            "max level must lie within 1..=32, got 40"
        );
    }
}
