//! Level generation for new nodes.
//!
//! Level 1 holds every node, and each node reaches the next level with probability
//! `p`, so the level of a node follows a geometric distribution truncated at the
//! maximum level of the list:
//!
//! `P(level = k) = p^(k - 1) * (1 - p)` for `k < max_level`.
//!
//! With `p = 0.5` this gives an expected level of 2 and an expected `O(log n)`
//! number of occupied levels for `n` entries.

use rand::Rng;

/// Upon the insertion of a new node, its tower height is determined by a
/// `LevelGenerator`.
///
/// Generators are shared between all threads inserting into a list, hence the
/// `Send + Sync` bound.
pub trait LevelGenerator: Send + Sync {
    /// The highest level this generator will ever hand out.
    fn max_level(&self) -> usize;

    /// Draws a level in `[1, self.max_level()]`.
    fn next_level(&self) -> usize;
}

/// Runs the coin flip loop against `rng`: start at 1 and keep climbing while a flip
/// with success probability `p` succeeds and the cap has not been reached.
///
/// # Panics
///
/// `p` must be within `[0, 1]`.
pub fn draw_level<R>(rng: &mut R, max_level: usize, p: f64) -> usize
where
    R: Rng + ?Sized,
{
    assert!((0.0..=1.0).contains(&p), "p must be in [0, 1], got {}", p);

    let mut level = 1;

    while level < max_level && rng.gen_bool(p) {
        level += 1;
    }

    level
}

/// The default generator. Every draw uses the random source local to the calling
/// thread, so concurrent inserts share no mutable state.
#[derive(Debug, Clone)]
pub struct Geometric {
    max_level: usize,
    p: f64,
}

impl Geometric {
    /// # Panics
    ///
    /// `max_level` must be non-zero and `p` must be within `(0, 1)`.
    pub fn new(max_level: usize, p: f64) -> Self {
        assert!(max_level > 0, "max_level must be non-zero");
        assert!(p > 0.0 && p < 1.0, "p must be in (0, 1)");

        Geometric { max_level, p }
    }
}

impl LevelGenerator for Geometric {
    fn max_level(&self) -> usize {
        self.max_level
    }

    fn next_level(&self) -> usize {
        draw_level(&mut rand::thread_rng(), self.max_level, self.p)
    }
}

#[cfg(test)]
mod level_test {
    use super::*;
    use rand::{rngs::mock::StepRng, rngs::StdRng, SeedableRng};

    #[test]
    fn test_always_failing_flips() {
        let mut rng = StepRng::new(u64::MAX, 0);
        assert_eq!(draw_level(&mut rng, 32, 0.5), 1);
    }

    #[test]
    fn test_always_succeeding_flips_hit_the_cap() {
        let mut rng = StepRng::new(0, 0);
        assert_eq!(draw_level(&mut rng, 32, 0.5), 32);
        assert_eq!(draw_level(&mut rng, 4, 0.5), 4);
        assert_eq!(draw_level(&mut rng, 1, 0.5), 1);
    }

    #[test]
    fn test_seeded_draws_are_reproducible() {
        let draws = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..64)
                .map(|_| draw_level(&mut rng, 16, 0.5))
                .collect::<Vec<_>>()
        };

        assert_eq!(draws(7), draws(7));
        assert!(draws(7).iter().all(|&l| (1..=16).contains(&l)));
    }

    #[test]
    fn test_distribution() {
        let mut rng = StdRng::seed_from_u64(0xdead_beef);
        let draws = 100_000;
        let mut counts = [0usize; 33];

        for _ in 0..draws {
            counts[draw_level(&mut rng, 32, 0.5)] += 1;
        }

        // P(1) = 0.5, P(2) = 0.25, P(3) = 0.125
        let share = |level: usize| counts[level] as f64 / draws as f64;
        assert!((share(1) - 0.5).abs() < 0.02);
        assert!((share(2) - 0.25).abs() < 0.02);
        assert!((share(3) - 0.125).abs() < 0.02);
        assert_eq!(counts[0], 0);
    }

    #[test]
    fn test_low_probability_stays_low() {
        let mut rng = StdRng::seed_from_u64(42);
        let total: usize = (0..10_000).map(|_| draw_level(&mut rng, 32, 0.25)).sum();
        let mean = total as f64 / 10_000.0;

        // 1 / (1 - 0.25)
        assert!((mean - 4.0 / 3.0).abs() < 0.05, "mean {mean}");
    }

    #[test]
    fn test_geometric_generator() {
        let generator = Geometric::new(4, 0.5);
        assert_eq!(generator.max_level(), 4);
        assert!((0..1_000)
            .map(|_| generator.next_level())
            .all(|l| (1..=4).contains(&l)));
    }

    #[test]
    #[should_panic]
    fn test_draw_rejects_bad_probability() {
        let mut rng = StdRng::seed_from_u64(1);
        let _ = draw_level(&mut rng, 8, 1.5);
    }

    #[test]
    #[should_panic]
    fn test_geometric_rejects_zero_levels() {
        let _ = Geometric::new(0, 0.5);
    }
}
