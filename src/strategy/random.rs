use rand::rngs::StdRng;
use rand::{thread_rng, Rng, SeedableRng};

/// Source of start offsets for the planner.
///
/// Closures `FnMut(usize) -> usize` implement this, which is the usual way to
/// pin offsets in tests.
pub trait RandomIndex {
    /// Returns an index in `[0, max)`. `max` is never 0.
    fn random_index(&mut self, max: usize) -> usize;
}

impl<F> RandomIndex for F
where
    F: FnMut(usize) -> usize,
{
    fn random_index(&mut self, max: usize) -> usize {
        self(max)
    }
}

/// Draws from the thread-local generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomIndex for ThreadRandom {
    fn random_index(&mut self, max: usize) -> usize {
        if max <= 1 {
            return 0;
        }
        thread_rng().gen_range(0..max)
    }
}

/// Reproducible draws from a seed.
#[derive(Debug, Clone)]
pub struct SeededRandom(StdRng);

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl RandomIndex for SeededRandom {
    fn random_index(&mut self, max: usize) -> usize {
        if max <= 1 {
            return 0;
        }
        self.0.gen_range(0..max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_stay_in_range() {
        let mut rng = ThreadRandom;
        assert_eq!(rng.random_index(1), 0);
        for _ in 0..100 {
            assert!(rng.random_index(5) < 5);
        }
    }

    #[test]
    fn seeded_draws_repeat() {
        let a = (0..20)
            .scan(SeededRandom::new(7), |r, _| Some(r.random_index(10)))
            .collect::<Vec<_>>();
        let b = (0..20)
            .scan(SeededRandom::new(7), |r, _| Some(r.random_index(10)))
            .collect::<Vec<_>>();
        assert_eq!(a, b);
        assert!(a.iter().all(|i| *i < 10));
    }

    #[test]
    fn closures_are_sources() {
        let mut fixed = |_max: usize| 2;
        assert_eq!(fixed.random_index(3), 2);
    }
}
