//! Seeded randomness for reproducible runs.

use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::distributions::{Distribution, Standard};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A random number generator whose whole output is determined by its seed.
#[derive(Debug, Clone)]
pub struct DeterministicRng {
    rng: StdRng,
    seed: u64,
    draws_count: u64,
}

impl DeterministicRng {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
            draws_count: 0,
        }
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of values drawn so far.
    #[must_use]
    pub fn draws_count(&self) -> u64 {
        self.draws_count
    }

    pub fn gen<T>(&mut self) -> T
    where
        Standard: Distribution<T>,
    {
        self.draws_count += 1;
        self.rng.gen()
    }

    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.draws_count += 1;
        self.rng.gen_range(range)
    }

    /// True with probability `p` (clamped to `[0, 1]`).
    pub fn gen_bool(&mut self, p: f64) -> bool {
        self.draws_count += 1;
        self.rng.gen_bool(p.clamp(0.0, 1.0))
    }

    /// Derive an independent generator, e.g. for a fault injector.
    #[must_use]
    pub fn fork(&mut self) -> Self {
        Self::new(self.gen())
    }
}
