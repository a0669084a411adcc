//! Probabilistic fault injection driven by a seeded RNG.

use crate::random::DeterministicRng;

/// How often and how hard faults are injected.
#[derive(Debug, Clone, PartialEq)]
pub struct FaultConfig {
    /// Probability that a fault point fires
    pub probability: f64,
    /// Upper bound for injected delays (microseconds)
    pub delay_us_max: u64,
    /// Whether a fault may shut the queue down mid-run
    pub allow_shutdown: bool,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            probability: 0.05,
            delay_us_max: 1_000,
            allow_shutdown: false,
        }
    }
}

impl FaultConfig {
    /// Never inject anything.
    #[must_use]
    pub fn none() -> Self {
        Self {
            probability: 0.0,
            delay_us_max: 0,
            allow_shutdown: false,
        }
    }

    /// Frequent faults, including shutdown.
    #[must_use]
    pub fn aggressive() -> Self {
        Self {
            probability: 0.25,
            delay_us_max: 10_000,
            allow_shutdown: true,
        }
    }
}

/// Counters for a fault injector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaultStats {
    pub checks_count: u64,
    pub faults_count: u64,
}

/// Decides, reproducibly, whether each fault point fires.
#[derive(Debug, Clone)]
pub struct FaultInjector {
    rng: DeterministicRng,
    config: FaultConfig,
    stats: FaultStats,
}

impl FaultInjector {
    #[must_use]
    pub fn new(rng: DeterministicRng, config: FaultConfig) -> Self {
        debug_assert!(
            (0.0..=1.0).contains(&config.probability),
            "Fault probability out of range: {}",
            config.probability
        );
        Self {
            rng,
            config,
            stats: FaultStats::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &FaultConfig {
        &self.config
    }

    /// Roll for a fault at the current point.
    pub fn should_fail(&mut self) -> bool {
        self.stats.checks_count += 1;
        if self.config.probability <= 0.0 {
            return false;
        }
        let fire = self.rng.gen_bool(self.config.probability);
        if fire {
            self.stats.faults_count += 1;
        }
        fire
    }

    /// A delay in `1..=delay_us_max` microseconds, or 0 when delays are off.
    pub fn delay_us(&mut self) -> u64 {
        if self.config.delay_us_max == 0 {
            return 0;
        }
        self.rng.gen_range(1..=self.config.delay_us_max)
    }

    #[must_use]
    pub fn stats(&self) -> &FaultStats {
        &self.stats
    }
}
