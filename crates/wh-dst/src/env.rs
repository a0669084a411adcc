//! The simulation environment: seed, randomness, time and faults in one place.

use std::fmt;

use crate::clock::SimClock;
use crate::fault::{FaultConfig, FaultInjector, FaultStats};
use crate::random::DeterministicRng;

/// Everything a deterministic run needs, derived from one seed.
#[derive(Debug, Clone)]
pub struct DstEnv {
    seed: u64,
    rng: DeterministicRng,
    clock: SimClock,
    fault: FaultInjector,
}

impl DstEnv {
    /// Environment with [`FaultConfig::default`].
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_fault_config(seed, FaultConfig::default())
    }

    #[must_use]
    pub fn with_fault_config(seed: u64, config: FaultConfig) -> Self {
        let mut rng = DeterministicRng::new(seed);
        let fault = FaultInjector::new(rng.fork(), config);
        Self {
            seed,
            rng,
            clock: SimClock::new(),
            fault,
        }
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn rng(&mut self) -> &mut DeterministicRng {
        &mut self.rng
    }

    pub fn clock(&mut self) -> &mut SimClock {
        &mut self.clock
    }

    pub fn fault(&mut self) -> &mut FaultInjector {
        &mut self.fault
    }

    /// Simulate a slow thread: advance the clock by a random fault delay.
    pub fn inject_delay(&mut self) -> u64 {
        let delay = self.fault.delay_us();
        self.clock.advance_us(delay);
        delay
    }

    /// `DST_SEED=<seed>`, for failure messages.
    #[must_use]
    pub fn format_seed(&self) -> String {
        format!("DST_SEED={}", self.seed)
    }

    #[must_use]
    pub fn stats(&self) -> DstEnvStats {
        DstEnvStats {
            seed: self.seed,
            elapsed_ns: self.clock.now_ns(),
            rng_draws: self.rng.draws_count(),
            faults: self.fault.stats().clone(),
        }
    }
}

/// Summary of an environment after a run.
#[derive(Debug, Clone)]
pub struct DstEnvStats {
    pub seed: u64,
    pub elapsed_ns: u64,
    pub rng_draws: u64,
    pub faults: FaultStats,
}

impl fmt::Display for DstEnvStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DST_SEED={} elapsed={}us rng_draws={} fault_checks={} faults={}",
            self.seed,
            self.elapsed_ns / 1_000,
            self.rng_draws,
            self.faults.checks_count,
            self.faults.faults_count
        )
    }
}
