//! # wh-dst
//!
//! Deterministic Simulation Testing for bounded queues.
//!
//! Inspired by FoundationDB and TigerBeetle, this crate provides deterministic
//! simulation of time, randomness, and faults. All behavior is reproducible
//! via a seed.
//!
//! ## Usage
//!
//! ```rust
//! use wh_dst::DstEnv;
//!
//! let seed = 12345;
//! let mut env = DstEnv::new(seed);
//!
//! // Deterministic time
//! let now = env.clock().now_ns();
//! env.clock().advance_ns(1_000_000); // 1ms
//! assert_eq!(env.clock().now_ns(), now + 1_000_000);
//!
//! // Deterministic randomness
//! let value: u64 = env.rng().gen();
//! let choice = env.rng().gen_range(0..10);
//! # let _ = (value, choice);
//!
//! // Deterministic fault injection
//! if env.fault().should_fail() {
//!     // Simulate failure
//! }
//! ```
//!
//! Queues plug in through [`DstTestableQueue`]; [`DstRunner`] drives them
//! and checks the `wh-core` bounded-queue invariants.
//!
//! ## Reproducibility
//!
//! To reproduce a failing test:
//! ```bash
//! DST_SEED=12345 cargo test
//! ```

pub mod clock;
pub mod env;
pub mod fault;
pub mod fault_injection;
pub mod random;

pub use clock::SimClock;
pub use env::{DstEnv, DstEnvStats};
pub use fault::{FaultConfig, FaultInjector, FaultStats};
pub use fault_injection::{
    run_dst_scenario, DstOp, DstResult, DstRunner, DstStats, DstTestableQueue, FaultPoint,
    FaultType, OpOutcome,
};
pub use random::DeterministicRng;

/// Number of operations a DST run should perform: `DST_ITERATIONS` or `default`.
#[must_use]
pub fn iterations_or(default: usize) -> usize {
    std::env::var("DST_ITERATIONS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Get DST seed from environment or generate random one.
///
/// Prints the seed for reproduction. Use `DST_SEED=<seed>` to reproduce.
#[must_use]
pub fn get_or_generate_seed() -> u64 {
    match std::env::var("DST_SEED").ok().and_then(|s| s.parse::<u64>().ok()) {
        Some(seed) if seed != 0 => {
            println!("DST_SEED={} (from environment)", seed);
            seed
        }
        _ => {
            let seed = rand::random::<u64>().max(1);
            println!("DST_SEED={} (randomly generated)", seed);
            seed
        }
    }
}
