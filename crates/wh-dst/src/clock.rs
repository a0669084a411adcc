//! Simulated time. Nothing sleeps; tests advance the clock explicitly.

/// A monotonic clock measured in nanoseconds since the start of a run.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    now_ns: u64,
}

impl SimClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn now_ns(&self) -> u64 {
        self.now_ns
    }

    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.now_ns / 1_000_000
    }

    pub fn advance_ns(&mut self, ns: u64) {
        self.now_ns = self.now_ns.saturating_add(ns);
    }

    pub fn advance_us(&mut self, us: u64) {
        self.advance_ns(us.saturating_mul(1_000));
    }

    pub fn advance_ms(&mut self, ms: u64) {
        self.advance_ns(ms.saturating_mul(1_000_000));
    }
}
