//! Fault injection for bounded queues.
//!
//! DST injects faults at OPERATION BOUNDARIES, never inside the queue's
//! critical section. The queue under test is unchanged; faults happen in
//! the runner.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  DstRunner                                                   │
//! │  ┌─────────────┐    ┌──────────────────┐    ┌─────────────┐  │
//! │  │ FaultPoint  │───>│ Queue            │───>│ FaultPoint  │  │
//! │  │ (pre-op)    │    │ try_push/try_pop │    │ (post-op)   │  │
//! │  └─────────────┘    └──────────────────┘    └─────────────┘  │
//! │        │                                           │         │
//! │        ▼                                           ▼         │
//! │  "Crash? Delay? Shutdown?"          "Caller drops the result" │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Operations never block: the runner uses zero-timeout attempts and
//! records `WouldBlock` where a real caller would wait. Whether a wait was
//! justified (queue full or empty) is checked against the runner's model.

use thiserror::Error;

use wh_core::{
    ActionOutcome, BoundedQueueProperties, BoundedQueuePropertyChecker, Counterexample,
    PropertyChecker, PropertyResult, StateSnapshot, ThreadAction,
};

use crate::env::DstEnv;
use crate::fault::FaultConfig;
use crate::random::DeterministicRng;

/// Fault injection points (between operations, not inside).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    /// Before starting an operation
    BeforeOperation,
    /// After the operation completed, before the caller sees the result
    AfterOperation,
}

/// Types of faults that can be injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FaultType {
    /// The calling thread "crashes"; the result is abandoned
    #[error("injected fault: caller crashed")]
    ThreadCrash,
    /// The calling thread is slow
    #[error("injected fault: delay")]
    Delay,
    /// Another thread shuts the queue down
    #[error("injected fault: queue shut down")]
    Shutdown,
}

/// Result of a zero-timeout queue attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpOutcome<T> {
    Done(T),
    /// A blocking caller would wait here
    WouldBlock,
    Cancelled,
}

/// Queues testable with DST.
///
/// MINIMAL interface - the queue needs no DST knowledge.
pub trait DstTestableQueue {
    /// Push without waiting.
    fn try_push(&self, item: u64) -> OpOutcome<()>;
    /// Pop without waiting.
    fn try_pop(&self) -> OpOutcome<u64>;
    fn shutdown(&self);
    /// Items held, oldest first.
    fn contents(&self) -> Vec<u64>;
    fn capacity(&self) -> usize;
}

/// DST operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DstOp {
    Push(u64),
    Pop,
    Shutdown,
}

/// DST runner for bounded queues.
///
/// Wraps a queue, injects faults at operation boundaries and keeps the
/// produced/consumed history the invariants are checked against.
pub struct DstRunner<Q> {
    queue: Q,
    env: DstEnv,
    fault_rng: DeterministicRng,
    // Tracking for invariant verification
    produced: Vec<u64>,
    consumed: Vec<u64>,
    /// Next item `generate_ops` hands out.
    next_item: u64,
    shutdown_requested: bool,
    spurious_blocks: u64,
    cancellation_mismatches: u64,
    trace: Counterexample,
    // Statistics
    stats: DstStats,
}

impl<Q: DstTestableQueue> DstRunner<Q> {
    /// Runner with [`FaultConfig::default`].
    pub fn new(queue: Q, seed: u64) -> Self {
        Self::with_fault_config(queue, seed, FaultConfig::default())
    }

    pub fn with_fault_config(queue: Q, seed: u64, config: FaultConfig) -> Self {
        debug_assert!(seed != 0, "Seed should not be zero");
        let mut env = DstEnv::with_fault_config(seed, config);
        let fault_rng = env.rng().fork();

        Self {
            queue,
            env,
            fault_rng,
            produced: Vec::new(),
            consumed: Vec::new(),
            next_item: 1,
            shutdown_requested: false,
            spurious_blocks: 0,
            cancellation_mismatches: 0,
            trace: Counterexample::with_seed(seed.max(1)),
            stats: DstStats {
                seed,
                ..DstStats::default()
            },
        }
    }

    /// Get the seed for reproduction.
    pub fn seed(&self) -> u64 {
        self.stats.seed
    }

    pub fn env(&self) -> &DstEnv {
        &self.env
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    /// Push with fault injection at boundaries.
    pub fn push(&mut self, item: u64) -> Result<OpOutcome<()>, FaultType> {
        self.before_operation()?;

        let was_full = self.queue.contents().len() >= self.queue.capacity();
        let outcome = self.queue.try_push(item);
        self.stats.operations_count += 1;

        match outcome {
            OpOutcome::Done(()) => self.produced.push(item),
            OpOutcome::WouldBlock if !was_full && !self.shutdown_requested => {
                self.spurious_blocks += 1;
            }
            _ => {}
        }
        self.check_cancellation(matches!(outcome, OpOutcome::Cancelled));
        self.record(format!("push({})", item), outcome_of(&outcome));

        // The item is in the queue even if the caller never learns it.
        self.after_operation()?;
        Ok(outcome)
    }

    /// Pop with fault injection at boundaries.
    pub fn pop(&mut self) -> Result<OpOutcome<u64>, FaultType> {
        self.before_operation()?;

        let was_empty = self.queue.contents().is_empty();
        let outcome = self.queue.try_pop();
        self.stats.operations_count += 1;

        match outcome {
            OpOutcome::Done(item) => self.consumed.push(item),
            OpOutcome::WouldBlock if !was_empty && !self.shutdown_requested => {
                self.spurious_blocks += 1;
            }
            _ => {}
        }
        self.check_cancellation(matches!(outcome, OpOutcome::Cancelled));
        self.record("pop()".to_string(), outcome_of(&outcome));

        // The item left the queue even if the caller crashes holding it.
        self.after_operation()?;
        Ok(outcome)
    }

    /// Shut the queue down.
    pub fn shutdown(&mut self) {
        self.queue.shutdown();
        self.shutdown_requested = true;
        self.record("shutdown()".to_string(), ActionOutcome::Completed);
    }

    /// Execute one scripted operation.
    pub fn apply(&mut self, op: DstOp) -> Result<(), FaultType> {
        match op {
            DstOp::Push(item) => self.push(item).map(|_| ()),
            DstOp::Pop => self.pop().map(|_| ()),
            DstOp::Shutdown => {
                self.shutdown();
                Ok(())
            }
        }
    }

    /// Generate `count` random operations from the environment's RNG.
    ///
    /// Pushed items are ascending and unique across every call on this
    /// runner. Pushes and pops are equally likely; a shutdown is appended
    /// with probability `shutdown_probability` per operation.
    pub fn generate_ops(&mut self, count: usize, shutdown_probability: f64) -> Vec<DstOp> {
        let mut ops = Vec::with_capacity(count);
        for _ in 0..count {
            let rng = self.env.rng();
            if rng.gen_bool(shutdown_probability) {
                ops.push(DstOp::Shutdown);
            } else if rng.gen_bool(0.5) {
                ops.push(DstOp::Push(self.next_item));
                self.next_item += 1;
            } else {
                ops.push(DstOp::Pop);
            }
        }
        ops
    }

    fn before_operation(&mut self) -> Result<(), FaultType> {
        match self.maybe_inject_fault(FaultPoint::BeforeOperation) {
            Some(FaultType::ThreadCrash) => {
                self.stats.abandoned_operations += 1;
                Err(FaultType::ThreadCrash)
            }
            Some(FaultType::Shutdown) => {
                self.shutdown();
                Ok(())
            }
            Some(FaultType::Delay) | None => Ok(()),
        }
    }

    fn after_operation(&mut self) -> Result<(), FaultType> {
        match self.maybe_inject_fault(FaultPoint::AfterOperation) {
            Some(FaultType::ThreadCrash) => {
                self.stats.abandoned_operations += 1;
                if let Some(last) = self.trace.interleaving.last_mut() {
                    last.outcome = ActionOutcome::Abandoned;
                }
                Err(FaultType::ThreadCrash)
            }
            Some(FaultType::Shutdown) => {
                self.shutdown();
                Ok(())
            }
            Some(FaultType::Delay) | None => Ok(()),
        }
    }

    /// Maybe inject a fault at the given point.
    fn maybe_inject_fault(&mut self, point: FaultPoint) -> Option<FaultType> {
        if !self.env.fault().should_fail() {
            return None;
        }
        self.stats.faults_injected += 1;

        let allow_shutdown = self.env.fault().config().allow_shutdown;
        let fault = match (self.fault_rng.gen_range(0..3_u8), point) {
            (0, _) => FaultType::ThreadCrash,
            (1, FaultPoint::BeforeOperation) if allow_shutdown && !self.shutdown_requested => {
                FaultType::Shutdown
            }
            _ => FaultType::Delay,
        };

        if fault == FaultType::Delay {
            self.env.inject_delay();
        }
        Some(fault)
    }

    fn check_cancellation(&mut self, cancelled: bool) {
        if cancelled != self.shutdown_requested {
            self.cancellation_mismatches += 1;
        }
    }

    fn record(&mut self, action: String, outcome: ActionOutcome) {
        let step = self.trace.interleaving.len() as u64 + 1;
        let now_us = self.env.clock().now_ns() / 1_000;
        self.trace.add_action(ThreadAction {
            thread_id: 0,
            step,
            action,
            outcome,
        });
        self.trace.add_state(StateSnapshot {
            step,
            description: format!("len={} t={}us", self.queue.contents().len(), now_us),
            variables: Vec::new(),
        });
    }

    /// Check every bounded-queue invariant against the recorded history.
    pub fn check_invariants(&self) -> Vec<PropertyResult> {
        BoundedQueuePropertyChecker::new(self).with_seed(self.seed().max(1)).check_all()
    }

    /// The recorded operations, rendered for failure messages.
    pub fn trace(&self) -> &Counterexample {
        &self.trace
    }

    pub fn stats(&self) -> DstStats {
        self.stats.clone()
    }
}

impl<Q: DstTestableQueue> BoundedQueueProperties for DstRunner<Q> {
    fn produced_items(&self) -> Vec<u64> {
        self.produced.clone()
    }

    fn consumed_items(&self) -> Vec<u64> {
        self.consumed.clone()
    }

    fn current_contents(&self) -> Vec<u64> {
        self.queue.contents()
    }

    fn capacity(&self) -> u64 {
        self.queue.capacity() as u64
    }

    fn spurious_blocks(&self) -> u64 {
        self.spurious_blocks
    }

    fn cancellation_mismatches(&self) -> u64 {
        self.cancellation_mismatches
    }
}

fn outcome_of<T>(outcome: &OpOutcome<T>) -> ActionOutcome {
    match outcome {
        OpOutcome::Done(_) => ActionOutcome::Completed,
        OpOutcome::WouldBlock => ActionOutcome::Blocked,
        OpOutcome::Cancelled => ActionOutcome::Cancelled,
    }
}

/// Statistics from DST run.
#[derive(Debug, Clone, Default)]
pub struct DstStats {
    pub seed: u64,
    pub operations_count: u64,
    pub faults_injected: u64,
    pub abandoned_operations: u64,
}

impl DstStats {
    pub fn format(&self) -> String {
        format!(
            "DST_SEED={} ops={} faults={} abandoned={}",
            self.seed, self.operations_count, self.faults_injected, self.abandoned_operations
        )
    }
}

/// Run a DST scenario.
///
/// Operations are executed with fault injection. Invariants checked at end.
pub fn run_dst_scenario<Q: DstTestableQueue>(
    queue: Q,
    seed: u64,
    config: FaultConfig,
    operations: Vec<DstOp>,
) -> DstResult {
    let mut runner = DstRunner::with_fault_config(queue, seed, config);
    let mut fault_errors = Vec::new();

    for op in operations {
        // Faults are expected - they're part of the test
        if let Err(fault) = runner.apply(op) {
            fault_errors.push(fault);
        }
    }

    let properties = runner.check_invariants();
    DstResult {
        passed: properties.iter().all(|r| r.holds),
        properties,
        stats: runner.stats(),
        fault_errors,
        trace: runner.trace().clone(),
    }
}

/// DST result.
#[derive(Debug)]
pub struct DstResult {
    pub passed: bool,
    pub properties: Vec<PropertyResult>,
    pub stats: DstStats,
    pub fault_errors: Vec<FaultType>,
    pub trace: Counterexample,
}

impl DstResult {
    pub fn format(&self) -> String {
        let status = if self.passed { "PASS" } else { "FAIL" };
        let mut result = format!("[{}] {}", status, self.stats.format());

        for property in self.properties.iter().filter(|p| !p.holds) {
            result.push_str(&format!("\n  VIOLATION: {}", property));
        }
        if !self.passed {
            result.push_str("\n\n");
            result.push_str(&self.trace.render_diagram());
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    // Simple mock queue for testing the DST framework itself
    struct MockQueue {
        state: Mutex<(VecDeque<u64>, bool)>,
        capacity: usize,
    }

    impl MockQueue {
        fn new(capacity: usize) -> Self {
            Self {
                state: Mutex::new((VecDeque::new(), false)),
                capacity,
            }
        }
    }

    impl DstTestableQueue for MockQueue {
        fn try_push(&self, item: u64) -> OpOutcome<()> {
            let mut state = self.state.lock().unwrap();
            if state.1 {
                OpOutcome::Cancelled
            } else if state.0.len() >= self.capacity {
                OpOutcome::WouldBlock
            } else {
                state.0.push_back(item);
                OpOutcome::Done(())
            }
        }

        fn try_pop(&self) -> OpOutcome<u64> {
            let mut state = self.state.lock().unwrap();
            if state.1 {
                return OpOutcome::Cancelled;
            }
            match state.0.pop_front() {
                Some(item) => OpOutcome::Done(item),
                None => OpOutcome::WouldBlock,
            }
        }

        fn shutdown(&self) {
            self.state.lock().unwrap().1 = true;
        }

        fn contents(&self) -> Vec<u64> {
            self.state.lock().unwrap().0.iter().copied().collect()
        }

        fn capacity(&self) -> usize {
            self.capacity
        }
    }

    /// A broken queue that hands items out newest first.
    struct LifoQueue(MockQueue);

    impl DstTestableQueue for LifoQueue {
        fn try_push(&self, item: u64) -> OpOutcome<()> {
            self.0.try_push(item)
        }

        fn try_pop(&self) -> OpOutcome<u64> {
            match self.0.state.lock().unwrap().0.pop_back() {
                Some(item) => OpOutcome::Done(item),
                None => OpOutcome::WouldBlock,
            }
        }

        fn shutdown(&self) {
            self.0.shutdown();
        }

        fn contents(&self) -> Vec<u64> {
            self.0.contents()
        }

        fn capacity(&self) -> usize {
            self.0.capacity
        }
    }

    #[test]
    fn test_dst_runner_basic() {
        let mut runner = DstRunner::new(MockQueue::new(2), 12345);

        // These might fail due to fault injection, and that's OK
        let _ = runner.push(1);
        let _ = runner.push(2);
        let _ = runner.pop();

        let results = runner.check_invariants();
        assert!(results.iter().all(|r| r.holds), "{:?}", results);
    }

    #[test]
    fn test_full_queue_reports_would_block() {
        let mut runner = DstRunner::with_fault_config(MockQueue::new(1), 7, FaultConfig::none());
        assert_eq!(runner.push(1), Ok(OpOutcome::Done(())));
        assert_eq!(runner.push(2), Ok(OpOutcome::WouldBlock));
        assert_eq!(runner.pop(), Ok(OpOutcome::Done(1)));
        assert_eq!(runner.pop(), Ok(OpOutcome::WouldBlock));
        assert_eq!(runner.spurious_blocks(), 0);
    }

    #[test]
    fn test_shutdown_cancels_everything() {
        let ops = vec![DstOp::Push(1), DstOp::Shutdown, DstOp::Push(2), DstOp::Pop];
        let result = run_dst_scenario(MockQueue::new(4), 42, FaultConfig::none(), ops);

        assert!(result.passed, "DST failed: {}", result.format());
        assert_eq!(result.stats.operations_count, 3);
    }

    #[test]
    fn test_lifo_queue_is_caught() {
        let ops = vec![DstOp::Push(1), DstOp::Push(2), DstOp::Pop];
        let result = run_dst_scenario(
            LifoQueue(MockQueue::new(4)),
            42,
            FaultConfig::none(),
            ops,
        );

        assert!(!result.passed);
        let report = result.format();
        assert!(report.contains("FIFO_Order"), "{}", report);
        assert!(report.contains("DST_SEED=42"), "{}", report);
    }

    #[test]
    fn test_random_ops_hold_with_faults() {
        let mut runner =
            DstRunner::with_fault_config(MockQueue::new(3), 2024, FaultConfig::aggressive());
        let ops = runner.generate_ops(500, 0.0);
        for op in ops {
            let _ = runner.apply(op);
        }

        let results = runner.check_invariants();
        assert!(results.iter().all(|r| r.holds), "{:?}", results);
        assert!(runner.stats().faults_injected > 0);
    }

    #[test]
    fn test_determinism() {
        let ops = vec![DstOp::Push(1), DstOp::Push(2), DstOp::Pop, DstOp::Push(3)];

        let result1 = run_dst_scenario(MockQueue::new(2), 42, FaultConfig::aggressive(), ops.clone());
        let result2 = run_dst_scenario(MockQueue::new(2), 42, FaultConfig::aggressive(), ops);

        // Same seed = same faults = same stats
        assert_eq!(result1.stats.faults_injected, result2.stats.faults_injected);
        assert_eq!(result1.fault_errors, result2.fault_errors);
    }

    #[test]
    fn test_generated_items_unique_across_batches() {
        let mut runner = DstRunner::with_fault_config(MockQueue::new(4), 11, FaultConfig::none());

        // Both batches are generated before either is applied.
        let mut ops = runner.generate_ops(100, 0.0);
        ops.extend(runner.generate_ops(100, 0.0));

        let pushed: Vec<u64> = ops
            .iter()
            .filter_map(|op| match op {
                DstOp::Push(item) => Some(*item),
                _ => None,
            })
            .collect();
        assert!(pushed.windows(2).all(|w| w[0] < w[1]), "{:?}", pushed);

        for op in ops {
            runner.apply(op).unwrap();
        }
        let results = runner.check_invariants();
        assert!(results.iter().all(|r| r.holds), "{:?}", results);
    }
}
