//! Producer/consumer workload over a shared [`BoundedQueue`].
//!
//! Producers stock vehicles at a fixed pace; consumers take them out and
//! report each one through a [`PrintSink`]. The run ends after a wall-clock
//! duration or once a fixed number of vehicles has been consumed. Then the
//! queue is shut down, every thread is joined and leftovers are drained.

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info, warn};
use wh_queue::{BoundedQueue, CapacityPolicy, CAPACITY_DEFAULT};

use crate::error::DriverError;
use crate::sink::PrintSink;
use crate::vehicle::{Vehicle, VehicleFactory, FIRST_VEHICLE_ID};

/// Fewest consumers a run accepts.
pub const MIN_CONSUMERS: usize = 2;

/// Default pause between two pushes of one producer.
pub const PRODUCE_INTERVAL_DEFAULT: Duration = Duration::from_millis(500);

/// Default pause after each item a consumer takes.
pub const CONSUME_INTERVAL_DEFAULT: Duration = Duration::from_millis(1000);

/// Settings for one warehouse run.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Requested capacity, checked against `policy`. Signed so negative
    /// requests surface as `InvalidCapacity`.
    pub capacity: i64,
    pub policy: CapacityPolicy,
    pub producers: usize,
    pub consumers: usize,
    pub produce_interval: Duration,
    pub consume_interval: Duration,
    /// Stop after this much wall-clock time.
    pub duration: Option<Duration>,
    /// Stop once this many vehicles have been consumed.
    pub max_items: Option<u64>,
    /// Seed for the car/truck choice; random when unset.
    pub seed: Option<u64>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            capacity: CAPACITY_DEFAULT as i64,
            policy: CapacityPolicy::default(),
            producers: 1,
            consumers: MIN_CONSUMERS,
            produce_interval: PRODUCE_INTERVAL_DEFAULT,
            consume_interval: CONSUME_INTERVAL_DEFAULT,
            duration: None,
            max_items: None,
            seed: None,
        }
    }
}

/// Counts collected over a run.
///
/// `produced == consumed + drained` once the run has returned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub seed: u64,
    pub capacity: usize,
    pub produced: u64,
    pub consumed: u64,
    pub drained: u64,
    /// Items taken by each consumer, indexed by consumer number minus one.
    pub per_consumer: Vec<u64>,
    /// Pushes rejected because the queue had already shut down.
    pub cancelled_pushes: u64,
}

/// Raised once to end the run. Paces threads with interruptible sleeps.
#[derive(Debug, Default)]
struct StopSignal {
    raised: Mutex<bool>,
    changed: Condvar,
}

impl StopSignal {
    fn raise(&self) {
        let mut raised = self.raised.lock().unwrap_or_else(PoisonError::into_inner);
        if !*raised {
            *raised = true;
            self.changed.notify_all();
        }
    }

    fn is_raised(&self) -> bool {
        *self.raised.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep for `timeout` or until raised. Returns whether the signal is raised.
    fn wait_timeout(&self, timeout: Duration) -> bool {
        let raised = self.raised.lock().unwrap_or_else(PoisonError::into_inner);
        let (raised, _) = self
            .changed
            .wait_timeout_while(raised, timeout, |raised| !*raised)
            .unwrap_or_else(PoisonError::into_inner);
        *raised
    }

    fn wait(&self) {
        let raised = self.raised.lock().unwrap_or_else(PoisonError::into_inner);
        let _raised = self
            .changed
            .wait_while(raised, |raised| !*raised)
            .unwrap_or_else(PoisonError::into_inner);
    }
}

/// State shared by every thread of one run.
struct Shared<'a, W> {
    config: &'a DriverConfig,
    queue: BoundedQueue<Vehicle>,
    factory: VehicleFactory,
    sink: &'a PrintSink<W>,
    stop: StopSignal,
    /// Vehicles a producer is allowed to build, counted before pushing.
    reserved: AtomicU64,
    consumed: AtomicU64,
}

#[derive(Debug, Default)]
struct ProducerReport {
    produced: u64,
    cancelled: u64,
}

impl<W: Write> Shared<'_, W> {
    /// Claim the right to build one more vehicle under `max_items`.
    fn reserve(&self) -> bool {
        match self.config.max_items {
            None => true,
            Some(max) => self
                .reserved
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < max).then_some(n + 1))
                .is_ok(),
        }
    }

    fn produce(&self, index: usize, seed: u64) -> Result<ProducerReport, DriverError> {
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(index as u64));
        let mut report = ProducerReport::default();
        debug!(producer = index, "producer started");

        while !self.stop.is_raised() && self.reserve() {
            let vehicle = self.factory.next(&mut rng);
            match self.queue.push(vehicle) {
                Ok(()) => report.produced += 1,
                Err(err) if err.is_cancelled() => {
                    report.cancelled += 1;
                    break;
                }
                Err(err) => return Err(err.into()),
            }
            if self.stop.wait_timeout(self.config.produce_interval) {
                break;
            }
        }

        debug!(producer = index, produced = report.produced, "producer stopped");
        Ok(report)
    }

    fn consume(&self, number: usize) -> Result<u64, DriverError> {
        let mut taken = 0;
        debug!(consumer = number, "consumer started");

        loop {
            let vehicle = match self.queue.pop() {
                Ok(vehicle) => vehicle,
                Err(err) if err.is_cancelled() => break,
                Err(err) => return Err(err.into()),
            };
            taken += 1;
            let total = self.consumed.fetch_add(1, Ordering::AcqRel) + 1;
            self.sink.report(number, &vehicle)?;

            if self.config.max_items.is_some_and(|max| total >= max) {
                self.stop.raise();
            }
            self.stop.wait_timeout(self.config.consume_interval);
        }

        debug!(consumer = number, taken, "consumer stopped");
        Ok(taken)
    }

    /// Raise the stop signal when a thread fails so the others wind down.
    fn guard<T>(&self, result: Result<T, DriverError>) -> Result<T, DriverError> {
        if let Err(err) = &result {
            warn!(error = %err, "worker failed, stopping run");
            self.stop.raise();
            self.queue.shutdown();
        }
        result
    }
}

/// Runs the producer/consumer workload.
pub struct Warehouse;

impl Warehouse {
    /// Run with reports written to stdout.
    pub fn run(config: &DriverConfig) -> Result<RunSummary, DriverError> {
        Self::run_with_sink(config, &PrintSink::stdout())
    }

    pub fn run_with_sink<W: Write + Send>(
        config: &DriverConfig,
        sink: &PrintSink<W>,
    ) -> Result<RunSummary, DriverError> {
        if config.consumers < MIN_CONSUMERS {
            return Err(DriverError::InvalidConsumers {
                requested: config.consumers,
                minimum: MIN_CONSUMERS,
            });
        }
        if config.producers == 0 {
            return Err(DriverError::NoProducers);
        }

        let capacity = config.policy.check(config.capacity)?;
        let seed = config.seed.unwrap_or_else(rand::random);
        let shared = Shared {
            config,
            queue: BoundedQueue::with_policy(capacity, config.policy)?,
            factory: VehicleFactory::new(FIRST_VEHICLE_ID),
            sink,
            stop: StopSignal::default(),
            reserved: AtomicU64::new(0),
            consumed: AtomicU64::new(0),
        };

        info!(
            capacity,
            producers = config.producers,
            consumers = config.consumers,
            seed,
            "warehouse started"
        );

        let (producers, consumers) = thread::scope(|s| {
            let shared = &shared;
            let producers: Vec<_> = (0..config.producers)
                .map(|index| s.spawn(move || shared.guard(shared.produce(index, seed))))
                .collect();
            let consumers: Vec<_> = (1..=config.consumers)
                .map(|number| s.spawn(move || shared.guard(shared.consume(number))))
                .collect();

            if config.max_items == Some(0) {
                shared.stop.raise();
            }
            match config.duration {
                Some(duration) => {
                    shared.stop.wait_timeout(duration);
                }
                None => shared.stop.wait(),
            }
            shared.stop.raise();
            shared.queue.shutdown();

            let producers: Vec<_> = producers.into_iter().map(|h| h.join()).collect();
            let consumers: Vec<_> = consumers.into_iter().map(|h| h.join()).collect();
            (producers, consumers)
        });

        let mut summary = RunSummary {
            seed,
            capacity,
            ..RunSummary::default()
        };
        for joined in producers {
            let report = joined.map_err(|_| DriverError::ThreadPanicked("producer"))??;
            summary.produced += report.produced;
            summary.cancelled_pushes += report.cancelled;
        }
        for joined in consumers {
            let taken = joined.map_err(|_| DriverError::ThreadPanicked("consumer"))??;
            summary.consumed += taken;
            summary.per_consumer.push(taken);
        }
        summary.drained = shared.queue.drain().len() as u64;

        info!(
            produced = summary.produced,
            consumed = summary.consumed,
            drained = summary.drained,
            "warehouse stopped"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use wh_queue::QueueError;

    fn fast(max_items: u64) -> DriverConfig {
        DriverConfig {
            produce_interval: Duration::ZERO,
            consume_interval: Duration::ZERO,
            max_items: Some(max_items),
            seed: Some(7),
            ..DriverConfig::default()
        }
    }

    #[test]
    fn test_rejects_single_consumer() {
        let config = DriverConfig {
            consumers: 1,
            ..fast(1)
        };
        let err = Warehouse::run_with_sink(&config, &PrintSink::new(Vec::new())).unwrap_err();
        assert!(matches!(err, DriverError::InvalidConsumers { requested: 1, minimum: 2 }));
    }

    #[test]
    fn test_rejects_no_producers() {
        let config = DriverConfig {
            producers: 0,
            ..fast(1)
        };
        let err = Warehouse::run_with_sink(&config, &PrintSink::new(Vec::new())).unwrap_err();
        assert!(matches!(err, DriverError::NoProducers));
    }

    #[test]
    fn test_rejects_small_capacity() {
        for capacity in [-1, 0, 7] {
            let config = DriverConfig {
                capacity,
                ..fast(1)
            };
            let err = Warehouse::run_with_sink(&config, &PrintSink::new(Vec::new())).unwrap_err();
            assert!(
                matches!(err, DriverError::Queue(QueueError::InvalidCapacity { .. })),
                "capacity {} accepted",
                capacity
            );
        }
    }

    #[test]
    fn test_capacity_limit_is_opt_in() {
        let config = DriverConfig {
            capacity: 64,
            policy: CapacityPolicy::default().with_maximum(32),
            ..fast(1)
        };
        let err = Warehouse::run_with_sink(&config, &PrintSink::new(Vec::new())).unwrap_err();
        assert!(matches!(
            err,
            DriverError::Queue(QueueError::InvalidCapacity { requested: 64, maximum: Some(32), .. })
        ));

        let config = DriverConfig {
            capacity: 4096,
            ..fast(1)
        };
        let summary = Warehouse::run_with_sink(&config, &PrintSink::new(Vec::new())).unwrap();
        assert_eq!(summary.capacity, 4096);
    }

    #[test]
    fn test_max_items_run_accounts_for_every_vehicle() {
        let sink = PrintSink::new(Vec::new());
        let summary = Warehouse::run_with_sink(&fast(40), &sink).unwrap();

        assert_eq!(summary.seed, 7);
        assert_eq!(summary.capacity, 8);
        assert!(summary.produced <= 40);
        assert!(summary.consumed >= 40 || summary.produced < 40);
        assert_eq!(summary.produced, summary.consumed + summary.drained);
        assert_eq!(summary.per_consumer.len(), 2);
        assert_eq!(summary.per_consumer.iter().sum::<u64>(), summary.consumed);

        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            text.matches("======= Consumer ").count() as u64,
            summary.consumed
        );
    }

    #[test]
    fn test_duration_run_stops() {
        let config = DriverConfig {
            producers: 3,
            consumers: 4,
            produce_interval: Duration::from_millis(1),
            consume_interval: Duration::from_millis(2),
            duration: Some(Duration::from_millis(100)),
            seed: Some(1),
            ..DriverConfig::default()
        };

        let started = Instant::now();
        let summary = Warehouse::run_with_sink(&config, &PrintSink::new(Vec::new())).unwrap();
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(summary.produced > 0);
        assert_eq!(summary.produced, summary.consumed + summary.drained);
        assert_eq!(summary.per_consumer.len(), 4);
    }

    #[test]
    fn test_backpressure_run_stays_bounded() {
        // Producers outpace consumers, so the queue fills and pushes block.
        let config = DriverConfig {
            producers: 2,
            produce_interval: Duration::ZERO,
            consume_interval: Duration::from_millis(50),
            duration: Some(Duration::from_millis(100)),
            seed: Some(3),
            ..DriverConfig::default()
        };

        let summary = Warehouse::run_with_sink(&config, &PrintSink::new(Vec::new())).unwrap();
        assert!(summary.drained <= summary.capacity as u64);
        assert_eq!(summary.produced, summary.consumed + summary.drained);
    }

    #[test]
    fn test_zero_max_items_returns_immediately() {
        let summary = Warehouse::run_with_sink(&fast(0), &PrintSink::new(Vec::new())).unwrap();
        assert_eq!(summary.produced, 0);
        assert_eq!(summary.consumed, 0);
        assert_eq!(summary.drained, 0);
    }

    #[test]
    fn test_stop_signal() {
        let stop = StopSignal::default();
        assert!(!stop.is_raised());
        assert!(!stop.wait_timeout(Duration::from_millis(1)));

        stop.raise();
        stop.raise();
        assert!(stop.is_raised());
        assert!(stop.wait_timeout(Duration::from_secs(60)));
        stop.wait();
    }
}
