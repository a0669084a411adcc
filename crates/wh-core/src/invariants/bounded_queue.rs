//! Bounded queue invariants.
//!
//! | Property | Description |
//! |----------|-------------|
//! | NoLostItems | Every produced item is still held or was consumed |
//! | NoDuplicates | No item is consumed twice or held twice |
//! | NoPhantomItems | Nothing is consumed or held that was never produced |
//! | FIFO_Order | Consumed items, then held items, replay the production order |
//! | BoundedCapacity | The queue never holds more than its capacity |
//! | BlockOnlyAtLimit | A push waits only when full, a pop only when empty |
//! | CancelledAfterShutdown | Operations report cancellation exactly when the queue is shut down |
//!
//! FIFO_Order assumes `produced` and `consumed` are recorded in the order the
//! queue's critical sections completed, which is what a single-threaded
//! driver such as the DST runner observes.

use std::collections::HashSet;

use crate::counterexample::{Counterexample, StateSnapshot};
use crate::property::{PropertyChecker, PropertyResult};

/// Observable history of a bounded queue.
pub trait BoundedQueueProperties {
    /// All items accepted by a push, in acceptance order.
    fn produced_items(&self) -> Vec<u64>;

    /// All items returned by a pop, in return order.
    fn consumed_items(&self) -> Vec<u64>;

    /// Items currently held, oldest first.
    fn current_contents(&self) -> Vec<u64>;

    fn capacity(&self) -> u64;

    /// Pushes that waited while space was free plus pops that waited while
    /// items were held.
    fn spurious_blocks(&self) -> u64 {
        0
    }

    /// Operations that succeeded or waited after shutdown, plus operations
    /// reported as cancelled before it.
    fn cancellation_mismatches(&self) -> u64 {
        0
    }
}

/// Property checker for bounded queue implementations.
pub struct BoundedQueuePropertyChecker<'a, Q: BoundedQueueProperties> {
    queue: &'a Q,
    dst_seed: Option<u64>,
}

impl<'a, Q: BoundedQueueProperties> BoundedQueuePropertyChecker<'a, Q> {
    #[must_use]
    pub fn new(queue: &'a Q) -> Self {
        Self {
            queue,
            dst_seed: None,
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        debug_assert!(seed != 0, "DST seed should not be zero");
        self.dst_seed = Some(seed);
        self
    }

    fn counterexample(
        &self,
        description: String,
        produced: &[u64],
        consumed: &[u64],
        contents: &[u64],
    ) -> Counterexample {
        let mut ce = match self.dst_seed {
            Some(seed) => Counterexample::with_seed(seed),
            None => Counterexample::new(),
        };
        ce.add_state(StateSnapshot {
            step: 1,
            description,
            variables: vec![
                ("produced".to_string(), format!("{:?}", produced)),
                ("consumed".to_string(), format!("{:?}", consumed)),
                ("contents".to_string(), format!("{:?}", contents)),
            ],
        });
        ce
    }

    fn check_no_lost_items(&self) -> PropertyResult {
        let produced = self.queue.produced_items();
        let consumed = self.queue.consumed_items();
        let contents = self.queue.current_contents();
        let seen: HashSet<u64> = consumed.iter().chain(contents.iter()).copied().collect();

        match produced.iter().find(|item| !seen.contains(item)) {
            Some(item) => PropertyResult::fail(
                "NoLostItems",
                format!("Item {} was produced but is neither held nor consumed", item),
                Some(self.counterexample(
                    format!("Item {} lost", item),
                    &produced,
                    &consumed,
                    &contents,
                )),
            ),
            None => PropertyResult::pass("NoLostItems"),
        }
    }

    fn check_no_duplicates(&self) -> PropertyResult {
        let consumed = self.queue.consumed_items();
        let contents = self.queue.current_contents();

        let mut seen = HashSet::new();
        for item in consumed.iter().chain(contents.iter()) {
            if !seen.insert(*item) {
                return PropertyResult::fail(
                    "NoDuplicates",
                    format!("Item {} was handed out or held more than once", item),
                    None,
                );
            }
        }

        PropertyResult::pass("NoDuplicates")
    }

    fn check_no_phantom_items(&self) -> PropertyResult {
        let produced: HashSet<u64> = self.queue.produced_items().into_iter().collect();
        let consumed = self.queue.consumed_items();
        let contents = self.queue.current_contents();

        match consumed.iter().chain(contents.iter()).find(|item| !produced.contains(item)) {
            Some(item) => PropertyResult::fail(
                "NoPhantomItems",
                format!("Item {} was never produced", item),
                None,
            ),
            None => PropertyResult::pass("NoPhantomItems"),
        }
    }

    fn check_fifo_order(&self) -> PropertyResult {
        let produced = self.queue.produced_items();
        let consumed = self.queue.consumed_items();
        let contents = self.queue.current_contents();

        for (i, item) in consumed.iter().chain(contents.iter()).enumerate() {
            if i < produced.len() && *item != produced[i] {
                let (source, index) = if i < consumed.len() {
                    ("Consumed", i)
                } else {
                    ("Held", i - consumed.len())
                };
                return PropertyResult::fail(
                    "FIFO_Order",
                    format!(
                        "{} item at index {} is {} but production order expects {}",
                        source, index, item, produced[i]
                    ),
                    Some(self.counterexample(
                        format!("Order diverges at position {}", i),
                        &produced,
                        &consumed,
                        &contents,
                    )),
                );
            }
        }

        PropertyResult::pass("FIFO_Order")
    }

    fn check_bounded_capacity(&self) -> PropertyResult {
        let held = self.queue.current_contents().len() as u64;
        let capacity = self.queue.capacity();

        if held > capacity {
            return PropertyResult::fail(
                "BoundedCapacity",
                format!("Queue holds {} items but capacity is {}", held, capacity),
                None,
            );
        }

        PropertyResult::pass("BoundedCapacity")
    }

    fn check_block_only_at_limit(&self) -> PropertyResult {
        let spurious = self.queue.spurious_blocks();
        if spurious > 0 {
            return PropertyResult::fail(
                "BlockOnlyAtLimit",
                format!("{} operations waited although they could proceed", spurious),
                None,
            );
        }

        PropertyResult::pass("BlockOnlyAtLimit")
    }

    fn check_cancelled_after_shutdown(&self) -> PropertyResult {
        let mismatches = self.queue.cancellation_mismatches();
        if mismatches > 0 {
            return PropertyResult::fail(
                "CancelledAfterShutdown",
                format!("{} operations disagreed with the shutdown state", mismatches),
                None,
            );
        }

        PropertyResult::pass("CancelledAfterShutdown")
    }
}

impl<'a, Q: BoundedQueueProperties> PropertyChecker for BoundedQueuePropertyChecker<'a, Q> {
    fn check_all(&self) -> Vec<PropertyResult> {
        vec![
            self.check_no_lost_items(),
            self.check_no_duplicates(),
            self.check_no_phantom_items(),
            self.check_fifo_order(),
            self.check_bounded_capacity(),
            self.check_block_only_at_limit(),
            self.check_cancelled_after_shutdown(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Reference FIFO for exercising the checker.
    struct TestQueue {
        produced: Vec<u64>,
        consumed: Vec<u64>,
        contents: VecDeque<u64>,
        capacity: u64,
        late_successes: u64,
        spurious: u64,
    }

    impl TestQueue {
        fn new(capacity: u64) -> Self {
            Self {
                produced: Vec::new(),
                consumed: Vec::new(),
                contents: VecDeque::new(),
                capacity,
                late_successes: 0,
                spurious: 0,
            }
        }

        fn push(&mut self, item: u64) {
            self.produced.push(item);
            self.contents.push_back(item);
        }

        fn pop(&mut self) -> Option<u64> {
            let item = self.contents.pop_front();
            if let Some(v) = item {
                self.consumed.push(v);
            }
            item
        }
    }

    impl BoundedQueueProperties for TestQueue {
        fn produced_items(&self) -> Vec<u64> {
            self.produced.clone()
        }

        fn consumed_items(&self) -> Vec<u64> {
            self.consumed.clone()
        }

        fn current_contents(&self) -> Vec<u64> {
            self.contents.iter().copied().collect()
        }

        fn capacity(&self) -> u64 {
            self.capacity
        }

        fn spurious_blocks(&self) -> u64 {
            self.spurious
        }

        fn cancellation_mismatches(&self) -> u64 {
            self.late_successes
        }
    }

    fn result<'r>(results: &'r [PropertyResult], name: &str) -> &'r PropertyResult {
        results.iter().find(|r| r.name == name).unwrap()
    }

    #[test]
    fn test_correct_queue_passes_all() {
        let mut queue = TestQueue::new(4);
        queue.push(1);
        queue.push(2);
        queue.push(3);
        queue.pop();

        let checker = BoundedQueuePropertyChecker::new(&queue);
        assert!(checker.all_hold(), "{}", checker.report());
    }

    #[test]
    fn test_lost_item_detected() {
        let mut queue = TestQueue::new(4);
        queue.push(1);
        queue.push(2);
        queue.contents.pop_back(); // Item 2 vanishes

        let checker = BoundedQueuePropertyChecker::new(&queue).with_seed(7);
        let results = checker.check_all();
        let no_lost = result(&results, "NoLostItems");
        assert!(!no_lost.holds);
        assert!(no_lost.violation.as_ref().unwrap().contains('2'));
        assert_eq!(no_lost.counterexample.as_ref().unwrap().dst_seed, Some(7));
    }

    #[test]
    fn test_duplicate_detected() {
        let mut queue = TestQueue::new(4);
        queue.push(1);
        queue.push(2);
        queue.pop();
        queue.contents.push_front(1); // Item 1 handed out and still held

        let results = BoundedQueuePropertyChecker::new(&queue).check_all();
        assert!(!result(&results, "NoDuplicates").holds);
    }

    #[test]
    fn test_phantom_detected() {
        let mut queue = TestQueue::new(4);
        queue.push(1);
        queue.contents.push_back(99);

        let results = BoundedQueuePropertyChecker::new(&queue).check_all();
        assert!(!result(&results, "NoPhantomItems").holds);
    }

    #[test]
    fn test_reordering_detected() {
        let mut queue = TestQueue::new(4);
        queue.push(1);
        queue.push(2);
        queue.contents.swap(0, 1);
        queue.pop();

        let results = BoundedQueuePropertyChecker::new(&queue).check_all();
        let fifo = result(&results, "FIFO_Order");
        assert!(!fifo.holds);
        assert!(fifo.violation.as_ref().unwrap().contains("Consumed item at index 0"));
        assert!(result(&results, "NoLostItems").holds);
    }

    #[test]
    fn test_over_capacity_detected() {
        let mut queue = TestQueue::new(2);
        queue.push(1);
        queue.push(2);
        queue.push(3);

        let results = BoundedQueuePropertyChecker::new(&queue).check_all();
        assert!(!result(&results, "BoundedCapacity").holds);
    }

    #[test]
    fn test_spurious_block_detected() {
        let mut queue = TestQueue::new(2);
        queue.spurious = 2;

        let results = BoundedQueuePropertyChecker::new(&queue).check_all();
        let blocked = result(&results, "BlockOnlyAtLimit");
        assert!(!blocked.holds);
        assert!(blocked.violation.as_ref().unwrap().starts_with("2 operations"));
    }

    #[test]
    fn test_success_after_shutdown_detected() {
        let mut queue = TestQueue::new(2);
        queue.late_successes = 1;

        let results = BoundedQueuePropertyChecker::new(&queue).check_all();
        assert!(!result(&results, "CancelledAfterShutdown").holds);
    }
}
