//! Invariant traits for verified concurrent structures.
//!
//! - `bounded_queue`: blocking bounded FIFO invariants (NoLostItems,
//!   NoDuplicates, FIFO_Order, BoundedCapacity, BlockOnlyAtLimit,
//!   CancelledAfterShutdown)

pub mod bounded_queue;

pub use bounded_queue::{BoundedQueueProperties, BoundedQueuePropertyChecker};
