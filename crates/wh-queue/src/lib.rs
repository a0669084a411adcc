//! # wh-queue
//!
//! A blocking bounded FIFO queue for producer/consumer workloads.
//!
//! `push` waits while the queue is full and `pop` waits while it is empty,
//! so backpressure flows in both directions without errors or dropped items.
//! [`BoundedQueue::shutdown`] releases every waiter with
//! [`QueueError::Cancelled`] so workloads can stop cleanly.
//!
//! ```rust
//! use wh_queue::{BoundedQueue, QueueError};
//!
//! let queue = BoundedQueue::new(8)?;
//! queue.push("car")?;
//! queue.push("truck")?;
//! assert_eq!(queue.pop()?, "car");
//!
//! queue.shutdown();
//! assert_eq!(queue.pop(), Err(QueueError::Cancelled));
//! # Ok::<(), QueueError>(())
//! ```
//!
//! ## Verification
//!
//! - Unit and proptest suites run with a plain `cargo test -p wh-queue`.
//! - DST runs live in `tests/` and use `wh-dst`; reproduce with `DST_SEED=<seed>`.
//! - Loom models the blocking protocol:
//!   `RUSTFLAGS="--cfg loom" cargo test -p wh-queue --lib --release`

pub mod bounded_queue;
pub mod config;
pub mod error;
mod sync;

pub use bounded_queue::{BoundedQueue, QueueState};
pub use config::{CapacityPolicy, QueueConfig, CAPACITY_DEFAULT, CAPACITY_MIN_DEFAULT};
pub use error::QueueError;
