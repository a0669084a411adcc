//! # wh-warehouse
//!
//! A vehicle warehouse: producer threads stock cars and trucks into a shared
//! [`wh_queue::BoundedQueue`], consumer threads take them out and report each
//! one. The `warehouse` binary wraps [`Warehouse::run`] in a CLI.
//!
//! ```rust
//! use std::time::Duration;
//! use wh_warehouse::{DriverConfig, PrintSink, Warehouse};
//!
//! let config = DriverConfig {
//!     produce_interval: Duration::ZERO,
//!     consume_interval: Duration::ZERO,
//!     max_items: Some(10),
//!     ..DriverConfig::default()
//! };
//! let summary = Warehouse::run_with_sink(&config, &PrintSink::new(Vec::new())).unwrap();
//! assert_eq!(summary.produced, summary.consumed + summary.drained);
//! ```

pub mod driver;
pub mod error;
pub mod sink;
pub mod vehicle;

pub use driver::{
    DriverConfig, RunSummary, Warehouse, CONSUME_INTERVAL_DEFAULT, MIN_CONSUMERS,
    PRODUCE_INTERVAL_DEFAULT,
};
pub use error::DriverError;
pub use sink::PrintSink;
pub use vehicle::{Describe, Vehicle, VehicleFactory, VehicleKind, FIRST_VEHICLE_ID};
