//! # wh-core
//!
//! Core types and invariants for the warehouse queue.
//!
//! This crate provides:
//! - `PropertyResult` and `PropertyChecker` for verifying invariants
//! - `Counterexample` for rendering failure paths as thread diagrams
//! - `BoundedQueueProperties`, the history a queue exposes for checking

pub mod counterexample;
pub mod invariants;
pub mod property;

pub use counterexample::{ActionOutcome, Counterexample, StateSnapshot, ThreadAction};
pub use invariants::{BoundedQueueProperties, BoundedQueuePropertyChecker};
pub use property::{PropertyChecker, PropertyResult};
