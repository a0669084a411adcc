//! Driver errors.

use std::io;

use thiserror::Error;
use wh_queue::QueueError;

/// Errors from configuring or running the warehouse.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("need at least {minimum} consumers, got {requested}")]
    InvalidConsumers { requested: usize, minimum: usize },

    #[error("need at least one producer")]
    NoProducers,

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("failed to write report: {0}")]
    Io(#[from] io::Error),

    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),
}
