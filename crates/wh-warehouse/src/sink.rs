//! Serialized consumer output.

use std::io::{self, Stdout, Write};
use std::sync::{Mutex, PoisonError};

use crate::vehicle::Describe;

/// Writes consumer reports as whole blocks.
///
/// Each report is one header line, the item description and a blank line.
/// The writer stays locked for the entire block, so reports from concurrent
/// consumers never interleave.
#[derive(Debug)]
pub struct PrintSink<W> {
    out: Mutex<W>,
}

impl PrintSink<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> PrintSink<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    /// Report that consumer `consumer` took `item`.
    pub fn report<D: Describe + ?Sized>(&self, consumer: usize, item: &D) -> io::Result<()> {
        let block = format!(
            "======= Consumer {} =======\n{}\n\n",
            consumer,
            item.describe()
        );

        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        out.write_all(block.as_bytes())?;
        out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}
