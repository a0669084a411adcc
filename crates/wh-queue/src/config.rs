//! Capacity policy and queue configuration.

use crate::error::QueueError;

/// Smallest capacity the default policy accepts. Capacities of 7 or less are
/// rejected.
pub const CAPACITY_MIN_DEFAULT: usize = 8;

/// Capacity used when nothing else is configured.
pub const CAPACITY_DEFAULT: usize = CAPACITY_MIN_DEFAULT;

/// Bounds a queue capacity must fall within, inclusive on both ends.
///
/// Only the minimum is enforced by default. An upper limit is opt-in via
/// [`with_maximum`](Self::with_maximum).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityPolicy {
    minimum: usize,
    maximum: Option<usize>,
}

impl Default for CapacityPolicy {
    fn default() -> Self {
        Self {
            minimum: CAPACITY_MIN_DEFAULT,
            maximum: None,
        }
    }
}

impl CapacityPolicy {
    /// Accept any capacity of 1 or more.
    #[must_use]
    pub fn unrestricted() -> Self {
        Self {
            minimum: 1,
            maximum: None,
        }
    }

    /// Reject capacities above `maximum`. A maximum below the minimum is
    /// raised to the minimum.
    #[must_use]
    pub fn with_maximum(mut self, maximum: usize) -> Self {
        self.maximum = Some(maximum.max(self.minimum));
        self
    }

    #[must_use]
    pub fn minimum(&self) -> usize {
        self.minimum
    }

    #[must_use]
    pub fn maximum(&self) -> Option<usize> {
        self.maximum
    }

    /// Validate a signed capacity, as read from a command line or config file.
    pub fn check(&self, requested: i64) -> Result<usize, QueueError> {
        match usize::try_from(requested) {
            Ok(capacity) => self.admit(capacity, i128::from(requested)),
            Err(_) => Err(self.invalid(i128::from(requested))),
        }
    }

    /// Validate an unsigned capacity.
    pub fn validate(&self, capacity: usize) -> Result<usize, QueueError> {
        self.admit(capacity, capacity as i128)
    }

    fn admit(&self, capacity: usize, requested: i128) -> Result<usize, QueueError> {
        let too_large = self.maximum.is_some_and(|maximum| capacity > maximum);
        if capacity < self.minimum || too_large {
            return Err(self.invalid(requested));
        }
        Ok(capacity)
    }

    fn invalid(&self, requested: i128) -> QueueError {
        QueueError::InvalidCapacity {
            requested,
            minimum: self.minimum,
            maximum: self.maximum,
        }
    }
}

/// Everything needed to build a [`BoundedQueue`](crate::BoundedQueue).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    pub capacity: usize,
    pub policy: CapacityPolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: CAPACITY_DEFAULT,
            policy: CapacityPolicy::default(),
        }
    }
}

impl QueueConfig {
    /// A config for small queues, e.g. in tests, that skips the minimum.
    #[must_use]
    pub fn unrestricted(capacity: usize) -> Self {
        Self {
            capacity,
            policy: CapacityPolicy::unrestricted(),
        }
    }
}
