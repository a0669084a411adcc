//! Error taxonomy for the bounded queue.

use thiserror::Error;

/// Errors returned by [`BoundedQueue`](crate::BoundedQueue).
///
/// Contention is never an error: a full or empty queue makes the caller wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The requested capacity violates the [`CapacityPolicy`](crate::CapacityPolicy).
    #[error("invalid capacity {requested}: {}", describe_bounds(.minimum, .maximum))]
    InvalidCapacity {
        /// Wide enough to echo both signed and unsigned requests unchanged.
        requested: i128,
        minimum: usize,
        maximum: Option<usize>,
    },

    /// The queue was shut down before or while the caller was waiting.
    #[error("queue has been shut down")]
    Cancelled,

    /// A timed push or pop reached its deadline.
    #[error("timed out waiting on the queue")]
    Timeout,
}

impl QueueError {
    /// True for the clean-shutdown signal.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, QueueError::Cancelled)
    }
}

fn describe_bounds(minimum: &usize, maximum: &Option<usize>) -> String {
    match maximum {
        Some(maximum) => format!("must be between {minimum} and {maximum}"),
        None => format!("must be at least {minimum}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_bounds() {
        let err = QueueError::InvalidCapacity {
            requested: -5,
            minimum: 8,
            maximum: Some(1024),
        };
        let message = err.to_string();
        assert!(message.contains("-5"));
        assert!(message.contains("between 8 and 1024"));

        let err = QueueError::InvalidCapacity {
            requested: 3,
            minimum: 8,
            maximum: None,
        };
        assert_eq!(err.to_string(), "invalid capacity 3: must be at least 8");
    }

    #[test]
    fn test_is_cancelled() {
        assert!(QueueError::Cancelled.is_cancelled());
        assert!(!QueueError::Timeout.is_cancelled());
    }
}
