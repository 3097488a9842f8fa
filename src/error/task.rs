//! Task runner errors

use super::RocketError;

/// Creates an invalid concurrency error
pub fn invalid_concurrency(value: usize, reason: impl Into<String>) -> RocketError {
    RocketError::InvalidConcurrency {
        value,
        reason: reason.into(),
    }
}

/// Creates an invalid execution mode error
pub fn invalid_mode(mode: impl Into<String>) -> RocketError {
    RocketError::InvalidExecutionMode { mode: mode.into() }
}

/// Creates a task panicked error
pub fn panicked(message: impl Into<String>) -> RocketError {
    RocketError::TaskPanicked {
        message: message.into(),
    }
}

/// Creates a worker pool start-up error
pub fn pool_failed(threads: usize, reason: impl Into<String>) -> RocketError {
    RocketError::ThreadPoolFailed {
        threads,
        reason: reason.into(),
    }
}
