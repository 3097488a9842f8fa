//! File system errors

use std::path::Path;

use super::{RocketError, display_path};

/// Creates a file read failed error
pub fn read_failed(path: &Path, reason: impl ToString) -> RocketError {
    RocketError::FileReadFailed {
        path: display_path(path),
        reason: reason.to_string(),
    }
}

/// Creates a file write failed error
pub fn write_failed(path: &Path, reason: impl ToString) -> RocketError {
    RocketError::FileWriteFailed {
        path: display_path(path),
        reason: reason.to_string(),
    }
}

/// Creates an IO error with operation context
pub fn io_error(message: impl Into<String>) -> RocketError {
    RocketError::IoError {
        message: message.into(),
    }
}
