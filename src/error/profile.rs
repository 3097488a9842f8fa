//! Project profile errors

use std::path::Path;

use super::{RocketError, display_path};

/// Creates a profile validation failed error
pub fn validation_failed(message: impl Into<String>) -> RocketError {
    RocketError::ProfileValidationFailed {
        message: message.into(),
    }
}

/// Creates a profile not found error
pub fn not_found(path: &Path) -> RocketError {
    RocketError::ProfileNotFound {
        path: display_path(path),
    }
}

/// Creates a profile already exists error
pub fn exists(path: &Path) -> RocketError {
    RocketError::ProfileExists {
        path: display_path(path),
    }
}
