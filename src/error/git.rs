//! Registry clone/pull errors

use std::path::Path;

use super::{RocketError, display_path};

/// Creates a clone failed error
pub fn clone_failed(url: impl Into<String>, reason: impl Into<String>) -> RocketError {
    RocketError::GitCloneFailed {
        url: url.into(),
        reason: reason.into(),
    }
}

/// Creates a pull failed error
pub fn pull_failed(path: &Path, reason: impl Into<String>) -> RocketError {
    RocketError::GitPullFailed {
        path: display_path(path),
        reason: reason.into(),
    }
}

/// Creates an open failed error
pub fn open_failed(path: &Path, reason: impl Into<String>) -> RocketError {
    RocketError::GitOpenFailed {
        path: display_path(path),
        reason: reason.into(),
    }
}
