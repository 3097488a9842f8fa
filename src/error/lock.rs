//! File lock errors

use std::path::Path;

use super::{RocketError, display_path};

/// Creates a lock held error
pub fn held(path: &Path) -> RocketError {
    RocketError::LockHeld {
        path: display_path(path),
    }
}
