//! Package descriptor and resolution errors

use std::path::Path;

use super::{RocketError, display_path};

/// Creates a package validation failed error
pub fn validation_failed(reference: impl Into<String>, message: impl Into<String>) -> RocketError {
    RocketError::PackageValidationFailed {
        reference: reference.into(),
        message: message.into(),
    }
}

/// Creates a package not found error
pub fn not_found(reference: impl Into<String>, path: &Path) -> RocketError {
    RocketError::PackageNotFound {
        reference: reference.into(),
        path: display_path(path),
    }
}

/// Creates a missing platform source error
pub fn source_not_found(reference: impl Into<String>, platform: impl Into<String>) -> RocketError {
    RocketError::SourceNotFound {
        reference: reference.into(),
        platform: platform.into(),
    }
}

/// Creates a type mismatch error
pub fn type_mismatch(
    reference: impl Into<String>,
    expected: impl Into<String>,
    actual: impl Into<String>,
) -> RocketError {
    RocketError::TypeMismatch {
        reference: reference.into(),
        expected: expected.into(),
        actual: actual.into(),
    }
}

/// Creates a circular dependency error from the chain of references
pub fn circular<S: AsRef<str>>(chain: &[S]) -> RocketError {
    RocketError::CircularDependency {
        chain: chain
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(" -> "),
    }
}

/// Creates a dependency depth exceeded error
pub fn depth_exceeded(reference: impl Into<String>, max_depth: usize) -> RocketError {
    RocketError::DependencyDepthExceeded {
        reference: reference.into(),
        max_depth,
    }
}
