//! Reference parsing errors

use super::RocketError;

/// Creates an invalid reference error
pub fn invalid(reference: impl Into<String>, reason: impl Into<String>) -> RocketError {
    RocketError::InvalidReference {
        reference: reference.into(),
        reason: reason.into(),
    }
}
