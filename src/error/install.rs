//! Download, extraction and installation errors

use std::path::Path;

use super::{RocketError, display_path};

/// Creates an installation not found error
pub fn not_found(reference: impl Into<String>, path: &Path) -> RocketError {
    RocketError::InstallationNotFound {
        reference: reference.into(),
        path: display_path(path),
    }
}

/// Creates a download failed error
pub fn download_failed(uri: impl Into<String>, reason: impl Into<String>) -> RocketError {
    RocketError::DownloadFailed {
        uri: uri.into(),
        reason: reason.into(),
    }
}

/// Creates an extraction failed error
pub fn extract_failed(path: &Path, reason: impl Into<String>) -> RocketError {
    RocketError::ExtractFailed {
        path: display_path(path),
        reason: reason.into(),
    }
}
