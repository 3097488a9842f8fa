//! Error types and handling for RocketBlend
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.
//!
//! This module is organized into sub-modules by error domain:
//! - [`reference`]: Reference parsing errors
//! - [`package`]: Package descriptor and resolution errors
//! - [`profile`]: Project profile errors
//! - [`git`]: Registry clone/pull errors
//! - [`install`]: Download, extraction and installation errors
//! - [`lock`]: File lock contention errors
//! - [`task`]: Task runner errors
//! - [`fs`]: File system errors

pub mod fs;
pub mod git;
pub mod install;
pub mod lock;
pub mod package;
pub mod profile;
pub mod reference;
pub mod task;

use std::path::Path;

use miette::Diagnostic;
use thiserror::Error;

/// Main error type for RocketBlend operations
#[derive(Error, Diagnostic, Debug)]
pub enum RocketError {
    // Reference errors
    #[error("Invalid reference '{reference}': {reason}")]
    #[diagnostic(
        code(rocketblend::reference::invalid),
        help("References look like <host>/<org>/<repo>/<path...> or local/<path...>")
    )]
    InvalidReference { reference: String, reason: String },

    // Package errors
    #[error("Package validation failed for '{reference}': {message}")]
    #[diagnostic(code(rocketblend::package::validation_failed))]
    PackageValidationFailed { reference: String, message: String },

    #[error("Package not found: {reference}")]
    #[diagnostic(
        code(rocketblend::package::not_found),
        help("Check the reference, or run 'rocketblend tidy --update' to refresh the registry")
    )]
    PackageNotFound { reference: String, path: String },

    #[error("Package '{reference}' has no source for platform '{platform}'")]
    #[diagnostic(code(rocketblend::package::source_not_found))]
    SourceNotFound { reference: String, platform: String },

    #[error("Type mismatch for '{reference}': expected {expected}, found {actual}")]
    #[diagnostic(code(rocketblend::package::type_mismatch))]
    TypeMismatch {
        reference: String,
        expected: String,
        actual: String,
    },

    #[error("Circular dependency detected: {chain}")]
    #[diagnostic(
        code(rocketblend::package::circular),
        help("Remove the circular dependency from the package descriptors")
    )]
    CircularDependency { chain: String },

    #[error("Dependency depth of {max_depth} exceeded while resolving '{reference}'")]
    #[diagnostic(code(rocketblend::package::depth_exceeded))]
    DependencyDepthExceeded { reference: String, max_depth: usize },

    // Profile errors
    #[error("Profile validation failed: {message}")]
    #[diagnostic(code(rocketblend::profile::validation_failed))]
    ProfileValidationFailed { message: String },

    #[error("Profile not found: {path}")]
    #[diagnostic(
        code(rocketblend::profile::not_found),
        help("Run 'rocketblend new' to create a profile for this project")
    )]
    ProfileNotFound { path: String },

    #[error("Profile already exists: {path}")]
    #[diagnostic(
        code(rocketblend::profile::exists),
        help("Pass --force to overwrite the existing profile")
    )]
    ProfileExists { path: String },

    // Git errors
    #[error("Failed to clone registry {url}: {reason}")]
    #[diagnostic(
        code(rocketblend::git::clone_failed),
        help("Check that the registry URL is correct and you have access to it")
    )]
    GitCloneFailed { url: String, reason: String },

    #[error("Failed to pull registry at '{path}': {reason}")]
    #[diagnostic(code(rocketblend::git::pull_failed))]
    GitPullFailed { path: String, reason: String },

    #[error("Failed to open repository at '{path}': {reason}")]
    #[diagnostic(code(rocketblend::git::open_failed))]
    GitOpenFailed { path: String, reason: String },

    #[error("Git operation failed: {message}")]
    #[diagnostic(code(rocketblend::git::operation_failed))]
    GitOperationFailed { message: String },

    // Installation errors
    #[error("Installation not found for '{reference}' at {path}")]
    #[diagnostic(
        code(rocketblend::install::not_found),
        help("Run 'rocketblend install' to download missing dependencies")
    )]
    InstallationNotFound { reference: String, path: String },

    #[error("Failed to download {uri}: {reason}")]
    #[diagnostic(code(rocketblend::install::download_failed))]
    DownloadFailed { uri: String, reason: String },

    #[error("Failed to extract {path}: {reason}")]
    #[diagnostic(code(rocketblend::install::extract_failed))]
    ExtractFailed { path: String, reason: String },

    // Lock errors
    #[error("Lock is held by another process: {path}")]
    #[diagnostic(
        code(rocketblend::lock::held),
        help("Another install of the same reference is running; retry once it finishes")
    )]
    LockHeld { path: String },

    // Task runner errors
    #[error("No tasks to execute")]
    #[diagnostic(code(rocketblend::task::no_tasks))]
    NoTasks,

    #[error("Invalid concurrency {value}: {reason}")]
    #[diagnostic(code(rocketblend::task::invalid_concurrency))]
    InvalidConcurrency { value: usize, reason: String },

    #[error("Invalid execution mode: {mode}")]
    #[diagnostic(
        code(rocketblend::task::invalid_mode),
        help("Valid modes: sequential, concurrent, bounded, worker-pool")
    )]
    InvalidExecutionMode { mode: String },

    #[error("Task panicked: {message}")]
    #[diagnostic(code(rocketblend::task::panicked))]
    TaskPanicked { message: String },

    #[error("Failed to start a pool of {threads} worker threads: {reason}")]
    #[diagnostic(code(rocketblend::task::pool_failed))]
    ThreadPoolFailed { threads: usize, reason: String },

    #[error("Operation cancelled")]
    #[diagnostic(code(rocketblend::task::cancelled))]
    Cancelled,

    // Configuration errors
    #[error("Failed to parse configuration file: {path}")]
    #[diagnostic(code(rocketblend::config::parse_failed))]
    ConfigParseFailed { path: String, reason: String },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(rocketblend::config::invalid))]
    ConfigInvalid { message: String },

    // File system errors
    #[error("Failed to read file: {path}: {reason}")]
    #[diagnostic(code(rocketblend::fs::read_failed))]
    FileReadFailed { path: String, reason: String },

    #[error("Failed to write file: {path}: {reason}")]
    #[diagnostic(code(rocketblend::fs::write_failed))]
    FileWriteFailed { path: String, reason: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(rocketblend::fs::io_error))]
    IoError { message: String },
}

impl RocketError {
    /// Whether this error is one of the "not found" kinds
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RocketError::PackageNotFound { .. }
                | RocketError::SourceNotFound { .. }
                | RocketError::InstallationNotFound { .. }
                | RocketError::ProfileNotFound { .. }
        )
    }
}

impl From<std::io::Error> for RocketError {
    fn from(err: std::io::Error) -> Self {
        RocketError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for RocketError {
    fn from(err: serde_yaml::Error) -> Self {
        RocketError::ConfigParseFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for RocketError {
    fn from(err: serde_json::Error) -> Self {
        RocketError::ConfigParseFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<git2::Error> for RocketError {
    fn from(err: git2::Error) -> Self {
        RocketError::GitOperationFailed {
            message: err.message().to_string(),
        }
    }
}

impl From<reqwest::Error> for RocketError {
    fn from(err: reqwest::Error) -> Self {
        RocketError::DownloadFailed {
            uri: err
                .url()
                .map_or_else(|| "unknown".to_string(), ToString::to_string),
            reason: err.to_string(),
        }
    }
}

/// Display helper used by the error constructors
pub(crate) fn display_path(path: &Path) -> String {
    path.display().to_string()
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, RocketError>;
