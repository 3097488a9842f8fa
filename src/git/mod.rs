//! Git operations on registry clones
//!
//! Registries are plain git repositories of package descriptors. A registry
//! is cloned the first time one of its references is needed and pulled when
//! an update is requested. Pulling never merges: the checked-out branch is
//! reset hard onto whatever `origin` has, since the local clone is a mirror.
//!
//! The registry talks to git through the [`Vcs`] trait so tests and
//! alternative transports can stand in for [`GitVcs`].

mod auth;
mod error;

use std::fs;
use std::path::Path;

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{FetchOptions, RemoteCallbacks, Repository, ResetType};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{
    Result, RocketError,
    fs as fs_err,
    git::{clone_failed, open_failed, pull_failed},
};

pub use auth::setup_auth_callbacks;
pub use error::interpret_git_error;

/// Clone/pull collaborator used by the package registry
pub trait Vcs: Send + Sync {
    /// Clone `url` into `path`
    fn clone_repo(&self, token: &CancellationToken, url: &str, path: &Path) -> Result<()>;

    /// Bring the clone at `path` up to date with its origin
    fn pull(&self, token: &CancellationToken, path: &Path) -> Result<()>;
}

/// [`Vcs`] backed by libgit2
#[derive(Debug, Default, Clone, Copy)]
pub struct GitVcs;

impl Vcs for GitVcs {
    fn clone_repo(&self, token: &CancellationToken, url: &str, path: &Path) -> Result<()> {
        clone(token, url, path).map(|_| ())
    }

    fn pull(&self, token: &CancellationToken, path: &Path) -> Result<()> {
        pull(token, path)
    }
}

fn fetch_options(token: &CancellationToken) -> FetchOptions<'static> {
    let mut callbacks = RemoteCallbacks::new();
    setup_auth_callbacks(&mut callbacks);

    // Returning false aborts the transfer.
    let token = token.clone();
    callbacks.transfer_progress(move |_| !token.is_cancelled());

    let mut options = FetchOptions::new();
    options.remote_callbacks(callbacks);
    options
}

/// Clone `url` into `target`
///
/// A failed clone removes whatever it left behind so the next attempt does
/// not mistake a half-written directory for a registry.
pub fn clone(token: &CancellationToken, url: &str, target: &Path) -> Result<Repository> {
    if token.is_cancelled() {
        return Err(RocketError::Cancelled);
    }

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| fs_err::write_failed(parent, e))?;
    }

    info!(url, path = %target.display(), "cloning registry");

    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch_options(token));
    builder.clone(url, target).map_err(|e| {
        let _ = fs::remove_dir_all(target);
        if token.is_cancelled() {
            RocketError::Cancelled
        } else {
            clone_failed(url, interpret_git_error(&e))
        }
    })
}

/// Fetch `origin` and hard-reset the checked-out branch onto it
pub fn pull(token: &CancellationToken, path: &Path) -> Result<()> {
    if token.is_cancelled() {
        return Err(RocketError::Cancelled);
    }

    let repo = open(path)?;
    let failed = |e: git2::Error| {
        if token.is_cancelled() {
            RocketError::Cancelled
        } else {
            pull_failed(path, interpret_git_error(&e))
        }
    };

    debug!(path = %path.display(), "pulling registry");

    let mut remote = repo.find_remote("origin").map_err(failed)?;
    remote
        .fetch::<&str>(&[], Some(&mut fetch_options(token)), None)
        .map_err(failed)?;

    let tracking = match head_branch(&repo) {
        Some(branch) => format!("refs/remotes/origin/{branch}"),
        None => "refs/remotes/origin/HEAD".to_string(),
    };
    let target = repo
        .find_reference(&tracking)
        .and_then(|r| r.peel_to_commit())
        .map_err(failed)?;

    let mut checkout = CheckoutBuilder::new();
    checkout.force();
    repo.reset(target.as_object(), ResetType::Hard, Some(&mut checkout))
        .map_err(failed)?;

    debug!(path = %path.display(), commit = %target.id(), "registry updated");
    Ok(())
}

/// Open an existing clone
pub fn open(path: &Path) -> Result<Repository> {
    Repository::open(path).map_err(|e| open_failed(path, e.message()))
}

/// Name of the checked-out branch, `None` when HEAD is detached
fn head_branch(repo: &Repository) -> Option<String> {
    let head = repo.head().ok()?;
    if head.is_branch() {
        head.shorthand().map(ToString::to_string)
    } else {
        None
    }
}
