//! Profile orchestration
//!
//! The driver runs the project lifecycle over one or more profiles:
//!
//! ```text
//! load ─▶ tidy ─▶ install ─▶ resolve
//!           └───────▶ save
//! ```
//!
//! Each operation fans out across its profiles through the task runner.
//! Operations lock the project paths they touch, in sorted order, so two
//! calls on the same project are serialised while unrelated projects
//! proceed in parallel.

mod tidy;

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Result, RocketError};
use crate::installation::{InstallationCache, Installations};
use crate::profile::Profile;
use crate::registry::PackageRegistry;
use crate::task::{self, RunOptions, Task};

/// A profile together with the project directory it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileEntry {
    pub path: PathBuf,
    pub profile: Profile,
}

impl ProfileEntry {
    pub fn new(path: impl Into<PathBuf>, profile: Profile) -> Self {
        Self {
            path: path.into(),
            profile,
        }
    }
}

/// How [`Driver::save_profiles`] treats the filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct SaveOptions {
    /// Create the profile directory when missing
    pub ensure_paths: bool,
    /// Replace an existing profile file
    pub overwrite: bool,
}

pub struct Driver {
    registry: Arc<PackageRegistry>,
    installations: Arc<InstallationCache>,
    run_options: RunOptions,
    path_locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("run_options", &self.run_options)
            .finish_non_exhaustive()
    }
}

impl Driver {
    pub fn new(
        registry: Arc<PackageRegistry>,
        installations: Arc<InstallationCache>,
        run_options: RunOptions,
    ) -> Self {
        Self {
            registry,
            installations,
            run_options,
            path_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Read the profiles of `paths`
    ///
    /// A project without a profile gets a copy of `default` when one is
    /// given; otherwise it is a [`RocketError::ProfileNotFound`].
    pub fn load_profiles(
        &self,
        token: &CancellationToken,
        paths: &[PathBuf],
        default: Option<&Profile>,
    ) -> Result<Vec<ProfileEntry>> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        let locks = self.path_locks(paths.iter().map(PathBuf::as_path));
        let _guards = lock_all(&locks);

        let tasks: Vec<Task<'_, ProfileEntry>> = paths
            .iter()
            .map(|path| {
                task::task(move |token: &CancellationToken| {
                    if token.is_cancelled() {
                        return Err(RocketError::Cancelled);
                    }
                    debug!(path = %path.display(), "loading profile");
                    let profile = match (Profile::load(path), default) {
                        (Ok(profile), _) => profile,
                        (Err(RocketError::ProfileNotFound { .. }), Some(default)) => default.clone(),
                        (Err(e), _) => return Err(e),
                    };
                    Ok(ProfileEntry::new(path.clone(), profile))
                })
            })
            .collect();
        task::run(token, tasks, self.run_options)
    }

    /// Rewrite each profile's dependencies to their resolved, typed form
    pub fn tidy_profiles(&self, token: &CancellationToken, entries: &mut [ProfileEntry], update: bool) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let locks = self.path_locks(entries.iter().map(|e| e.path.as_path()));
        let _guards = lock_all(&locks);

        let tasks: Vec<Task<'_, _>> = entries
            .iter()
            .map(|entry| {
                let profile = &entry.profile;
                task::task(move |token: &CancellationToken| self.tidy_dependencies(token, profile, update))
            })
            .collect();
        let tidied = task::run(token, tasks, self.run_options)?;

        for (entry, dependencies) in entries.iter_mut().zip(tidied) {
            entry.profile.dependencies = dependencies;
        }
        Ok(())
    }

    /// Download and extract everything the profiles depend on
    pub fn install_profiles(&self, token: &CancellationToken, entries: &[ProfileEntry]) -> Result<()> {
        self.installations_for(token, entries, true).map(|_| ())
    }

    /// Installations of each profile, which must already be on disk
    pub fn resolve_profiles(&self, token: &CancellationToken, entries: &[ProfileEntry]) -> Result<Vec<Installations>> {
        self.installations_for(token, entries, false)
    }

    /// Validate and write each profile back to its project
    pub fn save_profiles(&self, token: &CancellationToken, entries: &[ProfileEntry], options: SaveOptions) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let locks = self.path_locks(entries.iter().map(|e| e.path.as_path()));
        let _guards = lock_all(&locks);

        let tasks: Vec<Task<'_, ()>> = entries
            .iter()
            .map(|entry| {
                task::task(move |token: &CancellationToken| {
                    if token.is_cancelled() {
                        return Err(RocketError::Cancelled);
                    }
                    debug!(path = %entry.path.display(), "saving profile");
                    entry
                        .profile
                        .save(&entry.path, options.ensure_paths, options.overwrite)
                })
            })
            .collect();
        task::run(token, tasks, self.run_options).map(|_| ())
    }

    fn installations_for(
        &self,
        token: &CancellationToken,
        entries: &[ProfileEntry],
        fetch: bool,
    ) -> Result<Vec<Installations>> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }
        let locks = self.path_locks(entries.iter().map(|e| e.path.as_path()));
        let _guards = lock_all(&locks);

        let tasks: Vec<Task<'_, Installations>> = entries
            .iter()
            .map(|entry| {
                task::task(move |token: &CancellationToken| {
                    debug!(path = %entry.path.display(), fetch, "materialising profile");
                    self.installations
                        .get_installations(token, &entry.profile.dependencies, fetch)
                })
            })
            .collect();
        task::run(token, tasks, self.run_options)
    }

    /// Locks for `paths`, deduplicated and in a stable order
    fn path_locks<'p>(&self, paths: impl Iterator<Item = &'p Path>) -> Vec<Arc<Mutex<()>>> {
        let keys: BTreeSet<PathBuf> = paths
            .map(|p| std::path::absolute(p).unwrap_or_else(|_| p.to_path_buf()))
            .collect();

        let mut locks = self
            .path_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        keys.into_iter()
            .map(|key| Arc::clone(locks.entry(key).or_default()))
            .collect()
    }
}

fn lock_all(locks: &[Arc<Mutex<()>>]) -> Vec<MutexGuard<'_, ()>> {
    locks
        .iter()
        .map(|lock| lock.lock().unwrap_or_else(PoisonError::into_inner))
        .collect()
}
