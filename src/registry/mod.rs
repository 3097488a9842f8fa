//! Package registry
//!
//! Registries are git repositories of `rocketpack.yaml` descriptors mirrored
//! under the packages path:
//!
//! ```text
//! <packages>/
//! ├── github.com/rocketblend/official-library/    # clone of the registry
//! │   └── packages/v0/builds/blender/4.2.2/
//! │       └── rocketpack.yaml
//! └── local/                                      # inserted, never synced
//!     └── my/addon/rocketpack.yaml
//! ```
//!
//! A registry is cloned the first time one of its references is requested
//! and pulled when an update is asked for or a descriptor is missing. Nothing
//! is memoised across calls; every lookup reads the descriptor from disk.

mod resolve;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{Result, RocketError, fs as fs_err, package as package_err};
use crate::git::Vcs;
use crate::package::{PACKAGE_FILE_NAME, Package};
use crate::reference::Reference;
use crate::task::{self, RunOptions, Task};

pub use resolve::ResolvedDependencies;

/// Deepest chain of nested dependencies that will be followed
pub const MAX_DEPENDENCY_DEPTH: usize = 10;

/// Options for [`PackageRegistry::get_packages`]
#[derive(Debug, Clone)]
pub struct GetPackagesOptions {
    pub references: Vec<Reference>,
    /// Pull registries before loading
    pub update: bool,
    /// Levels of nested dependencies to follow; 0 loads only `references`
    pub depth: usize,
}

impl GetPackagesOptions {
    /// Load `references` and their full dependency closure
    pub fn closure(references: Vec<Reference>, update: bool) -> Self {
        Self {
            references,
            update,
            depth: MAX_DEPENDENCY_DEPTH,
        }
    }

    /// Load only `references`
    pub fn shallow(references: Vec<Reference>, update: bool) -> Self {
        Self {
            references,
            update,
            depth: 0,
        }
    }
}

/// Loaded packages keyed by reference
pub type Packages = BTreeMap<Reference, Package>;

/// On-disk mirror of package registries
pub struct PackageRegistry {
    packages_path: PathBuf,
    vcs: Arc<dyn Vcs>,
    run_options: RunOptions,
    repo_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl std::fmt::Debug for PackageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageRegistry")
            .field("packages_path", &self.packages_path)
            .field("run_options", &self.run_options)
            .finish_non_exhaustive()
    }
}

/// State shared by every task of one `get_packages` call
struct Lookup<'r> {
    registry: &'r PackageRegistry,
    update: bool,
    depth: usize,
    synced: Mutex<HashSet<String>>,
}

impl PackageRegistry {
    pub fn new(packages_path: impl Into<PathBuf>, vcs: Arc<dyn Vcs>, run_options: RunOptions) -> Self {
        Self {
            packages_path: packages_path.into(),
            vcs,
            run_options,
            repo_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn packages_path(&self) -> &Path {
        &self.packages_path
    }

    /// Directory holding the clone of `reference`'s registry
    pub fn repo_dir(&self, reference: &Reference) -> PathBuf {
        self.packages_path.join(reference.repo().trim_end_matches('/'))
    }

    /// Path of the descriptor for `reference`
    pub fn package_file(&self, reference: &Reference) -> PathBuf {
        self.packages_path
            .join(reference.as_str())
            .join(PACKAGE_FILE_NAME)
    }

    /// Load the requested packages, plus nested dependencies up to `depth`
    pub fn get_packages(&self, token: &CancellationToken, options: &GetPackagesOptions) -> Result<Packages> {
        if token.is_cancelled() {
            return Err(RocketError::Cancelled);
        }
        if options.references.is_empty() {
            return Ok(Packages::new());
        }

        let lookup = Lookup {
            registry: self,
            update: options.update,
            depth: options.depth.min(MAX_DEPENDENCY_DEPTH),
            synced: Mutex::new(HashSet::new()),
        };
        lookup.resolve_all(token, &options.references, &[])
    }

    /// Validate and write descriptors into the packages path
    pub fn insert_packages(&self, token: &CancellationToken, packages: &Packages) -> Result<()> {
        if packages.is_empty() {
            return Ok(());
        }

        let tasks: Vec<Task<'_, ()>> = packages
            .iter()
            .map(|(reference, package)| {
                task::task(move |token: &CancellationToken| self.insert_package(token, reference, package))
            })
            .collect();
        task::run(token, tasks, self.run_options).map(|_| ())
    }

    /// Remove the registry clones holding `references`
    ///
    /// Local references only remove their own package directory. A missing
    /// directory is not an error.
    pub fn remove_packages(&self, token: &CancellationToken, references: &[Reference]) -> Result<()> {
        if references.is_empty() {
            return Ok(());
        }

        let tasks: Vec<Task<'_, ()>> = references
            .iter()
            .map(|reference| {
                task::task(move |token: &CancellationToken| self.remove_package(token, reference))
            })
            .collect();
        task::run(token, tasks, self.run_options).map(|_| ())
    }

    fn insert_package(&self, token: &CancellationToken, reference: &Reference, package: &Package) -> Result<()> {
        if token.is_cancelled() {
            return Err(RocketError::Cancelled);
        }
        package.validate(reference.as_str())?;

        let path = self.package_file(reference);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| fs_err::write_failed(dir, e))?;
        }
        fs::write(&path, package.to_yaml()?).map_err(|e| fs_err::write_failed(&path, e))?;

        debug!(reference = %reference, path = %path.display(), "package inserted");
        Ok(())
    }

    fn remove_package(&self, token: &CancellationToken, reference: &Reference) -> Result<()> {
        if token.is_cancelled() {
            return Err(RocketError::Cancelled);
        }

        let dir = if reference.is_local_only() {
            self.packages_path.join(reference.as_str())
        } else {
            self.repo_dir(reference)
        };

        let lock = self.repo_lock(reference.repo());
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        match fs::remove_dir_all(&dir) {
            Ok(()) => {
                info!(reference = %reference, path = %dir.display(), "removed package");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(reference = %reference, path = %dir.display(), "nothing to remove");
                Ok(())
            }
            Err(e) => Err(fs_err::write_failed(&dir, e)),
        }
    }

    /// In-process lock serialising clone/pull of one registry
    fn repo_lock(&self, repo: &str) -> Arc<Mutex<()>> {
        let mut locks = self.repo_locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(repo.to_string()).or_default())
    }

    /// Make sure the registry clone for `reference` is present and, if
    /// requested, current
    fn sync_repo(&self, token: &CancellationToken, reference: &Reference, lookup: &Lookup<'_>) -> Result<()> {
        if reference.is_local_only() {
            return Ok(());
        }

        let repo = reference.repo();
        let lock = self.repo_lock(repo);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        if lookup.is_synced(repo) {
            return Ok(());
        }

        let repo_dir = self.repo_dir(reference);
        let package_file = self.package_file(reference);

        if !repo_dir.exists() {
            let url = reference.repo_url()?;
            self.vcs.clone_repo(token, &url, &repo_dir)?;
            lookup.mark_synced(repo);
        } else if lookup.update || !package_file.exists() {
            info!(reference = %reference, path = %repo_dir.display(), "pulling registry");
            self.vcs.pull(token, &repo_dir)?;
            lookup.mark_synced(repo);
        }
        Ok(())
    }

    fn load_package(&self, reference: &Reference) -> Result<Package> {
        let path = self.package_file(reference);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(package_err::not_found(reference.as_str(), &path));
            }
            Err(e) => return Err(fs_err::read_failed(&path, e)),
        };
        Package::from_yaml(&content, reference.as_str())
    }
}

impl Lookup<'_> {
    fn is_synced(&self, repo: &str) -> bool {
        self.synced
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(repo)
    }

    fn mark_synced(&self, repo: &str) {
        self.synced
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(repo.to_string());
    }

    fn resolve_all(&self, token: &CancellationToken, references: &[Reference], chain: &[Reference]) -> Result<Packages> {
        let tasks: Vec<Task<'_, Packages>> = references
            .iter()
            .map(|reference| {
                task::task(move |token: &CancellationToken| self.resolve(token, reference, chain))
            })
            .collect();

        let mut packages = Packages::new();
        for found in task::run(token, tasks, self.registry.run_options)? {
            packages.extend(found);
        }
        Ok(packages)
    }

    /// Load `reference` and, within the depth limit, its dependencies
    ///
    /// `chain` holds the references on the path from the requested package
    /// down to this one.
    fn resolve(&self, token: &CancellationToken, reference: &Reference, chain: &[Reference]) -> Result<Packages> {
        if token.is_cancelled() {
            return Err(RocketError::Cancelled);
        }
        if chain.contains(reference) {
            let mut cycle = chain.to_vec();
            cycle.push(reference.clone());
            return Err(package_err::circular(&cycle));
        }

        debug!(reference = %reference, level = chain.len(), "loading package");
        self.registry.sync_repo(token, reference, self)?;
        let package = self.registry.load_package(reference)?;

        let level = chain.len();
        let dependencies = package.dependencies.clone();
        let mut packages = Packages::new();
        packages.insert(reference.clone(), package);

        if dependencies.is_empty() {
            return Ok(packages);
        }
        if level >= self.depth {
            if self.depth == MAX_DEPENDENCY_DEPTH {
                return Err(package_err::depth_exceeded(reference.as_str(), MAX_DEPENDENCY_DEPTH));
            }
            return Ok(packages);
        }

        let mut child_chain = chain.to_vec();
        child_chain.push(reference.clone());
        let child_refs: Vec<Reference> = dependencies.iter().map(|d| d.reference.clone()).collect();
        let children = self.resolve_all(token, &child_refs, &child_chain)?;

        for dependency in &dependencies {
            let actual = children.get(&dependency.reference).map(|p| p.package_type);
            if let Some(actual) = actual.filter(|t| *t != dependency.package_type) {
                return Err(package_err::type_mismatch(
                    dependency.reference.as_str(),
                    dependency.package_type.as_str(),
                    actual.as_str(),
                ));
            }
        }

        packages.extend(children);
        Ok(packages)
    }
}

#[cfg(test)]
mod tests;
