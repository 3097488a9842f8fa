//! Installation cache
//!
//! Materialises packages on disk:
//!
//! ```text
//! <installations>/<reference>/
//! ├── <resource>          # extracted artifact the installation points at
//! ├── reference.lock      # only while an install is in progress
//! └── download.json       # only while a download is in flight
//! ```
//!
//! Installing one reference is serialised across processes by the file lock
//! in its directory; different references install in parallel. A failed
//! install is not rolled back; the next run sees the missing resource and
//! tries again.

mod download;
mod extract;

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{
    Result, RocketError,
    fs as fs_err,
    install::{download_failed, not_found},
    package::{source_not_found, type_mismatch},
};
use crate::filelock;
use crate::package::{Dependency, Package, PackageType, Source};
use crate::platform::Platform;
use crate::reference::Reference;
use crate::registry::{GetPackagesOptions, PackageRegistry};
use crate::task::{self, RunOptions, Task};

pub use download::{Downloader, HttpDownloader, PROGRESS_FILE_NAME};
pub use extract::{ArchiveExtractor, Extractor, is_supported_archive};

/// A package materialised on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installation {
    /// Extracted resource; `None` for packages bundled with the build
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    #[serde(rename = "type")]
    pub package_type: PackageType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Installation {
    fn new(package: &Package, path: Option<PathBuf>) -> Self {
        Self {
            path,
            package_type: package.package_type,
            name: package.name.clone(),
            version: package.version.clone(),
        }
    }
}

/// Installations keyed by reference
pub type Installations = BTreeMap<Reference, Installation>;

pub struct InstallationCache {
    installations_path: PathBuf,
    platform: Platform,
    registry: Arc<PackageRegistry>,
    downloader: Arc<dyn Downloader>,
    extractor: Arc<dyn Extractor>,
    run_options: RunOptions,
}

impl std::fmt::Debug for InstallationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallationCache")
            .field("installations_path", &self.installations_path)
            .field("platform", &self.platform)
            .field("run_options", &self.run_options)
            .finish_non_exhaustive()
    }
}

impl InstallationCache {
    pub fn new(
        installations_path: impl Into<PathBuf>,
        platform: Platform,
        registry: Arc<PackageRegistry>,
        downloader: Arc<dyn Downloader>,
        extractor: Arc<dyn Extractor>,
        run_options: RunOptions,
    ) -> Self {
        Self {
            installations_path: installations_path.into(),
            platform,
            registry,
            downloader,
            extractor,
            run_options,
        }
    }

    pub fn installations_path(&self) -> &Path {
        &self.installations_path
    }

    /// Directory holding the installation of `reference`
    pub fn installation_dir(&self, reference: &Reference) -> PathBuf {
        self.installations_path.join(reference.as_str())
    }

    /// Installations for `dependencies`
    ///
    /// With `fetch` missing resources are downloaded and extracted; without
    /// it a missing resource is an [`RocketError::InstallationNotFound`].
    pub fn get_installations(
        &self,
        token: &CancellationToken,
        dependencies: &[Dependency],
        fetch: bool,
    ) -> Result<Installations> {
        if token.is_cancelled() {
            return Err(RocketError::Cancelled);
        }
        if dependencies.is_empty() {
            return Ok(Installations::new());
        }

        let references: Vec<Reference> = dependencies.iter().map(|d| d.reference.clone()).collect();
        let packages = self
            .registry
            .get_packages(token, &GetPackagesOptions::shallow(references, false))?;

        for dependency in dependencies {
            let package = packages.get(&dependency.reference).ok_or_else(|| {
                crate::error::package::not_found(
                    dependency.reference.as_str(),
                    &self.registry.package_file(&dependency.reference),
                )
            })?;
            if package.package_type != dependency.package_type {
                return Err(type_mismatch(
                    dependency.reference.as_str(),
                    dependency.package_type.as_str(),
                    package.package_type.as_str(),
                ));
            }
        }

        let tasks: Vec<Task<'_, (Reference, Installation)>> = packages
            .iter()
            .map(|(reference, package)| {
                task::task(move |token: &CancellationToken| {
                    self.get_installation(token, reference, package, fetch)
                        .map(|installation| (reference.clone(), installation))
                })
            })
            .collect();

        Ok(task::run(token, tasks, self.run_options)?
            .into_iter()
            .collect())
    }

    /// Delete the installation directories of `references`
    pub fn remove_installations(&self, token: &CancellationToken, references: &[Reference]) -> Result<()> {
        if token.is_cancelled() {
            return Err(RocketError::Cancelled);
        }
        if references.is_empty() {
            return Ok(());
        }

        let tasks: Vec<Task<'_, ()>> = references
            .iter()
            .map(|reference| {
                task::task(move |token: &CancellationToken| self.remove_installation(token, reference))
            })
            .collect();
        task::run(token, tasks, self.run_options).map(|_| ())
    }

    fn get_installation(
        &self,
        token: &CancellationToken,
        reference: &Reference,
        package: &Package,
        fetch: bool,
    ) -> Result<Installation> {
        if token.is_cancelled() {
            return Err(RocketError::Cancelled);
        }

        debug!(reference = %reference, bundled = package.bundled(), fetch, "checking installation");
        if package.bundled() {
            return Ok(Installation::new(package, None));
        }

        let source = package
            .source(self.platform)
            .ok_or_else(|| source_not_found(reference.as_str(), self.platform.as_str()))?;
        let Some(uri) = source.uri.as_deref() else {
            return Ok(Installation::new(package, None));
        };

        let dir = self.installation_dir(reference);
        let resource = dir.join(&source.resource);
        if !resource.exists() {
            if !fetch {
                return Err(not_found(reference.as_str(), &resource));
            }
            self.install(token, reference, source, uri, &dir, &resource)?;
        }

        Ok(Installation::new(package, Some(resource)))
    }

    fn install(
        &self,
        token: &CancellationToken,
        reference: &Reference,
        source: &Source,
        uri: &str,
        dir: &Path,
        resource: &Path,
    ) -> Result<()> {
        let guard = filelock::lock(token, dir)?;

        // Another process may have finished the install while we waited.
        if resource.exists() {
            return guard.unlock();
        }

        let file_name = source
            .download_file_name()
            .ok_or_else(|| download_failed(uri, "uri has no file name"))?;
        let downloaded = dir.join(file_name);

        info!(reference = %reference, uri, path = %downloaded.display(), "installing");
        self.downloader.download(token, uri, &downloaded)?;

        if is_supported_archive(&downloaded) {
            self.extractor.extract(token, &downloaded, dir)?;
        }

        if !resource.exists() {
            return Err(not_found(reference.as_str(), resource));
        }

        guard.unlock()
    }

    fn remove_installation(&self, token: &CancellationToken, reference: &Reference) -> Result<()> {
        let dir = self.installation_dir(reference);
        let guard = filelock::lock(token, &dir)?;
        let lock_path = guard.path().to_path_buf();
        let reclaim_path = dir.join(filelock::RECLAIM_FILE_NAME);

        let mut removed_any = false;
        let entries = fs::read_dir(&dir).map_err(|e| fs_err::read_failed(&dir, e))?;
        for entry in entries {
            let path = entry.map_err(|e| fs_err::read_failed(&dir, e))?.path();
            if path == lock_path || path == reclaim_path {
                continue;
            }
            let removed = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            match removed {
                Ok(()) => removed_any = true,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(fs_err::write_failed(&path, e)),
            }
        }
        guard.unlock()?;

        // Another install may have taken the lock again since the unlock.
        fs::remove_dir(&dir).or_else(|e| match e.kind() {
            ErrorKind::NotFound | ErrorKind::DirectoryNotEmpty => Ok(()),
            _ => Err(fs_err::write_failed(&dir, e)),
        })?;
        if removed_any {
            info!(reference = %reference, path = %dir.display(), "removed installation");
        } else {
            debug!(reference = %reference, "no installation to remove");
        }
        Ok(())
    }
}
