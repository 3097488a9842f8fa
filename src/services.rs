//! Wiring of the long-lived components
//!
//! Everything that talks to the outside world is built here once from a
//! [`Config`] and shared through `Arc`s, so commands and tests receive their
//! collaborators explicitly.

use std::sync::Arc;

use crate::config::Config;
use crate::driver::Driver;
use crate::error::Result;
use crate::git::{GitVcs, Vcs};
use crate::installation::{ArchiveExtractor, Downloader, Extractor, HttpDownloader, InstallationCache};
use crate::registry::PackageRegistry;

#[derive(Debug)]
pub struct Services {
    pub config: Config,
    pub registry: Arc<PackageRegistry>,
    pub installations: Arc<InstallationCache>,
    pub driver: Driver,
}

impl Services {
    /// Services backed by git, HTTP and the archive extractor
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::with_collaborators(
            config,
            Arc::new(GitVcs),
            Arc::new(HttpDownloader::new()?),
            Arc::new(ArchiveExtractor::new(true)),
        ))
    }

    pub fn with_collaborators(
        config: &Config,
        vcs: Arc<dyn Vcs>,
        downloader: Arc<dyn Downloader>,
        extractor: Arc<dyn Extractor>,
    ) -> Self {
        let run_options = config.run_options();
        let registry = Arc::new(PackageRegistry::new(&config.packages_path, vcs, run_options));
        let installations = Arc::new(InstallationCache::new(
            &config.installations_path,
            config.platform,
            Arc::clone(&registry),
            downloader,
            extractor,
            run_options,
        ));
        let driver = Driver::new(Arc::clone(&registry), Arc::clone(&installations), run_options);

        Self {
            config: config.clone(),
            registry,
            installations,
            driver,
        }
    }
}
