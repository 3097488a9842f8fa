//! Test fixtures shared by the unit tests
//!
//! Registries are real git repositories under a temp directory. [`LocalVcs`]
//! maps a registry URL such as `https://registry.test/org/repo` onto the
//! matching origin directory, so the registry exercises real clones and
//! pulls without network access.

#![allow(clippy::expect_used)]

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use flate2::Compression;
use flate2::write::GzEncoder;
use git2::{Repository, Signature};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, install::download_failed};
use crate::git::{self, Vcs};
use crate::installation::Downloader;
use crate::package::PACKAGE_FILE_NAME;
use crate::registry::PackageRegistry;
use crate::task::RunOptions;

/// Create a temp directory.
#[must_use]
pub fn create_temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

/// [`Vcs`] that clones `https://<repo>` from `<origins>/<repo>`
#[derive(Debug, Clone)]
pub struct LocalVcs {
    pub origins: PathBuf,
}

impl LocalVcs {
    fn origin_for(&self, url: &str) -> PathBuf {
        self.origins.join(url.trim_start_matches("https://"))
    }
}

impl Vcs for LocalVcs {
    fn clone_repo(&self, token: &CancellationToken, url: &str, path: &Path) -> Result<()> {
        let origin = self.origin_for(url);
        git::clone(token, &origin.to_string_lossy(), path).map(|_| ())
    }

    fn pull(&self, token: &CancellationToken, path: &Path) -> Result<()> {
        git::pull(token, path)
    }
}

/// Serves fixed payloads by URI and counts downloads
#[derive(Debug, Default)]
pub struct MemoryDownloader {
    payloads: Mutex<HashMap<String, Vec<u8>>>,
    delay: Mutex<Option<Duration>>,
    pub calls: AtomicUsize,
}

impl MemoryDownloader {
    pub fn serve(&self, uri: &str, payload: Vec<u8>) {
        self.payloads
            .lock()
            .expect("payloads lock")
            .insert(uri.to_string(), payload);
    }

    /// Hold every download for `delay` before writing the payload.
    pub fn slow_down(&self, delay: Duration) {
        *self.delay.lock().expect("delay lock") = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Downloader for MemoryDownloader {
    fn download(&self, _token: &CancellationToken, uri: &str, destination: &Path) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().expect("delay lock");
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        let payload = self
            .payloads
            .lock()
            .expect("payloads lock")
            .get(uri)
            .cloned()
            .ok_or_else(|| download_failed(uri, "404 Not Found"))?;
        fs::write(destination, payload).expect("write download");
        Ok(())
    }
}

/// Origin registries plus the packages and installations directories
pub struct TestRegistry {
    pub temp: TempDir,
    pub origins: PathBuf,
    pub packages: PathBuf,
    pub installations: PathBuf,
}

impl TestRegistry {
    pub fn new() -> Self {
        let temp = create_temp_dir();
        let origins = temp.path().join("origins");
        let packages = temp.path().join("packages");
        let installations = temp.path().join("installations");
        Self {
            temp,
            origins,
            packages,
            installations,
        }
    }

    pub fn vcs(&self) -> Arc<LocalVcs> {
        Arc::new(LocalVcs {
            origins: self.origins.clone(),
        })
    }

    pub fn registry(&self, run_options: RunOptions) -> PackageRegistry {
        PackageRegistry::new(&self.packages, self.vcs(), run_options)
    }

    /// Write `yaml` as the descriptor of `reference` and commit it to the
    /// origin of its registry
    pub fn publish(&self, reference: &str, yaml: &str) {
        let segments: Vec<&str> = reference.splitn(4, '/').collect();
        let repo_dir = self.origins.join(segments[..3].join("/"));
        let repo = Repository::open(&repo_dir)
            .or_else(|_| Repository::init(&repo_dir))
            .expect("Failed to open origin repository");

        let relative = Path::new(segments[3]).join(PACKAGE_FILE_NAME);
        let file = repo_dir.join(&relative);
        fs::create_dir_all(file.parent().expect("descriptor has a parent"))
            .expect("Failed to create package directory");
        fs::write(&file, yaml).expect("Failed to write descriptor");
        commit(&repo, &relative);
    }
}

fn commit(repo: &Repository, relative: &Path) {
    let mut index = repo.index().expect("index");
    index.add_path(relative).expect("add path");
    index.write().expect("write index");
    let tree = repo
        .find_tree(index.write_tree().expect("write tree"))
        .expect("find tree");

    let sig = Signature::now("Test", "test@test.com").expect("signature");
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, "publish", &tree, &parents)
        .expect("commit");
}

/// Build a gzipped tarball from `(path, content)` entries
pub fn tar_gz(entries: &[(&str, &str)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, content) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, path, content.as_bytes())
            .expect("append tar entry");
    }
    let mut encoder = builder.into_inner().expect("finish tar");
    encoder.flush().expect("flush");
    encoder.finish().expect("finish gzip")
}

/// Descriptor of a build with one `any` source downloading `uri`
pub fn build_yaml(uri: &str, resource: &str, dependencies: &[&str]) -> String {
    let mut yaml = format!(
        "type: build\nname: Blender\nversion: 4.2.2\nsources:\n  - resource: {resource}\n    uri: {uri}\n"
    );
    push_dependencies(&mut yaml, dependencies);
    yaml
}

/// Descriptor of an addon, bundled when `uri` is `None`
///
/// A downloaded addon's resource is the file named by its URI.
pub fn addon_yaml(uri: Option<&str>, dependencies: &[&str]) -> String {
    let resource = uri
        .and_then(|u| u.rsplit('/').next())
        .unwrap_or("addon.py");
    let mut yaml = format!("type: addon\nsources:\n  - resource: {resource}\n");
    if let Some(uri) = uri {
        yaml.push_str(&format!("    uri: {uri}\n"));
    }
    push_dependencies(&mut yaml, dependencies);
    yaml
}

fn push_dependencies(yaml: &mut String, dependencies: &[&str]) {
    if dependencies.is_empty() {
        return;
    }
    yaml.push_str("dependencies:\n");
    for reference in dependencies {
        yaml.push_str(&format!("  - reference: {reference}\n    type: addon\n"));
    }
}
