//! Common test utilities for RocketBlend integration tests

#![allow(dead_code, clippy::expect_used)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use assert_cmd::Command;
use flate2::Compression;
use flate2::write::GzEncoder;
use git2::{Repository, Signature};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use rocketblend::config::Config;
use rocketblend::config::paths::{CONFIG_DIR_ENV, INSTALLATIONS_PATH_ENV, PACKAGES_PATH_ENV};
use rocketblend::error::Result;
use rocketblend::git::{self, Vcs};
use rocketblend::installation::{ArchiveExtractor, Downloader, HttpDownloader};
use rocketblend::package::PACKAGE_FILE_NAME;
use rocketblend::platform::Platform;
use rocketblend::services::Services;

/// An isolated environment: project, config, registries and caches
pub struct TestEnv {
    pub temp: TempDir,
    pub project: PathBuf,
    pub config_dir: PathBuf,
    pub origins: PathBuf,
    pub packages: PathBuf,
    pub installations: PathBuf,
    pub dist: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let root = temp.path().to_path_buf();
        let env = Self {
            project: root.join("project"),
            config_dir: root.join("config"),
            origins: root.join("origins"),
            packages: root.join("packages"),
            installations: root.join("installations"),
            dist: root.join("dist"),
            temp,
        };
        for dir in [&env.project, &env.config_dir, &env.dist] {
            std::fs::create_dir_all(dir).expect("Failed to create test directory");
        }
        env
    }

    /// The binary, pointed at this environment's config and caches
    #[allow(deprecated)]
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("rocketblend").expect("binary is built");
        cmd.env(CONFIG_DIR_ENV, &self.config_dir)
            .env(PACKAGES_PATH_ENV, &self.packages)
            .env(INSTALLATIONS_PATH_ENV, &self.installations)
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1")
            .arg("--project")
            .arg(&self.project);
        cmd
    }

    pub fn write_config(&self, yaml: &str) {
        std::fs::write(self.config_dir.join("config.yaml"), yaml).expect("Failed to write config");
    }

    pub fn config(&self) -> Config {
        Config {
            platform: Platform::Linux,
            packages_path: self.packages.clone(),
            installations_path: self.installations.clone(),
            ..Config::default()
        }
    }

    /// Services over local git origins and `file://` downloads
    pub fn services(&self, downloader: Arc<CountingDownloader>) -> Services {
        Services::with_collaborators(
            &self.config(),
            Arc::new(LocalVcs {
                origins: self.origins.clone(),
            }),
            downloader,
            Arc::new(ArchiveExtractor::new(true)),
        )
    }

    /// Write a descriptor for a `local/...` reference
    pub fn publish_local(&self, reference: &str, yaml: &str) {
        let dir = self.packages.join(reference);
        std::fs::create_dir_all(&dir).expect("Failed to create package directory");
        std::fs::write(dir.join(PACKAGE_FILE_NAME), yaml).expect("Failed to write descriptor");
    }

    /// Commit a descriptor to the git origin of `reference`'s registry
    pub fn publish(&self, reference: &str, yaml: &str) {
        let segments: Vec<&str> = reference.splitn(4, '/').collect();
        let repo_dir = self.origins.join(segments[..3].join("/"));
        let repo = Repository::open(&repo_dir)
            .or_else(|_| Repository::init(&repo_dir))
            .expect("Failed to open origin repository");

        let relative = Path::new(segments[3]).join(PACKAGE_FILE_NAME);
        let file = repo_dir.join(&relative);
        std::fs::create_dir_all(file.parent().expect("descriptor has a parent"))
            .expect("Failed to create package directory");
        std::fs::write(&file, yaml).expect("Failed to write descriptor");

        let mut index = repo.index().expect("index");
        index.add_path(&relative).expect("add path");
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

    /// Write a file under `dist/` and return its `file://` URI
    pub fn dist_file(&self, name: &str, content: &[u8]) -> String {
        let path = self.dist.join(name);
        std::fs::write(&path, content).expect("Failed to write dist file");
        format!("file://{}", path.display())
    }

    pub fn profile_json(&self) -> serde_json::Value {
        let content = std::fs::read_to_string(self.project.join(".rocketblend/profile.json"))
            .expect("Failed to read profile");
        serde_json::from_str(&content).expect("profile is JSON")
    }
}

/// [`Vcs`] that clones `https://<repo>` from `<origins>/<repo>`
pub struct LocalVcs {
    pub origins: PathBuf,
}

impl Vcs for LocalVcs {
    fn clone_repo(&self, token: &CancellationToken, url: &str, path: &Path) -> Result<()> {
        let origin = self.origins.join(url.trim_start_matches("https://"));
        git::clone(token, &origin.to_string_lossy(), path).map(|_| ())
    }

    fn pull(&self, token: &CancellationToken, path: &Path) -> Result<()> {
        git::pull(token, path)
    }
}

/// The HTTP downloader, counting how often it is asked for something
pub struct CountingDownloader {
    inner: HttpDownloader,
    calls: AtomicUsize,
}

impl CountingDownloader {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: HttpDownloader::new().expect("http client"),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Downloader for CountingDownloader {
    fn download(&self, token: &CancellationToken, uri: &str, destination: &Path) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.download(token, uri, destination)
    }
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
