//! Fetching package resources

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{Result, RocketError, fs as fs_err, install::download_failed};

/// Progress record written next to an in-flight download
pub const PROGRESS_FILE_NAME: &str = "download.json";

const CHUNK_SIZE: usize = 64 * 1024;

/// Downloads a URI to a local path
pub trait Downloader: Send + Sync {
    fn download(&self, token: &CancellationToken, uri: &str, destination: &Path) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct DownloadInfo<'a> {
    uri: &'a str,
    size: Option<u64>,
}

/// Removes the progress record when the download ends, however it ends
struct ProgressFile(PathBuf);

impl ProgressFile {
    fn write(dir: &Path, info: &DownloadInfo<'_>) -> Result<Self> {
        let path = dir.join(PROGRESS_FILE_NAME);
        fs::write(&path, serde_json::to_vec(info)?).map_err(|e| fs_err::write_failed(&path, e))?;
        Ok(Self(path))
    }
}

impl Drop for ProgressFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.0);
    }
}

/// HTTP(S) downloader; `file://` URIs are copied from disk
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: reqwest::blocking::Client,
}

impl HttpDownloader {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("rocketblend/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    fn open(&self, uri: &str) -> Result<(Box<dyn Read>, Option<u64>)> {
        if let Some(path) = uri.strip_prefix("file://") {
            let path = Path::new(path);
            let file = File::open(path).map_err(|e| download_failed(uri, e.to_string()))?;
            let size = file.metadata().ok().map(|m| m.len());
            return Ok((Box::new(file), size));
        }

        let response = self
            .client
            .get(uri)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| download_failed(uri, e.to_string()))?;
        let size = response.content_length();
        Ok((Box::new(response), size))
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, token: &CancellationToken, uri: &str, destination: &Path) -> Result<()> {
        if token.is_cancelled() {
            return Err(RocketError::Cancelled);
        }

        let dir = destination
            .parent()
            .ok_or_else(|| download_failed(uri, "destination has no parent directory"))?;
        fs::create_dir_all(dir).map_err(|e| fs_err::write_failed(dir, e))?;

        info!(uri, path = %destination.display(), "downloading");
        let (mut reader, size) = self.open(uri)?;
        let _progress = ProgressFile::write(dir, &DownloadInfo { uri, size })?;

        let mut temp = NamedTempFile::new_in(dir).map_err(|e| fs_err::write_failed(dir, e))?;
        let written = copy_cancellable(token, &mut reader, temp.as_file_mut())
            .map_err(|e| match e {
                RocketError::IoError { message } => download_failed(uri, message),
                other => other,
            })?;

        temp.persist(destination)
            .map_err(|e| fs_err::write_failed(destination, e.error))?;
        debug!(uri, bytes = written, "download complete");
        Ok(())
    }
}

/// Copy in chunks, stopping once `token` is cancelled
fn copy_cancellable(token: &CancellationToken, reader: &mut dyn Read, writer: &mut dyn Write) -> Result<u64> {
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;
    loop {
        if token.is_cancelled() {
            return Err(RocketError::Cancelled);
        }
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        writer.write_all(&buffer[..read])?;
        total += read as u64;
    }
    writer.flush()?;
    Ok(total)
}
