//! Unpacking downloaded archives

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::Path;

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use xz2::read::XzDecoder;
use zip::ZipArchive;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Result, RocketError, install::extract_failed};

/// Extensions treated as archives after a download
const ARCHIVE_EXTENSIONS: [&str; 7] = [
    ".tar.gz", ".tgz", ".tar", ".tar.bz2", ".tar.xz", ".zip", ".dmg",
];

/// Unpacks an archive into a directory
pub trait Extractor: Send + Sync {
    fn extract(&self, token: &CancellationToken, archive: &Path, output_dir: &Path) -> Result<()>;
}

/// Whether `path` names a recognised archive
pub fn is_supported_archive(path: &Path) -> bool {
    archive_extension(path).is_some()
}

fn archive_extension(path: &Path) -> Option<&'static str> {
    let name = path.file_name()?.to_str()?.to_ascii_lowercase();
    ARCHIVE_EXTENSIONS
        .iter()
        .copied()
        .find(|ext| name.ends_with(ext))
}

/// Extracts zip archives and tarballs (plain, gzip, bzip2 and xz)
///
/// Disk images (`.dmg`) are recognised but cannot be unpacked.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveExtractor {
    /// Delete the archive once it has been unpacked
    pub cleanup: bool,
}

impl ArchiveExtractor {
    pub fn new(cleanup: bool) -> Self {
        Self { cleanup }
    }
}

impl Extractor for ArchiveExtractor {
    fn extract(&self, token: &CancellationToken, archive: &Path, output_dir: &Path) -> Result<()> {
        if token.is_cancelled() {
            return Err(RocketError::Cancelled);
        }

        let file = File::open(archive).map_err(|e| extract_failed(archive, e.to_string()))?;
        let reader = BufReader::new(file);

        info!(archive = %archive.display(), output = %output_dir.display(), "extracting");
        match archive_extension(archive) {
            Some(".tar.gz" | ".tgz") => unpack(token, GzDecoder::new(reader), archive, output_dir)?,
            Some(".tar.bz2") => unpack(token, BzDecoder::new(reader), archive, output_dir)?,
            Some(".tar.xz") => unpack(token, XzDecoder::new(reader), archive, output_dir)?,
            Some(".tar") => unpack(token, reader, archive, output_dir)?,
            Some(".zip") => unzip(token, reader, archive, output_dir)?,
            Some(ext) => {
                return Err(extract_failed(
                    archive,
                    format!("unsupported archive format '{ext}'"),
                ));
            }
            None => return Err(extract_failed(archive, "not an archive")),
        }

        if self.cleanup {
            if let Err(e) = fs::remove_file(archive) {
                warn!(archive = %archive.display(), error = %e, "failed to remove archive");
            }
        }
        Ok(())
    }
}

fn unpack<R: Read>(token: &CancellationToken, reader: R, archive: &Path, output_dir: &Path) -> Result<()> {
    let mut tar = tar::Archive::new(reader);
    tar.set_preserve_permissions(true);

    let entries = tar
        .entries()
        .map_err(|e| extract_failed(archive, e.to_string()))?;
    for entry in entries {
        if token.is_cancelled() {
            return Err(RocketError::Cancelled);
        }
        let mut entry = entry.map_err(|e| extract_failed(archive, e.to_string()))?;
        // unpack_in refuses entries escaping output_dir
        let unpacked = entry
            .unpack_in(output_dir)
            .map_err(|e| extract_failed(archive, e.to_string()))?;
        if !unpacked {
            debug!(archive = %archive.display(), "skipped entry outside output directory");
        }
    }
    Ok(())
}

fn unzip<R: Read + io::Seek>(
    token: &CancellationToken,
    reader: R,
    archive: &Path,
    output_dir: &Path,
) -> Result<()> {
    let failed = |e: &dyn std::fmt::Display| extract_failed(archive, e.to_string());
    let mut zip = ZipArchive::new(reader).map_err(|e| failed(&e))?;

    for index in 0..zip.len() {
        if token.is_cancelled() {
            return Err(RocketError::Cancelled);
        }
        let mut entry = zip.by_index(index).map_err(|e| failed(&e))?;
        let Some(relative) = entry.enclosed_name() else {
            debug!(archive = %archive.display(), entry = entry.name(), "skipped entry outside output directory");
            continue;
        };
        let target = output_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|e| failed(&e))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| failed(&e))?;
        }
        let mut file = File::create(&target).map_err(|e| failed(&e))?;
        io::copy(&mut entry, &mut file).map_err(|e| failed(&e))?;

        if let Some(mode) = entry.unix_mode() {
            set_mode(&target, mode).map_err(|e| failed(&e))?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}
