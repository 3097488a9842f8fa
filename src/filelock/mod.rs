//! Advisory file lock over an installation directory
//!
//! The lock is a sentinel file created exclusively inside the directory. The
//! holder keeps its modification time fresh from a heartbeat thread; a
//! sentinel that has not been touched within the timeout belongs to a dead
//! process and is reclaimed. Contention never blocks: a live lock is an
//! immediate [`RocketError::LockHeld`](crate::error::RocketError::LockHeld).
//!
//! Each sentinel records an owner id. Reclaiming happens under a second
//! exclusive sentinel so only one process replaces a stale lock, and a
//! holder only removes a sentinel that still carries its own id.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Result, RocketError, fs as fs_err, lock::held};

/// Sentinel file name inside the locked directory
pub const LOCK_FILE_NAME: &str = "reference.lock";

/// Held while a stale sentinel is being replaced
pub const RECLAIM_FILE_NAME: &str = "reference.lock.reclaim";

/// Age after which an untouched sentinel is considered stale
pub const EXECUTION_TIMEOUT: Duration = Duration::from_secs(30);

/// How often the holder refreshes the sentinel
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy)]
pub struct LockOptions {
    pub timeout: Duration,
    pub heartbeat: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            timeout: EXECUTION_TIMEOUT,
            heartbeat: HEARTBEAT_INTERVAL,
        }
    }
}

/// A held lock; released on [`FileLock::unlock`] or drop
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    owner: String,
    stop: Option<Sender<()>>,
    heartbeat: Option<JoinHandle<()>>,
}

/// Lock `dir` with the default timeout and heartbeat
pub fn lock(token: &CancellationToken, dir: &Path) -> Result<FileLock> {
    lock_with(token, dir, LockOptions::default())
}

pub fn lock_with(token: &CancellationToken, dir: &Path, options: LockOptions) -> Result<FileLock> {
    if token.is_cancelled() {
        return Err(RocketError::Cancelled);
    }

    fs::create_dir_all(dir).map_err(|e| fs_err::write_failed(dir, e))?;
    let path = dir.join(LOCK_FILE_NAME);

    let owner = owner_id();
    let file = match create_exclusive(&path, &owner)? {
        Some(file) => file,
        None if is_stale(&path, options.timeout) => reclaim(dir, &path, &owner, options.timeout)?,
        None => return Err(held(&path)),
    };

    debug!(path = %path.display(), "lock acquired");

    let (stop, stopped) = mpsc::channel::<()>();
    let heartbeat = {
        let token = token.clone();
        let path = path.clone();
        thread::spawn(move || {
            loop {
                match stopped.recv_timeout(options.heartbeat) {
                    Err(RecvTimeoutError::Timeout) if !token.is_cancelled() => {
                        if let Err(e) = file.set_modified(SystemTime::now()) {
                            warn!(path = %path.display(), error = %e, "lock heartbeat failed");
                        }
                    }
                    _ => break,
                }
            }
        })
    };

    Ok(FileLock {
        path,
        owner,
        stop: Some(stop),
        heartbeat: Some(heartbeat),
    })
}

impl FileLock {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stop the heartbeat and remove the sentinel
    pub fn unlock(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        let Some(stop) = self.stop.take() else {
            return Ok(());
        };
        drop(stop);
        if let Some(handle) = self.heartbeat.take() {
            let _ = handle.join();
        }

        if !is_owner(&self.path, &self.owner) {
            warn!(path = %self.path.display(), "lock was taken over; leaving sentinel in place");
            return Ok(());
        }

        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "lock released");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(fs_err::write_failed(&self.path, e)),
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!(error = %e, "failed to release lock");
        }
    }
}

/// Replace a stale sentinel while holding the reclaim sentinel.
///
/// Staleness is checked again under the reclaim sentinel: a competing
/// reclaimer that got there first leaves a fresh lock behind, which makes
/// this attempt [`RocketError::LockHeld`]. A reclaim sentinel abandoned by a
/// dead process is removed once it is itself stale, and that attempt still
/// reports the lock as held.
fn reclaim(dir: &Path, path: &Path, owner: &str, timeout: Duration) -> Result<File> {
    let guard_path = dir.join(RECLAIM_FILE_NAME);
    if create_exclusive(&guard_path, owner)?.is_none() {
        if is_stale(&guard_path, timeout) {
            warn!(path = %guard_path.display(), "removing abandoned reclaim sentinel");
            remove_if_present(&guard_path)?;
        }
        return Err(held(path));
    }

    let reclaimed = if is_stale(path, timeout) {
        warn!(path = %path.display(), "reclaiming stale lock");
        remove_if_present(path)?;
        create_exclusive(path, owner)
    } else {
        Ok(None)
    };
    remove_if_present(&guard_path)?;

    match reclaimed? {
        Some(file) if is_owner(path, owner) => Ok(file),
        _ => Err(held(path)),
    }
}

/// `Ok(None)` when the sentinel already exists
fn create_exclusive(path: &Path, owner: &str) -> Result<Option<File>> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            file.write_all(owner.as_bytes())
                .and_then(|()| file.flush())
                .map_err(|e| fs_err::write_failed(path, e))?;
            Ok(Some(file))
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(None),
        Err(e) => Err(fs_err::write_failed(path, e)),
    }
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(fs_err::write_failed(path, e)),
    }
}

/// Process id plus a per-process counter
fn owner_id() -> String {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    format!("{}-{}", process::id(), NEXT.fetch_add(1, Ordering::Relaxed))
}

fn is_owner(path: &Path, owner: &str) -> bool {
    fs::read_to_string(path).is_ok_and(|contents| contents == owner)
}

/// A sentinel is stale once its mtime is older than `timeout`. Only
/// [`reclaim`] acts on this, under the reclaim sentinel.
fn is_stale(path: &Path, timeout: Duration) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .is_some_and(|age| age > timeout)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn age(path: &Path, by: Duration) {
        let file = OpenOptions::new().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - by).unwrap();
    }

    #[test]
    fn test_second_lock_is_held() {
        let temp = TempDir::new().unwrap();
        let token = CancellationToken::new();
        let first = lock(&token, temp.path()).unwrap();
        let err = lock(&token, temp.path()).unwrap_err();
        assert!(matches!(err, RocketError::LockHeld { .. }));
        first.unlock().unwrap();
        assert!(!temp.path().join(LOCK_FILE_NAME).exists());
    }

    #[test]
    fn test_stale_lock_is_reclaimed() {
        let temp = TempDir::new().unwrap();
        let token = CancellationToken::new();
        let sentinel = temp.path().join(LOCK_FILE_NAME);
        File::create(&sentinel).unwrap();

        let err = lock(&token, temp.path()).unwrap_err();
        assert!(matches!(err, RocketError::LockHeld { .. }));

        age(&sentinel, Duration::from_secs(120));
        let reclaimed = lock(&token, temp.path()).unwrap();
        assert!(reclaimed.path().exists());
        reclaimed.unlock().unwrap();
        assert!(!sentinel.exists());
    }

    #[test]
    fn test_stale_lock_has_one_reclaimer() {
        let temp = TempDir::new().unwrap();
        let token = CancellationToken::new();
        let sentinel = temp.path().join(LOCK_FILE_NAME);
        File::create(&sentinel).unwrap();
        age(&sentinel, Duration::from_secs(120));

        let start = std::sync::Barrier::new(8);
        let results: Vec<Result<FileLock>> = thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        start.wait();
                        lock(&token, temp.path())
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let held: Vec<&FileLock> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(held.len(), 1);
        assert!(is_owner(&sentinel, &held[0].owner));
        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(matches!(err, RocketError::LockHeld { .. }), "{err:?}");
        }
        assert!(!temp.path().join(RECLAIM_FILE_NAME).exists());
    }

    #[test]
    fn test_taken_over_sentinel_is_left_alone() {
        let temp = TempDir::new().unwrap();
        let token = CancellationToken::new();
        let guard = lock(&token, temp.path()).unwrap();
        fs::write(guard.path(), "someone-else").unwrap();

        guard.unlock().unwrap();
        let sentinel = temp.path().join(LOCK_FILE_NAME);
        assert_eq!(fs::read_to_string(&sentinel).unwrap(), "someone-else");
    }

    #[test]
    fn test_abandoned_reclaim_sentinel_is_cleared() {
        let temp = TempDir::new().unwrap();
        let token = CancellationToken::new();
        let sentinel = temp.path().join(LOCK_FILE_NAME);
        let reclaim_sentinel = temp.path().join(RECLAIM_FILE_NAME);
        File::create(&sentinel).unwrap();
        File::create(&reclaim_sentinel).unwrap();
        age(&sentinel, Duration::from_secs(120));
        age(&reclaim_sentinel, Duration::from_secs(120));

        let err = lock(&token, temp.path()).unwrap_err();
        assert!(matches!(err, RocketError::LockHeld { .. }));
        assert!(!reclaim_sentinel.exists());

        let reclaimed = lock(&token, temp.path()).unwrap();
        reclaimed.unlock().unwrap();
        assert!(!sentinel.exists());
    }

    #[test]
    fn test_drop_releases() {
        let temp = TempDir::new().unwrap();
        let token = CancellationToken::new();
        {
            let _guard = lock(&token, temp.path()).unwrap();
            assert!(temp.path().join(LOCK_FILE_NAME).exists());
        }
        assert!(!temp.path().join(LOCK_FILE_NAME).exists());
        assert!(lock(&token, temp.path()).is_ok());
    }

    #[test]
    fn test_heartbeat_refreshes_mtime() {
        let temp = TempDir::new().unwrap();
        let token = CancellationToken::new();
        let options = LockOptions {
            timeout: Duration::from_secs(1),
            heartbeat: Duration::from_millis(20),
        };
        let guard = lock_with(&token, temp.path(), options).unwrap();
        age(guard.path(), Duration::from_secs(60));
        thread::sleep(Duration::from_millis(200));

        let err = lock_with(&token, temp.path(), options).unwrap_err();
        assert!(matches!(err, RocketError::LockHeld { .. }));
        guard.unlock().unwrap();
    }

    #[test]
    fn test_cancelled_token() {
        let temp = TempDir::new().unwrap();
        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(
            lock(&token, temp.path()).unwrap_err(),
            RocketError::Cancelled
        ));
    }

    #[test]
    fn test_creates_missing_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("a/b/c");
        let token = CancellationToken::new();
        let guard = lock(&token, &dir).unwrap();
        assert!(dir.join(LOCK_FILE_NAME).exists());
        drop(guard);
    }
}
