//! Run moderation — at most one sync run per run key.
//!
//! # Storage layout
//!
//! ```text
//! ~/.gotosync/
//!   run/
//!     <digest>.sock   (Unix socket, listening while the run is alive)
//!     <digest>.json   (LockRecord: key, pid, started_at)
//! ```
//!
//! `<digest>` is the first 16 hex chars of SHA-256 of the run key.
//!
//! The socket is what makes the lock crash-safe: a live owner keeps it bound
//! and listening, so a competing run can connect to it. When the owner dies
//! without cleaning up, the file stays behind but connecting is refused, and
//! the next acquirer removes it and takes over.

use std::io::ErrorKind;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{io_err, SyncError};

/// Sidecar record describing a held lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    pub key: String,
    pub pid: u32,
    pub started_at: DateTime<Utc>,
}

/// A held run lock. Released by [`RunLock::release`] or on drop.
#[derive(Debug)]
pub struct RunLock {
    key: String,
    socket: PathBuf,
    record: PathBuf,
    listener: Option<UnixListener>,
}

/// Run key for a `(product, id)` request; either part may be absent.
pub fn run_key(product: Option<&str>, id: Option<&str>) -> String {
    format!("{}{}", product.unwrap_or_default(), id.unwrap_or_default())
}

/// `<home>/.gotosync/run/`
pub fn run_dir_at(home: &Path) -> PathBuf {
    home.join(".gotosync").join("run")
}

/// `(<digest>.sock, <digest>.json)` under the run directory. Pure, no I/O.
pub fn lock_paths_at(home: &Path, key: &str) -> (PathBuf, PathBuf) {
    lock_paths_in(&run_dir_at(home), key)
}

fn lock_paths_in(dir: &Path, key: &str) -> (PathBuf, PathBuf) {
    let digest = {
        let mut h = Sha256::new();
        h.update(key.as_bytes());
        hex::encode(h.finalize())
    };
    let stem = &digest[..16];
    (
        dir.join(format!("{stem}.sock")),
        dir.join(format!("{stem}.json")),
    )
}

const WAIT_POLL: Duration = Duration::from_millis(20);

impl RunLock {
    /// Try to take the lock for `key`.
    ///
    /// Returns `Ok(None)` when another live run holds it. Stale locks left by
    /// a crashed run are cleared and taken over.
    pub fn acquire_at(home: &Path, key: &str) -> Result<Option<Self>, SyncError> {
        Self::acquire_in(&run_dir_at(home), key)
    }

    /// [`RunLock::acquire_at`] for locks kept in an arbitrary directory.
    pub fn acquire_in(dir: &Path, key: &str) -> Result<Option<Self>, SyncError> {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        let (socket, record) = lock_paths_in(dir, key);

        if socket.exists() {
            if UnixStream::connect(&socket).is_ok() {
                tracing::debug!("lock for '{key}' is held by another process");
                return Ok(None);
            }
            tracing::warn!("removing stale run lock {}", socket.display());
            remove_if_exists(&socket)?;
            remove_if_exists(&record)?;
        }

        let listener = match UnixListener::bind(&socket) {
            Ok(listener) => listener,
            // Lost the race against a concurrent acquirer.
            Err(err) if err.kind() == ErrorKind::AddrInUse => return Ok(None),
            Err(err) => return Err(io_err(&socket, err)),
        };

        let lock = Self {
            key: key.to_owned(),
            socket,
            record,
            listener: Some(listener),
        };
        lock.write_record()?;
        tracing::debug!("acquired run lock for '{key}'");
        Ok(Some(lock))
    }

    /// Block until the lock in `dir` is free, for at most `timeout`.
    pub fn wait_in(dir: &Path, key: &str, timeout: Duration) -> Result<Self, SyncError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(lock) = Self::acquire_in(dir, key)? {
                return Ok(lock);
            }
            if Instant::now() >= deadline {
                return Err(SyncError::LockTimeout(key.to_owned()));
            }
            std::thread::sleep(WAIT_POLL);
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Release the lock, reporting cleanup failures.
    pub fn release(mut self) -> Result<(), SyncError> {
        self.release_inner()
    }

    /// Records of locks whose owner is still alive.
    pub fn list_at(home: &Path) -> Result<Vec<LockRecord>, SyncError> {
        let dir = run_dir_at(home);
        if !dir.exists() {
            return Ok(vec![]);
        }
        let mut entries: Vec<_> = std::fs::read_dir(&dir)
            .map_err(|e| io_err(&dir, e))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|ext| ext.to_str()) == Some("json"))
            .collect();
        entries.sort();

        let mut records = Vec::new();
        for path in entries {
            if UnixStream::connect(path.with_extension("sock")).is_err() {
                continue;
            }
            let contents = match std::fs::read_to_string(&path) {
                Ok(contents) => contents,
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => return Err(io_err(&path, err)),
            };
            records.push(serde_json::from_str(&contents)?);
        }
        Ok(records)
    }

    fn write_record(&self) -> Result<(), SyncError> {
        let record = LockRecord {
            key: self.key.clone(),
            pid: std::process::id(),
            started_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&record)?;
        let tmp = self.record.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
        std::fs::rename(&tmp, &self.record).map_err(|e| io_err(&self.record, e))?;
        Ok(())
    }

    fn release_inner(&mut self) -> Result<(), SyncError> {
        let Some(listener) = self.listener.take() else {
            return Ok(());
        };
        drop(listener);
        remove_if_exists(&self.record)?;
        remove_if_exists(&self.socket)?;
        tracing::debug!("released run lock for '{}'", self.key);
        Ok(())
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(err) = self.release_inner() {
            tracing::warn!("failed to release run lock for '{}': {err}", self.key);
        }
    }
}

fn remove_if_exists(path: &Path) -> Result<(), SyncError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(path, err)),
    }
}
