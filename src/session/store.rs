//! Durable session record for the persistent browser.
//!
//! The record is the single source of truth for "is a persistent browser
//! running": it exists on disk if and only if `start` succeeded and `close`
//! has not run. There is no file locking; a record disappearing between
//! read and use is a normal failure, not corruption.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File name of the session record inside the config directory.
const RECORD_FILE: &str = "session.json";

/// Where the persistent browser keeps its isolated profile.
const USER_DATA_DIR: &str = "user-data";

/// Endpoint address and process id of a running persistent browser.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionRecord {
    /// Remote debugging endpoint, e.g. `ws://127.0.0.1:9222`.
    pub url: String,
    /// Process id of the spawned browser.
    pub pid: i32,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("browser is not running (no session record found)")]
    NotRunning,

    #[error("browser is already running with pid {pid}; use 'close' to stop it first")]
    AlreadyRunning { pid: i32 },

    #[error("could not determine user config directory")]
    NoConfigDir,

    #[error("session record is unreadable: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Reads and writes the session record under a per-user config directory.
///
/// The directory is injectable so tests (and parallel tools) can run
/// isolated sessions; nothing here is process-global.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Store rooted at `<user config dir>/browser-tools`.
    pub fn new() -> Result<Self, SessionError> {
        let base = dirs::config_dir().ok_or(SessionError::NoConfigDir)?;
        Ok(Self::at(base.join("browser-tools")))
    }

    /// Store rooted at an explicit directory.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn record_path(&self) -> PathBuf {
        self.dir.join(RECORD_FILE)
    }

    /// Profile directory handed to the persistent browser. Never the
    /// user's real profile.
    pub fn user_data_dir(&self) -> PathBuf {
        self.dir.join(USER_DATA_DIR)
    }

    pub fn exists(&self) -> bool {
        self.record_path().exists()
    }

    /// Load the record, failing with [`SessionError::NotRunning`] when absent.
    pub fn load(&self) -> Result<SessionRecord, SessionError> {
        let path = self.record_path();
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(SessionError::NotRunning);
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_slice(&data)?)
    }

    /// Persist the record. Fails fast when a record already exists so a
    /// second `start` cannot clobber a live session.
    pub fn save(&self, record: &SessionRecord) -> Result<(), SessionError> {
        if let Ok(existing) = self.load() {
            return Err(SessionError::AlreadyRunning { pid: existing.pid });
        }

        create_private_dir(&self.dir)?;
        let data = serde_json::to_vec(record)?;
        let path = self.record_path();
        fs::write(&path, data)?;
        restrict_permissions(&path)?;
        Ok(())
    }

    /// Remove the record. A missing record is success, not an error, so
    /// `close` stays idempotent.
    pub fn remove(&self) -> Result<(), SessionError> {
        match fs::remove_file(self.record_path()) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    match fs::DirBuilder::new().recursive(true).mode(0o700).create(dir) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        Err(err) => Err(err),
    }
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
