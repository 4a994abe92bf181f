//! Persisted migration runs
//!
//! Each run lives in `<state_dir>/<run_id>.json`. A suspended run is resumed
//! under an exclusive lock on `<state_dir>/<run_id>.lock`.

use fd_lock::{RwLock, RwLockWriteGuard};
use std::fs::File;
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

use crate::workflows::MigrationState;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No persisted run with id {run_id}")]
    NotFound { run_id: String },

    #[error("Invalid run id '{run_id}'")]
    InvalidRunId { run_id: String },

    #[error("Run {run_id} is locked by another process")]
    Locked { run_id: String },
}

/// File system store of migration runs
#[derive(Debug, Clone)]
pub struct RunStore {
    state_dir: PathBuf,
}

impl RunStore {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    fn run_file(&self, run_id: &str) -> Result<PathBuf, StoreError> {
        validate_run_id(run_id)?;
        Ok(self.state_dir.join(format!("{run_id}.json")))
    }

    /// Write the run atomically (temp file, then rename)
    pub async fn save(&self, state: &MigrationState) -> Result<PathBuf, StoreError> {
        let path = self.run_file(&state.run_id)?;
        fs::create_dir_all(&self.state_dir).await?;

        let serialized = serde_json::to_string_pretty(state)?;
        let temp = self.state_dir.join(format!("{}.json.tmp", state.run_id));
        fs::write(&temp, serialized).await?;
        fs::rename(&temp, &path).await?;

        info!(
            run_id = %state.run_id,
            status = %state.status,
            file = ?path,
            "Migration run saved"
        );
        Ok(path)
    }

    pub async fn load(&self, run_id: &str) -> Result<MigrationState, StoreError> {
        let path = self.run_file(run_id)?;
        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    run_id: run_id.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        let state: MigrationState = serde_json::from_str(&contents)?;
        debug!(run_id = %run_id, status = %state.status, "Migration run loaded");
        Ok(state)
    }

    /// All persisted runs, oldest first
    pub async fn list(&self) -> Result<Vec<MigrationState>, StoreError> {
        let mut runs = Vec::new();
        let mut entries = match fs::read_dir(&self.state_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(runs),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let contents = fs::read_to_string(&path).await?;
                runs.push(serde_json::from_str::<MigrationState>(&contents)?);
            }
        }
        runs.sort_by_key(|run| run.created_at);
        Ok(runs)
    }

    fn lock_file(&self, run_id: &str) -> Result<PathBuf, StoreError> {
        validate_run_id(run_id)?;
        Ok(self.state_dir.join(format!("{run_id}.lock")))
    }

    /// Lock file handle for `run_id`; call [`RunLock::try_acquire`] to hold it
    pub fn lock(&self, run_id: &str) -> Result<RunLock, StoreError> {
        let path = self.lock_file(run_id)?;
        std::fs::create_dir_all(&self.state_dir)?;
        let file = File::create(path)?;
        Ok(RunLock {
            run_id: run_id.to_string(),
            lock: RwLock::new(file),
        })
    }

    /// Delete the lock file of a run nobody can resume any more.
    ///
    /// Call only after the [`RunLock`] is dropped.
    pub async fn remove_lock(&self, run_id: &str) -> Result<(), StoreError> {
        let path = self.lock_file(run_id)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(run_id = %run_id, "Run lock removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Advisory lock guarding a single run
pub struct RunLock {
    run_id: String,
    lock: RwLock<File>,
}

impl RunLock {
    /// Take the lock without waiting
    pub fn try_acquire(&mut self) -> Result<RwLockWriteGuard<'_, File>, StoreError> {
        let run_id = self.run_id.clone();
        self.lock
            .try_write()
            .map_err(|_| StoreError::Locked { run_id })
    }
}

fn validate_run_id(run_id: &str) -> Result<(), StoreError> {
    let valid = !run_id.is_empty()
        && run_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidRunId {
            run_id: run_id.to_string(),
        })
    }
}
