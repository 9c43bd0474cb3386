//! Checkpoint persistence (load / save / clear)
//!
//! Writes go through a temp file in the same directory followed by an atomic
//! rename, under an advisory lock held on a sibling `.lock` file.

use super::checkpoint::Checkpoint;
use super::lock::{lock_path_for, with_lock, LockMode};
use chrono::NaiveDate;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Maximum accepted checkpoint file size (1 MiB). A real checkpoint is ~80 bytes.
pub const MAX_CHECKPOINT_FILE_SIZE: u64 = 1024 * 1024;

/// What to do with a persisted checkpoint at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResumePolicy {
    /// Trust the persisted checkpoint, including its range if it differs from
    /// the requested one
    #[default]
    Resume,
    /// Resume only if the persisted range matches; otherwise discard it
    Restart,
    /// Always discard the persisted checkpoint
    Reset,
}

impl FromStr for ResumePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "on" | "resume" => Ok(ResumePolicy::Resume),
            "off" | "restart" => Ok(ResumePolicy::Restart),
            "reset" => Ok(ResumePolicy::Reset),
            _ => Err(format!(
                "Invalid resume mode: {s}. Valid options: on, off, reset"
            )),
        }
    }
}

/// Errors related to checkpoint persistence
#[derive(Debug, thiserror::Error)]
pub enum ResumeError {
    /// Checkpoint file could not be parsed or violates its invariant
    #[error("malformed checkpoint: {0}")]
    Malformed(String),

    /// Checkpoint file too large
    #[error("checkpoint file too large: {size} bytes (max: {max} bytes)")]
    TooLarge {
        /// Actual file size
        size: u64,
        /// Maximum allowed size
        max: u64,
    },

    /// `save` called before `load`
    #[error("checkpoint not loaded")]
    NotLoaded,

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Lock error
    #[error("lock error: {0}")]
    LockError(String),
}

impl ResumeError {
    /// Whether the persisted state is unusable but harmless to overwrite
    pub fn is_corrupt_state(&self) -> bool {
        matches!(self, ResumeError::Malformed(_) | ResumeError::TooLarge { .. })
    }
}

/// File-backed checkpoint store
#[derive(Debug)]
pub struct CheckpointStore {
    path: PathBuf,
    policy: ResumePolicy,
    state: Option<Checkpoint>,
}

impl CheckpointStore {
    /// Create a store for `path`; nothing is read until [`load`](Self::load)
    pub fn new(path: impl Into<PathBuf>, policy: ResumePolicy) -> Self {
        Self {
            path: path.into(),
            policy,
            state: None,
        }
    }

    /// Checkpoint file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Configured policy
    pub fn policy(&self) -> ResumePolicy {
        self.policy
    }

    /// In-memory checkpoint, available after `load`
    pub fn checkpoint(&self) -> Option<&Checkpoint> {
        self.state.as_ref()
    }

    /// Read the persisted checkpoint without applying any policy.
    ///
    /// Returns `Ok(None)` if no file exists and a corrupt-state error if the
    /// file cannot be parsed or violates the range invariant.
    pub fn read(path: &Path) -> Result<Option<Checkpoint>, ResumeError> {
        debug!(path = %path.display(), "Reading checkpoint");

        with_lock(path, LockMode::Shared, || {
            let metadata = match std::fs::metadata(path) {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(ResumeError::IoError(e.to_string())),
            };

            if metadata.len() > MAX_CHECKPOINT_FILE_SIZE {
                return Err(ResumeError::TooLarge {
                    size: metadata.len(),
                    max: MAX_CHECKPOINT_FILE_SIZE,
                });
            }

            let contents =
                std::fs::read_to_string(path).map_err(|e| ResumeError::IoError(e.to_string()))?;

            let checkpoint: Checkpoint = serde_json::from_str(&contents)
                .map_err(|e| ResumeError::Malformed(e.to_string()))?;
            checkpoint.validate().map_err(ResumeError::Malformed)?;

            Ok(Some(checkpoint))
        })
    }

    /// Determine the next day to export for the requested range.
    ///
    /// Under [`ResumePolicy::Resume`] a checkpoint for a different range wins
    /// over the requested dates; use [`checkpoint`](Self::checkpoint) to read
    /// the effective range afterwards.
    pub fn load(
        &mut self,
        range_start: NaiveDate,
        range_end: NaiveDate,
    ) -> Result<NaiveDate, ResumeError> {
        let fresh = Checkpoint::new(range_start, range_end);

        if self.policy == ResumePolicy::Reset {
            info!("Reset mode: discarding any existing checkpoint");
            self.remove_file()?;
            self.state = Some(fresh);
            return Ok(range_start);
        }

        let persisted = match Self::read(&self.path) {
            Ok(Some(checkpoint)) => checkpoint,
            Ok(None) => {
                info!("No existing checkpoint");
                self.state = Some(fresh);
                return Ok(range_start);
            }
            Err(e) if e.is_corrupt_state() => {
                warn!(error = %e, "Corrupt checkpoint file, overwriting");
                self.state = Some(fresh);
                return Ok(range_start);
            }
            Err(e) => return Err(e),
        };

        if persisted.covers_range(range_start, range_end) {
            info!(checkpoint = %persisted, "Found a checkpoint");
            self.state = Some(persisted);
            return Ok(persisted.next_date());
        }

        warn!(
            checkpoint = %persisted,
            requested_start = %range_start,
            requested_end = %range_end,
            "Previous checkpoint was for a different time range"
        );

        match self.policy {
            ResumePolicy::Resume => {
                warn!("Resume mode: using checkpoint start and end dates");
                warn!("If this is not intended, delete the checkpoint file or use --resume off");
                self.state = Some(persisted);
                Ok(persisted.next_date())
            }
            ResumePolicy::Restart | ResumePolicy::Reset => {
                self.remove_file()?;
                self.state = Some(fresh);
                Ok(range_start)
            }
        }
    }

    /// Persist `next_date` as the day about to be exported
    pub fn save(&mut self, next_date: NaiveDate) -> Result<(), ResumeError> {
        let state = self.state.as_mut().ok_or(ResumeError::NotLoaded)?;
        state.set_next_date(next_date);
        let state = *state;

        info!(checkpoint = %state, "Writing checkpoint");

        let json = serde_json::to_string(&state)
            .map_err(|e| ResumeError::SerializationError(e.to_string()))?;

        with_lock(&self.path, LockMode::Exclusive, || {
            write_atomically(&self.path, json.as_bytes())
        })
    }

    /// Remove persisted state after a completed export
    pub fn clear(&mut self) -> Result<(), ResumeError> {
        info!(path = %self.path.display(), "Deleting checkpoint");
        self.remove_file()?;
        self.state = None;

        // Lock file is only meaningful while a checkpoint exists
        let _ = std::fs::remove_file(lock_path_for(&self.path));
        Ok(())
    }

    fn remove_file(&self) -> Result<(), ResumeError> {
        with_lock(&self.path, LockMode::Exclusive, || {
            match std::fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(ResumeError::IoError(format!(
                    "Failed to remove checkpoint {}: {e}",
                    self.path.display()
                ))),
            }
        })
    }
}

/// Replace `path` with `contents` via temp file + rename
fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), ResumeError> {
    let parent_dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp_file = tempfile::NamedTempFile::new_in(parent_dir)
        .map_err(|e| ResumeError::IoError(format!("Failed to create temp file: {e}")))?;

    temp_file
        .write_all(contents)
        .map_err(|e| ResumeError::IoError(format!("Failed to write to temp file: {e}")))?;
    temp_file
        .flush()
        .map_err(|e| ResumeError::IoError(format!("Failed to flush temp file: {e}")))?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| ResumeError::IoError(format!("Failed to sync temp file: {e}")))?;

    temp_file
        .persist(path)
        .map_err(|e| ResumeError::IoError(format!("Failed to persist temp file: {e}")))?;

    if let Ok(dir) = std::fs::File::open(parent_dir) {
        let _ = dir.sync_all();
    }

    Ok(())
}
