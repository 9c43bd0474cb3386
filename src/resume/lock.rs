//! Advisory locking around checkpoint reads and writes
//!
//! The lock lives in a sibling `<name>.lock` file so the checkpoint itself can
//! be replaced atomically by rename while the lock is held.

use super::store::ResumeError;
use fd_lock::RwLock;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// Lock flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Multiple readers
    Shared,
    /// Single writer
    Exclusive,
}

/// Path of the lock file guarding `path`
pub fn lock_path_for(path: &Path) -> PathBuf {
    path.with_extension("lock")
}

/// Run `f` while holding a lock on the checkpoint at `path`.
///
/// Blocks until the lock is available. The lock is released when `f` returns.
pub fn with_lock<T>(
    path: &Path,
    mode: LockMode,
    f: impl FnOnce() -> Result<T, ResumeError>,
) -> Result<T, ResumeError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ResumeError::IoError(e.to_string()))?;
    }

    let lock_path = lock_path_for(path);
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|e| ResumeError::LockError(format!("Failed to open lock file: {e}")))?;

    let mut lock = RwLock::new(file);

    match mode {
        LockMode::Shared => {
            let _guard = lock
                .read()
                .map_err(|e| ResumeError::LockError(format!("Failed to acquire read lock: {e}")))?;
            f()
        }
        LockMode::Exclusive => {
            let _guard = lock
                .write()
                .map_err(|e| ResumeError::LockError(format!("Failed to acquire write lock: {e}")))?;
            f()
        }
    }
}
