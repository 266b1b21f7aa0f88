//! Optimistic concurrency guard
//!
//! Compares a local file's modification time against the remote's last
//! known update time before any single-file mutation. No buffer: any local
//! mtime older than the remote update means the writer has not seen the
//! remote change, and the write is rejected before anything is transmitted.

use chrono::{DateTime, Utc};
use gs_core::error::SyncError;
use std::path::Path;

/// Reject the write when the local copy predates the remote update
///
/// A missing local file is a first write, not an error.
pub fn check_in_sync(local_path: &Path, remote_update_time: DateTime<Utc>) -> Result<(), SyncError> {
    let metadata = match std::fs::metadata(local_path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(SyncError::Io(e)),
    };
    let mod_time: DateTime<Utc> = metadata.modified()?.into();

    if mod_time < remote_update_time {
        return Err(SyncError::StaleWrite {
            path: local_path.display().to_string(),
        });
    }
    Ok(())
}
