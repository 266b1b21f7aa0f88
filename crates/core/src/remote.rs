//! Remote store boundary
//!
//! The real client (network calls, token refresh) lives outside this
//! workspace. The engine sees only this trait. `InMemoryRemote` backs every
//! integration test and doubles as a local development store.

use crate::error::RemoteError;
use crate::types::{FileKind, RemoteFile};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Validate one raw wire record into a typed `RemoteFile`
///
/// Runs at the client boundary so downstream components never branch on raw
/// type strings.
pub fn validate_record(
    name: &str,
    kind: &str,
    content: String,
    position: u32,
    update_time: chrono::DateTime<Utc>,
) -> Result<RemoteFile, RemoteError> {
    if name.is_empty() {
        return Err(RemoteError::InvalidRecord("empty file name".into()));
    }
    let kind = FileKind::from_wire(kind)
        .ok_or_else(|| RemoteError::InvalidRecord(format!("unknown file type '{kind}'")))?;
    Ok(RemoteFile {
        name: name.to_string(),
        kind,
        content,
        position,
        update_time,
    })
}

/// The remote document store, keyed by project id
///
/// Mutating calls return the full updated file list, mirroring the remote
/// API's behavior.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn list(&self, project_id: &str) -> Result<Vec<RemoteFile>, RemoteError>;

    async fn write(
        &self,
        project_id: &str,
        name: &str,
        content: &str,
        kind: FileKind,
    ) -> Result<Vec<RemoteFile>, RemoteError>;

    async fn delete(&self, project_id: &str, name: &str) -> Result<Vec<RemoteFile>, RemoteError>;
}

/// In-process remote store
///
/// Supports failure injection: after `fail_after_writes(n)`, the (n+1)th
/// write returns a network error, which is how the transaction rollback
/// tests exercise the remote-failure path.
#[derive(Default)]
pub struct InMemoryRemote {
    projects: Mutex<HashMap<String, Vec<RemoteFile>>>,
    writes_until_failure: Mutex<Option<u32>>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a project with files
    pub fn seed(&self, project_id: &str, files: Vec<RemoteFile>) {
        self.projects.lock().insert(project_id.to_string(), files);
    }

    /// Allow `n` more writes, then fail every subsequent one
    pub fn fail_after_writes(&self, n: u32) {
        *self.writes_until_failure.lock() = Some(n);
    }

    /// Direct snapshot of a project's files, for assertions
    pub fn snapshot(&self, project_id: &str) -> Vec<RemoteFile> {
        self.projects
            .lock()
            .get(project_id)
            .cloned()
            .unwrap_or_default()
    }

    fn check_write_allowed(&self) -> Result<(), RemoteError> {
        let mut guard = self.writes_until_failure.lock();
        if let Some(remaining) = guard.as_mut() {
            if *remaining == 0 {
                return Err(RemoteError::Network("injected write failure".into()));
            }
            *remaining -= 1;
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemote {
    async fn list(&self, project_id: &str) -> Result<Vec<RemoteFile>, RemoteError> {
        Ok(self.snapshot(project_id))
    }

    async fn write(
        &self,
        project_id: &str,
        name: &str,
        content: &str,
        kind: FileKind,
    ) -> Result<Vec<RemoteFile>, RemoteError> {
        self.check_write_allowed()?;

        let mut projects = self.projects.lock();
        let files = projects.entry(project_id.to_string()).or_default();

        match files.iter_mut().find(|f| f.name == name) {
            Some(existing) => {
                existing.content = content.to_string();
                existing.kind = kind;
                existing.update_time = Utc::now();
            }
            None => {
                let position = files.len() as u32;
                files.push(RemoteFile {
                    name: name.to_string(),
                    kind,
                    content: content.to_string(),
                    position,
                    update_time: Utc::now(),
                });
            }
        }

        Ok(files.clone())
    }

    async fn delete(&self, project_id: &str, name: &str) -> Result<Vec<RemoteFile>, RemoteError> {
        self.check_write_allowed()?;

        let mut projects = self.projects.lock();
        let files = projects.entry(project_id.to_string()).or_default();
        files.retain(|f| f.name != name);

        Ok(files.clone())
    }
}
