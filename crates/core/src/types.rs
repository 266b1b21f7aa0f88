//! Typed file model shared between the remote store and the local tree

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;

/// Kind of a remote file, validated at the remote-client boundary
///
/// The remote wire format uses upper-case strings (`CODE`, `MARKUP`, `DATA`);
/// older projects report lower-case. Downstream code only ever sees this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileKind {
    Code,
    Markup,
    Data,
}

impl FileKind {
    /// Parse a wire string into a kind
    pub fn from_wire(s: &str) -> Option<FileKind> {
        match s.to_ascii_uppercase().as_str() {
            "CODE" | "SERVER_JS" => Some(FileKind::Code),
            "MARKUP" | "HTML" => Some(FileKind::Markup),
            "DATA" | "JSON" => Some(FileKind::Data),
            _ => None,
        }
    }

    /// Wire string for this kind
    pub fn as_wire(&self) -> &'static str {
        match self {
            FileKind::Code => "CODE",
            FileKind::Markup => "MARKUP",
            FileKind::Data => "DATA",
        }
    }

    /// Local file extension for this kind (without the dot)
    pub fn extension(&self) -> &'static str {
        match self {
            FileKind::Code => "js",
            FileKind::Markup => "html",
            FileKind::Data => "json",
        }
    }

    /// Kind implied by a local file extension
    pub fn from_extension(ext: &str) -> Option<FileKind> {
        match ext {
            "js" => Some(FileKind::Code),
            "html" => Some(FileKind::Markup),
            "json" => Some(FileKind::Data),
            _ => None,
        }
    }
}

/// One file record as held by the remote store
///
/// The engine only ever holds transient copies; the remote store owns these.
/// `name` is path-like: slashes denote logical grouping, there are no real
/// directories on the remote side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub name: String,
    pub kind: FileKind,
    pub content: String,
    /// Execution order within the project
    pub position: u32,
    pub update_time: DateTime<Utc>,
}

/// One file as it exists in the local working tree
#[derive(Debug, Clone)]
pub struct LocalFile {
    pub relative_path: PathBuf,
    pub content: Vec<u8>,
    /// Authority for "has this been touched since last sync"
    pub mod_time: SystemTime,
}

/// Direction of a sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncDirection {
    /// Pull, merge, push
    Sync,
    /// Stop after merge/commit
    PullOnly,
    /// Pull and merge first, then push (never a blind push)
    PushOnly,
}

impl SyncDirection {
    pub fn from_wire(s: &str) -> Option<SyncDirection> {
        match s {
            "sync" => Some(SyncDirection::Sync),
            "pull-only" => Some(SyncDirection::PullOnly),
            "push-only" => Some(SyncDirection::PushOnly),
            _ => None,
        }
    }

    pub fn as_wire(&self) -> &'static str {
        match self {
            SyncDirection::Sync => "sync",
            SyncDirection::PullOnly => "pull-only",
            SyncDirection::PushOnly => "push-only",
        }
    }

    /// Whether the push phase runs at all
    pub fn pushes(&self) -> bool {
        !matches!(self, SyncDirection::PullOnly)
    }
}

/// One conflicted region extracted from merge output
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictSpan {
    /// 1-indexed line of the opening marker
    pub start_line: usize,
    /// 1-indexed line of the closing marker
    pub end_line: usize,
    pub local: String,
    pub base: Option<String>,
    pub remote: String,
}

/// A file the merge engine could not reconcile
///
/// Never silently resolved; the caller must fix the markers and re-run.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeConflict {
    /// Path relative to the sub-tree working copy
    pub path: String,
    pub spans: Vec<ConflictSpan>,
}

/// Outcome of syncing one sub-tree
#[derive(Debug, Clone, Default)]
pub struct SyncResult {
    pub subtree: String,
    pub files_pulled: usize,
    pub files_merged: usize,
    pub files_pushed: usize,
    pub conflicts: Vec<MergeConflict>,
}

impl SyncResult {
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}

/// Aggregate outcome of a full sync run across sub-trees
///
/// A failure in one sub-tree never aborts the others; it is recorded here
/// alongside the results of the sub-trees that did complete.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub results: Vec<SyncResult>,
    /// Sub-tree path paired with the error that stopped it
    pub failures: Vec<(String, crate::error::SyncError)>,
}

impl SyncReport {
    /// True when no sub-tree failed and no sub-tree has unresolved conflicts
    pub fn success(&self) -> bool {
        self.failures.is_empty() && self.results.iter().all(|r| r.is_clean())
    }

    /// Error form of the aggregate outcome, for callers that want failure
    /// as `Err` instead of inspecting the report
    pub fn into_result(mut self) -> Result<Vec<SyncResult>, crate::error::SyncError> {
        let paths = self.conflict_paths();
        if !paths.is_empty() {
            return Err(crate::error::SyncError::Conflict { paths });
        }
        if !self.failures.is_empty() {
            let (_, err) = self.failures.remove(0);
            return Err(err);
        }
        Ok(self.results)
    }

    /// Every conflicted path across all sub-trees, prefixed with its sub-tree
    pub fn conflict_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        for result in &self.results {
            for conflict in &result.conflicts {
                if result.subtree.is_empty() {
                    paths.push(conflict.path.clone());
                } else {
                    paths.push(format!("{}/{}", result.subtree, conflict.path));
                }
            }
        }
        paths
    }
}
