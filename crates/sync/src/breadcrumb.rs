//! Breadcrumb registry
//!
//! A breadcrumb is a remote file at `<subtree>/.git/config` declaring that
//! path (and everything beneath it, until a nested breadcrumb) as one
//! independently synchronized unit. Breadcrumbs never overlap: a file
//! belongs to its nearest ancestor breadcrumb. The engine reads breadcrumbs
//! at sync start and rewrites them only after a fully successful push; it
//! never creates one on its own.

use chrono::{DateTime, Utc};
use gs_core::types::{RemoteFile, SyncDirection};
use std::path::PathBuf;

/// Remote file name of the breadcrumb inside its sub-tree
pub const BREADCRUMB_FILE: &str = ".git/config";

/// Metadata recorded after the last successful push
#[derive(Debug, Clone, PartialEq)]
pub struct LastSync {
    pub timestamp: DateTime<Utc>,
    pub direction: SyncDirection,
    pub files_changed: u32,
}

/// Parsed breadcrumb content (INI-like, git-config style)
#[derive(Debug, Clone, PartialEq)]
pub struct Breadcrumb {
    pub remote_url: Option<String>,
    pub branch: String,
    pub local_sync_path: Option<PathBuf>,
    pub last_sync: Option<LastSync>,
}

impl Default for Breadcrumb {
    fn default() -> Self {
        Self {
            remote_url: None,
            branch: "main".to_string(),
            local_sync_path: None,
            last_sync: None,
        }
    }
}

impl Breadcrumb {
    /// Parse breadcrumb content; unknown sections and keys are ignored
    pub fn parse(content: &str) -> Breadcrumb {
        let mut crumb = Breadcrumb::default();
        let mut section = String::new();

        let mut ts: Option<DateTime<Utc>> = None;
        let mut direction: Option<SyncDirection> = None;
        let mut files_changed: Option<u32> = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                let header = &line[1..line.len() - 1];
                if let Some(rest) = header.strip_prefix("branch ") {
                    crumb.branch = rest.trim_matches('"').to_string();
                    section = "branch".to_string();
                } else {
                    section = header
                        .split_whitespace()
                        .next()
                        .unwrap_or_default()
                        .to_string();
                }
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            match (section.as_str(), key) {
                ("remote", "url") => crumb.remote_url = Some(value.to_string()),
                ("sync", "localSyncPath") => {
                    crumb.local_sync_path = Some(PathBuf::from(value));
                }
                ("sync", "lastSync.timestamp") => {
                    ts = DateTime::parse_from_rfc3339(value)
                        .ok()
                        .map(|t| t.with_timezone(&Utc));
                }
                ("sync", "lastSync.direction") => {
                    direction = SyncDirection::from_wire(value);
                }
                ("sync", "lastSync.filesChanged") => {
                    files_changed = value.parse().ok();
                }
                _ => {}
            }
        }

        if let (Some(timestamp), Some(direction)) = (ts, direction) {
            crumb.last_sync = Some(LastSync {
                timestamp,
                direction,
                files_changed: files_changed.unwrap_or(0),
            });
        }

        crumb
    }

    /// Serialize back to git-config style text
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        if let Some(url) = &self.remote_url {
            out.push_str("[remote \"origin\"]\n");
            out.push_str(&format!("\turl = {url}\n"));
        }
        out.push_str(&format!("[branch \"{}\"]\n", self.branch));
        out.push_str("[sync]\n");
        if let Some(path) = &self.local_sync_path {
            out.push_str(&format!("\tlocalSyncPath = {}\n", path.display()));
        }
        if let Some(last) = &self.last_sync {
            out.push_str(&format!(
                "\tlastSync.timestamp = {}\n",
                last.timestamp.to_rfc3339()
            ));
            out.push_str(&format!(
                "\tlastSync.direction = {}\n",
                last.direction.as_wire()
            ));
            out.push_str(&format!(
                "\tlastSync.filesChanged = {}\n",
                last.files_changed
            ));
        }
        out
    }
}

/// Remote name of the breadcrumb for a sub-tree
pub fn breadcrumb_name(subtree: &str) -> String {
    if subtree.is_empty() {
        BREADCRUMB_FILE.to_string()
    } else {
        format!("{subtree}/{BREADCRUMB_FILE}")
    }
}

/// The breadcrumb record for a sub-tree, if the remote has one
pub fn find_breadcrumb<'a>(files: &'a [RemoteFile], subtree: &str) -> Option<&'a RemoteFile> {
    let name = breadcrumb_name(subtree);
    files.iter().find(|f| f.name == name)
}

/// Every sync unit in the project: the root plus each breadcrumbed path
pub fn list_subtrees(files: &[RemoteFile]) -> Vec<String> {
    let mut subtrees = vec![String::new()];
    for file in files {
        if let Some(path) = file.name.strip_suffix(&format!("/{BREADCRUMB_FILE}")) {
            subtrees.push(path.to_string());
        }
    }
    subtrees.sort();
    subtrees.dedup();
    subtrees
}

/// Paths of breadcrumbed sub-trees strictly below `subtree`, relative to it
pub(crate) fn nested_roots(files: &[RemoteFile], subtree: &str) -> Vec<String> {
    list_subtrees(files)
        .into_iter()
        .filter_map(|s| {
            if s.is_empty() || s == subtree {
                return None;
            }
            if subtree.is_empty() {
                Some(s)
            } else {
                s.strip_prefix(&format!("{subtree}/")).map(str::to_string)
            }
        })
        .collect()
}

/// Files owned by one sub-tree, with the sub-tree prefix stripped
///
/// Files under a deeper nested breadcrumb are excluded; they belong to that
/// nested unit alone. The sub-tree's own `.git/...` files are included.
pub fn filter_to_subtree(files: &[RemoteFile], subtree: &str) -> Vec<RemoteFile> {
    let nested = nested_roots(files, subtree);

    files
        .iter()
        .filter_map(|file| {
            let rel = if subtree.is_empty() {
                file.name.as_str()
            } else {
                file.name.strip_prefix(&format!("{subtree}/"))?
            };
            let owned_by_nested = nested
                .iter()
                .any(|root| rel.starts_with(&format!("{root}/")));
            if owned_by_nested {
                return None;
            }
            let mut owned = file.clone();
            owned.name = rel.to_string();
            Some(owned)
        })
        .collect()
}
