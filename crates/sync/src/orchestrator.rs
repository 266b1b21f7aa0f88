//! Sync orchestrator
//!
//! Drives the full pull → merge → commit → push sequence per sub-tree and
//! aggregates partial failures: one sub-tree failing (conflict, remote
//! error, git error) never aborts its siblings. Within a sub-tree the
//! ordering is strict (pull precedes merge, merge precedes commit, commit
//! precedes push) and push-only still pulls and merges first, so a blind
//! push can never clobber unseen remote edits.

use crate::breadcrumb::{self, Breadcrumb, LastSync};
use crate::workspace;
use chrono::Utc;
use gs_core::config::SyncConfig;
use gs_core::error::SyncError;
use gs_core::locks::PathLocks;
use gs_core::remote::RemoteStore;
use gs_core::types::{FileKind, RemoteFile, SyncDirection, SyncReport, SyncResult};
use merge::{select_strategy, Git, IncomingFile};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    pub direction: SyncDirection,
    /// Skip merging and blindly clear-and-rewrite the local tree from the
    /// remote. A deliberately dangerous bypass; local edits are lost.
    pub force_overwrite: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            direction: SyncDirection::Sync,
            force_overwrite: false,
        }
    }
}

pub struct Syncer {
    remote: Arc<dyn RemoteStore>,
    config: SyncConfig,
    locks: Arc<PathLocks>,
}

impl Syncer {
    pub fn new(remote: Arc<dyn RemoteStore>, config: SyncConfig) -> Self {
        Self {
            remote,
            config,
            locks: Arc::new(PathLocks::new()),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn locks(&self) -> Arc<PathLocks> {
        self.locks.clone()
    }

    /// Sync every sub-tree of a project
    ///
    /// The remote file set is fetched once; sub-trees are discovered from
    /// their breadcrumbs and synchronized independently.
    pub async fn sync_project(
        &self,
        project_id: &str,
        options: &SyncOptions,
    ) -> Result<SyncReport, SyncError> {
        let files = self.remote.list(project_id).await?;
        let subtrees = breadcrumb::list_subtrees(&files);
        tracing::info!(
            project = project_id,
            subtrees = subtrees.len(),
            files = files.len(),
            "starting sync"
        );

        let mut report = SyncReport::default();
        for subtree in subtrees {
            match self
                .sync_subtree(project_id, &subtree, &files, options)
                .await
            {
                Ok(result) => report.results.push(result),
                Err(err) => {
                    tracing::warn!(subtree = %subtree, error = %err, "sub-tree sync failed");
                    report.failures.push((subtree, err));
                }
            }
        }
        Ok(report)
    }

    /// Sync one specific sub-tree
    ///
    /// A non-root path without a breadcrumb is not git-linked; the engine
    /// never creates a breadcrumb on its own.
    pub async fn sync_path(
        &self,
        project_id: &str,
        path: &str,
        options: &SyncOptions,
    ) -> Result<SyncResult, SyncError> {
        let files = self.remote.list(project_id).await?;
        if !path.is_empty() && breadcrumb::find_breadcrumb(&files, path).is_none() {
            return Err(SyncError::NotLinked {
                path: path.to_string(),
            });
        }
        self.sync_subtree(project_id, path, &files, options).await
    }

    async fn sync_subtree(
        &self,
        project_id: &str,
        subtree: &str,
        all_files: &[RemoteFile],
        options: &SyncOptions,
    ) -> Result<SyncResult, SyncError> {
        let crumb_file = breadcrumb::find_breadcrumb(all_files, subtree);
        if crumb_file.is_none() && !subtree.is_empty() {
            return Err(SyncError::NotLinked {
                path: subtree.to_string(),
            });
        }
        let crumb = crumb_file
            .map(|f| Breadcrumb::parse(&f.content))
            .unwrap_or_default();

        let workdir = self.workdir_for(project_id, subtree, &crumb);
        let _lock = self.locks.lock(&workdir).await;

        let git = Git::new(&workdir);
        workspace::ensure_workspace(&git, &self.config, &crumb)?;

        // Pull: this sub-tree's slice of the already-fetched remote set
        let subtree_files = breadcrumb::filter_to_subtree(all_files, subtree);
        let mut result = SyncResult {
            subtree: subtree.to_string(),
            files_pulled: subtree_files.len(),
            ..Default::default()
        };

        let mut incoming = Vec::new();
        for file in &subtree_files {
            match transform::to_local(file) {
                Ok(draft) => {
                    // Breadcrumb mirrors are plain copies with no merge
                    // semantics; write them directly
                    if transform::naming::is_breadcrumb_name(&file.name) {
                        let abs = workdir.join(&draft.relative_path);
                        if let Some(parent) = abs.parent() {
                            std::fs::create_dir_all(parent)?;
                        }
                        std::fs::write(&abs, &draft.content)?;
                        continue;
                    }
                    incoming.push(IncomingFile {
                        relative_path: draft.relative_path,
                        content: draft.content,
                    });
                }
                Err(err) => {
                    tracing::debug!(name = %file.name, error = %err, "skipping remote file");
                }
            }
        }

        // Merge
        if options.force_overwrite {
            tracing::warn!(subtree = %subtree, "force overwrite: discarding local tree");
            clear_tree(&workdir)?;
            for file in &incoming {
                let abs = workdir.join(&file.relative_path);
                if let Some(parent) = abs.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&abs, &file.content)?;
            }
        } else {
            let strategy = select_strategy(self.config.strategy, &git);
            tracing::debug!(strategy = strategy.name(), subtree = %subtree, "merging");
            let outcome = strategy
                .merge_tree(&git, &incoming)
                .map_err(|e| SyncError::Git(e.to_string()))?;
            result.files_merged = outcome.files_merged;

            if !outcome.is_clean() {
                // Conflict markers are on disk; nothing gets committed or
                // pushed until a human resolves them and re-runs the sync
                tracing::warn!(
                    subtree = %subtree,
                    conflicts = outcome.conflicts.len(),
                    "merge produced conflicts"
                );
                result.conflicts = outcome.conflicts;
                return Ok(result);
            }
        }

        // Commit
        if git.is_dirty().map_err(|e| SyncError::Git(e.to_string()))? {
            git.add_all().map_err(|e| SyncError::Git(e.to_string()))?;
            git.commit("sync with remote")
                .map_err(|e| SyncError::Git(e.to_string()))?;
        }

        // Push
        if options.direction.pushes() {
            result.files_pushed = self
                .push_subtree(project_id, subtree, all_files, &subtree_files, &workdir)
                .await?;

            // The breadcrumb is rewritten only after a fully successful
            // push, and only if one exists; syncing never creates one
            if crumb_file.is_some() {
                self.rewrite_breadcrumb(project_id, subtree, &crumb, options, &result, &workdir)
                    .await?;
            }
        }

        Ok(result)
    }

    /// Read back the local tree and push everything that differs remotely
    async fn push_subtree(
        &self,
        project_id: &str,
        subtree: &str,
        all_files: &[RemoteFile],
        subtree_files: &[RemoteFile],
        workdir: &Path,
    ) -> Result<usize, SyncError> {
        let nested = breadcrumb::nested_roots(all_files, subtree);
        let locals = workspace::read_local_tree(workdir, &nested)?;

        let remote_by_name: HashMap<&str, &RemoteFile> =
            subtree_files.iter().map(|f| (f.name.as_str(), f)).collect();

        let mut pushed = 0;
        for local in &locals {
            let Ok(content) = std::str::from_utf8(&local.content) else {
                tracing::debug!(path = %local.relative_path.display(), "skipping binary file");
                continue;
            };

            let draft = match transform::to_remote(&local.relative_path, content) {
                Ok(draft) => draft,
                Err(err) => {
                    tracing::debug!(
                        path = %local.relative_path.display(),
                        error = %err,
                        "skipping local file"
                    );
                    continue;
                }
            };

            // Unchanged files are excluded from the push set
            if let Some(existing) = remote_by_name.get(draft.name.as_str()) {
                if existing.kind == draft.kind && existing.content == draft.content {
                    continue;
                }
            }

            let full_name = if subtree.is_empty() {
                draft.name.clone()
            } else {
                format!("{subtree}/{}", draft.name)
            };
            self.remote
                .write(project_id, &full_name, &draft.content, draft.kind)
                .await?;
            pushed += 1;
        }

        tracing::info!(subtree = %subtree, pushed, "push complete");
        Ok(pushed)
    }

    async fn rewrite_breadcrumb(
        &self,
        project_id: &str,
        subtree: &str,
        crumb: &Breadcrumb,
        options: &SyncOptions,
        result: &SyncResult,
        workdir: &Path,
    ) -> Result<(), SyncError> {
        let mut updated = crumb.clone();
        updated.last_sync = Some(LastSync {
            timestamp: Utc::now(),
            direction: options.direction,
            files_changed: (result.files_merged + result.files_pushed) as u32,
        });
        let content = updated.serialize();

        self.remote
            .write(
                project_id,
                &breadcrumb::breadcrumb_name(subtree),
                &content,
                FileKind::Data,
            )
            .await?;

        let mirror = workdir.join(".git-gas").join("config");
        if let Some(parent) = mirror.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&mirror, &content)?;
        Ok(())
    }

    fn workdir_for(&self, project_id: &str, subtree: &str, crumb: &Breadcrumb) -> PathBuf {
        if let Some(path) = &crumb.local_sync_path {
            return path.clone();
        }
        if subtree.is_empty() {
            self.config.project_dir(project_id)
        } else {
            // Independent working copies live side by side; nesting one git
            // repository inside another would leak files across sync units
            self.config
                .base_dir
                .join(format!("{project_id}__{}", subtree.replace('/', "_")))
        }
    }
}

/// Remove everything in the working copy except the repository itself and
/// the breadcrumb mirror
fn clear_tree(root: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        let name = entry.file_name();
        if name == ".git" || name == ".git-gas" {
            continue;
        }
        if entry.file_type()?.is_dir() {
            std::fs::remove_dir_all(entry.path())?;
        } else {
            std::fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}
