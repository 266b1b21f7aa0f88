//! Batched worktree merge strategy
//!
//! Instead of one `merge-file` call per path, the remote file set is
//! materialized in a throwaway worktree rooted at HEAD, reduced to a single
//! patch, and applied to the main working copy with three-way fallback.
//! Fewer subprocess calls, coarser conflict granularity: one failing hunk
//! can hold back otherwise-mergeable files that share the patch.

use crate::conflicts::parse_conflict_spans;
use crate::git::Git;
use crate::strategy::{IncomingFile, MergeError, MergeStrategy, TreeMergeOutcome};
use crate::three_way::{classify, FileMergeState};
use gs_core::types::MergeConflict;
use std::fs;

pub struct WorktreeStrategy;

impl MergeStrategy for WorktreeStrategy {
    fn name(&self) -> &'static str {
        "worktree"
    }

    fn merge_tree(
        &self,
        git: &Git,
        incoming: &[IncomingFile],
    ) -> Result<TreeMergeOutcome, MergeError> {
        if git.head_commit()?.is_none() {
            return Err(MergeError::MissingHead);
        }

        // Files identical to the working copy never enter the patch
        let mut changed = Vec::new();
        for file in incoming {
            let abs = git.workdir().join(&file.relative_path);
            let local = if abs.exists() {
                Some(fs::read_to_string(&abs)?)
            } else {
                None
            };
            if classify(local.as_deref(), &file.content) != FileMergeState::Unchanged {
                changed.push(file);
            }
        }
        if changed.is_empty() {
            return Ok(TreeMergeOutcome::default());
        }

        let scratch = tempfile::tempdir()?;
        let wt_path = scratch.path().join("incoming");
        git.worktree_add_detached(&wt_path, "HEAD")?;

        // Everything below must release the worktree again, conflict or not
        let result = self.merge_via_worktree(git, &wt_path, &changed, scratch.path());
        if let Err(remove_err) = git.worktree_remove(&wt_path) {
            tracing::warn!(error = %remove_err, "failed to remove throwaway worktree");
        }
        result
    }
}

impl WorktreeStrategy {
    fn merge_via_worktree(
        &self,
        git: &Git,
        wt_path: &std::path::Path,
        changed: &[&IncomingFile],
        scratch: &std::path::Path,
    ) -> Result<TreeMergeOutcome, MergeError> {
        for file in changed {
            let target = wt_path.join(&file.relative_path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, &file.content)?;
        }

        let wt_git = Git::new(wt_path);
        wt_git.add_all()?;
        let patch = wt_git.diff_cached()?;
        if patch.trim().is_empty() {
            // Remote matches HEAD for every changed path; local-only edits
            // stay untouched
            return Ok(TreeMergeOutcome::default());
        }

        let patch_path = scratch.join("incoming.patch");
        fs::write(&patch_path, &patch)?;

        let touched = patch.lines().filter(|l| l.starts_with("+++ ")).count();
        let apply = git.apply_3way(&patch_path)?;

        if apply.success() {
            return Ok(TreeMergeOutcome {
                files_written: touched,
                files_merged: touched,
                conflicts: Vec::new(),
            });
        }

        let unmerged = git.unmerged_paths()?;
        if unmerged.is_empty() {
            return Err(MergeError::Git(crate::git::GitError::Command {
                command: "apply --3way".to_string(),
                exit_code: apply.exit_code,
                stderr: apply.stderr.trim().to_string(),
            }));
        }

        tracing::warn!(files = unmerged.len(), "patch application left conflicts");
        let mut conflicts = Vec::new();
        for path in unmerged {
            let content = fs::read_to_string(git.workdir().join(&path)).unwrap_or_default();
            conflicts.push(MergeConflict {
                spans: parse_conflict_spans(&content),
                path,
            });
        }

        Ok(TreeMergeOutcome {
            files_written: touched,
            files_merged: touched.saturating_sub(conflicts.len()),
            conflicts,
        })
    }
}
