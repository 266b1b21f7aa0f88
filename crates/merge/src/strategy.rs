//! Merge strategy selection
//!
//! Two interchangeable strategies reconcile the transformed remote file set
//! with a local working copy. The worktree strategy batches everything into
//! one patch application; the three-way strategy runs one merge per file.
//! A capability probe picks for installations without worktree support.

use crate::git::{Git, GitError};
use gs_core::config::StrategyChoice;
use gs_core::types::MergeConflict;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MergeError {
    #[error(transparent)]
    Git(#[from] GitError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("working copy has no commits; provision it before merging")]
    MissingHead,
}

/// One transformed remote file headed for the working copy
#[derive(Debug, Clone)]
pub struct IncomingFile {
    /// Path relative to the working copy root
    pub relative_path: PathBuf,
    pub content: String,
}

/// Result of merging a whole file set into the working copy
#[derive(Debug, Default)]
pub struct TreeMergeOutcome {
    /// Files created or updated on disk (including conflict-marker files)
    pub files_written: usize,
    /// Files that required an actual merge and came out clean
    pub files_merged: usize,
    pub conflicts: Vec<MergeConflict>,
}

impl TreeMergeOutcome {
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}

pub trait MergeStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Reconcile the incoming file set with the working copy
    ///
    /// Guarantee: a file whose merge produced conflict markers is recorded
    /// in `conflicts` and must not be pushed by the caller.
    fn merge_tree(&self, git: &Git, incoming: &[IncomingFile])
        -> Result<TreeMergeOutcome, MergeError>;
}

/// Pick a strategy for this working copy
///
/// `Auto` probes the local git installation: worktree support plus an
/// existing HEAD commit selects the batched worktree strategy, anything
/// else falls back to per-file three-way merges.
pub fn select_strategy(choice: StrategyChoice, git: &Git) -> Box<dyn MergeStrategy> {
    match choice {
        StrategyChoice::ThreeWay => Box::new(crate::three_way::ThreeWayStrategy),
        StrategyChoice::Worktree => Box::new(crate::worktree::WorktreeStrategy),
        StrategyChoice::Auto => {
            let worktree_capable = git.supports_worktrees()
                && matches!(git.head_commit(), Ok(Some(_)));
            if worktree_capable {
                tracing::debug!("merge strategy probe selected worktree");
                Box::new(crate::worktree::WorktreeStrategy)
            } else {
                tracing::debug!("merge strategy probe selected three-way");
                Box::new(crate::three_way::ThreeWayStrategy)
            }
        }
    }
}
