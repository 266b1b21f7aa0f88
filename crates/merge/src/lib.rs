//! Merge engine
//!
//! Reconciles transformed remote content with a local git working copy.
//! Two strategies behind one trait:
//! - Three-way: one `git merge-file` per diverged path
//! - Worktree: one patch built in a throwaway worktree, applied with
//!   `git apply --3way`
//!
//! Both guarantee that conflicted files never reach the push phase: a
//! conflict is written to disk as markers, reported, and left for a human.

pub mod conflicts;
pub mod git;
pub mod strategy;
pub mod three_way;
pub mod worktree;

pub use conflicts::{file_has_conflict_markers, has_conflict_markers, parse_conflict_spans};
pub use git::{Git, GitError, GitOutput, MergeFileOutcome};
pub use strategy::{select_strategy, IncomingFile, MergeError, MergeStrategy, TreeMergeOutcome};
pub use three_way::{classify, merge_contents, FileMergeState, ThreeWayStrategy};
pub use worktree::WorktreeStrategy;
