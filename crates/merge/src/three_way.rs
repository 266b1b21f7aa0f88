//! Per-file three-way merge strategy
//!
//! Each incoming file runs a small state machine:
//! - `NewRemote`: no local copy, write the remote content verbatim
//! - `Unchanged`: bitwise equal, skip
//! - `Diverged`: three-way merge via `git merge-file`
//!
//! The base handed to `merge-file` is the file's last-committed local
//! version. No true last-synced snapshot is retained, so once the sync's
//! own commit has absorbed local edits a later merge sees them as part of
//! the base; that drift is inherited behavior, kept rather than corrected.

use crate::conflicts::parse_conflict_spans;
use crate::git::{Git, MergeFileOutcome};
use crate::strategy::{IncomingFile, MergeError, MergeStrategy, TreeMergeOutcome};
use gs_core::types::MergeConflict;
use std::fs;
use std::path::Path;

/// Classification of one incoming file against the working copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMergeState {
    NewRemote,
    Unchanged,
    Diverged,
}

/// Classify without touching anything
pub fn classify(local: Option<&str>, incoming: &str) -> FileMergeState {
    match local {
        None => FileMergeState::NewRemote,
        Some(existing) if existing == incoming => FileMergeState::Unchanged,
        Some(_) => FileMergeState::Diverged,
    }
}

/// Three-way merge of explicit base/local/remote contents
///
/// This is the engine primitive: given a genuine base, overlapping
/// local/remote edits always surface as a conflict, never as silent
/// resolution.
pub fn merge_contents(
    git: &Git,
    base: &str,
    local: &str,
    remote: &str,
) -> Result<MergeFileOutcome, MergeError> {
    let dir = tempfile::tempdir()?;
    let base_path = dir.path().join("base");
    let local_path = dir.path().join("local");
    let remote_path = dir.path().join("remote");
    fs::write(&base_path, base)?;
    fs::write(&local_path, local)?;
    fs::write(&remote_path, remote)?;

    Ok(git.merge_file(&local_path, &base_path, &remote_path)?)
}

pub struct ThreeWayStrategy;

impl MergeStrategy for ThreeWayStrategy {
    fn name(&self) -> &'static str {
        "three-way"
    }

    fn merge_tree(
        &self,
        git: &Git,
        incoming: &[IncomingFile],
    ) -> Result<TreeMergeOutcome, MergeError> {
        let mut outcome = TreeMergeOutcome::default();

        for file in incoming {
            let abs = git.workdir().join(&file.relative_path);
            let local = read_if_exists(&abs)?;

            match classify(local.as_deref(), &file.content) {
                FileMergeState::NewRemote => {
                    write_file(&abs, &file.content)?;
                    outcome.files_written += 1;
                }
                FileMergeState::Unchanged => {}
                FileMergeState::Diverged => {
                    let rel = file.relative_path.to_string_lossy();
                    // Paths absent from HEAD get an empty base so that
                    // concurrent additions conflict instead of one side
                    // overwriting the other.
                    let base = git.head_content(&rel)?.unwrap_or_default();
                    let local = local.unwrap_or_default();

                    match merge_contents(git, &base, &local, &file.content)? {
                        MergeFileOutcome::Clean(text) => {
                            write_file(&abs, &text)?;
                            outcome.files_written += 1;
                            outcome.files_merged += 1;
                        }
                        MergeFileOutcome::Conflict { text, regions } => {
                            tracing::warn!(
                                path = %rel,
                                regions,
                                "three-way merge left conflicts"
                            );
                            write_file(&abs, &text)?;
                            outcome.files_written += 1;
                            outcome.conflicts.push(MergeConflict {
                                path: rel.into_owned(),
                                spans: parse_conflict_spans(&text),
                            });
                        }
                    }
                }
            }
        }

        Ok(outcome)
    }
}

fn read_if_exists(path: &Path) -> std::io::Result<Option<String>> {
    if path.exists() {
        Ok(Some(fs::read_to_string(path)?))
    } else {
        Ok(None)
    }
}

fn write_file(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn repo() -> (TempDir, Git) {
        let dir = TempDir::new().unwrap();
        let git = Git::new(dir.path());
        git.init().unwrap();
        git.config("user.name", "test").unwrap();
        git.config("user.email", "test@example.com").unwrap();
        (dir, git)
    }

    fn incoming(path: &str, content: &str) -> IncomingFile {
        IncomingFile {
            relative_path: PathBuf::from(path),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(None, "x"), FileMergeState::NewRemote);
        assert_eq!(classify(Some("x"), "x"), FileMergeState::Unchanged);
        assert_eq!(classify(Some("x"), "y"), FileMergeState::Diverged);
    }

    #[test]
    fn test_new_remote_written_verbatim() {
        let (dir, git) = repo();
        let outcome = ThreeWayStrategy
            .merge_tree(&git, &[incoming("lib/utils.js", "function f() {}\n")])
            .unwrap();

        assert_eq!(outcome.files_written, 1);
        assert_eq!(outcome.files_merged, 0);
        assert!(outcome.is_clean());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("lib/utils.js")).unwrap(),
            "function f() {}\n"
        );
    }

    #[test]
    fn test_unchanged_skipped() {
        let (dir, git) = repo();
        std::fs::write(dir.path().join("a.js"), "same\n").unwrap();

        let outcome = ThreeWayStrategy
            .merge_tree(&git, &[incoming("a.js", "same\n")])
            .unwrap();
        assert_eq!(outcome.files_written, 0);
        assert!(outcome.is_clean());
    }

    #[test]
    fn test_disjoint_edits_merge_clean() {
        let (dir, git) = repo();
        std::fs::write(dir.path().join("a.js"), "one\ntwo\nthree\n").unwrap();
        git.add_all().unwrap();
        git.commit("base").unwrap();

        // Local edits the first line, remote edits the last
        std::fs::write(dir.path().join("a.js"), "ONE\ntwo\nthree\n").unwrap();
        let outcome = ThreeWayStrategy
            .merge_tree(&git, &[incoming("a.js", "one\ntwo\nTHREE\n")])
            .unwrap();

        assert_eq!(outcome.files_merged, 1);
        assert!(outcome.is_clean());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("a.js")).unwrap(),
            "ONE\ntwo\nTHREE\n"
        );
    }

    #[test]
    fn test_overlapping_edits_conflict() {
        let (dir, git) = repo();
        std::fs::write(dir.path().join("a.js"), "one\ntwo\n").unwrap();
        git.add_all().unwrap();
        git.commit("base").unwrap();

        std::fs::write(dir.path().join("a.js"), "LOCAL\ntwo\n").unwrap();
        let outcome = ThreeWayStrategy
            .merge_tree(&git, &[incoming("a.js", "REMOTE\ntwo\n")])
            .unwrap();

        assert_eq!(outcome.conflicts.len(), 1);
        assert_eq!(outcome.conflicts[0].path, "a.js");
        assert_eq!(outcome.conflicts[0].spans.len(), 1);
        assert_eq!(outcome.conflicts[0].spans[0].local, "LOCAL");
        assert_eq!(outcome.conflicts[0].spans[0].remote, "REMOTE");

        let on_disk = std::fs::read_to_string(dir.path().join("a.js")).unwrap();
        assert!(on_disk.contains("<<<<<<< local"));
        assert!(on_disk.contains(">>>>>>> remote"));
    }

    #[test]
    fn test_concurrent_additions_conflict() {
        let (dir, git) = repo();
        // Never committed locally, also present remotely with other content
        std::fs::write(dir.path().join("new.js"), "local version\n").unwrap();

        let outcome = ThreeWayStrategy
            .merge_tree(&git, &[incoming("new.js", "remote version\n")])
            .unwrap();
        assert_eq!(outcome.conflicts.len(), 1);
    }

    #[test]
    fn test_engine_primitive_never_resolves_overlap() {
        let (_dir, git) = repo();
        let outcome =
            merge_contents(&git, "shared\n", "local change\n", "remote change\n").unwrap();
        assert!(matches!(outcome, MergeFileOutcome::Conflict { .. }));
    }
}
