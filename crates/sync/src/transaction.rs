//! Atomic single-file write transaction
//!
//! The everyday-edit fast path: one file changes locally, gets validated,
//! and is pushed to the remote store, with compensating rollback at every
//! phase boundary:
//!
//! 1. Stale check: rejected before anything is touched
//! 2. Local write + validation hooks: hook failure restores the prior
//!    bytes, nothing is committed or pushed
//! 3. Commit + remote push: push failure resets the branch to its prior
//!    HEAD; a failing reset is the one state that needs a human, and the
//!    error names the orphaned commit and the recovery command

use crate::guard;
use gs_core::config::SyncConfig;
use gs_core::error::SyncError;
use gs_core::locks::PathLocks;
use gs_core::remote::RemoteStore;
use merge::{Git, GitError};
use std::path::Path;
use std::process::Command;

fn git_err(e: GitError) -> SyncError {
    SyncError::Git(e.to_string())
}

/// Write one file locally and remotely, atomically
///
/// `relative_path` is relative to the sub-tree working copy at `workdir`;
/// `subtree` is the remote prefix re-attached before pushing. After success
/// both sides agree on the file; after a rolled-back failure neither side
/// changed.
pub async fn atomic_write(
    remote: &dyn RemoteStore,
    config: &SyncConfig,
    locks: &PathLocks,
    project_id: &str,
    workdir: &Path,
    subtree: &str,
    relative_path: &Path,
    content: &str,
) -> Result<(), SyncError> {
    let _guard = locks.lock(workdir).await;
    tracing::debug!(path = %relative_path.display(), "starting write transaction");

    if !workdir.join(".git").exists() {
        return Err(SyncError::NotLinked {
            path: workdir.display().to_string(),
        });
    }
    let git = Git::new(workdir);

    // Resolve the remote name up front; an unsupported path never starts a
    // transaction
    let draft = transform::to_remote(relative_path, content)
        .map_err(|e| SyncError::Transform(e.to_string()))?;
    let remote_name = if subtree.is_empty() {
        draft.name.clone()
    } else {
        format!("{subtree}/{}", draft.name)
    };

    // Phase 0: optimistic concurrency check against the remote's clock
    let abs = workdir.join(relative_path);
    let remote_files = remote.list(project_id).await?;
    if let Some(counterpart) = remote_files.iter().find(|f| f.name == remote_name) {
        guard::check_in_sync(&abs, counterpart.update_time)?;
    }

    // Snapshot for rollback
    let prior_content = if abs.exists() {
        Some(std::fs::read(&abs)?)
    } else {
        None
    };
    let prior_head = match git.head_commit().map_err(git_err)? {
        Some(head) => head,
        None => {
            // A repo without commits has no state to roll back to
            git.commit_allow_empty("initialize sync workspace")
                .map_err(git_err)?;
            git.head_commit()
                .map_err(git_err)?
                .expect("commit just created")
        }
    };

    // Phase 1: local write + validation hooks
    if let Some(parent) = abs.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&abs, content)?;

    if let Err(err) = run_hooks(&config.validation_hooks, workdir, relative_path) {
        restore_local(&abs, prior_content.as_deref())?;
        return Err(err);
    }

    if !git.is_dirty().map_err(git_err)? {
        // Content identical to the committed state; nothing to transact
        return Ok(());
    }
    git.add_all().map_err(git_err)?;
    git.commit(&format!("write {}", relative_path.display()))
        .map_err(git_err)?;

    // Phase 2: remote push, with hook edits picked up
    let pushed_content = std::fs::read_to_string(&abs)?;
    let draft = transform::to_remote(relative_path, &pushed_content)
        .map_err(|e| SyncError::Transform(e.to_string()))?;

    match remote
        .write(project_id, &remote_name, &draft.content, draft.kind)
        .await
    {
        Ok(_) => {
            tracing::info!(name = %remote_name, "pushed file");
            Ok(())
        }
        Err(push_err) => {
            // Phase 3: compensate
            tracing::warn!(error = %push_err, "remote push failed, rolling back");
            match git.reset_hard(&prior_head) {
                Ok(()) => Err(SyncError::Remote(push_err)),
                Err(reset_err) => {
                    let orphan = git
                        .head_commit()
                        .ok()
                        .flatten()
                        .unwrap_or_else(|| "HEAD".to_string());
                    tracing::error!(
                        commit = %orphan,
                        error = %reset_err,
                        "rollback failed, manual recovery required"
                    );
                    Err(SyncError::RollbackFailure {
                        commit: orphan,
                        recovery: format!(
                            "git -C {} reset --hard {prior_head}",
                            workdir.display()
                        ),
                    })
                }
            }
        }
    }
}

fn run_hooks(hooks: &[String], workdir: &Path, relative_path: &Path) -> Result<(), SyncError> {
    for hook in hooks {
        let output = Command::new("sh")
            .args(["-c", hook.as_str()])
            .current_dir(workdir)
            .env("GASKET_FILE", relative_path)
            .output()?;

        if !output.status.success() {
            let mut text = String::from_utf8_lossy(&output.stderr).into_owned();
            if text.trim().is_empty() {
                text = String::from_utf8_lossy(&output.stdout).into_owned();
            }
            return Err(SyncError::HookFailed {
                hook: hook.clone(),
                output: text.trim().to_string(),
            });
        }
    }
    Ok(())
}

fn restore_local(abs: &Path, prior: Option<&[u8]>) -> Result<(), SyncError> {
    match prior {
        Some(bytes) => std::fs::write(abs, bytes)?,
        None => {
            if abs.exists() {
                std::fs::remove_file(abs)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breadcrumb::Breadcrumb;
    use crate::workspace::ensure_workspace;
    use chrono::{Duration, Utc};
    use gs_core::remote::InMemoryRemote;
    use gs_core::types::{FileKind, RemoteFile};
    use tempfile::TempDir;

    fn setup() -> (TempDir, Git, SyncConfig, PathLocks, InMemoryRemote) {
        let dir = TempDir::new().unwrap();
        let git = Git::new(dir.path());
        let config = SyncConfig::default();
        ensure_workspace(&git, &config, &Breadcrumb::default()).unwrap();
        (dir, git, config, PathLocks::new(), InMemoryRemote::new())
    }

    #[tokio::test]
    async fn test_successful_write_reaches_both_sides() {
        let (dir, git, config, locks, remote) = setup();

        atomic_write(
            &remote,
            &config,
            &locks,
            "p",
            dir.path(),
            "",
            Path::new("utils.js"),
            "function f() {}\n",
        )
        .await
        .unwrap();

        // Local file committed
        assert!(dir.path().join("utils.js").exists());
        assert!(!git.is_dirty().unwrap());

        // Remote holds the wrapped module
        let files = remote.snapshot("p");
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "utils");
        assert_eq!(files[0].kind, FileKind::Code);
        assert!(files[0].content.contains("function f() {}"));
        assert!(files[0].content.contains("__defineModule__"));
    }

    #[tokio::test]
    async fn test_hook_failure_reverts_and_skips_push() {
        let (dir, git, mut config, locks, remote) = setup();
        config.validation_hooks = vec!["echo broken >&2; exit 1".to_string()];

        std::fs::write(dir.path().join("a.js"), "old\n").unwrap();
        git.add_all().unwrap();
        git.commit("seed").unwrap();
        let head = git.head_commit().unwrap();

        let err = atomic_write(
            &remote, &config, &locks, "p", dir.path(), "", Path::new("a.js"), "new\n",
        )
        .await;

        assert!(matches!(err, Err(SyncError::HookFailed { .. })));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("a.js")).unwrap(),
            "old\n"
        );
        assert_eq!(git.head_commit().unwrap(), head);
        assert!(remote.snapshot("p").is_empty());
    }

    #[tokio::test]
    async fn test_remote_failure_rolls_back_commit() {
        let (dir, git, config, locks, remote) = setup();
        remote.fail_after_writes(0);

        let head_before = git.head_commit().unwrap();
        let err = atomic_write(
            &remote,
            &config,
            &locks,
            "p",
            dir.path(),
            "",
            Path::new("a.js"),
            "content\n",
        )
        .await;

        assert!(matches!(err, Err(SyncError::Remote(_))));
        // HEAD equals its pre-transaction value and the file is gone
        assert_eq!(git.head_commit().unwrap(), head_before);
        assert!(!dir.path().join("a.js").exists());
        assert!(remote.snapshot("p").is_empty());
    }

    #[tokio::test]
    async fn test_stale_write_rejected_before_mutation() {
        let (dir, _git, config, locks, remote) = setup();

        std::fs::write(dir.path().join("a.js"), "local\n").unwrap();
        remote.seed(
            "p",
            vec![RemoteFile {
                name: "a".to_string(),
                kind: FileKind::Code,
                content: "newer remote".to_string(),
                position: 0,
                update_time: Utc::now() + Duration::hours(1),
            }],
        );

        let err = atomic_write(
            &remote, &config, &locks, "p", dir.path(), "", Path::new("a.js"), "mine\n",
        )
        .await;

        assert!(matches!(err, Err(SyncError::StaleWrite { .. })));
        // Nothing was touched
        assert_eq!(
            std::fs::read_to_string(dir.path().join("a.js")).unwrap(),
            "local\n"
        );
        assert_eq!(remote.snapshot("p")[0].content, "newer remote");
    }

    #[tokio::test]
    async fn test_hook_edits_are_pushed() {
        let (dir, _git, mut config, locks, remote) = setup();
        // Hook rewrites the file before the push phase
        config.validation_hooks =
            vec!["printf 'formatted\\n' > \"$GASKET_FILE\"".to_string()];

        atomic_write(
            &remote,
            &config,
            &locks,
            "p",
            dir.path(),
            "",
            Path::new("notes.json"),
            "raw\n",
        )
        .await
        .unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("notes.json")).unwrap(),
            "formatted\n"
        );
        assert_eq!(remote.snapshot("p")[0].content, "formatted\n");
    }
}
