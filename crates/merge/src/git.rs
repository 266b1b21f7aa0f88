//! Git subprocess runner
//!
//! Git is only ever invoked as a subprocess, with a fixed argument
//! vocabulary. Every invocation funnels through [`Git::run`], which captures
//! `{exit_code, stdout, stderr}`; the mapping from exit code to outcome
//! lives in one typed method per command instead of scattered heuristics.

use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GitError {
    #[error("failed to spawn git: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("git {command} failed with exit code {exit_code}: {stderr}")]
    Command {
        command: String,
        exit_code: i32,
        stderr: String,
    },
}

/// Captured result of one git invocation
#[derive(Debug, Clone)]
pub struct GitOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Outcome of `git merge-file`
#[derive(Debug, Clone, PartialEq)]
pub enum MergeFileOutcome {
    /// Merged text, no conflicts
    Clean(String),
    /// Text with inline conflict markers
    Conflict { text: String, regions: usize },
}

/// Handle on one working copy
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Run git with the given arguments, capturing everything
    pub fn run(&self, args: &[&str]) -> Result<GitOutput, GitError> {
        let output = Command::new("git")
            .current_dir(&self.workdir)
            .args(args)
            .output()
            .map_err(GitError::Spawn)?;

        Ok(GitOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Run git and require a zero exit code
    fn run_ok(&self, args: &[&str]) -> Result<GitOutput, GitError> {
        let out = self.run(args)?;
        if out.success() {
            Ok(out)
        } else {
            Err(GitError::Command {
                command: args.join(" "),
                exit_code: out.exit_code,
                stderr: out.stderr.trim().to_string(),
            })
        }
    }

    pub fn init(&self) -> Result<(), GitError> {
        self.run_ok(&["init"]).map(|_| ())
    }

    pub fn config(&self, key: &str, value: &str) -> Result<(), GitError> {
        self.run_ok(&["config", key, value]).map(|_| ())
    }

    /// `checkout -b` is a no-op when the branch already exists
    pub fn checkout_new_branch(&self, branch: &str) -> Result<(), GitError> {
        let refname = format!("refs/heads/{branch}");
        let verify = self.run(&["rev-parse", "--verify", "--quiet", refname.as_str()])?;
        if verify.success() {
            return Ok(());
        }
        self.run_ok(&["checkout", "-b", branch]).map(|_| ())
    }

    /// `remote add origin` tolerates an origin that is already registered
    pub fn remote_add_origin(&self, url: &str) -> Result<(), GitError> {
        let out = self.run(&["remote", "add", "origin", url])?;
        if out.success() || out.stderr.contains("already exists") {
            Ok(())
        } else {
            Err(GitError::Command {
                command: "remote add origin".to_string(),
                exit_code: out.exit_code,
                stderr: out.stderr.trim().to_string(),
            })
        }
    }

    pub fn add_all(&self) -> Result<(), GitError> {
        self.run_ok(&["add", "-A"]).map(|_| ())
    }

    pub fn commit(&self, message: &str) -> Result<(), GitError> {
        self.run_ok(&["commit", "-m", message]).map(|_| ())
    }

    pub fn commit_allow_empty(&self, message: &str) -> Result<(), GitError> {
        self.run_ok(&["commit", "--allow-empty", "-m", message])
            .map(|_| ())
    }

    /// Current HEAD commit, or `None` before the first commit
    pub fn head_commit(&self) -> Result<Option<String>, GitError> {
        let out = self.run(&["rev-parse", "--verify", "--quiet", "HEAD"])?;
        if out.success() {
            Ok(Some(out.stdout.trim().to_string()))
        } else {
            Ok(None)
        }
    }

    /// Content of a path as of HEAD, or `None` when HEAD has no such path
    pub fn head_content(&self, path: &str) -> Result<Option<String>, GitError> {
        let spec = format!("HEAD:{path}");
        let out = self.run(&["show", spec.as_str()])?;
        if out.success() {
            Ok(Some(out.stdout))
        } else {
            Ok(None)
        }
    }

    pub fn status_porcelain(&self) -> Result<String, GitError> {
        Ok(self.run_ok(&["status", "--porcelain"])?.stdout)
    }

    pub fn is_dirty(&self) -> Result<bool, GitError> {
        Ok(!self.status_porcelain()?.trim().is_empty())
    }

    /// Paths left unmerged after a failed three-way application
    pub fn unmerged_paths(&self) -> Result<Vec<String>, GitError> {
        let status = self.status_porcelain()?;
        let mut paths = Vec::new();
        for line in status.lines() {
            if line.len() < 4 {
                continue;
            }
            let code = &line[..2];
            // Any stage code involving U, or both-added/both-deleted
            if code.contains('U') || code == "AA" || code == "DD" {
                paths.push(line[3..].to_string());
            }
        }
        Ok(paths)
    }

    pub fn reset_hard(&self, commit: &str) -> Result<(), GitError> {
        self.run_ok(&["reset", "--hard", commit]).map(|_| ())
    }

    /// Three-way text merge of one file
    ///
    /// Exit code semantics of `merge-file`: 0 is a clean merge, a small
    /// positive code is the number of conflict regions, anything else is a
    /// hard failure.
    pub fn merge_file(
        &self,
        local: &Path,
        base: &Path,
        remote: &Path,
    ) -> Result<MergeFileOutcome, GitError> {
        let local = local.to_string_lossy();
        let base = base.to_string_lossy();
        let remote = remote.to_string_lossy();
        let out = self.run(&[
            "merge-file",
            "-p",
            "-L",
            "local",
            "-L",
            "base",
            "-L",
            "remote",
            local.as_ref(),
            base.as_ref(),
            remote.as_ref(),
        ])?;

        match out.exit_code {
            0 => Ok(MergeFileOutcome::Clean(out.stdout)),
            n if (1..128).contains(&n) => Ok(MergeFileOutcome::Conflict {
                text: out.stdout,
                regions: n as usize,
            }),
            n => Err(GitError::Command {
                command: "merge-file".to_string(),
                exit_code: n,
                stderr: out.stderr.trim().to_string(),
            }),
        }
    }

    pub fn worktree_add_detached(&self, path: &Path, commitish: &str) -> Result<(), GitError> {
        let path = path.to_string_lossy();
        self.run_ok(&["worktree", "add", "--detach", path.as_ref(), commitish])
            .map(|_| ())
    }

    pub fn worktree_remove(&self, path: &Path) -> Result<(), GitError> {
        let path = path.to_string_lossy();
        self.run_ok(&["worktree", "remove", "--force", path.as_ref()])
            .map(|_| ())
    }

    /// Capability probe: does this git installation support worktrees?
    pub fn supports_worktrees(&self) -> bool {
        self.run(&["worktree", "list"])
            .map(|out| out.success())
            .unwrap_or(false)
    }

    /// Patch of the index against HEAD
    pub fn diff_cached(&self) -> Result<String, GitError> {
        Ok(self.run_ok(&["diff", "--cached", "--binary"])?.stdout)
    }

    /// Apply a patch with three-way fallback; the raw output is returned so
    /// the caller can distinguish conflicts from hard failures via the
    /// working-tree state
    pub fn apply_3way(&self, patch: &Path) -> Result<GitOutput, GitError> {
        let patch = patch.to_string_lossy();
        self.run(&["apply", "--3way", patch.as_ref()])
    }
}
