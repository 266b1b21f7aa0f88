//! Local working-copy provisioning and read-back
//!
//! Provisioning is idempotent: every sync run passes through it, whether
//! the working copy is brand new or years old.

use crate::breadcrumb::Breadcrumb;
use gs_core::config::SyncConfig;
use gs_core::error::SyncError;
use gs_core::types::LocalFile;
use merge::Git;
use std::path::Path;
use walkdir::WalkDir;

/// Ensure a usable git working copy exists at the git handle's directory
///
/// Creates the directory, initializes the repository, pins the commit
/// identity (commits must not depend on host gitconfig), checks out the
/// configured branch, registers the remote, and gives a brand-new
/// repository its first commit so HEAD always resolves. Safe to re-run.
pub fn ensure_workspace(
    git: &Git,
    config: &SyncConfig,
    breadcrumb: &Breadcrumb,
) -> Result<(), SyncError> {
    let workdir = git.workdir();
    if !workdir.exists() {
        std::fs::create_dir_all(workdir)?;
    }

    if !workdir.join(".git").exists() {
        git.init().map_err(|e| SyncError::Git(e.to_string()))?;
        tracing::info!(path = %workdir.display(), "initialized working copy");
    }

    // Breadcrumb mirrors live next to the tree but are never tracked
    let exclude = workdir.join(".git").join("info").join("exclude");
    let mut existing = std::fs::read_to_string(&exclude).unwrap_or_default();
    if !existing.lines().any(|l| l.trim() == ".git-gas/") {
        if let Some(parent) = exclude.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if !existing.is_empty() && !existing.ends_with('\n') {
            existing.push('\n');
        }
        existing.push_str(".git-gas/\n");
        std::fs::write(&exclude, existing)?;
    }

    git.config("user.name", &config.commit_name)
        .map_err(|e| SyncError::Git(e.to_string()))?;
    git.config("user.email", &config.commit_email)
        .map_err(|e| SyncError::Git(e.to_string()))?;

    git.checkout_new_branch(&breadcrumb.branch)
        .map_err(|e| SyncError::Git(e.to_string()))?;

    if let Some(url) = &breadcrumb.remote_url {
        git.remote_add_origin(url)
            .map_err(|e| SyncError::Git(e.to_string()))?;
    }

    if git
        .head_commit()
        .map_err(|e| SyncError::Git(e.to_string()))?
        .is_none()
    {
        git.commit_allow_empty("initialize sync workspace")
            .map_err(|e| SyncError::Git(e.to_string()))?;
    }

    Ok(())
}

/// Read back every file in the working copy
///
/// `.git/` and `.git-gas/` are never part of the tracked file set, and
/// directories in `excluded` (nested sub-tree roots) belong to other sync
/// units.
pub fn read_local_tree(root: &Path, excluded: &[String]) -> Result<Vec<LocalFile>, SyncError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).into_iter().filter_entry(|e| {
        let name = e.file_name().to_string_lossy();
        name != ".git" && name != ".git-gas"
    }) {
        let entry = entry.map_err(|e| SyncError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let rel = match path.strip_prefix(root) {
            Ok(p) => p.to_path_buf(),
            Err(_) => continue,
        };
        let rel_str = rel.to_string_lossy();
        if excluded
            .iter()
            .any(|dir| rel_str.starts_with(&format!("{dir}/")))
        {
            continue;
        }

        let metadata = entry.metadata().map_err(|e| SyncError::Io(e.into()))?;
        files.push(LocalFile {
            content: std::fs::read(path)?,
            mod_time: metadata.modified()?,
            relative_path: rel,
        });
    }

    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(files)
}
