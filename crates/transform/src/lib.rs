//! Content transformation between remote file records and local files
//!
//! Pure functions only: no filesystem or network access. Rules apply in
//! order, first match wins:
//! 1. `README` (markup) ⇄ `README.md` with HTML⇄Markdown conversion
//! 2. Dotfiles ⇄ same name, string-shimmed on the remote side
//! 3. Breadcrumbs (`.git/...`) ⇄ `.git-gas/...` mirrors
//! 4. Everything else: underscore/extension naming plus the module shim for
//!    code files

pub mod markup;
pub mod naming;
pub mod shim;

use gs_core::types::{FileKind, RemoteFile};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransformError {
    /// The local file has no remote representation (e.g. unknown extension).
    /// Callers skip these rather than failing the run.
    #[error("unsupported local file: {0}")]
    Unsupported(PathBuf),
    #[error("malformed module shim in '{0}': {1}")]
    MalformedShim(String, String),
    #[error("local path is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),
}

/// A local file produced from a remote record
#[derive(Debug, Clone, PartialEq)]
pub struct LocalDraft {
    pub relative_path: PathBuf,
    pub content: String,
}

/// A remote record produced from a local file
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDraft {
    pub name: String,
    pub kind: FileKind,
    pub content: String,
}

/// Map one remote file record to its local representation
pub fn to_local(remote: &RemoteFile) -> Result<LocalDraft, TransformError> {
    // Rule 1: README
    if remote.name == "README" && remote.kind == FileKind::Markup {
        return Ok(LocalDraft {
            relative_path: PathBuf::from("README.md"),
            content: markup::html_to_markdown(&remote.content),
        });
    }

    // Rule 2: dotfiles (leading dot, no grouping)
    if naming::is_dotfile(&remote.name) {
        let content = shim::unwrap_dotfile(&remote.content)
            .map_err(|e| TransformError::MalformedShim(remote.name.clone(), e))?;
        return Ok(LocalDraft {
            relative_path: PathBuf::from(&remote.name),
            content,
        });
    }

    // Rule 3: breadcrumbs mirror under .git-gas/
    if let Some(mirror) = naming::breadcrumb_to_local(&remote.name) {
        return Ok(LocalDraft {
            relative_path: mirror,
            content: remote.content.clone(),
        });
    }

    // Rule 4: general naming + module shim for code
    let relative_path = naming::remote_name_to_local_path(&remote.name, remote.kind);
    let content = match remote.kind {
        FileKind::Code => shim::unwrap_module(&remote.content),
        FileKind::Markup | FileKind::Data => remote.content.clone(),
    };

    Ok(LocalDraft {
        relative_path,
        content,
    })
}

/// Map one local file back to a remote record
pub fn to_remote(relative_path: &Path, content: &str) -> Result<RemoteDraft, TransformError> {
    let path_str = relative_path
        .to_str()
        .ok_or_else(|| TransformError::NonUtf8Path(relative_path.to_path_buf()))?;

    // Rule 1: README
    if path_str == "README.md" {
        return Ok(RemoteDraft {
            name: "README".to_string(),
            kind: FileKind::Markup,
            content: markup::markdown_to_html(content),
        });
    }

    // Rule 2: dotfiles
    if naming::is_dotfile(path_str) {
        return Ok(RemoteDraft {
            name: path_str.to_string(),
            kind: FileKind::Code,
            content: shim::wrap_dotfile(content),
        });
    }

    // Rule 3: breadcrumb mirrors
    if let Some(name) = naming::local_to_breadcrumb(path_str) {
        return Ok(RemoteDraft {
            name,
            kind: FileKind::Data,
            content: content.to_string(),
        });
    }

    // Rule 4: general naming
    let (name, kind) = naming::local_path_to_remote_name(path_str)
        .ok_or_else(|| TransformError::Unsupported(relative_path.to_path_buf()))?;

    let content = match kind {
        FileKind::Code => shim::wrap_module(&name, content),
        FileKind::Markup | FileKind::Data => content.to_string(),
    };

    Ok(RemoteDraft {
        name,
        kind,
        content,
    })
}
