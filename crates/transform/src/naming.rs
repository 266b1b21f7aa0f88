//! Name mapping between remote records and local paths
//!
//! Remote names are flat and path-like: slashes denote logical grouping
//! (breadcrumbs always use them), underscores in general names become real
//! path separators locally. Local extensions encode the file kind.

use gs_core::types::FileKind;
use std::path::PathBuf;

/// A dotfile-style name: leading dot, no grouping separator
///
/// `.gitignore` is a dotfile; `.git/config` is not (that is a breadcrumb).
pub fn is_dotfile(name: &str) -> bool {
    name.starts_with('.') && !name.contains('/')
}

/// Map a remote breadcrumb name (`<prefix>.git/<rest>`) to its local mirror
/// under `.git-gas/`, or `None` when the name is not a breadcrumb
///
/// The mirror keeps the live working tree free of a second `.git` directory
/// that would confuse the local git client.
pub fn breadcrumb_to_local(name: &str) -> Option<PathBuf> {
    let idx = find_git_segment(name)?;
    let (prefix, rest) = name.split_at(idx);
    let rest = rest.strip_prefix(".git/")?;
    Some(PathBuf::from(format!("{prefix}.git-gas/{rest}")))
}

/// Map a local `.git-gas/` mirror path back to its remote breadcrumb name
pub fn local_to_breadcrumb(path: &str) -> Option<String> {
    let idx = path.find(".git-gas/")?;
    // Only a path-segment boundary counts
    if idx > 0 && path.as_bytes()[idx - 1] != b'/' {
        return None;
    }
    let (prefix, rest) = path.split_at(idx);
    let rest = rest.strip_prefix(".git-gas/")?;
    Some(format!("{prefix}.git/{rest}"))
}

/// Whether a remote name lives under a breadcrumb directory
pub fn is_breadcrumb_name(name: &str) -> bool {
    find_git_segment(name).is_some()
}

fn find_git_segment(name: &str) -> Option<usize> {
    if name.starts_with(".git/") {
        return Some(0);
    }
    name.find("/.git/").map(|i| i + 1)
}

/// General rule: underscores become path separators, extension by kind
pub fn remote_name_to_local_path(name: &str, kind: FileKind) -> PathBuf {
    let path = name.replace('_', "/");
    PathBuf::from(format!("{}.{}", path, kind.extension()))
}

/// General rule inverse: strip the extension to find the kind, encode every
/// separator as an underscore
///
/// Returns `None` when the extension maps to no remote kind.
pub fn local_path_to_remote_name(path: &str) -> Option<(String, FileKind)> {
    let (stem, ext) = path.rsplit_once('.')?;
    let kind = FileKind::from_extension(ext)?;
    Some((stem.replace('/', "_"), kind))
}
