//! Error taxonomy for the sync engine
//!
//! Five user-facing cases carry exact remediation in their display text:
//! not-linked, conflict, remote failure, rollback failure, stale write.
//! Everything else is an infrastructure carrier.

use thiserror::Error;

/// Failure at the remote store boundary
///
/// The HTTP client lives outside this workspace; it surfaces everything as
/// one of these. Any remote error fails the phase that triggered it.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("remote request failed: {0}")]
    Network(String),
    #[error("remote rejected request with status {status}: {message}")]
    Api { status: u16, message: String },
    #[error("no valid session token")]
    Auth,
    #[error("remote returned an invalid file record: {0}")]
    InvalidRecord(String),
}

/// Top-level error taxonomy
#[derive(Error, Debug)]
pub enum SyncError {
    /// No breadcrumb found at the requested path. Never auto-created.
    #[error(
        "'{path}' is not git-linked: no .git/config breadcrumb found.\n\
         To link it, create a breadcrumb with the remote URL and branch and\n\
         initialize the working copy manually, then re-run the sync."
    )]
    NotLinked { path: String },

    /// Merge produced divergent content that needs a human
    #[error(
        "merge produced conflicts in {} file(s): {}\n\
         Resolve the conflict markers in each file, then re-run the sync.",
        .paths.len(),
        .paths.join(", ")
    )]
    Conflict { paths: Vec<String> },

    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Remote push failed AND the local revert failed. The one state that
    /// requires human intervention.
    #[error(
        "remote push failed and local rollback also failed; commit {commit} is\n\
         still on the branch. Recover manually with:\n  {recovery}"
    )]
    RollbackFailure { commit: String, recovery: String },

    /// Optimistic-concurrency guard rejected the write
    #[error(
        "stale write to '{path}': the remote copy changed after the local file\n\
         was last synchronized. Pull and merge before writing."
    )]
    StaleWrite { path: String },

    /// A local validation hook rejected the content; the write was reverted
    /// and nothing was pushed
    #[error("validation hook '{hook}' failed:\n{output}")]
    HookFailed { hook: String, output: String },

    #[error("git: {0}")]
    Git(String),

    #[error("transform: {0}")]
    Transform(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
