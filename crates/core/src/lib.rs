//! Shared data model and infrastructure for the gasket sync engine
//!
//! This crate owns:
//! - The typed file model exchanged with the remote script store
//! - The error taxonomy shared by every other crate
//! - The `RemoteStore` boundary trait (the HTTP client lives outside this
//!   workspace; tests use the in-memory implementation)
//! - Configuration loading
//! - The per-path lock table serializing concurrent mutating operations

pub mod config;
pub mod error;
pub mod locks;
pub mod remote;
pub mod types;

pub use config::{StrategyChoice, SyncConfig};
pub use error::{RemoteError, SyncError};
pub use locks::PathLocks;
pub use remote::{InMemoryRemote, RemoteStore};
pub use types::{
    ConflictSpan, FileKind, LocalFile, MergeConflict, RemoteFile, SyncDirection, SyncReport,
    SyncResult,
};
