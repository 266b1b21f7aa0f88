//! Sync engine for remote script projects backed by local git trees
//!
//! This crate ties the engine together:
//! - Breadcrumb registry: which remote paths are independent sync units
//! - Workspace provisioning: idempotent local git working copies
//! - Orchestrator: pull → merge → commit → push per sub-tree, with
//!   partial-failure aggregation
//! - Atomic write transaction: the single-file fast path with rollback
//! - Optimistic concurrency guard: stale-write rejection

pub mod breadcrumb;
pub mod guard;
pub mod orchestrator;
pub mod transaction;
pub mod workspace;

pub use breadcrumb::{filter_to_subtree, list_subtrees, Breadcrumb, LastSync};
pub use guard::check_in_sync;
pub use orchestrator::{SyncOptions, Syncer};
pub use transaction::atomic_write;
pub use workspace::{ensure_workspace, read_local_tree};
