//! Per-path lock table
//!
//! The local working-copy directory is the serialization point: two
//! concurrent operations against the same sub-tree must not interleave git
//! commands against a half-written tree. Keys are resolved absolute paths;
//! operations on different working copies proceed independently.

use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
pub struct PathLocks {
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for a path, waiting if another operation holds it
    ///
    /// The key is canonicalized when the path exists so that two spellings of
    /// the same directory share a lock.
    pub async fn lock(&self, path: &Path) -> OwnedMutexGuard<()> {
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let entry = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        entry.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_same_key_serializes() {
        let locks = Arc::new(PathLocks::new());
        let concurrent = Arc::new(AtomicU32::new(0));
        let peak = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let concurrent = concurrent.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock(Path::new("/tmp/same-subtree")).await;
                let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                concurrent.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = PathLocks::new();
        let _a = locks.lock(Path::new("/tmp/subtree-a")).await;
        // Must not deadlock
        let _b = locks.lock(Path::new("/tmp/subtree-b")).await;
    }
}
