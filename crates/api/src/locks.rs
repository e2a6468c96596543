use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-project mutual exclusion for writes, deletes and package builds.
///
/// Operations on different projects never wait on each other. Reads do not
/// take a lock.
pub struct ProjectLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ProjectLocks {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Wait for exclusive access to `project_id`.
    ///
    /// The lock is held until the returned guard is dropped.
    pub async fn acquire(&self, project_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Entries nobody holds or waits on are dropped on the way.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(project_id.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of projects with a live lock entry.
    pub async fn tracked(&self) -> usize {
        self.locks.lock().await.len()
    }
}

impl Default for ProjectLocks {
    fn default() -> Self {
        Self::new()
    }
}
