//! Durable writes that outlived the request that issued them.
//!
//! A store call that times out keeps running on the blocking pool. The
//! service hands each such write a compensation task, which undoes the write
//! if it lands late, and tracks it here. Later writes to the same database
//! and every reload settle the tracked tasks first, so neither can observe
//! an entity whose CREATE already failed.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

struct PendingWrite {
    database: String,
    task: JoinHandle<()>,
}

#[derive(Default)]
pub struct PendingWrites {
    writes: Mutex<Vec<PendingWrite>>,
}

impl PendingWrites {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PendingWrite>> {
        // The vector stays consistent even if a holder panicked.
        self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Tracks the compensation task of a timed-out write to `database`.
    pub fn track(&self, database: &str, task: JoinHandle<()>) {
        self.lock().push(PendingWrite {
            database: database.to_string(),
            task,
        });
    }

    /// Number of tracked tasks, finished or not.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Waits for the tasks of `database` (every database if `None`).
    ///
    /// Returns `false` if they did not all finish within `limit`; the
    /// unfinished ones stay tracked.
    pub async fn settle(&self, database: Option<&str>, limit: Duration) -> bool {
        let mut waiting: Vec<PendingWrite> = {
            let mut writes = self.lock();
            let (matching, rest): (Vec<_>, Vec<_>) = writes
                .drain(..)
                .partition(|w| database.map_or(true, |db| w.database == db));
            *writes = rest;
            matching
        };
        if waiting.is_empty() {
            return true;
        }

        debug!(database = ?database, count = waiting.len(), "waiting for pending writes");
        let deadline = Instant::now() + limit;
        while let Some(mut write) = waiting.pop() {
            if tokio::time::timeout_at(deadline, &mut write.task).await.is_err() {
                waiting.push(write);
                self.lock().extend(waiting);
                return false;
            }
        }
        true
    }
}
