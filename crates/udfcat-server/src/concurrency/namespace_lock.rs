//! Per-database mutual exclusion with a global exclusive mode.
//!
//! Every catalog operation holds the global lock shared plus the mutex of
//! each database it touches. Database mutexes are always taken in sorted,
//! deduplicated name order so multi-database operations cannot deadlock.
//! Reload takes the global lock exclusively, which waits for in-flight
//! operations to finish and blocks new ones until it is released.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Guard for a set of database namespaces. Releases on drop.
pub struct NamespaceGuard<'a> {
    // Field order is drop order: namespaces before the global lock.
    _namespaces: Vec<OwnedMutexGuard<()>>,
    _global: RwLockReadGuard<'a, ()>,
}

#[derive(Default)]
pub struct NamespaceLocks {
    namespaces: DashMap<String, Arc<Mutex<()>>>,
    global: RwLock<()>,
}

impl NamespaceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the namespaces of `databases` (in any order, duplicates
    /// allowed) under the shared global lock.
    pub async fn acquire<'a, I, S>(&'a self, databases: I) -> NamespaceGuard<'a>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names: Vec<String> = databases
            .into_iter()
            .map(|d| d.as_ref().to_string())
            .collect();
        names.sort();
        names.dedup();

        let global = self.global.read().await;
        let mut guards = Vec::with_capacity(names.len());
        for name in &names {
            // Clone the mutex out so no map shard is held across the await.
            let mutex = self.namespaces.entry(name.clone()).or_default().clone();
            guards.push(mutex.lock_owned().await);
        }
        debug!(databases = ?names, "namespace locks acquired");
        NamespaceGuard {
            _namespaces: guards,
            _global: global,
        }
    }

    /// Takes the global lock exclusively, excluding every namespace.
    pub async fn acquire_global(&self) -> RwLockWriteGuard<'_, ()> {
        let guard = self.global.write().await;
        debug!("global catalog lock acquired");
        guard
    }

    /// Number of namespaces that have been locked at least once.
    pub fn namespace_count(&self) -> usize {
        self.namespaces.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn same_namespace_is_exclusive() {
        let locks = NamespaceLocks::new();
        let held = locks.acquire(["udf_test"]).await;
        let blocked = timeout(Duration::from_millis(50), locks.acquire(["udf_test"])).await;
        assert!(blocked.is_err());
        drop(held);
        let _again = timeout(Duration::from_millis(50), locks.acquire(["udf_test"]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn different_namespaces_proceed_together() {
        let locks = NamespaceLocks::new();
        let _a = locks.acquire(["a_db"]).await;
        let _b = timeout(Duration::from_millis(50), locks.acquire(["b_db"]))
            .await
            .unwrap();
        assert_eq!(locks.namespace_count(), 2);
    }

    #[tokio::test]
    async fn duplicates_and_order_do_not_self_deadlock() {
        let locks = NamespaceLocks::new();
        let _guard = timeout(
            Duration::from_millis(50),
            locks.acquire(["b_db", "a_db", "b_db"]),
        )
        .await
        .unwrap();
        assert_eq!(locks.namespace_count(), 2);
    }

    #[tokio::test]
    async fn global_lock_waits_for_namespaces() {
        let locks = NamespaceLocks::new();
        let held = locks.acquire(["udf_test"]).await;
        assert!(timeout(Duration::from_millis(50), locks.acquire_global())
            .await
            .is_err());
        drop(held);
        let global = locks.acquire_global().await;
        assert!(timeout(Duration::from_millis(50), locks.acquire(["other"]))
            .await
            .is_err());
        drop(global);
    }
}
