//! In-memory implementation of [`MetastoreClient`].
//!
//! [`InMemoryMetastore`] is a first-class backend for tests and anywhere
//! durability isn't needed. It has the same semantics as the SQLite
//! backend and can be switched into an unreachable mode, in which every
//! call fails with [`StorageError::Unreachable`], to exercise rollback and
//! degraded-reload paths.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::error::StorageError;
use crate::traits::MetastoreClient;
use crate::types::{FunctionKey, StoredFunction};

type FunctionMap = BTreeMap<(String, String), StoredFunction>;

#[derive(Debug, Default)]
struct Databases {
    /// Database name to functions keyed by (name, signature column).
    functions: BTreeMap<String, FunctionMap>,
}

#[derive(Debug, Default)]
pub struct InMemoryMetastore {
    data: Mutex<Databases>,
    unreachable: AtomicBool,
    /// Artificial latency per call, in milliseconds.
    delay_ms: AtomicU64,
}

fn entry_key(f: &StoredFunction) -> (String, String) {
    (f.name.clone(), f.key().signature_column())
}

impl InMemoryMetastore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail (or succeed again).
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Delays every subsequent call, simulating a slow store.
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms
            .store(delay.as_millis().try_into().unwrap_or(u64::MAX), Ordering::SeqCst);
    }

    fn lock(&self) -> Result<MutexGuard<'_, Databases>, StorageError> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_millis(delay));
        }
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(StorageError::Unreachable("in-memory metastore is offline".into()));
        }
        self.data
            .lock()
            .map_err(|_| StorageError::Unreachable("in-memory metastore lock poisoned".into()))
    }
}

impl MetastoreClient for InMemoryMetastore {
    fn create_database(&self, name: &str, _owner: &str, if_not_exists: bool) -> Result<bool, StorageError> {
        let mut data = self.lock()?;
        if data.functions.contains_key(name) {
            if if_not_exists {
                return Ok(false);
            }
            return Err(StorageError::DatabaseAlreadyExists(name.to_string()));
        }
        data.functions.insert(name.to_string(), BTreeMap::new());
        Ok(true)
    }

    fn drop_database(&self, name: &str, cascade: bool) -> Result<(), StorageError> {
        let mut data = self.lock()?;
        let functions = data
            .functions
            .get(name)
            .ok_or_else(|| StorageError::DatabaseNotFound(name.to_string()))?;
        if !cascade && !functions.is_empty() {
            return Err(StorageError::DatabaseNotEmpty {
                database: name.to_string(),
                functions: functions.len(),
            });
        }
        data.functions.remove(name);
        Ok(())
    }

    fn list_databases(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.lock()?.functions.keys().cloned().collect())
    }

    fn list_functions(&self, database: &str) -> Result<Vec<StoredFunction>, StorageError> {
        let data = self.lock()?;
        let functions = data
            .functions
            .get(database)
            .ok_or_else(|| StorageError::DatabaseNotFound(database.to_string()))?;
        Ok(functions.values().cloned().collect())
    }

    fn get_functions_by_name(&self, database: &str, name: &str) -> Result<Vec<StoredFunction>, StorageError> {
        let data = self.lock()?;
        let functions = data
            .functions
            .get(database)
            .ok_or_else(|| StorageError::DatabaseNotFound(database.to_string()))?;
        Ok(functions
            .values()
            .filter(|f| f.name == name)
            .cloned()
            .collect())
    }

    fn create_functions(&self, batch: &[StoredFunction]) -> Result<(), StorageError> {
        self.replace_functions(&[], batch)
    }

    fn drop_functions(&self, keys: &[FunctionKey]) -> Result<(), StorageError> {
        self.replace_functions(keys, &[])
    }

    fn replace_functions(&self, drop: &[FunctionKey], create: &[StoredFunction]) -> Result<(), StorageError> {
        let mut data = self.lock()?;
        // Work on a copy so a failure leaves the store untouched.
        let mut next = data.functions.clone();
        for key in drop {
            let removed = next
                .get_mut(&key.database)
                .and_then(|fns| fns.remove(&(key.name.clone(), key.signature_column())));
            if removed.is_none() {
                return Err(StorageError::FunctionNotFound(key.to_string()));
            }
        }
        for f in create {
            let functions = next
                .get_mut(&f.database)
                .ok_or_else(|| StorageError::DatabaseNotFound(f.database.clone()))?;
            if functions.insert(entry_key(f), f.clone()).is_some() {
                return Err(StorageError::AlreadyExists(f.key().to_string()));
            }
        }
        data.functions = next;
        Ok(())
    }
}
