//! The [`MetastoreClient`] trait defining the durable store contract.
//!
//! The catalog and the external metastore tool both write through this
//! contract. Every multi-entity write is atomic: it applies completely or
//! not at all. Calls are synchronous and may block on I/O; async callers
//! run them on a blocking thread.

use crate::error::StorageError;
use crate::types::{FunctionKey, StoredFunction};

pub trait MetastoreClient: Send + Sync {
    // -------------------------------------------------------------------
    // Databases
    // -------------------------------------------------------------------

    /// Creates a database. Returns `false` (and changes nothing) if it
    /// exists and `if_not_exists` is set.
    fn create_database(&self, name: &str, owner: &str, if_not_exists: bool) -> Result<bool, StorageError>;

    /// Drops a database. Without `cascade` a database holding functions is
    /// rejected with [`StorageError::DatabaseNotEmpty`].
    fn drop_database(&self, name: &str, cascade: bool) -> Result<(), StorageError>;

    /// All database names, sorted.
    fn list_databases(&self) -> Result<Vec<String>, StorageError>;

    fn database_exists(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.list_databases()?.iter().any(|d| d == name))
    }

    // -------------------------------------------------------------------
    // Functions
    // -------------------------------------------------------------------

    /// All function entities of a database, ordered by name then signature.
    fn list_functions(&self, database: &str) -> Result<Vec<StoredFunction>, StorageError>;

    /// Function entities of one name, ordered by signature.
    fn get_functions_by_name(&self, database: &str, name: &str) -> Result<Vec<StoredFunction>, StorageError>;

    /// Inserts a batch atomically. Any duplicate key fails the whole batch
    /// with [`StorageError::AlreadyExists`].
    fn create_functions(&self, batch: &[StoredFunction]) -> Result<(), StorageError>;

    /// Deletes a batch atomically. Any missing key fails the whole batch
    /// with [`StorageError::FunctionNotFound`].
    fn drop_functions(&self, keys: &[FunctionKey]) -> Result<(), StorageError>;

    /// Deletes `drop` and then inserts `create`, as one atomic write.
    fn replace_functions(&self, drop: &[FunctionKey], create: &[StoredFunction]) -> Result<(), StorageError>;
}
