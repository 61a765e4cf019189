//! Storage error types for udfcat-storage.
//!
//! [`StorageError`] covers the metastore's failure modes: backend and
//! serialization failures, missing or duplicate entities, and an
//! unreachable store.

use thiserror::Error;

/// Errors produced by metastore operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The SQLite backend reported an error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Schema migration failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// The store could not be reached.
    #[error("metastore unreachable: {0}")]
    Unreachable(String),

    /// The database does not exist in the store.
    #[error("database not found: {0}")]
    DatabaseNotFound(String),

    /// The database already exists in the store.
    #[error("database already exists: {0}")]
    DatabaseAlreadyExists(String),

    /// A non-cascading drop found functions in the database.
    #[error("database {database} is not empty ({functions} function(s))")]
    DatabaseNotEmpty { database: String, functions: usize },

    /// An entity with the same key already exists.
    #[error("function already exists: {0}")]
    AlreadyExists(String),

    /// No entity with the key exists.
    #[error("function not found: {0}")]
    FunctionNotFound(String),

    /// A stored entity could not be turned into a function record.
    #[error("cannot decode {key}: {reason}")]
    Decode { key: String, reason: String },
}
