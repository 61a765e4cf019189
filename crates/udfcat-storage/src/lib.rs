//! Durable metastore access for the function catalog.
//!
//! Provides the [`MetastoreClient`] trait defining the store contract, plus
//! [`InMemoryMetastore`] and [`SqliteMetastore`] as first-class backends.
//!
//! # Modules
//!
//! - [`error`]: StorageError enum with all failure modes
//! - [`types`]: StoredFunction entity, FunctionKey, property keys
//! - [`traits`]: MetastoreClient trait definition
//! - [`convert`]: FunctionRecord <-> entity conversion and load derivation
//! - [`hash`]: blake3 fingerprints of stored entities
//! - [`memory`]: InMemoryMetastore implementation
//! - [`schema`]: migrations and connection setup
//! - [`sqlite`]: SqliteMetastore implementation

pub mod convert;
pub mod error;
pub mod hash;
pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod traits;
pub mod types;

// Re-export key types for ergonomic use.
pub use convert::{load_database, to_stored, DatabaseLoad};
pub use error::StorageError;
pub use hash::fingerprint;
pub use memory::InMemoryMetastore;
pub use sqlite::SqliteMetastore;
pub use traits::MetastoreClient;
pub use types::{FunctionKey, ResourceType, StoredFunction};
