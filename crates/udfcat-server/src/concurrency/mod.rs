//! Concurrency control for the function catalog.
//!
//! - [`namespace_lock::NamespaceLocks`] serializes operations per database
//!   and lets the reload coordinator exclude all of them at once.
//! - [`pending::PendingWrites`] tracks timed-out durable writes until they
//!   have been undone.

pub mod namespace_lock;
pub mod pending;

pub use namespace_lock::{NamespaceGuard, NamespaceLocks};
pub use pending::PendingWrites;
