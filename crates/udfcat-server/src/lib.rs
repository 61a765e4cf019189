//! HTTP/JSON catalog server for user-defined functions.
//!
//! Serves CREATE/DROP/SHOW FUNCTION, overload resolution and INVALIDATE
//! METADATA over a shared durable metastore. This crate contains the
//! catalog service, its concurrency and reload machinery, API schema
//! types, error handling, and route definitions.

pub mod concurrency;
pub mod config;
pub mod error;
pub mod handlers;
pub mod reload;
pub mod router;
pub mod schema;
pub mod service;
pub mod state;
