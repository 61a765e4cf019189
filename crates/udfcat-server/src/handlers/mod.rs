//! HTTP handler functions for all catalog endpoints.
//!
//! Handlers are thin: they extract parameters, call the [`CatalogService`]
//! and shape the response.
//!
//! [`CatalogService`]: crate::service::CatalogService

pub mod catalog;
pub mod databases;
pub mod functions;
