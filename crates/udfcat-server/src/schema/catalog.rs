//! Schema types for catalog lifecycle endpoints.

use serde::Serialize;

use crate::reload::{CatalogState, ReloadReport};

/// Response of `GET /catalog/status`.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogStatusResponse {
    pub state: CatalogState,
    pub databases: usize,
    pub functions: usize,
    pub last_reload: Option<ReloadReport>,
    /// Why the last rebuild failed, while the catalog is not loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}
