//! Schema types for database management.

use serde::{Deserialize, Serialize};

/// Request to create a database.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDatabaseRequest {
    pub name: String,
    /// Succeed without change if the database exists.
    #[serde(default)]
    pub if_not_exists: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateDatabaseResponse {
    pub database: String,
    /// `false` if the database already existed.
    pub created: bool,
}

/// Query parameters of `DELETE /databases/{db}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DropDatabaseQuery {
    #[serde(default)]
    pub if_exists: bool,
    /// Drop the database's functions too.
    #[serde(default)]
    pub cascade: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DropDatabaseResponse {
    pub database: String,
    pub dropped: bool,
    /// In-memory functions removed with the database.
    pub functions_removed: usize,
}
