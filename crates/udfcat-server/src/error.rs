//! API error types with HTTP status code mapping.
//!
//! [`ApiError`] is the unified error type for all catalog endpoints. Each
//! variant carries the message reported to the client and maps to one
//! taxonomy code (e.g. `FunctionAlreadyExistsError`) and one HTTP status.
//! It implements `axum::response::IntoResponse` to produce structured JSON
//! error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use udfcat_core::CatalogError;
use udfcat_resolve::ResolveError;
use udfcat_storage::StorageError;

/// Structured error detail in API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorDetail {
    /// Taxonomy name (e.g., "FunctionNotFoundError").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional structured details (e.g., the overloads of an ambiguous drop).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// API errors with HTTP status code mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A function with the same identity or an owning class exists (409).
    #[error("{0}")]
    FunctionAlreadyExists(String),

    /// The function to drop or resolve does not exist (404).
    #[error("{0}")]
    FunctionNotFound(String),

    /// A bare-name drop matched several overloads (422).
    #[error("{message}")]
    AmbiguousDropSyntax {
        message: String,
        overloads: Vec<String>,
    },

    /// Several overloads match a call equally well (422).
    #[error("{message}")]
    AmbiguousOverload {
        message: String,
        candidates: Vec<String>,
    },

    /// No overload accepts the call's arguments (422).
    #[error("{0}")]
    NoMatchingOverload(String),

    /// The library, symbol, or class does not exist (422).
    #[error("{0}")]
    SymbolNotFound(String),

    /// The symbol exists but does not match the declared signature (422).
    #[error("{0}")]
    SymbolSignatureMismatch(String),

    /// A Java class has no overload with supported types (422).
    #[error("{0}")]
    NoCompatibleSignatures(String),

    /// The durable store failed or timed out (503).
    #[error("{0}")]
    Persistence(String),

    /// The catalog is not loaded after a failed rebuild (503).
    #[error("{0}")]
    CatalogNotLoaded(String),

    /// Database not found (404).
    #[error("{0}")]
    DatabaseNotFound(String),

    /// Database already exists (409).
    #[error("{0}")]
    DatabaseAlreadyExists(String),

    /// Non-cascading drop of a database holding functions (409).
    #[error("{0}")]
    DatabaseNotEmpty(String),

    /// Invalid request (400).
    #[error("{0}")]
    BadRequest(String),

    /// Internal server error (500).
    #[error("{0}")]
    InternalError(String),
}

impl ApiError {
    /// Taxonomy name reported as the error `code`.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::FunctionAlreadyExists(_) => "FunctionAlreadyExistsError",
            ApiError::FunctionNotFound(_) => "FunctionNotFoundError",
            ApiError::AmbiguousDropSyntax { .. } => "AmbiguousDropSyntaxError",
            ApiError::AmbiguousOverload { .. } => "AmbiguousOverloadError",
            ApiError::NoMatchingOverload(_) => "NoMatchingOverloadError",
            ApiError::SymbolNotFound(_) => "SymbolNotFoundError",
            ApiError::SymbolSignatureMismatch(_) => "SymbolSignatureMismatchError",
            ApiError::NoCompatibleSignatures(_) => "NoCompatibleSignaturesError",
            ApiError::Persistence(_) => "PersistenceError",
            ApiError::CatalogNotLoaded(_) => "CatalogNotLoadedError",
            ApiError::DatabaseNotFound(_) => "DatabaseNotFoundError",
            ApiError::DatabaseAlreadyExists(_) => "DatabaseAlreadyExistsError",
            ApiError::DatabaseNotEmpty(_) => "DatabaseNotEmptyError",
            ApiError::BadRequest(_) => "BadRequestError",
            ApiError::InternalError(_) => "InternalError",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::FunctionAlreadyExists(_)
            | ApiError::DatabaseAlreadyExists(_)
            | ApiError::DatabaseNotEmpty(_) => StatusCode::CONFLICT,
            ApiError::FunctionNotFound(_) | ApiError::DatabaseNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::AmbiguousDropSyntax { .. }
            | ApiError::AmbiguousOverload { .. }
            | ApiError::NoMatchingOverload(_)
            | ApiError::SymbolNotFound(_)
            | ApiError::SymbolSignatureMismatch(_)
            | ApiError::NoCompatibleSignatures(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Persistence(_) | ApiError::CatalogNotLoaded(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ApiError::AmbiguousDropSyntax { overloads, .. } => {
                Some(serde_json::json!({ "overloads": overloads }))
            }
            ApiError::AmbiguousOverload { candidates, .. } => {
                Some(serde_json::json!({ "candidates": candidates }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = ApiErrorDetail {
            code: self.code().to_string(),
            message: self.to_string(),
            details: self.details(),
        };

        let body = serde_json::json!({
            "success": false,
            "error": detail,
        });

        (self.status(), axum::Json(body)).into_response()
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        let message = err.to_string();
        match err {
            CatalogError::FunctionAlreadyExists { .. } => ApiError::FunctionAlreadyExists(message),
            CatalogError::FunctionNotFound { .. } => ApiError::FunctionNotFound(message),
            CatalogError::AmbiguousDropSyntax { overloads, .. } => {
                ApiError::AmbiguousDropSyntax { message, overloads }
            }
            CatalogError::AmbiguousOverload { candidates, .. } => {
                ApiError::AmbiguousOverload { message, candidates }
            }
            CatalogError::NoMatchingOverload { .. } => ApiError::NoMatchingOverload(message),
            CatalogError::DatabaseNotFound(_) => ApiError::DatabaseNotFound(message),
            CatalogError::DatabaseAlreadyExists(_) => ApiError::DatabaseAlreadyExists(message),
            CatalogError::DatabaseNotEmpty { .. } => ApiError::DatabaseNotEmpty(message),
            CatalogError::InvalidType { .. }
            | CatalogError::InvalidName { .. }
            | CatalogError::InvalidPattern { .. } => ApiError::BadRequest(message),
        }
    }
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        let message = err.to_string();
        match err {
            ResolveError::LibraryUnavailable { .. }
            | ResolveError::SymbolNotFound { .. }
            | ResolveError::ClassNotFound { .. } => ApiError::SymbolNotFound(message),
            ResolveError::SymbolSignatureMismatch { .. } => ApiError::SymbolSignatureMismatch(message),
            ResolveError::NoCompatibleSignatures { .. } => ApiError::NoCompatibleSignatures(message),
            ResolveError::Manifest(_) => ApiError::InternalError(message),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        let message = err.to_string();
        match err {
            StorageError::DatabaseNotFound(_) => ApiError::DatabaseNotFound(message),
            StorageError::DatabaseAlreadyExists(_) => ApiError::DatabaseAlreadyExists(message),
            StorageError::DatabaseNotEmpty { .. } => ApiError::DatabaseNotEmpty(message),
            StorageError::AlreadyExists(_) => ApiError::FunctionAlreadyExists(message),
            StorageError::FunctionNotFound(_) => ApiError::FunctionNotFound(message),
            StorageError::Decode { .. } => ApiError::InternalError(message),
            StorageError::Serialization(_)
            | StorageError::Sqlite(_)
            | StorageError::Migration(_)
            | StorageError::Unreachable(_) => ApiError::Persistence(message),
        }
    }
}
