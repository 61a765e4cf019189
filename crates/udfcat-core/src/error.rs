//! Core error types for udfcat-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering the
//! registry's failure modes: uniqueness and overload violations, unknown
//! databases, and malformed names or types.

use thiserror::Error;

/// Errors produced by the signature model and the function registry.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A function with the same identity (or an owning Java class) exists.
    #[error("Function {name} already exists in database {database}")]
    FunctionAlreadyExists { database: String, name: String },

    /// No function matched the drop or lookup request.
    #[error("Function does not exist: {database}.{name}")]
    FunctionNotFound { database: String, name: String },

    /// A bare-name drop matched more than one overload.
    #[error(
        "Cannot drop {database}.{name} without a signature: {} overloads share the name ({})",
        overloads.len(),
        overloads.join(", ")
    )]
    AmbiguousDropSyntax {
        database: String,
        name: String,
        overloads: Vec<String>,
    },

    /// More than one overload matched a call with equal precedence.
    #[error("Ambiguous call to {database}.{name}({args}): candidates {}", candidates.join(", "))]
    AmbiguousOverload {
        database: String,
        name: String,
        args: String,
        candidates: Vec<String>,
    },

    /// No overload accepts the call's argument types.
    #[error("No matching function with signature: {database}.{name}({args})")]
    NoMatchingOverload {
        database: String,
        name: String,
        args: String,
    },

    /// The referenced database does not exist.
    #[error("Database does not exist: {0}")]
    DatabaseNotFound(String),

    /// A database with this name already exists.
    #[error("Database already exists: {0}")]
    DatabaseAlreadyExists(String),

    /// A non-cascading drop targeted a database that still holds functions.
    #[error("Cannot drop non-empty database: {database} ({functions} function(s))")]
    DatabaseNotEmpty { database: String, functions: usize },

    /// A type string could not be parsed.
    #[error("invalid type '{text}': {reason}")]
    InvalidType { text: String, reason: String },

    /// A database or function name is not a valid identifier.
    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// A name pattern could not be compiled.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}
