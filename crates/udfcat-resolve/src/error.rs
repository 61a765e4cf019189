//! Symbol resolution errors.

use thiserror::Error;

/// Errors produced while validating a function's implementation against its
/// library or archive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The library or archive could not be inspected.
    #[error("Could not load binary: {location}")]
    LibraryUnavailable { location: String },

    /// The symbol is not exported by the library.
    #[error("Could not find symbol '{symbol}' in: {location}")]
    SymbolNotFound { location: String, symbol: String },

    /// The archive does not contain the class.
    #[error("Could not find class '{class_name}' in: {archive}")]
    ClassNotFound { archive: String, class_name: String },

    /// A symbol with this name exists but its parameters do not match the
    /// declared signature.
    #[error("Symbol '{symbol}' in {location} does not match signature {signature} (expected '{expected}')")]
    SymbolSignatureMismatch {
        location: String,
        symbol: String,
        signature: String,
        expected: String,
    },

    /// No `evaluate` overload of the class maps to a supported signature.
    #[error("No compatible signatures in class: {class_name} in: {archive}")]
    NoCompatibleSignatures { archive: String, class_name: String },

    /// The symbol manifest could not be read or parsed.
    #[error("invalid symbol manifest: {0}")]
    Manifest(String),
}

impl ResolveError {
    /// Taxonomy name reported to clients.
    pub fn code(&self) -> &'static str {
        match self {
            ResolveError::LibraryUnavailable { .. }
            | ResolveError::SymbolNotFound { .. }
            | ResolveError::ClassNotFound { .. } => "SymbolNotFoundError",
            ResolveError::SymbolSignatureMismatch { .. } => "SymbolSignatureMismatchError",
            ResolveError::NoCompatibleSignatures { .. } => "NoCompatibleSignaturesError",
            ResolveError::Manifest(_) => "InternalError",
        }
    }
}
