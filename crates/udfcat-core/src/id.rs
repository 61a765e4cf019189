//! Validated name newtypes for catalog entities.
//!
//! Database and function names are case-insensitive identifiers. Both are
//! distinct newtype wrappers over a lowercased `String`, so a `DatabaseName`
//! cannot be accidentally used where a `FunctionName` is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Database name, normalized to lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DatabaseName(String);

/// Function name, normalized to lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FunctionName(String);

/// Lowercases and validates an identifier: `[a-z_][a-z0-9_]*`.
fn normalize_identifier(raw: &str) -> Result<String, CatalogError> {
    let name = raw.trim().to_ascii_lowercase();
    let invalid = |reason: &str| CatalogError::InvalidName {
        name: raw.to_string(),
        reason: reason.to_string(),
    };

    let mut chars = name.chars();
    match chars.next() {
        None => return Err(invalid("name is empty")),
        Some(c) if !(c.is_ascii_lowercase() || c == '_') => {
            return Err(invalid("name must start with a letter or underscore"))
        }
        Some(_) => {}
    }
    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
        return Err(invalid("name may only contain letters, digits and underscores"));
    }
    Ok(name)
}

impl DatabaseName {
    pub fn new(raw: &str) -> Result<Self, CatalogError> {
        normalize_identifier(raw).map(DatabaseName)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FunctionName {
    pub fn new(raw: &str) -> Result<Self, CatalogError> {
        normalize_identifier(raw).map(FunctionName)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Display implementations -- just print the inner value.

impl fmt::Display for DatabaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for FunctionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Serde bridges.

impl TryFrom<String> for DatabaseName {
    type Error = CatalogError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DatabaseName::new(&value)
    }
}

impl From<DatabaseName> for String {
    fn from(name: DatabaseName) -> Self {
        name.0
    }
}

impl TryFrom<String> for FunctionName {
    type Error = CatalogError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        FunctionName::new(&value)
    }
}

impl From<FunctionName> for String {
    fn from(name: FunctionName) -> Self {
        name.0
    }
}
