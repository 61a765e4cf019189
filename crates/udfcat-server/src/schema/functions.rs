//! Schema types for function DDL, SHOW and resolve.

use serde::{Deserialize, Serialize};

use udfcat_core::{BinaryType, FunctionKind, FunctionListing, FunctionRecord};

/// Request body of CREATE FUNCTION.
///
/// A native function needs `args` and `returns`. A Java function (`.jar`
/// location or `binary_type: "JAVA"`) created without them registers every
/// compatible `evaluate` overload of the class and is persistent; created
/// with them it registers the one declared signature, session-local.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateFunctionRequest {
    pub name: String,
    /// Shared library or JAR path.
    pub location: String,
    /// Native symbol, or fully qualified Java class name.
    pub symbol: String,
    /// Argument list, e.g. `"double, int..."`.
    pub args: Option<String>,
    /// Return type, e.g. `"bigint"`.
    pub returns: Option<String>,
    /// Overrides the binary type inferred from `location`.
    pub binary_type: Option<BinaryType>,
    pub prepare_fn: Option<String>,
    pub close_fn: Option<String>,
    #[serde(default)]
    pub if_not_exists: bool,
}

/// Request body of CREATE AGGREGATE FUNCTION.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAggregateRequest {
    pub name: String,
    pub location: String,
    pub args: String,
    pub returns: String,
    pub intermediate_type: Option<String>,
    pub update_fn: String,
    /// Defaults to `update_fn` with `Update` replaced by `Init`.
    pub init_fn: Option<String>,
    pub merge_fn: Option<String>,
    pub serialize_fn: Option<String>,
    pub finalize_fn: Option<String>,
    #[serde(default)]
    pub if_not_exists: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateFunctionResponse {
    /// `false` if `if_not_exists` skipped an existing function.
    pub created: bool,
    /// Signatures of the registered overloads.
    pub functions: Vec<String>,
}

/// Request body of DROP FUNCTION. Without `args` the name alone must
/// identify a single overload.
#[derive(Debug, Clone, Deserialize)]
pub struct DropFunctionRequest {
    pub name: String,
    pub args: Option<String>,
    #[serde(default)]
    pub if_exists: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DropFunctionResponse {
    /// Signatures of the overloads removed from the catalog.
    pub dropped: Vec<String>,
    /// Entities deleted from the durable store.
    pub durable_entities_removed: usize,
}

/// Query parameters of the SHOW endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShowFunctionsQuery {
    /// Name pattern: `*` wildcards, `|` alternatives.
    pub like: Option<String>,
}

/// Tabular result of a SHOW statement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ResultSet {
    pub fn from_listing(listing: &FunctionListing) -> Self {
        ResultSet {
            columns: ["return type", "signature", "binary type", "is persistent"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            rows: listing
                .iter()
                .map(|record| {
                    vec![
                        record.signature().return_type().to_string(),
                        record.display_signature(),
                        record.kind.binary_type().to_string(),
                        record.persistent.to_string(),
                    ]
                })
                .collect(),
        }
    }
}

/// Request body of the resolve endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolveRequest {
    pub name: String,
    /// Argument types of the call, e.g. `["int", "double"]`.
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolveResponse {
    pub database: String,
    pub name: String,
    pub signature: String,
    pub return_type: String,
    pub binary_type: BinaryType,
    pub is_persistent: bool,
    pub implementation: FunctionKind,
}

impl From<&FunctionRecord> for ResolveResponse {
    fn from(record: &FunctionRecord) -> Self {
        ResolveResponse {
            database: record.database().to_string(),
            name: record.name().to_string(),
            signature: record.display_signature(),
            return_type: record.signature().return_type().to_string(),
            binary_type: record.kind.binary_type(),
            is_persistent: record.persistent,
            implementation: record.kind.clone(),
        }
    }
}
