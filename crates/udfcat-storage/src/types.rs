//! Metastore entity types.
//!
//! [`StoredFunction`] is the store's native function entity: the shape the
//! external metastore tool reads and writes (class + resource + owner),
//! plus an ordered property bag in which this engine keeps its richer
//! function metadata under `udfcat.*` keys. Entities written by the external
//! tool carry no such properties and often no signature.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Property keys of engine-written entities.
pub mod props {
    pub const KIND: &str = "udfcat.kind";
    pub const RETURN_TYPE: &str = "udfcat.return_type";
    pub const SYMBOL: &str = "udfcat.symbol";
    pub const PREPARE_FN: &str = "udfcat.prepare_fn";
    pub const CLOSE_FN: &str = "udfcat.close_fn";
    pub const INTERMEDIATE_TYPE: &str = "udfcat.intermediate_type";
    pub const INIT_FN: &str = "udfcat.init_fn";
    pub const UPDATE_FN: &str = "udfcat.update_fn";
    pub const MERGE_FN: &str = "udfcat.merge_fn";
    pub const SERIALIZE_FN: &str = "udfcat.serialize_fn";
    pub const FINALIZE_FN: &str = "udfcat.finalize_fn";
    pub const PERSISTENT: &str = "udfcat.persistent";

    pub const KIND_NATIVE_SCALAR: &str = "native_scalar";
    pub const KIND_JAVA_SCALAR: &str = "java_scalar";
    pub const KIND_NATIVE_AGGREGATE: &str = "native_aggregate";
}

/// Kind of resource holding a function's implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResourceType {
    Jar,
    Library,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceType::Jar => f.write_str("JAR"),
            ResourceType::Library => f.write_str("LIBRARY"),
        }
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "JAR" => Ok(ResourceType::Jar),
            "LIBRARY" | "FILE" => Ok(ResourceType::Library),
            other => Err(format!("unknown resource type: {other}")),
        }
    }
}

/// Primary key of a function entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FunctionKey {
    pub database: String,
    pub name: String,
    /// Canonical argument list (`"double,int..."`), or `None` for a
    /// class-level entity.
    pub signature: Option<String>,
}

impl FunctionKey {
    pub fn new(database: &str, name: &str, signature: Option<&str>) -> Self {
        FunctionKey {
            database: database.to_string(),
            name: name.to_string(),
            signature: signature.map(str::to_string),
        }
    }

    /// Column form of the signature: `(args)`, or empty when absent, so a
    /// zero-argument signature stays distinct from no signature.
    pub fn signature_column(&self) -> String {
        signature_column(self.signature.as_deref())
    }
}

pub(crate) fn signature_column(signature: Option<&str>) -> String {
    signature.map_or_else(String::new, |s| format!("({s})"))
}

pub(crate) fn signature_from_column(column: &str) -> Option<String> {
    column
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .map(str::to_string)
}

impl fmt::Display for FunctionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.database, self.name, self.signature_column())
    }
}

/// A function entity as kept by the metastore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFunction {
    pub database: String,
    pub name: String,
    pub signature: Option<String>,
    /// Java class name, or the native symbol.
    pub class_name: String,
    pub resource_uri: String,
    pub resource_type: ResourceType,
    pub owner: String,
    /// Unix seconds.
    pub create_time: i64,
    pub properties: IndexMap<String, String>,
}

impl StoredFunction {
    pub fn key(&self) -> FunctionKey {
        FunctionKey {
            database: self.database.clone(),
            name: self.name.clone(),
            signature: self.signature.clone(),
        }
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// `true` for entities written by this engine.
    pub fn is_engine_written(&self) -> bool {
        self.properties.contains_key(props::KIND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_argument_signature_differs_from_none() {
        let none = FunctionKey::new("db", "f", None);
        let empty = FunctionKey::new("db", "f", Some(""));
        assert_eq!(none.signature_column(), "");
        assert_eq!(empty.signature_column(), "()");
        assert_eq!(signature_from_column("()"), Some(String::new()));
        assert_eq!(signature_from_column(""), None);
        assert_eq!(empty.to_string(), "db.f()");
    }

    #[test]
    fn resource_type_text() {
        assert_eq!("jar".parse::<ResourceType>().unwrap(), ResourceType::Jar);
        assert_eq!(ResourceType::Library.to_string(), "LIBRARY");
        assert!("zip".parse::<ResourceType>().is_err());
    }
}
