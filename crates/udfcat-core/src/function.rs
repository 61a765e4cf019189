//! Function records: identity, kind-specific metadata, and persistence.
//!
//! [`FunctionRecord`] is the full metadata of one registered overload. Its
//! [`FunctionIdentity`] (database, name, signature) is the registry key;
//! [`FunctionKind`] carries what is needed to call the function: a native
//! library symbol, a Java class, or the phase entry points of a native
//! aggregate.
//!
//! Records are immutable. Changing a function means dropping it and creating
//! it again.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::{DatabaseName, FunctionName};
use crate::signature::FunctionSignature;
use crate::types::ColumnType;

/// Registry key of one function overload.
///
/// Ordering is database, then name, then signature, which is also the
/// display order of listings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FunctionIdentity {
    pub database: DatabaseName,
    pub name: FunctionName,
    pub signature: FunctionSignature,
}

impl FunctionIdentity {
    pub fn new(database: DatabaseName, name: FunctionName, signature: FunctionSignature) -> Self {
        FunctionIdentity {
            database,
            name,
            signature,
        }
    }
}

impl fmt::Display for FunctionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}({})", self.database, self.name, self.signature)
    }
}

/// Entry points of a native aggregate function.
///
/// `update` is mandatory. `init` and `merge` always resolve (by default from
/// the update symbol's name); `serialize` and `finalize` are optional, and
/// when absent the intermediate value is passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatePhases {
    pub init: String,
    pub update: String,
    pub merge: String,
    pub serialize: Option<String>,
    pub finalize: Option<String>,
}

/// Kind-specific metadata of a function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FunctionKind {
    /// Scalar function exported by a native shared library.
    NativeScalar {
        library: String,
        symbol: String,
        prepare_fn: Option<String>,
        close_fn: Option<String>,
    },
    /// Scalar function implemented by `evaluate` methods of a Java class.
    JavaScalar {
        archive: String,
        class_name: String,
        /// Overloads created together with this record: every compatible
        /// overload for a class-derived function, else just the declared one.
        overloads: Vec<FunctionSignature>,
        /// `true` when created from the class alone (every compatible
        /// overload registered); `false` for a single declared signature.
        class_derived: bool,
    },
    /// Aggregate function exported by a native shared library.
    NativeAggregate {
        library: String,
        phases: AggregatePhases,
        /// Type of the intermediate state; `None` means the return type.
        intermediate_type: Option<ColumnType>,
    },
}

/// Implementation family, as shown in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BinaryType {
    Native,
    Java,
}

impl fmt::Display for BinaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryType::Native => f.write_str("NATIVE"),
            BinaryType::Java => f.write_str("JAVA"),
        }
    }
}

impl FunctionKind {
    pub fn is_aggregate(&self) -> bool {
        matches!(self, FunctionKind::NativeAggregate { .. })
    }

    pub fn binary_type(&self) -> BinaryType {
        match self {
            FunctionKind::JavaScalar { .. } => BinaryType::Java,
            FunctionKind::NativeScalar { .. } | FunctionKind::NativeAggregate { .. } => {
                BinaryType::Native
            }
        }
    }

    /// Location of the library or archive holding the implementation.
    pub fn location(&self) -> &str {
        match self {
            FunctionKind::NativeScalar { library, .. }
            | FunctionKind::NativeAggregate { library, .. } => library,
            FunctionKind::JavaScalar { archive, .. } => archive,
        }
    }

    /// `true` for a Java function created from a class alone. Such a
    /// function owns its name within the database.
    pub fn is_class_derived(&self) -> bool {
        matches!(
            self,
            FunctionKind::JavaScalar {
                class_derived: true,
                ..
            }
        )
    }
}

/// Full metadata of one registered function overload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRecord {
    pub identity: FunctionIdentity,
    pub kind: FunctionKind,
    /// `true` if the function is stored durably and survives reloads.
    pub persistent: bool,
}

impl FunctionRecord {
    /// Creates a record, deriving persistence from the kind: native
    /// functions and class-derived Java functions are persistent; Java
    /// functions created with a declared signature are session-local.
    pub fn new(identity: FunctionIdentity, kind: FunctionKind) -> Self {
        let persistent = match &kind {
            FunctionKind::JavaScalar { class_derived, .. } => *class_derived,
            FunctionKind::NativeScalar { .. } | FunctionKind::NativeAggregate { .. } => true,
        };
        FunctionRecord {
            identity,
            kind,
            persistent,
        }
    }

    pub fn database(&self) -> &DatabaseName {
        &self.identity.database
    }

    pub fn name(&self) -> &FunctionName {
        &self.identity.name
    }

    pub fn signature(&self) -> &FunctionSignature {
        &self.identity.signature
    }

    pub fn is_aggregate(&self) -> bool {
        self.kind.is_aggregate()
    }

    /// Display form used by listings, e.g. `identity(DECIMAL(9,0))`.
    pub fn display_signature(&self) -> String {
        self.identity
            .signature
            .display_with_name(self.identity.name.as_str())
    }
}
