//! Java UDF class inspection.
//!
//! Classes are described by a [`ClassInspector`] as plain data
//! ([`ClassDescriptor`]); nothing here needs a JVM. Resolution enumerates
//! the class's `evaluate` overloads and keeps those whose parameter and
//! return types map to column types. Unsupported overloads are skipped.

pub mod mapping;

use serde::{Deserialize, Serialize};
use tracing::debug;
use udfcat_core::{FunctionKind, FunctionSignature};

use crate::error::ResolveError;
use mapping::{column_type, ENTRY_POINT, UDF_BASE_CLASS};

/// One method of a Java class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub name: String,
    /// Fully-qualified parameter types, or primitive names.
    #[serde(default)]
    pub params: Vec<String>,
    pub return_type: String,
    #[serde(default)]
    pub varargs: bool,
}

/// Reflective description of a Java class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDescriptor {
    pub class_name: String,
    /// Superclasses, nearest first.
    #[serde(default)]
    pub superclasses: Vec<String>,
    /// Methods in declaration order.
    #[serde(default)]
    pub methods: Vec<MethodDescriptor>,
}

/// Source of class descriptors for Java archives.
pub trait ClassInspector: Send + Sync {
    /// Describes `class_name` in the archive at `archive`, or `None` if the
    /// archive or class cannot be found.
    fn describe_class(&self, archive: &str, class_name: &str) -> Option<ClassDescriptor>;
}

impl ClassDescriptor {
    pub fn extends_udf(&self) -> bool {
        self.superclasses.iter().any(|c| c == UDF_BASE_CLASS)
    }

    /// Every compatible `evaluate` overload, in declaration order, with
    /// duplicate signatures collapsed to the first.
    pub fn compatible_signatures(&self) -> Vec<FunctionSignature> {
        if !self.extends_udf() {
            return Vec::new();
        }
        let mut out: Vec<FunctionSignature> = Vec::new();
        for method in self.methods.iter().filter(|m| m.name == ENTRY_POINT) {
            match map_method(method) {
                Some(sig) if !out.contains(&sig) => out.push(sig),
                Some(_) => {}
                None => debug!(
                    class = %self.class_name,
                    params = ?method.params,
                    ret = %method.return_type,
                    "skipping unsupported evaluate overload"
                ),
            }
        }
        out
    }
}

fn map_method(method: &MethodDescriptor) -> Option<FunctionSignature> {
    if method.varargs {
        return None;
    }
    let ret = column_type(&method.return_type)?;
    let args = method
        .params
        .iter()
        .map(|p| column_type(p))
        .collect::<Option<Vec<_>>>()?;
    FunctionSignature::new(args, false, ret).ok()
}

pub(crate) fn describe(
    inspector: &dyn ClassInspector,
    archive: &str,
    class_name: &str,
) -> Result<ClassDescriptor, ResolveError> {
    inspector
        .describe_class(archive, class_name)
        .ok_or_else(|| ResolveError::ClassNotFound {
            archive: archive.to_string(),
            class_name: class_name.to_string(),
        })
}

/// Compatible overloads of a class; an empty set is an error.
pub(crate) fn class_overloads(
    class: &ClassDescriptor,
    archive: &str,
) -> Result<Vec<FunctionSignature>, ResolveError> {
    let overloads = class.compatible_signatures();
    if overloads.is_empty() {
        return Err(ResolveError::NoCompatibleSignatures {
            archive: archive.to_string(),
            class_name: class.class_name.clone(),
        });
    }
    Ok(overloads)
}

/// Kind for a function created with a declared signature. The declared
/// argument and return types must both match an `evaluate` overload.
pub(crate) fn explicit_kind(
    class: &ClassDescriptor,
    archive: &str,
    signature: &FunctionSignature,
) -> Result<FunctionKind, ResolveError> {
    let overloads = class.compatible_signatures();
    let found = overloads
        .iter()
        .any(|o| o == signature && o.return_type() == signature.return_type());
    if !found {
        return Err(ResolveError::SymbolSignatureMismatch {
            location: archive.to_string(),
            symbol: format!("{}.{}", class.class_name, ENTRY_POINT),
            signature: format!("({}) RETURNS {}", signature, signature.return_type()),
            expected: overloads
                .iter()
                .map(|o| format!("({}) RETURNS {}", o, o.return_type()))
                .collect::<Vec<_>>()
                .join("; "),
        });
    }
    Ok(FunctionKind::JavaScalar {
        archive: archive.to_string(),
        class_name: class.class_name.clone(),
        overloads: vec![signature.clone()],
        class_derived: false,
    })
}

/// Kind shared by every record of a class-derived function.
pub(crate) fn class_kind(
    class: &ClassDescriptor,
    archive: &str,
    overloads: Vec<FunctionSignature>,
) -> FunctionKind {
    FunctionKind::JavaScalar {
        archive: archive.to_string(),
        class_name: class.class_name.clone(),
        overloads,
        class_derived: true,
    }
}
