//! Native (shared library) symbol resolution.
//!
//! Symbols are checked against the exported names of a library, obtained
//! through a [`LibraryInspector`]. Mangled symbols are type-checked by
//! comparing against the expected Itanium mangling of the declared
//! signature; unmangled (C linkage) symbols are accepted as exported.

pub mod mangle;

use std::collections::BTreeSet;

use tracing::debug;
use udfcat_core::{AggregatePhases, ColumnType, FunctionKind, FunctionSignature};

use crate::error::ResolveError;
use mangle::{base_name, lifecycle_params, mangle, scalar_params, CxxType};

/// Source of exported symbol names for native libraries.
pub trait LibraryInspector: Send + Sync {
    /// Exported symbol names of the library at `location`, or `None` if the
    /// library cannot be inspected.
    fn exported_symbols(&self, location: &str) -> Option<BTreeSet<String>>;
}

/// Symbol names supplied with a CREATE AGGREGATE FUNCTION. Unset phases are
/// derived from the update symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateSymbols {
    pub update: String,
    pub init: Option<String>,
    pub merge: Option<String>,
    pub serialize: Option<String>,
    pub finalize: Option<String>,
}

/// Validates native functions against one library's exports.
pub(crate) struct LibrarySymbols<'a> {
    location: &'a str,
    exports: BTreeSet<String>,
}

impl<'a> LibrarySymbols<'a> {
    pub(crate) fn load(
        inspector: &dyn LibraryInspector,
        location: &'a str,
    ) -> Result<Self, ResolveError> {
        let exports = inspector
            .exported_symbols(location)
            .ok_or_else(|| ResolveError::LibraryUnavailable {
                location: location.to_string(),
            })?;
        Ok(LibrarySymbols { location, exports })
    }

    /// Resolves `symbol` for an entry point with `params`, returning the
    /// name to record.
    fn lookup(&self, symbol: &str, params: &[CxxType], signature: &str) -> Result<String, ResolveError> {
        let mismatch = |expected: String| ResolveError::SymbolSignatureMismatch {
            location: self.location.to_string(),
            symbol: symbol.to_string(),
            signature: signature.to_string(),
            expected,
        };
        let not_found = || ResolveError::SymbolNotFound {
            location: self.location.to_string(),
            symbol: symbol.to_string(),
        };

        if symbol.starts_with("_Z") {
            let name = base_name(symbol).ok_or_else(not_found)?;
            let expected = mangle(name, params);
            if !self.exports.contains(symbol) {
                // The function exists under another mangling.
                if self.exports.iter().any(|s| base_name(s) == Some(name)) {
                    return Err(mismatch(expected));
                }
                return Err(not_found());
            }
            if expected != symbol {
                return Err(mismatch(expected));
            }
            return Ok(symbol.to_string());
        }

        if self.exports.contains(symbol) {
            debug!(symbol, location = self.location, "accepted unmangled symbol");
            return Ok(symbol.to_string());
        }
        let expected = mangle(symbol, params);
        if self.exports.contains(&expected) {
            debug!(symbol, mangled = %expected, "resolved mangled symbol");
            return Ok(expected);
        }
        if self.exports.iter().any(|s| base_name(s) == Some(symbol)) {
            return Err(mismatch(expected));
        }
        Err(not_found())
    }

    /// Resolves an optional phase: a missing symbol yields `None`, while a
    /// present symbol with the wrong signature is still an error.
    fn lookup_optional(
        &self,
        symbol: &str,
        params: &[CxxType],
        signature: &str,
    ) -> Result<Option<String>, ResolveError> {
        match self.lookup(symbol, params, signature) {
            Ok(found) => Ok(Some(found)),
            Err(ResolveError::SymbolNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub(crate) fn resolve_scalar(
        &self,
        symbol: &str,
        prepare_fn: Option<&str>,
        close_fn: Option<&str>,
        signature: &FunctionSignature,
    ) -> Result<FunctionKind, ResolveError> {
        let shown = signature.to_string();
        let params = scalar_params(signature.args(), signature.is_variadic());
        let symbol = self.lookup(symbol, &params, &shown)?;
        let prepare_fn = prepare_fn
            .map(|s| self.lookup(s, &lifecycle_params(), "prepare"))
            .transpose()?;
        let close_fn = close_fn
            .map(|s| self.lookup(s, &lifecycle_params(), "close"))
            .transpose()?;
        Ok(FunctionKind::NativeScalar {
            library: self.location.to_string(),
            symbol,
            prepare_fn,
            close_fn,
        })
    }

    pub(crate) fn resolve_aggregate(
        &self,
        symbols: &AggregateSymbols,
        signature: &FunctionSignature,
        intermediate_type: Option<ColumnType>,
    ) -> Result<FunctionKind, ResolveError> {
        let intermediate = intermediate_type.unwrap_or(signature.return_type());
        let shown = signature.to_string();
        let ctx = CxxType::context;

        let mut update_params = scalar_params(signature.args(), signature.is_variadic());
        update_params.push(CxxType::out_ptr(intermediate));
        let update = self.lookup(&symbols.update, &update_params, &shown)?;

        let init_params = vec![ctx(), CxxType::out_ptr(intermediate)];
        let merge_params = vec![
            ctx(),
            CxxType::const_ref(intermediate),
            CxxType::out_ptr(intermediate),
        ];
        let read_params = vec![ctx(), CxxType::const_ref(intermediate)];

        let init = match &symbols.init {
            Some(s) => self.lookup(s, &init_params, "init")?,
            None => self.lookup(&self.derive(&symbols.update, "Init")?, &init_params, "init")?,
        };
        let merge = match &symbols.merge {
            Some(s) => self.lookup(s, &merge_params, "merge")?,
            None => self.lookup(&self.derive(&symbols.update, "Merge")?, &merge_params, "merge")?,
        };
        let serialize = match &symbols.serialize {
            Some(s) => Some(self.lookup(s, &read_params, "serialize")?),
            None => match derive_phase(&symbols.update, "Serialize") {
                Some(derived) => self.lookup_optional(&derived, &read_params, "serialize")?,
                None => None,
            },
        };
        let finalize = match &symbols.finalize {
            Some(s) => Some(self.lookup(s, &read_params, "finalize")?),
            None => match derive_phase(&symbols.update, "Finalize") {
                Some(derived) => self.lookup_optional(&derived, &read_params, "finalize")?,
                None => None,
            },
        };

        Ok(FunctionKind::NativeAggregate {
            library: self.location.to_string(),
            phases: AggregatePhases {
                init,
                update,
                merge,
                serialize,
                finalize,
            },
            intermediate_type,
        })
    }

    fn derive(&self, update: &str, phase: &str) -> Result<String, ResolveError> {
        derive_phase(update, phase).ok_or_else(|| ResolveError::SymbolNotFound {
            location: self.location.to_string(),
            symbol: format!("{phase} (could not infer from update symbol '{update}')"),
        })
    }
}

/// Default phase name: the update function's name with `Update` replaced
/// by `phase`. Mangled update symbols contribute their base name.
fn derive_phase(update: &str, phase: &str) -> Option<String> {
    let name = base_name(update).unwrap_or(update);
    name.contains("Update").then(|| name.replacen("Update", phase, 1))
}
