//! The symbol resolver.
//!
//! [`SymbolResolver`] is the single entry point the catalog uses to turn a
//! CREATE request into validated [`FunctionKind`]s. It performs no
//! registration and no writes: any error here means the request is
//! rejected with zero side effects.

use std::sync::Arc;

use udfcat_core::{ColumnType, FunctionKind, FunctionSignature};

use crate::error::ResolveError;
use crate::jvm::{self, ClassInspector};
use crate::manifest::SymbolManifest;
use crate::native::{AggregateSymbols, LibraryInspector, LibrarySymbols};

/// A class-derived Java function: one kind shared by every overload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaClassFunction {
    pub kind: FunctionKind,
    pub overloads: Vec<FunctionSignature>,
}

#[derive(Clone)]
pub struct SymbolResolver {
    libraries: Arc<dyn LibraryInspector>,
    classes: Arc<dyn ClassInspector>,
}

impl std::fmt::Debug for SymbolResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolResolver").finish_non_exhaustive()
    }
}

impl SymbolResolver {
    pub fn new(libraries: Arc<dyn LibraryInspector>, classes: Arc<dyn ClassInspector>) -> Self {
        SymbolResolver { libraries, classes }
    }

    /// Resolver backed by one manifest for both libraries and archives.
    pub fn from_manifest(manifest: SymbolManifest) -> Self {
        let manifest = Arc::new(manifest);
        SymbolResolver {
            libraries: manifest.clone(),
            classes: manifest,
        }
    }

    /// Validates a native scalar function and its optional lifecycle hooks.
    pub fn native_scalar(
        &self,
        library: &str,
        symbol: &str,
        prepare_fn: Option<&str>,
        close_fn: Option<&str>,
        signature: &FunctionSignature,
    ) -> Result<FunctionKind, ResolveError> {
        LibrarySymbols::load(self.libraries.as_ref(), library)?
            .resolve_scalar(symbol, prepare_fn, close_fn, signature)
    }

    /// Validates a native aggregate's phase entry points.
    pub fn native_aggregate(
        &self,
        library: &str,
        symbols: &AggregateSymbols,
        signature: &FunctionSignature,
        intermediate_type: Option<ColumnType>,
    ) -> Result<FunctionKind, ResolveError> {
        LibrarySymbols::load(self.libraries.as_ref(), library)?
            .resolve_aggregate(symbols, signature, intermediate_type)
    }

    /// Validates a Java function created with a declared signature.
    pub fn java_explicit(
        &self,
        archive: &str,
        class_name: &str,
        signature: &FunctionSignature,
    ) -> Result<FunctionKind, ResolveError> {
        let class = jvm::describe(self.classes.as_ref(), archive, class_name)?;
        jvm::explicit_kind(&class, archive, signature)
    }

    /// Enumerates the compatible overloads of a Java class.
    ///
    /// Fails with [`ResolveError::NoCompatibleSignatures`] if none map.
    pub fn java_class(&self, archive: &str, class_name: &str) -> Result<JavaClassFunction, ResolveError> {
        let class = jvm::describe(self.classes.as_ref(), archive, class_name)?;
        let overloads = jvm::class_overloads(&class, archive)?;
        Ok(JavaClassFunction {
            kind: jvm::class_kind(&class, archive, overloads.clone()),
            overloads,
        })
    }
}
