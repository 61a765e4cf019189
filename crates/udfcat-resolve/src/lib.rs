//! Symbol resolution for user-defined functions.
//!
//! Confirms that a function's implementation exists and matches its
//! declared signature before the function is registered:
//! - [`native`]: exported symbols of shared libraries, checked against the
//!   Itanium mangling of the native calling convention.
//! - [`jvm`]: `evaluate` overloads of Java classes, filtered to those whose
//!   types map to column types.
//!
//! Library and class metadata come from injectable inspectors;
//! [`SymbolManifest`] implements both from a JSON document.

pub mod error;
pub mod jvm;
pub mod manifest;
pub mod native;
pub mod resolver;

pub use error::ResolveError;
pub use jvm::{ClassDescriptor, ClassInspector, MethodDescriptor};
pub use manifest::SymbolManifest;
pub use native::{AggregateSymbols, LibraryInspector};
pub use resolver::{JavaClassFunction, SymbolResolver};
