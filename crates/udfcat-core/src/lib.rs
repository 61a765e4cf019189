pub mod types;
pub mod id;
pub mod error;
pub mod signature;
pub mod function;
pub mod pattern;
pub mod registry;

// Re-export commonly used types
pub use types::ColumnType;
pub use id::{DatabaseName, FunctionName};
pub use error::CatalogError;
pub use signature::{FunctionSignature, MatchQuality};
pub use function::{AggregatePhases, BinaryType, FunctionIdentity, FunctionKind, FunctionRecord};
pub use pattern::NamePattern;
pub use registry::{FunctionListing, FunctionRegistry, ListFilter, Registration, StagedRegistration};
