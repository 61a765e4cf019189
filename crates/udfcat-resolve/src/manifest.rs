//! JSON symbol manifest.
//!
//! A manifest lists the exported symbols of native libraries and the class
//! descriptors of Java archives, keyed by location:
//!
//! ```json
//! {
//!   "libraries": { "/udfs/libTestUdfs.so": ["Identity", "_Z8IdentityPN..."] },
//!   "archives": {
//!     "/udfs/hive-exec.jar": [
//!       { "class_name": "org.apache.impala.TestUdf",
//!         "superclasses": ["org.apache.hadoop.hive.ql.exec.UDF"],
//!         "methods": [{ "name": "evaluate", "params": ["int"], "return_type": "int" }] }
//!     ]
//!   }
//! }
//! ```
//!
//! It implements both [`LibraryInspector`] and [`ClassInspector`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ResolveError;
use crate::jvm::{ClassDescriptor, ClassInspector};
use crate::native::LibraryInspector;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolManifest {
    #[serde(default)]
    pub libraries: BTreeMap<String, BTreeSet<String>>,
    #[serde(default)]
    pub archives: BTreeMap<String, Vec<ClassDescriptor>>,
}

impl SymbolManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, ResolveError> {
        serde_json::from_str(json).map_err(|e| ResolveError::Manifest(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, ResolveError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ResolveError::Manifest(format!("{}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    /// Adds a library, replacing any previous symbol list for `location`.
    pub fn with_library<I, S>(mut self, location: &str, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.libraries.insert(
            location.to_string(),
            symbols.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Adds a class to an archive, replacing a class of the same name.
    pub fn with_class(mut self, archive: &str, class: ClassDescriptor) -> Self {
        let classes = self.archives.entry(archive.to_string()).or_default();
        classes.retain(|c| c.class_name != class.class_name);
        classes.push(class);
        self
    }
}

impl LibraryInspector for SymbolManifest {
    fn exported_symbols(&self, location: &str) -> Option<BTreeSet<String>> {
        self.libraries.get(location).cloned()
    }
}

impl ClassInspector for SymbolManifest {
    fn describe_class(&self, archive: &str, class_name: &str) -> Option<ClassDescriptor> {
        self.archives
            .get(archive)?
            .iter()
            .find(|c| c.class_name == class_name)
            .cloned()
    }
}
