//! The reload coordinator.
//!
//! INVALIDATE METADATA (and cold start) discards the in-memory registry and
//! rebuilds it from the durable store:
//!
//! ```text
//! Loaded -> Invalidating -> Rebuilding -> Loaded
//!                               |
//!                               +-- store failure: stays Rebuilding
//! ```
//!
//! [`Rebuild`] collects the new registry one database at a time: it runs
//! the entities through [`udfcat_storage::load_database`] (which re-applies
//! the Java compatibility filter) and fingerprints each database. Each
//! store read is a separate call, bounded by the store timeout.
//! [`ReloadCoordinator`] tracks the state and turns a finished rebuild into
//! a [`ReloadReport`].

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use udfcat_core::{DatabaseName, FunctionRegistry};
use udfcat_resolve::SymbolResolver;
use udfcat_storage::{fingerprint, load_database, StoredFunction};

/// Lifecycle state of the in-memory catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogState {
    /// The registry reflects the durable store; requests are served.
    Loaded,
    /// The registry is being discarded.
    Invalidating,
    /// The registry is being rebuilt, or the last rebuild failed.
    Rebuilding,
}

/// Summary of one completed reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadReport {
    pub reload_id: Uuid,
    pub databases: usize,
    pub functions: usize,
    /// Entities that could not be decoded.
    pub skipped: usize,
    /// Java entities dropped by the compatibility filter.
    pub filtered: usize,
    /// Databases whose durable content changed since the previous load
    /// (including added and removed ones). Empty on the first load.
    pub changed_databases: Vec<String>,
    pub elapsed_ms: u64,
}

/// A registry rebuilt from the store, before it is installed.
#[derive(Debug, Default)]
pub struct Rebuild {
    pub registry: FunctionRegistry,
    /// Hex fingerprint of each database's entities.
    pub fingerprints: BTreeMap<String, String>,
    pub skipped: usize,
    pub filtered: usize,
}

impl Rebuild {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads one database's entities, re-applying the Java compatibility
    /// filter.
    pub fn add_database(&mut self, db_name: &str, entities: &[StoredFunction], resolver: &SymbolResolver) {
        self.fingerprints
            .insert(db_name.to_string(), fingerprint(entities).to_hex().to_string());

        let database = match DatabaseName::new(db_name) {
            Ok(database) => database,
            Err(e) => {
                warn!(database = %db_name, error = %e, "skipping database with invalid name");
                self.skipped += entities.len();
                return;
            }
        };
        self.registry.add_database(database);

        let load = load_database(entities, resolver);
        self.skipped += load.skipped;
        self.filtered += load.filtered;
        for record in load.records {
            let identity = record.identity.clone();
            if !self.registry.insert_loaded(record) {
                warn!(function = %identity, "skipping duplicate function entity");
                self.skipped += 1;
            }
        }
    }
}

/// Tracks the catalog state across reloads.
#[derive(Debug)]
pub struct ReloadCoordinator {
    state: CatalogState,
    fingerprints: Option<BTreeMap<String, String>>,
    last_report: Option<ReloadReport>,
    last_error: Option<String>,
}

impl Default for ReloadCoordinator {
    fn default() -> Self {
        // Nothing is loaded until the cold-start rebuild finishes.
        ReloadCoordinator {
            state: CatalogState::Rebuilding,
            fingerprints: None,
            last_report: None,
            last_error: None,
        }
    }
}

impl ReloadCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CatalogState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state == CatalogState::Loaded
    }

    pub fn last_report(&self) -> Option<&ReloadReport> {
        self.last_report.as_ref()
    }

    /// Error of the most recent failed rebuild, cleared by a successful one.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn begin_invalidation(&mut self) {
        self.state = CatalogState::Invalidating;
    }

    pub fn begin_rebuild(&mut self) {
        self.state = CatalogState::Rebuilding;
    }

    /// Records a failed rebuild. The state stays `Rebuilding`.
    pub fn fail(&mut self, error: String) {
        self.state = CatalogState::Rebuilding;
        self.last_error = Some(error);
    }

    /// Marks the catalog loaded and produces the report for `rebuild`.
    pub fn finish(&mut self, rebuild: &Rebuild, elapsed: Duration) -> ReloadReport {
        let changed_databases = match &self.fingerprints {
            None => Vec::new(),
            Some(previous) => changed(previous, &rebuild.fingerprints),
        };
        let report = ReloadReport {
            reload_id: Uuid::new_v4(),
            databases: rebuild.fingerprints.len(),
            functions: rebuild.registry.records().count(),
            skipped: rebuild.skipped,
            filtered: rebuild.filtered,
            changed_databases,
            elapsed_ms: elapsed.as_millis().try_into().unwrap_or(u64::MAX),
        };
        self.fingerprints = Some(rebuild.fingerprints.clone());
        self.last_report = Some(report.clone());
        self.last_error = None;
        self.state = CatalogState::Loaded;
        report
    }
}

fn changed(previous: &BTreeMap<String, String>, current: &BTreeMap<String, String>) -> Vec<String> {
    let mut names: Vec<String> = current
        .iter()
        .filter(|(db, hash)| previous.get(*db) != Some(*hash))
        .map(|(db, _)| db.clone())
        .chain(
            previous
                .keys()
                .filter(|db| !current.contains_key(*db))
                .cloned(),
        )
        .collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use udfcat_core::{ColumnType, FunctionIdentity, FunctionKind, FunctionName, FunctionRecord, FunctionSignature};
    use udfcat_resolve::SymbolManifest;
    use udfcat_storage::{to_stored, InMemoryMetastore, MetastoreClient, StorageError};

    fn rebuild(store: &dyn MetastoreClient, resolver: &SymbolResolver) -> Result<Rebuild, StorageError> {
        let mut rebuild = Rebuild::new();
        for db_name in store.list_databases()? {
            rebuild.add_database(&db_name, &store.list_functions(&db_name)?, resolver);
        }
        Ok(rebuild)
    }

    fn native(db: &str, name: &str) -> FunctionRecord {
        FunctionRecord::new(
            FunctionIdentity::new(
                DatabaseName::new(db).unwrap(),
                FunctionName::new(name).unwrap(),
                FunctionSignature::parse("int", ColumnType::Int).unwrap(),
            ),
            FunctionKind::NativeScalar {
                library: "/lib/libTestUdfs.so".into(),
                symbol: "Identity".into(),
                prepare_fn: None,
                close_fn: None,
            },
        )
    }

    fn resolver() -> SymbolResolver {
        SymbolResolver::from_manifest(SymbolManifest::new())
    }

    #[test]
    fn rebuild_loads_every_database() {
        let store = InMemoryMetastore::new();
        store.create_database("a_db", "udfcat", false).unwrap();
        store.create_database("empty_db", "udfcat", false).unwrap();
        store
            .create_functions(&[to_stored(&native("a_db", "identity"), "udfcat", 0)])
            .unwrap();

        let rebuild = rebuild(&store, &resolver()).unwrap();
        assert_eq!(rebuild.fingerprints.len(), 2);
        assert_eq!(rebuild.registry.records().count(), 1);
        assert!(rebuild
            .registry
            .has_database(&DatabaseName::new("empty_db").unwrap()));
    }

    #[test]
    fn database_with_invalid_name_is_skipped() {
        let entity = to_stored(&native("a_db", "identity"), "udfcat", 0);
        let mut rebuild = Rebuild::new();
        rebuild.add_database("not a name", &[entity], &resolver());
        assert_eq!(rebuild.skipped, 1);
        assert_eq!(rebuild.registry.records().count(), 0);
        assert!(rebuild.fingerprints.contains_key("not a name"));
    }

    #[test]
    fn coordinator_reports_changed_databases() {
        let store = InMemoryMetastore::new();
        store.create_database("a_db", "udfcat", false).unwrap();
        store.create_database("b_db", "udfcat", false).unwrap();

        let mut coordinator = ReloadCoordinator::new();
        assert_eq!(coordinator.state(), CatalogState::Rebuilding);
        let first = coordinator.finish(&rebuild(&store, &resolver()).unwrap(), Duration::ZERO);
        assert!(first.changed_databases.is_empty());
        assert!(coordinator.is_loaded());

        store
            .create_functions(&[to_stored(&native("b_db", "identity"), "udfcat", 0)])
            .unwrap();
        store.create_database("c_db", "udfcat", false).unwrap();
        coordinator.begin_invalidation();
        coordinator.begin_rebuild();
        let second = coordinator.finish(&rebuild(&store, &resolver()).unwrap(), Duration::ZERO);
        assert_eq!(second.changed_databases, vec!["b_db", "c_db"]);
        assert_eq!(second.functions, 1);
        assert_ne!(first.reload_id, second.reload_id);
    }

    #[test]
    fn failed_rebuild_stays_rebuilding() {
        let mut coordinator = ReloadCoordinator::new();
        coordinator.begin_invalidation();
        assert_eq!(coordinator.state(), CatalogState::Invalidating);
        coordinator.begin_rebuild();
        coordinator.fail("metastore unreachable".into());
        assert_eq!(coordinator.state(), CatalogState::Rebuilding);
        assert_eq!(coordinator.last_error(), Some("metastore unreachable"));
        assert!(!coordinator.is_loaded());
    }
}
