//! In-memory function registry.
//!
//! [`FunctionRegistry`] maps (database, name, signature) to
//! [`FunctionRecord`]s and enforces the catalog's uniqueness and overload
//! rules. It performs no I/O: the catalog service wraps it with namespace
//! locks and durable writes.
//!
//! Registration is two-phase. [`FunctionRegistry::register`] stages records:
//! staged records take part in uniqueness checks but are invisible to
//! [`resolve`](FunctionRegistry::resolve) and [`list`](FunctionRegistry::list)
//! until [`commit`](FunctionRegistry::commit)ted, and disappear without trace
//! on [`rollback`](FunctionRegistry::rollback).

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::CatalogError;
use crate::function::{FunctionIdentity, FunctionRecord};
use crate::id::{DatabaseName, FunctionName};
use crate::pattern::NamePattern;
use crate::signature::{FunctionSignature, MatchQuality};
use crate::types::ColumnType;

#[derive(Debug, Clone)]
struct Entry {
    record: Arc<FunctionRecord>,
    /// `false` while the registration transaction is in flight.
    visible: bool,
}

/// Functions of one database, ordered by name then signature.
#[derive(Debug, Clone, Default)]
struct DatabaseFunctions {
    entries: BTreeMap<(FunctionName, FunctionSignature), Entry>,
}

impl DatabaseFunctions {
    fn with_name<'a>(
        &'a self,
        name: &'a FunctionName,
    ) -> impl Iterator<Item = &'a Entry> + 'a {
        self.entries
            .iter()
            .filter(move |((n, _), _)| n == name)
            .map(|(_, e)| e)
    }

    fn visible_with_name<'a>(
        &'a self,
        name: &'a FunctionName,
    ) -> impl Iterator<Item = &'a Arc<FunctionRecord>> + 'a {
        self.with_name(name)
            .filter(|e| e.visible)
            .map(|e| &e.record)
    }

    fn visible_len(&self) -> usize {
        self.entries.values().filter(|e| e.visible).count()
    }
}

/// Outcome of [`FunctionRegistry::register`].
#[derive(Debug)]
#[must_use = "staged registrations must be committed or rolled back"]
pub enum Registration {
    /// Records are staged and await commit or rollback.
    Staged(StagedRegistration),
    /// A conflicting function exists and `if_not_exists` was set.
    Skipped,
}

/// Handle to staged records. Pass to [`FunctionRegistry::commit`] or
/// [`FunctionRegistry::rollback`].
#[derive(Debug)]
pub struct StagedRegistration {
    records: Vec<Arc<FunctionRecord>>,
}

impl StagedRegistration {
    pub fn records(&self) -> &[Arc<FunctionRecord>] {
        &self.records
    }
}

/// Which functions a listing includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListFilter {
    #[default]
    All,
    /// Scalar functions only (`SHOW FUNCTIONS`).
    Scalar,
    /// Aggregate functions only (`SHOW AGGREGATE FUNCTIONS`).
    Aggregate,
}

impl ListFilter {
    fn accepts(self, record: &FunctionRecord) -> bool {
        match self {
            ListFilter::All => true,
            ListFilter::Scalar => !record.is_aggregate(),
            ListFilter::Aggregate => record.is_aggregate(),
        }
    }
}

/// A finite, restartable listing of functions.
///
/// Holds a snapshot of one database's committed records; filtering happens
/// lazily on each call to [`iter`](FunctionListing::iter). Records appear in
/// name-then-signature order.
#[derive(Debug, Clone)]
pub struct FunctionListing {
    snapshot: Vec<Arc<FunctionRecord>>,
    pattern: NamePattern,
    filter: ListFilter,
}

impl FunctionListing {
    pub fn iter(&self) -> impl Iterator<Item = &Arc<FunctionRecord>> + '_ {
        self.snapshot.iter().filter(move |r| {
            self.filter.accepts(r) && self.pattern.matches(r.name().as_str())
        })
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }
}

impl<'a> IntoIterator for &'a FunctionListing {
    type Item = &'a Arc<FunctionRecord>;
    type IntoIter = Box<dyn Iterator<Item = &'a Arc<FunctionRecord>> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

/// The in-memory function registry for all databases.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    databases: BTreeMap<DatabaseName, DatabaseFunctions>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------
    // Databases
    // -------------------------------------------------------------------

    pub fn has_database(&self, database: &DatabaseName) -> bool {
        self.databases.contains_key(database)
    }

    pub fn databases(&self) -> impl Iterator<Item = &DatabaseName> {
        self.databases.keys()
    }

    /// Adds an empty database. Returns `false` if it already existed.
    pub fn add_database(&mut self, database: DatabaseName) -> bool {
        if self.databases.contains_key(&database) {
            return false;
        }
        self.databases.insert(database, DatabaseFunctions::default());
        true
    }

    /// Removes a database and returns the committed records it held.
    pub fn remove_database(
        &mut self,
        database: &DatabaseName,
    ) -> Result<Vec<Arc<FunctionRecord>>, CatalogError> {
        let functions = self
            .databases
            .remove(database)
            .ok_or_else(|| CatalogError::DatabaseNotFound(database.to_string()))?;
        Ok(functions
            .entries
            .into_values()
            .filter(|e| e.visible)
            .map(|e| e.record)
            .collect())
    }

    fn db(&self, database: &DatabaseName) -> Result<&DatabaseFunctions, CatalogError> {
        self.databases
            .get(database)
            .ok_or_else(|| CatalogError::DatabaseNotFound(database.to_string()))
    }

    fn db_mut(&mut self, database: &DatabaseName) -> Result<&mut DatabaseFunctions, CatalogError> {
        self.databases
            .get_mut(database)
            .ok_or_else(|| CatalogError::DatabaseNotFound(database.to_string()))
    }

    // -------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------

    /// Returns `true` if any function (staged or committed) uses `name`.
    pub fn name_in_use(&self, database: &DatabaseName, name: &FunctionName) -> bool {
        self.databases
            .get(database)
            .is_some_and(|db| db.with_name(name).next().is_some())
    }

    /// Stages `records` for registration.
    ///
    /// Fails with [`CatalogError::FunctionAlreadyExists`] if any record
    /// conflicts with an existing (staged or committed) function, unless
    /// `if_not_exists` is set, in which case nothing is staged and
    /// [`Registration::Skipped`] is returned. Conflicts are checked across
    /// all function kinds:
    ///
    /// - same identity;
    /// - a class-derived Java record whose name is already in use;
    /// - any record whose name is owned by a class-derived Java function.
    pub fn register(
        &mut self,
        records: Vec<FunctionRecord>,
        if_not_exists: bool,
    ) -> Result<Registration, CatalogError> {
        for record in &records {
            let db = self.db(record.database())?;
            if let Some(existing) = Self::conflict(db, record) {
                if if_not_exists {
                    return Ok(Registration::Skipped);
                }
                return Err(CatalogError::FunctionAlreadyExists {
                    database: existing.database().to_string(),
                    name: existing.name().to_string(),
                });
            }
        }

        let mut staged = Vec::with_capacity(records.len());
        for record in records {
            let record = Arc::new(record);
            let db = self.db_mut(record.database())?;
            let key = (record.name().clone(), record.signature().clone());
            if db.entries.contains_key(&key) {
                // Duplicate signature within the batch; the first one wins.
                continue;
            }
            db.entries.insert(
                key,
                Entry {
                    record: Arc::clone(&record),
                    visible: false,
                },
            );
            staged.push(record);
        }
        Ok(Registration::Staged(StagedRegistration { records: staged }))
    }

    fn conflict<'a>(db: &'a DatabaseFunctions, record: &'a FunctionRecord) -> Option<&'a FunctionRecord> {
        let key = (record.name().clone(), record.signature().clone());
        if let Some(existing) = db.entries.get(&key) {
            return Some(&existing.record);
        }
        db.with_name(record.name())
            .find(|e| record.kind.is_class_derived() || e.record.kind.is_class_derived())
            .map(|e| e.record.as_ref())
    }

    /// Makes staged records visible.
    pub fn commit(&mut self, staged: StagedRegistration) {
        for record in staged.records {
            if let Some(db) = self.databases.get_mut(record.database()) {
                let key = (record.name().clone(), record.signature().clone());
                if let Some(entry) = db.entries.get_mut(&key) {
                    entry.visible = true;
                }
            }
        }
    }

    /// Discards staged records.
    pub fn rollback(&mut self, staged: StagedRegistration) {
        for record in staged.records {
            if let Some(db) = self.databases.get_mut(record.database()) {
                let key = (record.name().clone(), record.signature().clone());
                if db.entries.get(&key).is_some_and(|e| !e.visible) {
                    db.entries.remove(&key);
                }
            }
        }
    }

    /// Inserts a committed record directly, bypassing the ownership rules.
    ///
    /// Used when rebuilding from the durable store, whose contents are the
    /// ground truth. Creates the database if needed. Returns `false` if a
    /// record with the same identity was already present.
    pub fn insert_loaded(&mut self, record: FunctionRecord) -> bool {
        let db = self
            .databases
            .entry(record.database().clone())
            .or_default();
        let key = (record.name().clone(), record.signature().clone());
        if db.entries.contains_key(&key) {
            return false;
        }
        db.entries.insert(
            key,
            Entry {
                record: Arc::new(record),
                visible: true,
            },
        );
        true
    }

    // -------------------------------------------------------------------
    // Unregistration
    // -------------------------------------------------------------------

    /// Finds the committed records a DROP FUNCTION would remove.
    ///
    /// With a signature, the exact overload must exist. Without one (bare
    /// name), exactly one overload may match: several overloads sharing the
    /// name fail with [`CatalogError::AmbiguousDropSyntax`].
    pub fn drop_targets(
        &self,
        database: &DatabaseName,
        name: &FunctionName,
        signature: Option<&FunctionSignature>,
    ) -> Result<Vec<Arc<FunctionRecord>>, CatalogError> {
        let db = self.db(database)?;
        let not_found = || CatalogError::FunctionNotFound {
            database: database.to_string(),
            name: match signature {
                Some(sig) => sig.display_with_name(name.as_str()),
                None => name.to_string(),
            },
        };

        match signature {
            Some(sig) => {
                let key = (name.clone(), sig.clone());
                match db.entries.get(&key) {
                    Some(entry) if entry.visible => Ok(vec![Arc::clone(&entry.record)]),
                    _ => Err(not_found()),
                }
            }
            None => {
                let matches: Vec<Arc<FunctionRecord>> =
                    db.visible_with_name(name).cloned().collect();
                match matches.len() {
                    0 => Err(not_found()),
                    1 => Ok(matches),
                    _ => Err(CatalogError::AmbiguousDropSyntax {
                        database: database.to_string(),
                        name: name.to_string(),
                        overloads: matches.iter().map(|r| r.display_signature()).collect(),
                    }),
                }
            }
        }
    }

    /// Removes a committed record.
    ///
    /// Fails with [`CatalogError::FunctionNotFound`] unless `if_exists` is
    /// set, in which case a missing record yields `Ok(None)`.
    pub fn unregister(
        &mut self,
        identity: &FunctionIdentity,
        if_exists: bool,
    ) -> Result<Option<Arc<FunctionRecord>>, CatalogError> {
        let key = (identity.name.clone(), identity.signature.clone());
        let removed = match self.databases.get_mut(&identity.database) {
            Some(db) if db.entries.get(&key).is_some_and(|e| e.visible) => {
                db.entries.remove(&key).map(|e| e.record)
            }
            _ => None,
        };
        match removed {
            Some(record) => Ok(Some(record)),
            None if if_exists => Ok(None),
            None => Err(CatalogError::FunctionNotFound {
                database: identity.database.to_string(),
                name: identity
                    .signature
                    .display_with_name(identity.name.as_str()),
            }),
        }
    }

    // -------------------------------------------------------------------
    // Lookup
    // -------------------------------------------------------------------

    /// Resolves a call to the unique best-matching committed overload.
    ///
    /// Precedence: exact match, then promotion, then variadic; within a
    /// class the lowest widening cost wins. A tie for best is ambiguous.
    pub fn resolve(
        &self,
        database: &DatabaseName,
        name: &FunctionName,
        call_args: &[ColumnType],
    ) -> Result<Arc<FunctionRecord>, CatalogError> {
        let db = self.db(database)?;
        let mut ranked: Vec<(MatchQuality, &Arc<FunctionRecord>)> = db
            .visible_with_name(name)
            .filter_map(|r| r.signature().match_quality(call_args).map(|q| (q, r)))
            .collect();
        ranked.sort_by(|a, b| a.0.cmp(&b.0));

        let args_text = || {
            call_args
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };

        match ranked.as_slice() {
            [] => Err(CatalogError::NoMatchingOverload {
                database: database.to_string(),
                name: name.to_string(),
                args: args_text(),
            }),
            [(best, record), rest @ ..] => {
                let tied: Vec<String> = rest
                    .iter()
                    .take_while(|(q, _)| q == best)
                    .map(|(_, r)| r.display_signature())
                    .collect();
                if tied.is_empty() {
                    Ok(Arc::clone(record))
                } else {
                    let mut candidates = vec![record.display_signature()];
                    candidates.extend(tied);
                    Err(CatalogError::AmbiguousOverload {
                        database: database.to_string(),
                        name: name.to_string(),
                        args: args_text(),
                        candidates,
                    })
                }
            }
        }
    }

    /// Lists committed functions of a database matching `pattern`.
    pub fn list(
        &self,
        database: &DatabaseName,
        pattern: NamePattern,
        filter: ListFilter,
    ) -> Result<FunctionListing, CatalogError> {
        let db = self.db(database)?;
        let snapshot = db
            .entries
            .values()
            .filter(|e| e.visible)
            .map(|e| Arc::clone(&e.record))
            .collect();
        Ok(FunctionListing {
            snapshot,
            pattern,
            filter,
        })
    }

    /// Number of committed functions in a database (0 if unknown).
    pub fn function_count(&self, database: &DatabaseName) -> usize {
        self.databases
            .get(database)
            .map_or(0, DatabaseFunctions::visible_len)
    }

    /// All committed records across databases, in key order.
    pub fn records(&self) -> impl Iterator<Item = &Arc<FunctionRecord>> {
        self.databases
            .values()
            .flat_map(|db| db.entries.values())
            .filter(|e| e.visible)
            .map(|e| &e.record)
    }
}
