//! Service layer that encapsulates all catalog business logic.
//!
//! [`CatalogService`] owns the in-memory [`FunctionRegistry`], the durable
//! [`MetastoreClient`], the [`SymbolResolver`] and the reload coordinator.
//! Handlers call its methods and never touch the registry or the store
//! directly.
//!
//! Every operation runs under the namespace locks of the databases it
//! touches (see [`NamespaceLocks`]). Store calls are blocking: they run on
//! `spawn_blocking` and are bounded by the configured timeout, after which
//! the operation fails with `PersistenceError`.
//!
//! Write ordering:
//! - CREATE stages records in the registry, writes the persistent ones to
//!   the store, then commits (or rolls back if the write failed).
//! - DROP deletes durable entities first and then removes the records.
//!
//! Either way a function is never resolvable without its durable entity.
//!
//! A CREATE write that times out may still land. It is undone as soon as it
//! does (see [`PendingWrites`]), and later writes to the database and every
//! reload wait for that first.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use udfcat_core::{
    BinaryType, CatalogError, ColumnType, DatabaseName, FunctionIdentity, FunctionListing,
    FunctionName, FunctionRecord, FunctionRegistry, FunctionSignature, ListFilter, NamePattern,
    Registration,
};
use udfcat_resolve::{AggregateSymbols, SymbolResolver};
use udfcat_storage::types::props;
use udfcat_storage::{
    to_stored, FunctionKey, MetastoreClient, ResourceType, StorageError, StoredFunction,
};

use crate::concurrency::{NamespaceLocks, PendingWrites};
use crate::error::ApiError;
use crate::reload::{CatalogState, Rebuild, ReloadCoordinator, ReloadReport};
use crate::schema::catalog::CatalogStatusResponse;
use crate::schema::functions::{
    CreateAggregateRequest, CreateFunctionRequest, CreateFunctionResponse, DropFunctionResponse,
};

/// Owner recorded on entities this engine writes.
pub const ENGINE_OWNER: &str = "udfcat";

/// Outcome of DROP DATABASE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DroppedDatabase {
    pub dropped: bool,
    pub functions_removed: usize,
}

/// Result of a store call bounded by the store timeout.
enum StoreCall<T> {
    Done(Result<T, ApiError>),
    /// The call is still running on the blocking pool.
    TimedOut(JoinHandle<Result<T, StorageError>>),
}

pub struct CatalogService {
    store: Arc<dyn MetastoreClient>,
    resolver: SymbolResolver,
    registry: RwLock<FunctionRegistry>,
    coordinator: Mutex<ReloadCoordinator>,
    locks: NamespaceLocks,
    pending: PendingWrites,
    store_timeout: Duration,
}

impl CatalogService {
    /// Creates a service with an empty, not yet loaded catalog.
    ///
    /// Requests fail with `CatalogNotLoaded` until
    /// [`invalidate_metadata`](Self::invalidate_metadata) succeeds; use
    /// [`start`](Self::start) to do both.
    pub fn new(store: Arc<dyn MetastoreClient>, resolver: SymbolResolver, store_timeout: Duration) -> Self {
        CatalogService {
            store,
            resolver,
            registry: RwLock::new(FunctionRegistry::new()),
            coordinator: Mutex::new(ReloadCoordinator::new()),
            locks: NamespaceLocks::new(),
            pending: PendingWrites::new(),
            store_timeout,
        }
    }

    /// Creates a service and loads the catalog from the store (cold start).
    pub async fn start(
        store: Arc<dyn MetastoreClient>,
        resolver: SymbolResolver,
        store_timeout: Duration,
    ) -> Result<Self, ApiError> {
        let service = Self::new(store, resolver, store_timeout);
        service.invalidate_metadata().await?;
        Ok(service)
    }

    // -----------------------------------------------------------------------
    // Shared state access
    // -----------------------------------------------------------------------

    fn registry(&self) -> Result<RwLockReadGuard<'_, FunctionRegistry>, ApiError> {
        self.registry
            .read()
            .map_err(|_| ApiError::InternalError("function registry lock poisoned".into()))
    }

    fn registry_mut(&self) -> Result<RwLockWriteGuard<'_, FunctionRegistry>, ApiError> {
        self.registry
            .write()
            .map_err(|_| ApiError::InternalError("function registry lock poisoned".into()))
    }

    fn coordinator(&self) -> Result<MutexGuard<'_, ReloadCoordinator>, ApiError> {
        self.coordinator
            .lock()
            .map_err(|_| ApiError::InternalError("reload coordinator lock poisoned".into()))
    }

    fn ensure_loaded(&self) -> Result<(), ApiError> {
        let coordinator = self.coordinator()?;
        if coordinator.is_loaded() {
            return Ok(());
        }
        let reason = coordinator
            .last_error()
            .map(|e| format!(" (last rebuild failed: {e})"))
            .unwrap_or_default();
        Err(ApiError::CatalogNotLoaded(format!(
            "Catalog is not loaded; retry INVALIDATE METADATA{reason}"
        )))
    }

    fn require_database(&self, database: &DatabaseName) -> Result<(), ApiError> {
        if self.registry()?.has_database(database) {
            Ok(())
        } else {
            Err(CatalogError::DatabaseNotFound(database.to_string()).into())
        }
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.store_timeout.as_millis()).unwrap_or(u64::MAX)
    }

    fn timed_out(&self, operation: &str) -> ApiError {
        warn!(operation, timeout_ms = self.timeout_ms(), "metastore call timed out");
        ApiError::Persistence(format!(
            "metastore {operation} timed out after {} ms",
            self.timeout_ms()
        ))
    }

    /// Runs a blocking store call on the blocking pool, bounded by the
    /// store timeout. A call that times out keeps running.
    async fn call_store<T, F>(&self, operation: &'static str, call: F) -> StoreCall<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn MetastoreClient) -> Result<T, StorageError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let mut task = tokio::task::spawn_blocking(move || call(store.as_ref()));
        match tokio::time::timeout(self.store_timeout, &mut task).await {
            Ok(Ok(result)) => StoreCall::Done(result.map_err(ApiError::from)),
            Ok(Err(join_error)) => StoreCall::Done(Err(ApiError::InternalError(format!(
                "metastore {operation} task failed: {join_error}"
            )))),
            Err(_) => StoreCall::TimedOut(task),
        }
    }

    /// [`call_store`](Self::call_store) for calls whose late completion
    /// needs no cleanup.
    async fn with_store<T, F>(&self, operation: &'static str, call: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn MetastoreClient) -> Result<T, StorageError> + Send + 'static,
    {
        match self.call_store(operation, call).await {
            StoreCall::Done(result) => result,
            StoreCall::TimedOut(_) => Err(self.timed_out(operation)),
        }
    }

    /// Writes `entities` in one batch. If the write times out, a background
    /// task deletes them again should the write still land.
    async fn write_functions(
        &self,
        database: &DatabaseName,
        entities: Vec<StoredFunction>,
    ) -> Result<(), ApiError> {
        let keys: Vec<FunctionKey> = entities.iter().map(StoredFunction::key).collect();
        let task = match self
            .call_store("create_functions", move |store| store.create_functions(&entities))
            .await
        {
            StoreCall::Done(result) => return result,
            StoreCall::TimedOut(task) => task,
        };

        let store = Arc::clone(&self.store);
        let db = database.to_string();
        let compensation = tokio::spawn(async move {
            if !matches!(task.await, Ok(Ok(()))) {
                return;
            }
            let count = keys.len();
            match tokio::task::spawn_blocking(move || store.drop_functions(&keys)).await {
                Ok(Ok(())) => info!(database = %db, count, "late durable write undone"),
                Ok(Err(e)) => warn!(database = %db, error = %e, "failed to undo late durable write"),
                Err(e) => warn!(database = %db, error = %e, "undo task failed"),
            }
        });
        self.pending.track(database.as_str(), compensation);
        Err(self.timed_out("create_functions"))
    }

    /// Waits until earlier timed-out writes to `database` (every database if
    /// `None`) are settled.
    async fn settle_pending(&self, database: Option<&DatabaseName>) -> Result<(), ApiError> {
        let db = database.map(DatabaseName::as_str);
        if self.pending.settle(db, self.store_timeout).await {
            return Ok(());
        }
        Err(ApiError::Persistence(format!(
            "an earlier metastore write to {} is still in flight",
            db.unwrap_or("the catalog")
        )))
    }

    // -----------------------------------------------------------------------
    // Databases
    // -----------------------------------------------------------------------

    /// Creates a database. Returns `false` if it existed and
    /// `if_not_exists` was set.
    pub async fn create_database(&self, name: &str, if_not_exists: bool) -> Result<bool, ApiError> {
        let database = DatabaseName::new(name)?;
        let _guard = self.locks.acquire([database.as_str()]).await;
        self.ensure_loaded()?;

        let db = database.to_string();
        let created = self
            .with_store("create_database", move |store| {
                store.create_database(&db, ENGINE_OWNER, if_not_exists)
            })
            .await?;
        // A database created by another writer becomes known here too.
        self.registry_mut()?.add_database(database.clone());
        if created {
            info!(database = %database, "database created");
        }
        Ok(created)
    }

    /// Drops a database. Without `cascade` a database holding functions is
    /// rejected.
    pub async fn drop_database(
        &self,
        name: &str,
        if_exists: bool,
        cascade: bool,
    ) -> Result<DroppedDatabase, ApiError> {
        let database = DatabaseName::new(name)?;
        let _guard = self.locks.acquire([database.as_str()]).await;
        self.ensure_loaded()?;

        let in_memory = self.registry()?.function_count(&database);
        if in_memory > 0 && !cascade {
            return Err(CatalogError::DatabaseNotEmpty {
                database: database.to_string(),
                functions: in_memory,
            }
            .into());
        }

        let db = database.to_string();
        let existed_durably = self
            .with_store("drop_database", move |store| match store.drop_database(&db, cascade) {
                Ok(()) => Ok(true),
                Err(StorageError::DatabaseNotFound(_)) => Ok(false),
                Err(e) => Err(e),
            })
            .await?;
        let removed = self.registry_mut()?.remove_database(&database).ok();

        match (existed_durably, removed) {
            (false, None) if if_exists => Ok(DroppedDatabase {
                dropped: false,
                functions_removed: 0,
            }),
            (false, None) => Err(CatalogError::DatabaseNotFound(database.to_string()).into()),
            (_, removed) => {
                let functions_removed = removed.map_or(0, |records| records.len());
                info!(database = %database, functions_removed, "database dropped");
                Ok(DroppedDatabase {
                    dropped: true,
                    functions_removed,
                })
            }
        }
    }

    // -----------------------------------------------------------------------
    // CREATE FUNCTION
    // -----------------------------------------------------------------------

    /// CREATE FUNCTION (native, Java class-derived, or Java with a declared
    /// signature).
    pub async fn create_function(
        &self,
        database: &str,
        req: &CreateFunctionRequest,
    ) -> Result<CreateFunctionResponse, ApiError> {
        let database = DatabaseName::new(database)?;
        let name = FunctionName::new(&req.name)?;
        let binary_type = req
            .binary_type
            .unwrap_or_else(|| infer_binary_type(&req.location));

        let _guard = self.locks.acquire([database.as_str()]).await;
        self.ensure_loaded()?;
        self.require_database(&database)?;

        let records = match binary_type {
            BinaryType::Native => {
                let signature = declared_signature(req.args.as_deref(), req.returns.as_deref())?;
                let kind = self.resolver.native_scalar(
                    &req.location,
                    &req.symbol,
                    req.prepare_fn.as_deref(),
                    req.close_fn.as_deref(),
                    &signature,
                )?;
                vec![FunctionRecord::new(
                    FunctionIdentity::new(database.clone(), name.clone(), signature),
                    kind,
                )]
            }
            BinaryType::Java if req.args.is_none() && req.returns.is_none() => {
                let class = self.resolver.java_class(&req.location, &req.symbol)?;
                debug!(
                    class = %req.symbol,
                    overloads = class.overloads.len(),
                    "java class resolved"
                );
                class
                    .overloads
                    .into_iter()
                    .map(|signature| {
                        FunctionRecord::new(
                            FunctionIdentity::new(database.clone(), name.clone(), signature),
                            class.kind.clone(),
                        )
                    })
                    .collect()
            }
            BinaryType::Java => {
                let signature = declared_signature(req.args.as_deref(), req.returns.as_deref())?;
                let kind = self
                    .resolver
                    .java_explicit(&req.location, &req.symbol, &signature)?;
                vec![FunctionRecord::new(
                    FunctionIdentity::new(database.clone(), name.clone(), signature),
                    kind,
                )]
            }
        };

        self.register_records(&database, &name, records, req.if_not_exists)
            .await
    }

    /// CREATE AGGREGATE FUNCTION (native only).
    pub async fn create_aggregate(
        &self,
        database: &str,
        req: &CreateAggregateRequest,
    ) -> Result<CreateFunctionResponse, ApiError> {
        let database = DatabaseName::new(database)?;
        let name = FunctionName::new(&req.name)?;
        if infer_binary_type(&req.location) == BinaryType::Java {
            return Err(ApiError::BadRequest(
                "Java aggregate functions are not supported".into(),
            ));
        }
        let signature = declared_signature(Some(&req.args), Some(&req.returns))?;
        let intermediate_type = req
            .intermediate_type
            .as_deref()
            .map(str::parse::<ColumnType>)
            .transpose()?;
        let symbols = AggregateSymbols {
            update: req.update_fn.clone(),
            init: req.init_fn.clone(),
            merge: req.merge_fn.clone(),
            serialize: req.serialize_fn.clone(),
            finalize: req.finalize_fn.clone(),
        };

        let _guard = self.locks.acquire([database.as_str()]).await;
        self.ensure_loaded()?;
        self.require_database(&database)?;

        let kind = self
            .resolver
            .native_aggregate(&req.location, &symbols, &signature, intermediate_type)?;
        let record = FunctionRecord::new(
            FunctionIdentity::new(database.clone(), name.clone(), signature),
            kind,
        );
        self.register_records(&database, &name, vec![record], req.if_not_exists)
            .await
    }

    /// Stages `records`, persists the persistent ones, then commits.
    /// Caller holds the database's namespace lock.
    async fn register_records(
        &self,
        database: &DatabaseName,
        name: &FunctionName,
        records: Vec<FunctionRecord>,
        if_not_exists: bool,
    ) -> Result<CreateFunctionResponse, ApiError> {
        let skipped = CreateFunctionResponse::default();

        if records.iter().any(|r| r.persistent) {
            self.settle_pending(Some(database)).await?;
            // The store may hold entities this registry does not load, e.g.
            // a class created by the external tool with no usable overload.
            let db = database.to_string();
            let fn_name = name.to_string();
            let durable = self
                .with_store("get_functions_by_name", move |store| {
                    store.get_functions_by_name(&db, &fn_name)
                })
                .await?;
            if durable_conflict(&durable, &records) {
                if if_not_exists {
                    return Ok(skipped);
                }
                return Err(CatalogError::FunctionAlreadyExists {
                    database: database.to_string(),
                    name: name.to_string(),
                }
                .into());
            }
        }

        let registration = self.registry_mut()?.register(records, if_not_exists);
        let staged = match registration? {
            Registration::Skipped => return Ok(skipped),
            Registration::Staged(staged) => staged,
        };

        let create_time = unix_now();
        let entities: Vec<StoredFunction> = staged
            .records()
            .iter()
            .filter(|r| r.persistent)
            .map(|r| to_stored(r, ENGINE_OWNER, create_time))
            .collect();
        if !entities.is_empty() {
            if let Err(e) = self.write_functions(database, entities).await {
                warn!(database = %database, function = %name, error = %e, "durable write failed, rolling back");
                self.registry_mut()?.rollback(staged);
                return Err(e);
            }
        }

        let functions: Vec<String> = staged
            .records()
            .iter()
            .map(|r| r.display_signature())
            .collect();
        let persistent = staged.records().iter().any(|r| r.persistent);
        self.registry_mut()?.commit(staged);
        info!(database = %database, functions = ?functions, persistent, "functions created");
        Ok(CreateFunctionResponse {
            created: true,
            functions,
        })
    }

    // -----------------------------------------------------------------------
    // DROP FUNCTION
    // -----------------------------------------------------------------------

    /// DROP FUNCTION, by full signature or by bare name.
    pub async fn drop_function(
        &self,
        database: &str,
        name: &str,
        args: Option<&str>,
        if_exists: bool,
    ) -> Result<DropFunctionResponse, ApiError> {
        let database = DatabaseName::new(database)?;
        let name = FunctionName::new(name)?;
        // The return type is not part of a function's identity.
        let signature = args
            .map(|args| FunctionSignature::parse(args, ColumnType::Boolean))
            .transpose()?;

        let _guard = self.locks.acquire([database.as_str()]).await;
        self.ensure_loaded()?;

        let targets = self
            .registry()?
            .drop_targets(&database, &name, signature.as_ref());
        match targets {
            Ok(targets) => {
                let targets: Vec<FunctionRecord> =
                    targets.iter().map(|r| FunctionRecord::clone(r)).collect();
                self.drop_records(&database, &name, targets).await
            }
            Err(err @ CatalogError::FunctionNotFound { .. }) => {
                self.drop_unloaded(&database, &name, signature.as_ref(), if_exists, err)
                    .await
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Deletes the durable entities behind `targets`, then unregisters them.
    async fn drop_records(
        &self,
        database: &DatabaseName,
        name: &FunctionName,
        targets: Vec<FunctionRecord>,
    ) -> Result<DropFunctionResponse, ApiError> {
        let mut durable_entities_removed = 0;

        if targets.iter().any(|t| t.persistent) {
            let remaining: Vec<FunctionRecord> = self
                .registry()?
                .list(database, NamePattern::any(), ListFilter::All)?
                .iter()
                .filter(|r| r.name() == name && r.persistent)
                .filter(|r| !targets.iter().any(|t| t.identity == r.identity))
                .map(|r| FunctionRecord::clone(r))
                .collect();

            let durable = self.durable_by_name(database, name).await?;
            let persistent: Vec<&FunctionRecord> = targets.iter().filter(|t| t.persistent).collect();
            let (drop, create) = plan_durable_drop(&durable, &persistent, &remaining, unix_now());
            if !drop.is_empty() || !create.is_empty() {
                durable_entities_removed = drop.len();
                self.with_store("replace_functions", move |store| {
                    store.replace_functions(&drop, &create)
                })
                .await?;
            }
        }

        let mut dropped = Vec::with_capacity(targets.len());
        {
            let mut registry = self.registry_mut()?;
            for target in &targets {
                registry.unregister(&target.identity, true)?;
                dropped.push(target.display_signature());
            }
        }
        info!(database = %database, dropped = ?dropped, durable_entities_removed, "functions dropped");
        Ok(DropFunctionResponse {
            dropped,
            durable_entities_removed,
        })
    }

    /// Drop of a function that is durable but not loaded: every entity of
    /// the name for a bare-name drop, else the entity with that signature.
    async fn drop_unloaded(
        &self,
        database: &DatabaseName,
        name: &FunctionName,
        signature: Option<&FunctionSignature>,
        if_exists: bool,
        not_found: CatalogError,
    ) -> Result<DropFunctionResponse, ApiError> {
        let mut durable = self.durable_by_name(database, name).await?;
        if let Some(signature) = signature {
            let canonical = signature.canonical_args();
            durable.retain(|e| e.signature.as_deref() == Some(canonical.as_str()));
        }
        if durable.is_empty() {
            if if_exists {
                return Ok(DropFunctionResponse::default());
            }
            return Err(not_found.into());
        }
        let keys: Vec<FunctionKey> = durable.iter().map(StoredFunction::key).collect();
        let durable_entities_removed = keys.len();
        self.with_store("drop_functions", move |store| store.drop_functions(&keys))
            .await?;
        info!(database = %database, function = %name, durable_entities_removed, "unloaded function dropped");
        Ok(DropFunctionResponse {
            dropped: Vec::new(),
            durable_entities_removed,
        })
    }

    async fn durable_by_name(
        &self,
        database: &DatabaseName,
        name: &FunctionName,
    ) -> Result<Vec<StoredFunction>, ApiError> {
        let db = database.to_string();
        let fn_name = name.to_string();
        self.with_store("get_functions_by_name", move |store| {
            match store.get_functions_by_name(&db, &fn_name) {
                Err(StorageError::DatabaseNotFound(_)) => Ok(Vec::new()),
                other => other,
            }
        })
        .await
    }

    // -----------------------------------------------------------------------
    // SHOW / resolve
    // -----------------------------------------------------------------------

    /// SHOW [AGGREGATE] FUNCTIONS [LIKE pattern].
    pub async fn show_functions(
        &self,
        database: &str,
        like: Option<&str>,
        filter: ListFilter,
    ) -> Result<FunctionListing, ApiError> {
        let database = DatabaseName::new(database)?;
        let pattern = like
            .map(NamePattern::new)
            .transpose()?
            .unwrap_or_else(NamePattern::any);
        let _guard = self.locks.acquire([database.as_str()]).await;
        self.ensure_loaded()?;
        let listing = self.registry()?.list(&database, pattern, filter)?;
        Ok(listing)
    }

    /// Resolves a call with the given argument types to one overload.
    pub async fn resolve(
        &self,
        database: &str,
        name: &str,
        args: &[String],
    ) -> Result<Arc<FunctionRecord>, ApiError> {
        let database = DatabaseName::new(database)?;
        let name = FunctionName::new(name)?;
        let call_args = args
            .iter()
            .map(|a| a.parse::<ColumnType>())
            .collect::<Result<Vec<_>, _>>()?;
        let _guard = self.locks.acquire([database.as_str()]).await;
        self.ensure_loaded()?;
        let record = self.registry()?.resolve(&database, &name, &call_args)?;
        debug!(function = %record.identity, "call resolved");
        Ok(record)
    }

    // -----------------------------------------------------------------------
    // Catalog lifecycle
    // -----------------------------------------------------------------------

    /// INVALIDATE METADATA: discards the registry and rebuilds it from the
    /// durable store. Blocks every other catalog operation until done.
    ///
    /// On failure the catalog stays unloaded (`Rebuilding`) and requests
    /// fail with `CatalogNotLoaded` until a retry succeeds.
    pub async fn invalidate_metadata(&self) -> Result<ReloadReport, ApiError> {
        let _global = self.locks.acquire_global().await;
        self.settle_pending(None).await?;
        let started = Instant::now();

        self.coordinator()?.begin_invalidation();
        *self.registry_mut()? = FunctionRegistry::new();
        self.coordinator()?.begin_rebuild();

        match self.load_from_store().await {
            Ok(rebuild) => {
                let report = self.coordinator()?.finish(&rebuild, started.elapsed());
                *self.registry_mut()? = rebuild.registry;
                info!(
                    reload_id = %report.reload_id,
                    databases = report.databases,
                    functions = report.functions,
                    skipped = report.skipped,
                    filtered = report.filtered,
                    changed = ?report.changed_databases,
                    elapsed_ms = report.elapsed_ms,
                    "catalog reloaded"
                );
                Ok(report)
            }
            Err(e) => {
                warn!(error = %e, "catalog rebuild failed; catalog left unloaded");
                self.coordinator()?.fail(e.to_string());
                Err(e)
            }
        }
    }

    /// Reads every database from the store, one bounded call per read.
    async fn load_from_store(&self) -> Result<Rebuild, ApiError> {
        let databases = self
            .with_store("list_databases", |store| store.list_databases())
            .await?;
        let mut rebuild = Rebuild::new();
        for db_name in databases {
            let name = db_name.clone();
            let entities = self
                .with_store("list_functions", move |store| match store.list_functions(&name) {
                    // Dropped by another writer since it was listed.
                    Err(StorageError::DatabaseNotFound(_)) => Ok(None),
                    other => other.map(Some),
                })
                .await?;
            if let Some(entities) = entities {
                rebuild.add_database(&db_name, &entities, &self.resolver);
            }
        }
        Ok(rebuild)
    }

    /// Current state and last reload. Does not wait for a running reload.
    pub fn status(&self) -> Result<CatalogStatusResponse, ApiError> {
        let coordinator = self.coordinator()?;
        let registry = self.registry()?;
        Ok(CatalogStatusResponse {
            state: coordinator.state(),
            databases: registry.databases().count(),
            functions: registry.records().count(),
            last_reload: coordinator.last_report().cloned(),
            last_error: match coordinator.state() {
                CatalogState::Loaded => None,
                _ => coordinator.last_error().map(str::to_string),
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn infer_binary_type(location: &str) -> BinaryType {
    if location.to_ascii_lowercase().ends_with(".jar") {
        BinaryType::Java
    } else {
        BinaryType::Native
    }
}

fn declared_signature(args: Option<&str>, returns: Option<&str>) -> Result<FunctionSignature, ApiError> {
    match (args, returns) {
        (Some(args), Some(returns)) => {
            let return_type: ColumnType = returns.parse()?;
            Ok(FunctionSignature::parse(args, return_type)?)
        }
        _ => Err(ApiError::BadRequest(
            "both 'args' and 'returns' are required for this function".into(),
        )),
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs() as i64)
}

/// `true` if the entity is a Java function, which owns its whole name.
fn is_java_entity(entity: &StoredFunction) -> bool {
    match entity.property(props::KIND) {
        Some(kind) => kind == props::KIND_JAVA_SCALAR,
        None => entity.resource_type == ResourceType::Jar,
    }
}

/// Whether durable entities of the name block registering `records`.
fn durable_conflict(durable: &[StoredFunction], records: &[FunctionRecord]) -> bool {
    let class_derived = records.iter().any(|r| r.kind.is_class_derived());
    if class_derived && !durable.is_empty() {
        return true;
    }
    let signatures: BTreeSet<String> = records
        .iter()
        .map(|r| r.signature().canonical_args())
        .collect();
    durable.iter().any(|e| {
        is_java_entity(e)
            || e
                .signature
                .as_ref()
                .is_some_and(|sig| signatures.contains(sig))
    })
}

/// Computes the durable change for dropping `targets`.
///
/// Returns the keys to delete and the entities to create. When no
/// persistent overload of the name remains, every entity of the name goes.
/// Otherwise each target's signed entity is deleted; a target stored only
/// as a class-level entity (no signature) has that entity replaced by signed
/// entities for the overloads that remain.
fn plan_durable_drop(
    durable: &[StoredFunction],
    targets: &[&FunctionRecord],
    remaining: &[FunctionRecord],
    create_time: i64,
) -> (Vec<FunctionKey>, Vec<StoredFunction>) {
    if remaining.is_empty() {
        return (durable.iter().map(StoredFunction::key).collect(), Vec::new());
    }

    let signed = |sig: &str| durable.iter().find(|e| e.signature.as_deref() == Some(sig));
    let mut drop: Vec<FunctionKey> = Vec::new();
    let mut expand_class_level = false;
    for target in targets {
        match signed(&target.signature().canonical_args()) {
            Some(entity) => drop.push(entity.key()),
            None => expand_class_level = true,
        }
    }

    let mut create = Vec::new();
    if expand_class_level && durable.iter().any(|e| e.signature.is_none()) {
        drop.extend(
            durable
                .iter()
                .filter(|e| e.signature.is_none())
                .map(StoredFunction::key),
        );
        create = remaining
            .iter()
            .filter(|r| signed(&r.signature().canonical_args()).is_none())
            .map(|r| to_stored(r, ENGINE_OWNER, create_time))
            .collect();
    }
    drop.sort();
    drop.dedup();
    (drop, create)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use udfcat_core::FunctionKind;

    const JAR: &str = "/jars/udfs.jar";

    fn java_record(args: &str, ret: ColumnType) -> FunctionRecord {
        FunctionRecord::new(
            FunctionIdentity::new(
                DatabaseName::new("db").unwrap(),
                FunctionName::new("f").unwrap(),
                FunctionSignature::parse(args, ret).unwrap(),
            ),
            FunctionKind::JavaScalar {
                archive: JAR.into(),
                class_name: "com.example.F".into(),
                overloads: vec![],
                class_derived: true,
            },
        )
    }

    fn external() -> StoredFunction {
        StoredFunction {
            database: "db".into(),
            name: "f".into(),
            signature: None,
            class_name: "com.example.F".into(),
            resource_uri: JAR.into(),
            resource_type: ResourceType::Jar,
            owner: "hive".into(),
            create_time: 0,
            properties: IndexMap::new(),
        }
    }

    #[test]
    fn infers_java_from_jar_location() {
        assert_eq!(infer_binary_type("/jars/UDFS.JAR"), BinaryType::Java);
        assert_eq!(infer_binary_type("/lib/libTestUdfs.so"), BinaryType::Native);
    }

    #[test]
    fn declared_signature_needs_both_parts() {
        assert!(declared_signature(Some("int"), None).is_err());
        let sig = declared_signature(Some("int, string"), Some("bigint")).unwrap();
        assert_eq!(sig.return_type(), ColumnType::BigInt);
        assert!(matches!(
            declared_signature(Some("int"), Some("bogus")),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn external_class_blocks_any_create() {
        let native = FunctionRecord::new(
            FunctionIdentity::new(
                DatabaseName::new("db").unwrap(),
                FunctionName::new("f").unwrap(),
                FunctionSignature::parse("string", ColumnType::String).unwrap(),
            ),
            FunctionKind::NativeScalar {
                library: "/lib/libTestUdfs.so".into(),
                symbol: "F".into(),
                prepare_fn: None,
                close_fn: None,
            },
        );
        assert!(durable_conflict(&[external()], &[native.clone()]));
        assert!(!durable_conflict(&[], &[native]));
    }

    #[test]
    fn dropping_last_overload_removes_every_entity() {
        let target = java_record("int", ColumnType::Int);
        let (drop, create) = plan_durable_drop(&[external()], &[&target], &[], 1);
        assert_eq!(drop, vec![FunctionKey::new("db", "f", None)]);
        assert!(create.is_empty());
    }

    #[test]
    fn dropping_one_overload_of_class_level_entity_rewrites_the_rest() {
        let target = java_record("int", ColumnType::Int);
        let rest = java_record("boolean", ColumnType::Boolean);
        let (drop, create) = plan_durable_drop(&[external()], &[&target], &[rest], 7);
        assert_eq!(drop, vec![FunctionKey::new("db", "f", None)]);
        assert_eq!(create.len(), 1);
        assert_eq!(create[0].signature.as_deref(), Some("boolean"));
        assert_eq!(create[0].create_time, 7);
    }

    #[test]
    fn dropping_signed_overload_deletes_only_its_entity() {
        let target = java_record("int", ColumnType::Int);
        let rest = java_record("boolean", ColumnType::Boolean);
        let durable = vec![
            to_stored(&target, ENGINE_OWNER, 0),
            to_stored(&rest, ENGINE_OWNER, 0),
        ];
        let (drop, create) = plan_durable_drop(&durable, &[&target], &[rest], 0);
        assert_eq!(drop, vec![FunctionKey::new("db", "f", Some("int"))]);
        assert!(create.is_empty());
    }
}
