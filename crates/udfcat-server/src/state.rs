//! Shared application state for the axum server.
//!
//! [`AppState`] holds the catalog service behind an `Arc` so it can be
//! cloned into every handler. Construction loads the catalog from the
//! durable store (cold start).

use std::sync::Arc;
use std::time::Duration;

use udfcat_resolve::{SymbolManifest, SymbolResolver};
use udfcat_storage::{InMemoryMetastore, MetastoreClient, SqliteMetastore};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::service::CatalogService;

/// Shared application state passed to all handlers via axum's `State`
/// extractor.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<CatalogService>,
}

impl AppState {
    /// Opens the SQLite metastore and symbol manifest named by `config` and
    /// loads the catalog.
    pub async fn new(config: &ServerConfig) -> Result<Self, ApiError> {
        let store = SqliteMetastore::new(&config.db_path)
            .map_err(|e| ApiError::InternalError(format!("failed to open metastore: {e}")))?;
        let manifest = match &config.symbol_manifest {
            Some(path) => SymbolManifest::load(path)?,
            None => SymbolManifest::new(),
        };
        Self::with_store(
            Arc::new(store),
            SymbolResolver::from_manifest(manifest),
            config.store_timeout,
        )
        .await
    }

    /// Builds the state over an existing store and resolver. Two states over
    /// the same store behave like two server processes sharing a metastore.
    pub async fn with_store(
        store: Arc<dyn MetastoreClient>,
        resolver: SymbolResolver,
        store_timeout: Duration,
    ) -> Result<Self, ApiError> {
        let service = CatalogService::start(store, resolver, store_timeout).await?;
        Ok(AppState {
            service: Arc::new(service),
        })
    }

    /// State over an empty in-memory metastore (for testing).
    pub async fn in_memory(resolver: SymbolResolver) -> Result<Self, ApiError> {
        Self::with_store(
            Arc::new(InMemoryMetastore::new()),
            resolver,
            ServerConfig::default().store_timeout,
        )
        .await
    }
}
