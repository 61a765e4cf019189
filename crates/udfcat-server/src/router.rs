//! Route table for the catalog API.

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Builds the axum router with all catalog routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Databases
        .route("/databases", post(handlers::databases::create_database))
        .route("/databases/{db}", delete(handlers::databases::drop_database))
        // Functions
        .route(
            "/databases/{db}/functions",
            get(handlers::functions::show_functions).post(handlers::functions::create_function),
        )
        .route(
            "/databases/{db}/aggregate-functions",
            get(handlers::functions::show_aggregate_functions)
                .post(handlers::functions::create_aggregate),
        )
        .route(
            "/databases/{db}/functions/drop",
            post(handlers::functions::drop_function),
        )
        .route(
            "/databases/{db}/functions/resolve",
            post(handlers::functions::resolve_function),
        )
        // Catalog lifecycle
        .route("/invalidate-metadata", post(handlers::catalog::invalidate_metadata))
        .route("/catalog/status", get(handlers::catalog::status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
