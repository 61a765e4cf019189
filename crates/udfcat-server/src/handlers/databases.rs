//! Database management handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::error::ApiError;
use crate::schema::databases::{
    CreateDatabaseRequest, CreateDatabaseResponse, DropDatabaseQuery, DropDatabaseResponse,
};
use crate::state::AppState;

/// `POST /databases`
pub async fn create_database(
    State(state): State<AppState>,
    Json(req): Json<CreateDatabaseRequest>,
) -> Result<(StatusCode, Json<CreateDatabaseResponse>), ApiError> {
    let created = state
        .service
        .create_database(&req.name, req.if_not_exists)
        .await?;
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((
        status,
        Json(CreateDatabaseResponse {
            database: req.name.to_ascii_lowercase(),
            created,
        }),
    ))
}

/// `DELETE /databases/{db}?if_exists=&cascade=`
pub async fn drop_database(
    State(state): State<AppState>,
    Path(database): Path<String>,
    Query(query): Query<DropDatabaseQuery>,
) -> Result<Json<DropDatabaseResponse>, ApiError> {
    let outcome = state
        .service
        .drop_database(&database, query.if_exists, query.cascade)
        .await?;
    Ok(Json(DropDatabaseResponse {
        database: database.to_ascii_lowercase(),
        dropped: outcome.dropped,
        functions_removed: outcome.functions_removed,
    }))
}
