//! Catalog lifecycle handlers.

use axum::extract::State;
use axum::Json;

use crate::error::ApiError;
use crate::reload::ReloadReport;
use crate::schema::catalog::CatalogStatusResponse;
use crate::state::AppState;

/// `POST /invalidate-metadata`
pub async fn invalidate_metadata(
    State(state): State<AppState>,
) -> Result<Json<ReloadReport>, ApiError> {
    let report = state.service.invalidate_metadata().await?;
    Ok(Json(report))
}

/// `GET /catalog/status`
pub async fn status(State(state): State<AppState>) -> Result<Json<CatalogStatusResponse>, ApiError> {
    Ok(Json(state.service.status()?))
}
