//! Function DDL, SHOW and resolve handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use udfcat_core::ListFilter;

use crate::error::ApiError;
use crate::schema::functions::{
    CreateAggregateRequest, CreateFunctionRequest, CreateFunctionResponse, DropFunctionRequest,
    DropFunctionResponse, ResolveRequest, ResolveResponse, ResultSet, ShowFunctionsQuery,
};
use crate::state::AppState;

fn created_status(response: &CreateFunctionResponse) -> StatusCode {
    if response.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    }
}

/// `POST /databases/{db}/functions`
pub async fn create_function(
    State(state): State<AppState>,
    Path(database): Path<String>,
    Json(req): Json<CreateFunctionRequest>,
) -> Result<(StatusCode, Json<CreateFunctionResponse>), ApiError> {
    let response = state.service.create_function(&database, &req).await?;
    Ok((created_status(&response), Json(response)))
}

/// `POST /databases/{db}/aggregate-functions`
pub async fn create_aggregate(
    State(state): State<AppState>,
    Path(database): Path<String>,
    Json(req): Json<CreateAggregateRequest>,
) -> Result<(StatusCode, Json<CreateFunctionResponse>), ApiError> {
    let response = state.service.create_aggregate(&database, &req).await?;
    Ok((created_status(&response), Json(response)))
}

/// `POST /databases/{db}/functions/drop`
pub async fn drop_function(
    State(state): State<AppState>,
    Path(database): Path<String>,
    Json(req): Json<DropFunctionRequest>,
) -> Result<Json<DropFunctionResponse>, ApiError> {
    let response = state
        .service
        .drop_function(&database, &req.name, req.args.as_deref(), req.if_exists)
        .await?;
    Ok(Json(response))
}

/// `GET /databases/{db}/functions?like=`
pub async fn show_functions(
    State(state): State<AppState>,
    Path(database): Path<String>,
    Query(query): Query<ShowFunctionsQuery>,
) -> Result<Json<ResultSet>, ApiError> {
    let listing = state
        .service
        .show_functions(&database, query.like.as_deref(), ListFilter::Scalar)
        .await?;
    Ok(Json(ResultSet::from_listing(&listing)))
}

/// `GET /databases/{db}/aggregate-functions?like=`
pub async fn show_aggregate_functions(
    State(state): State<AppState>,
    Path(database): Path<String>,
    Query(query): Query<ShowFunctionsQuery>,
) -> Result<Json<ResultSet>, ApiError> {
    let listing = state
        .service
        .show_functions(&database, query.like.as_deref(), ListFilter::Aggregate)
        .await?;
    Ok(Json(ResultSet::from_listing(&listing)))
}

/// `POST /databases/{db}/functions/resolve`
pub async fn resolve_function(
    State(state): State<AppState>,
    Path(database): Path<String>,
    Json(req): Json<ResolveRequest>,
) -> Result<Json<ResolveResponse>, ApiError> {
    let record = state
        .service
        .resolve(&database, &req.name, &req.args)
        .await?;
    Ok(Json(ResolveResponse::from(record.as_ref())))
}
