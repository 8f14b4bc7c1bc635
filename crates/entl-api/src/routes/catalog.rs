//! # Catalog API
//!
//! Modules, features and branches. The catalog is append-only over the
//! API: entries are registered, never edited or removed.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use entl_core::{Branch, Feature, Module};
use entl_query::CatalogView;

use crate::error::{AppError, ErrorBody};
use crate::extractors::extract_json;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/catalog", get(get_catalog))
        .route("/v1/catalog/modules", post(register_module))
        .route("/v1/catalog/features", post(register_feature))
        .route("/v1/catalog/branches", post(register_branch))
}

/// GET /v1/catalog — Modules with their features, and branches.
#[utoipa::path(
    get,
    path = "/v1/catalog",
    responses(
        (status = 200, description = "The catalog", body = CatalogView),
    ),
    tag = "catalog"
)]
pub async fn get_catalog(State(state): State<AppState>) -> Json<CatalogView> {
    Json(entl_query::catalog(&state.store.snapshot()))
}

/// POST /v1/catalog/modules — Register a module.
#[utoipa::path(
    post,
    path = "/v1/catalog/modules",
    request_body = Module,
    responses(
        (status = 201, description = "Module registered", body = Module),
        (status = 409, description = "Module id already taken", body = ErrorBody),
        (status = 422, description = "Malformed module", body = ErrorBody),
    ),
    tag = "catalog"
)]
pub async fn register_module(
    State(state): State<AppState>,
    body: Result<Json<Module>, JsonRejection>,
) -> Result<(StatusCode, Json<Module>), AppError> {
    let module = state.store.register_module(extract_json(body)?)?;
    Ok((StatusCode::CREATED, Json(module)))
}

/// POST /v1/catalog/features — Register a feature under an existing module.
#[utoipa::path(
    post,
    path = "/v1/catalog/features",
    request_body = Feature,
    responses(
        (status = 201, description = "Feature registered", body = Feature),
        (status = 404, description = "Module not found", body = ErrorBody),
        (status = 409, description = "Feature id already taken", body = ErrorBody),
    ),
    tag = "catalog"
)]
pub async fn register_feature(
    State(state): State<AppState>,
    body: Result<Json<Feature>, JsonRejection>,
) -> Result<(StatusCode, Json<Feature>), AppError> {
    let feature = state.store.register_feature(extract_json(body)?)?;
    Ok((StatusCode::CREATED, Json(feature)))
}

/// POST /v1/catalog/branches — Register a branch.
#[utoipa::path(
    post,
    path = "/v1/catalog/branches",
    request_body = Branch,
    responses(
        (status = 201, description = "Branch registered", body = Branch),
        (status = 409, description = "Branch id already taken", body = ErrorBody),
    ),
    tag = "catalog"
)]
pub async fn register_branch(
    State(state): State<AppState>,
    body: Result<Json<Branch>, JsonRejection>,
) -> Result<(StatusCode, Json<Branch>), AppError> {
    let branch = state.store.register_branch(extract_json(body)?)?;
    Ok((StatusCode::CREATED, Json(branch)))
}
