//! # Matrix API
//!
//! Read-only resolution endpoints. Each request takes one store snapshot
//! and answers entirely from it.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use entl_core::{Action, BranchId, FeatureId, ModuleId, PlanId};
use entl_matrix::{EffectiveMatrix, Resolution};

use crate::error::{AppError, ErrorBody};
use crate::extractors::extract_query;
use crate::state::AppState;

/// Optional branch scope of a resolution.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BranchParams {
    /// Required for branch-role modules when resolving a single module.
    pub branch_id: Option<BranchId>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CheckParams {
    pub action: Action,
    pub branch_id: Option<BranchId>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckResponse {
    pub plan_id: PlanId,
    pub feature_id: FeatureId,
    pub action: Action,
    pub allowed: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/plans/{plan_id}/matrix", get(plan_matrix))
        .route(
            "/v1/plans/{plan_id}/modules/{module_id}/resolve",
            get(resolve_module),
        )
        .route(
            "/v1/plans/{plan_id}/features/{feature_id}/check",
            get(check_feature),
        )
}

/// GET /v1/plans/{plan_id}/matrix — Every catalog module under the plan,
/// with the matrix digest.
#[utoipa::path(
    get,
    path = "/v1/plans/{plan_id}/matrix",
    params(("plan_id" = String, Path, description = "Plan ID"), BranchParams),
    responses(
        (status = 200, description = "Effective matrix", body = EffectiveMatrix),
        (status = 404, description = "Plan not found", body = ErrorBody),
    ),
    tag = "matrix"
)]
pub async fn plan_matrix(
    State(state): State<AppState>,
    Path(plan_id): Path<String>,
    params: Result<Query<BranchParams>, QueryRejection>,
) -> Result<Json<EffectiveMatrix>, AppError> {
    let plan_id = PlanId::new(plan_id)?;
    let params = extract_query(params)?;
    let matrix = entl_query::get_effective_matrix(
        &state.store.snapshot(),
        &plan_id,
        params.branch_id.as_ref(),
    )?;
    Ok(Json(matrix))
}

/// GET /v1/plans/{plan_id}/modules/{module_id}/resolve — Effective role
/// and flags of one module.
#[utoipa::path(
    get,
    path = "/v1/plans/{plan_id}/modules/{module_id}/resolve",
    params(
        ("plan_id" = String, Path, description = "Plan ID"),
        ("module_id" = String, Path, description = "Module ID"),
        BranchParams,
    ),
    responses(
        (status = 200, description = "Resolution", body = Resolution),
        (status = 404, description = "Plan or module not found", body = ErrorBody),
        (status = 409, description = "Single-role module without a role", body = ErrorBody),
        (status = 422, description = "Branch-role module without branch_id", body = ErrorBody),
    ),
    tag = "matrix"
)]
pub async fn resolve_module(
    State(state): State<AppState>,
    Path((plan_id, module_id)): Path<(String, String)>,
    params: Result<Query<BranchParams>, QueryRejection>,
) -> Result<Json<Resolution>, AppError> {
    let plan_id = PlanId::new(plan_id)?;
    let module_id = ModuleId::new(module_id)?;
    let params = extract_query(params)?;
    let resolution = entl_matrix::resolve(
        &state.store.snapshot(),
        &plan_id,
        &module_id,
        params.branch_id.as_ref(),
    )?;
    Ok(Json(resolution))
}

/// GET /v1/plans/{plan_id}/features/{feature_id}/check — Whether the plan
/// allows one action on one feature.
#[utoipa::path(
    get,
    path = "/v1/plans/{plan_id}/features/{feature_id}/check",
    params(
        ("plan_id" = String, Path, description = "Plan ID"),
        ("feature_id" = String, Path, description = "Feature ID"),
        CheckParams,
    ),
    responses(
        (status = 200, description = "Check result", body = CheckResponse),
        (status = 404, description = "Plan or feature not found", body = ErrorBody),
        (status = 409, description = "Single-role module without a role", body = ErrorBody),
    ),
    tag = "matrix"
)]
pub async fn check_feature(
    State(state): State<AppState>,
    Path((plan_id, feature_id)): Path<(String, String)>,
    params: Result<Query<CheckParams>, QueryRejection>,
) -> Result<Json<CheckResponse>, AppError> {
    let plan_id = PlanId::new(plan_id)?;
    let feature_id = FeatureId::new(feature_id)?;
    let params = extract_query(params)?;
    let allowed = entl_matrix::check(
        &state.store.snapshot(),
        &plan_id,
        &feature_id,
        params.branch_id.as_ref(),
        params.action,
    )?;
    Ok(Json(CheckResponse {
        plan_id,
        feature_id,
        action: params.action,
        allowed,
    }))
}
