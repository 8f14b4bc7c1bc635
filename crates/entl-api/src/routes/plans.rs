//! # Plans API
//!
//! Plan CRUD, duplication, permission grants and module role assignments.
//! Every write goes through [`entl_store::EntitlementStore`], which
//! validates before committing; a rejected write leaves the plan as it was.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use entl_core::{
    FeatureId, ModuleId, ModuleRoleAssignment, NewPlan, PermissionFlags, PermissionGrant, Plan,
    PlanId, PlanUpdate, RoleAssignmentInput,
};
use entl_query::{PlanDetail, PlanFilter, PlanSummary};
use entl_store::{ArchiveMode, ArchiveOutcome};

use crate::error::{AppError, ErrorBody};
use crate::extractors::{extract_json, extract_query, extract_validated_json, Validate};
use crate::state::AppState;

/// Query of `DELETE /v1/plans/{plan_id}`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RemovePlanParams {
    /// Remove the plan outright instead of archiving it. Refused while
    /// any subscription references the plan.
    #[serde(default)]
    pub hard: bool,
}

/// What `DELETE /v1/plans/{plan_id}` did.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RemovalKind {
    Archived,
    Deleted,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PlanRemovalResponse {
    pub plan_id: PlanId,
    pub outcome: RemovalKind,
    /// The archived plan; absent after a hard delete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
}

impl From<ArchiveOutcome> for PlanRemovalResponse {
    fn from(outcome: ArchiveOutcome) -> Self {
        match outcome {
            ArchiveOutcome::Archived(plan) => Self {
                plan_id: plan.id.clone(),
                outcome: RemovalKind::Archived,
                plan: Some(plan),
            },
            ArchiveOutcome::Deleted(plan_id) => Self {
                plan_id,
                outcome: RemovalKind::Deleted,
                plan: None,
            },
        }
    }
}

/// Request to copy a plan into a new Draft plan.
#[derive(Debug, Deserialize, ToSchema)]
pub struct DuplicatePlanRequest {
    pub new_id: PlanId,
    /// Defaults to "<source name> (Copy)".
    #[serde(default)]
    pub name: Option<String>,
}

impl Validate for DuplicatePlanRequest {
    fn validate(&self) -> Result<(), String> {
        if self.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err("name must not be blank".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GrantClearedResponse {
    pub plan_id: PlanId,
    pub feature_id: FeatureId,
    /// Whether an explicit grant existed before the call.
    pub removed: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/plans", get(list_plans).post(create_plan))
        .route(
            "/v1/plans/{plan_id}",
            get(get_plan).put(update_plan).delete(remove_plan),
        )
        .route("/v1/plans/{plan_id}/duplicate", post(duplicate_plan))
        .route(
            "/v1/plans/{plan_id}/grants/{feature_id}",
            put(set_grant).delete(clear_grant),
        )
        .route(
            "/v1/plans/{plan_id}/modules/{module_id}/roles",
            put(set_role_assignment),
        )
}

/// GET /v1/plans — List plans, optionally filtered.
#[utoipa::path(
    get,
    path = "/v1/plans",
    params(PlanFilter),
    responses(
        (status = 200, description = "Plans in id order", body = Vec<PlanSummary>),
        (status = 422, description = "Malformed filter", body = ErrorBody),
    ),
    tag = "plans"
)]
pub async fn list_plans(
    State(state): State<AppState>,
    filter: Result<Query<PlanFilter>, QueryRejection>,
) -> Result<Json<Vec<PlanSummary>>, AppError> {
    let filter = extract_query(filter)?;
    Ok(Json(entl_query::list_plans(&state.store.snapshot(), &filter)))
}

/// POST /v1/plans — Create a plan.
#[utoipa::path(
    post,
    path = "/v1/plans",
    request_body = NewPlan,
    responses(
        (status = 201, description = "Plan created", body = Plan),
        (status = 404, description = "Unknown module", body = ErrorBody),
        (status = 409, description = "Plan id already taken", body = ErrorBody),
        (status = 422, description = "Invalid plan", body = ErrorBody),
    ),
    tag = "plans"
)]
pub async fn create_plan(
    State(state): State<AppState>,
    body: Result<Json<NewPlan>, JsonRejection>,
) -> Result<(StatusCode, Json<Plan>), AppError> {
    let plan = state.store.create_plan(extract_json(body)?)?;
    Ok((StatusCode::CREATED, Json(plan)))
}

/// GET /v1/plans/{plan_id} — Plan with grants and role assignments.
#[utoipa::path(
    get,
    path = "/v1/plans/{plan_id}",
    params(("plan_id" = String, Path, description = "Plan ID")),
    responses(
        (status = 200, description = "Plan detail", body = PlanDetail),
        (status = 404, description = "Plan not found", body = ErrorBody),
    ),
    tag = "plans"
)]
pub async fn get_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<String>,
) -> Result<Json<PlanDetail>, AppError> {
    let plan_id = PlanId::new(plan_id)?;
    Ok(Json(entl_query::get_plan(&state.store.snapshot(), &plan_id)?))
}

/// PUT /v1/plans/{plan_id} — Partial update; absent fields are kept.
#[utoipa::path(
    put,
    path = "/v1/plans/{plan_id}",
    params(("plan_id" = String, Path, description = "Plan ID")),
    request_body = PlanUpdate,
    responses(
        (status = 200, description = "Plan updated", body = Plan),
        (status = 404, description = "Plan or module not found", body = ErrorBody),
        (status = 422, description = "Invalid update", body = ErrorBody),
    ),
    tag = "plans"
)]
pub async fn update_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<String>,
    body: Result<Json<PlanUpdate>, JsonRejection>,
) -> Result<Json<Plan>, AppError> {
    let plan_id = PlanId::new(plan_id)?;
    let update = extract_json(body)?;
    Ok(Json(state.store.update_plan(&plan_id, update)?))
}

/// DELETE /v1/plans/{plan_id} — Archive, or hard-delete with `?hard=true`.
#[utoipa::path(
    delete,
    path = "/v1/plans/{plan_id}",
    params(("plan_id" = String, Path, description = "Plan ID"), RemovePlanParams),
    responses(
        (status = 200, description = "Plan archived or deleted", body = PlanRemovalResponse),
        (status = 404, description = "Plan not found", body = ErrorBody),
        (status = 409, description = "Live subscriptions reference the plan", body = ErrorBody),
    ),
    tag = "plans"
)]
pub async fn remove_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<String>,
    params: Result<Query<RemovePlanParams>, QueryRejection>,
) -> Result<Json<PlanRemovalResponse>, AppError> {
    let plan_id = PlanId::new(plan_id)?;
    let mode = if extract_query(params)?.hard {
        ArchiveMode::HardDelete
    } else {
        ArchiveMode::Archive
    };
    Ok(Json(state.store.archive_plan(&plan_id, mode)?.into()))
}

/// POST /v1/plans/{plan_id}/duplicate — Copy a plan with its grants and
/// role assignments into a new Draft plan.
#[utoipa::path(
    post,
    path = "/v1/plans/{plan_id}/duplicate",
    params(("plan_id" = String, Path, description = "Source plan ID")),
    request_body = DuplicatePlanRequest,
    responses(
        (status = 201, description = "Copy created", body = Plan),
        (status = 404, description = "Source plan not found", body = ErrorBody),
        (status = 409, description = "New plan id already taken", body = ErrorBody),
    ),
    tag = "plans"
)]
pub async fn duplicate_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<String>,
    body: Result<Json<DuplicatePlanRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Plan>), AppError> {
    let source = PlanId::new(plan_id)?;
    let req = extract_validated_json(body)?;
    let plan = state.store.duplicate_plan(&source, req.new_id, req.name)?;
    Ok((StatusCode::CREATED, Json(plan)))
}

/// PUT /v1/plans/{plan_id}/grants/{feature_id} — Set the five permission
/// flags of one feature. `delete` without `view` is rejected.
#[utoipa::path(
    put,
    path = "/v1/plans/{plan_id}/grants/{feature_id}",
    params(
        ("plan_id" = String, Path, description = "Plan ID"),
        ("feature_id" = String, Path, description = "Feature ID"),
    ),
    request_body = PermissionFlags,
    responses(
        (status = 200, description = "Grant stored", body = PermissionGrant),
        (status = 404, description = "Plan or feature not found", body = ErrorBody),
        (status = 422, description = "Delete without view", body = ErrorBody),
    ),
    tag = "plans"
)]
pub async fn set_grant(
    State(state): State<AppState>,
    Path((plan_id, feature_id)): Path<(String, String)>,
    body: Result<Json<PermissionFlags>, JsonRejection>,
) -> Result<Json<PermissionGrant>, AppError> {
    let plan_id = PlanId::new(plan_id)?;
    let feature_id = FeatureId::new(feature_id)?;
    let flags = extract_json(body)?;
    Ok(Json(state.store.set_permission_grant(&plan_id, &feature_id, flags)?))
}

/// DELETE /v1/plans/{plan_id}/grants/{feature_id} — Drop the grant; the
/// feature falls back to deny-all.
#[utoipa::path(
    delete,
    path = "/v1/plans/{plan_id}/grants/{feature_id}",
    params(
        ("plan_id" = String, Path, description = "Plan ID"),
        ("feature_id" = String, Path, description = "Feature ID"),
    ),
    responses(
        (status = 200, description = "Grant cleared", body = GrantClearedResponse),
        (status = 404, description = "Plan or feature not found", body = ErrorBody),
    ),
    tag = "plans"
)]
pub async fn clear_grant(
    State(state): State<AppState>,
    Path((plan_id, feature_id)): Path<(String, String)>,
) -> Result<Json<GrantClearedResponse>, AppError> {
    let plan_id = PlanId::new(plan_id)?;
    let feature_id = FeatureId::new(feature_id)?;
    let removed = state.store.clear_permission_grant(&plan_id, &feature_id)?;
    Ok(Json(GrantClearedResponse {
        plan_id,
        feature_id,
        removed,
    }))
}

/// PUT /v1/plans/{plan_id}/modules/{module_id}/roles — Set the role of a
/// single-role module, or one or all branch rows of a branch-role module.
#[utoipa::path(
    put,
    path = "/v1/plans/{plan_id}/modules/{module_id}/roles",
    params(
        ("plan_id" = String, Path, description = "Plan ID"),
        ("module_id" = String, Path, description = "Module ID"),
    ),
    request_body = RoleAssignmentInput,
    responses(
        (status = 200, description = "Assignment stored", body = ModuleRoleAssignment),
        (status = 404, description = "Plan, module or branch not found", body = ErrorBody),
        (status = 422, description = "Wrong grant type, module not in plan, or two defaults", body = ErrorBody),
    ),
    tag = "plans"
)]
pub async fn set_role_assignment(
    State(state): State<AppState>,
    Path((plan_id, module_id)): Path<(String, String)>,
    body: Result<Json<RoleAssignmentInput>, JsonRejection>,
) -> Result<Json<ModuleRoleAssignment>, AppError> {
    let plan_id = PlanId::new(plan_id)?;
    let module_id = ModuleId::new(module_id)?;
    let input = extract_json(body)?;
    Ok(Json(
        state
            .store
            .set_module_role_assignment(&plan_id, &module_id, input)?,
    ))
}
