//! # Subscriptions API
//!
//! Plan assignment, module overrides, lifecycle transitions, masked
//! access and the expiry sweep. Lifecycle rules are enforced by
//! [`entl_binder::SubscriptionBinder`]; illegal transitions come back as
//! 409 `INVALID_STATE`.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use entl_binder::{AssignPlan, RenewRequest, SubscriptionBinder};
use entl_core::{ModuleId, PlanId, SubscriptionId};
use entl_matrix::SubscriptionAccess;
use entl_query::{SubscriptionFilter, SubscriptionSummary};
use entl_state::{Subscription, TransitionEvidence};

use crate::error::{AppError, ErrorBody};
use crate::extractors::{extract_json, extract_query, extract_validated_json, Validate};
use crate::routes::matrix::BranchParams;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct OverrideRequest {
    /// `false` removes all access to the module for this subscription.
    pub enabled: bool,
}

/// Reason and actor recorded in the transition log.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TransitionRequest {
    pub reason: String,
    #[serde(default)]
    pub actor: Option<String>,
}

impl Validate for TransitionRequest {
    fn validate(&self) -> Result<(), String> {
        if self.reason.trim().is_empty() {
            return Err("reason must not be blank".to_string());
        }
        Ok(())
    }
}

impl From<TransitionRequest> for TransitionEvidence {
    fn from(req: TransitionRequest) -> Self {
        let evidence = TransitionEvidence::new(req.reason.trim());
        match req.actor {
            Some(actor) => evidence.by(actor),
            None => evidence,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangePlanRequest {
    pub plan_id: PlanId,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ExpireDueRequest {
    /// Subscriptions whose term ended on or before this date expire.
    pub as_of: NaiveDate,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExpireDueResponse {
    pub as_of: NaiveDate,
    pub expired: Vec<SubscriptionId>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/subscriptions",
            get(list_subscriptions).post(assign_plan),
        )
        .route("/v1/subscriptions/expire-due", post(expire_due))
        .route("/v1/subscriptions/{id}", get(get_subscription))
        .route(
            "/v1/subscriptions/{id}/overrides/{module_id}",
            put(set_override).delete(clear_override),
        )
        .route("/v1/subscriptions/{id}/renew", post(renew))
        .route("/v1/subscriptions/{id}/cancel", post(cancel))
        .route("/v1/subscriptions/{id}/suspend", post(suspend))
        .route("/v1/subscriptions/{id}/resume", post(resume))
        .route("/v1/subscriptions/{id}/activate", post(activate))
        .route("/v1/subscriptions/{id}/change-plan", post(change_plan))
        .route(
            "/v1/subscriptions/{id}/access/{module_id}",
            get(subscription_access),
        )
}

fn owned(sub: Arc<Subscription>) -> Json<Subscription> {
    Json(Subscription::clone(&sub))
}

/// GET /v1/subscriptions — List subscriptions, optionally filtered.
#[utoipa::path(
    get,
    path = "/v1/subscriptions",
    params(SubscriptionFilter),
    responses(
        (status = 200, description = "Subscriptions in id order", body = Vec<SubscriptionSummary>),
        (status = 422, description = "Malformed filter", body = ErrorBody),
    ),
    tag = "subscriptions"
)]
pub async fn list_subscriptions(
    State(state): State<AppState>,
    filter: Result<Query<SubscriptionFilter>, QueryRejection>,
) -> Result<Json<Vec<SubscriptionSummary>>, AppError> {
    let filter = extract_query(filter)?;
    Ok(Json(entl_query::list_subscriptions(
        &state.store.snapshot(),
        &filter,
    )))
}

/// POST /v1/subscriptions — Subscribe a customer to an Active plan.
#[utoipa::path(
    post,
    path = "/v1/subscriptions",
    request_body = AssignPlan,
    responses(
        (status = 201, description = "Subscription created", body = Subscription),
        (status = 404, description = "Plan not found", body = ErrorBody),
        (status = 409, description = "Subscription id already taken", body = ErrorBody),
        (status = 422, description = "Plan not assignable or invalid input", body = ErrorBody),
    ),
    tag = "subscriptions"
)]
pub async fn assign_plan(
    State(state): State<AppState>,
    body: Result<Json<AssignPlan>, JsonRejection>,
) -> Result<(StatusCode, Json<Subscription>), AppError> {
    let req = extract_json(body)?;
    let sub = SubscriptionBinder::new(&state.store).assign_plan(req)?;
    Ok((StatusCode::CREATED, owned(sub)))
}

/// GET /v1/subscriptions/{id} — One subscription with its plan name.
#[utoipa::path(
    get,
    path = "/v1/subscriptions/{id}",
    params(("id" = String, Path, description = "Subscription ID")),
    responses(
        (status = 200, description = "Subscription", body = SubscriptionSummary),
        (status = 404, description = "Subscription not found", body = ErrorBody),
    ),
    tag = "subscriptions"
)]
pub async fn get_subscription(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SubscriptionSummary>, AppError> {
    let id = SubscriptionId::new(id)?;
    Ok(Json(entl_query::get_subscription(&state.store.snapshot(), &id)?))
}

/// PUT /v1/subscriptions/{id}/overrides/{module_id} — Enable or disable
/// one module for this subscription.
#[utoipa::path(
    put,
    path = "/v1/subscriptions/{id}/overrides/{module_id}",
    params(
        ("id" = String, Path, description = "Subscription ID"),
        ("module_id" = String, Path, description = "Module ID"),
    ),
    request_body = OverrideRequest,
    responses(
        (status = 200, description = "Override stored", body = Subscription),
        (status = 404, description = "Subscription or module not found", body = ErrorBody),
        (status = 409, description = "Subscription is cancelled", body = ErrorBody),
        (status = 422, description = "Module not in the plan", body = ErrorBody),
    ),
    tag = "subscriptions"
)]
pub async fn set_override(
    State(state): State<AppState>,
    Path((id, module_id)): Path<(String, String)>,
    body: Result<Json<OverrideRequest>, JsonRejection>,
) -> Result<Json<Subscription>, AppError> {
    let id = SubscriptionId::new(id)?;
    let module_id = ModuleId::new(module_id)?;
    let req = extract_json(body)?;
    let sub = SubscriptionBinder::new(&state.store).set_module_override(&id, &module_id, req.enabled)?;
    Ok(owned(sub))
}

/// DELETE /v1/subscriptions/{id}/overrides/{module_id} — Follow the plan again.
#[utoipa::path(
    delete,
    path = "/v1/subscriptions/{id}/overrides/{module_id}",
    params(
        ("id" = String, Path, description = "Subscription ID"),
        ("module_id" = String, Path, description = "Module ID"),
    ),
    responses(
        (status = 200, description = "Override cleared", body = Subscription),
        (status = 404, description = "Subscription or module not found", body = ErrorBody),
    ),
    tag = "subscriptions"
)]
pub async fn clear_override(
    State(state): State<AppState>,
    Path((id, module_id)): Path<(String, String)>,
) -> Result<Json<Subscription>, AppError> {
    let id = SubscriptionId::new(id)?;
    let module_id = ModuleId::new(module_id)?;
    let sub = SubscriptionBinder::new(&state.store).clear_module_override(&id, &module_id)?;
    Ok(owned(sub))
}

/// POST /v1/subscriptions/{id}/renew — Start the next term.
#[utoipa::path(
    post,
    path = "/v1/subscriptions/{id}/renew",
    params(("id" = String, Path, description = "Subscription ID")),
    request_body = RenewRequest,
    responses(
        (status = 200, description = "Renewed", body = Subscription),
        (status = 404, description = "Subscription not found", body = ErrorBody),
        (status = 409, description = "Not renewable in its current state", body = ErrorBody),
    ),
    tag = "subscriptions"
)]
pub async fn renew(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<RenewRequest>, JsonRejection>,
) -> Result<Json<Subscription>, AppError> {
    let id = SubscriptionId::new(id)?;
    let req = extract_json(body)?;
    Ok(owned(SubscriptionBinder::new(&state.store).renew(&id, req)?))
}

/// POST /v1/subscriptions/{id}/cancel — Permanently end the subscription.
#[utoipa::path(
    post,
    path = "/v1/subscriptions/{id}/cancel",
    params(("id" = String, Path, description = "Subscription ID")),
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Cancelled", body = Subscription),
        (status = 404, description = "Subscription not found", body = ErrorBody),
        (status = 409, description = "Illegal transition", body = ErrorBody),
    ),
    tag = "subscriptions"
)]
pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<TransitionRequest>, JsonRejection>,
) -> Result<Json<Subscription>, AppError> {
    let id = SubscriptionId::new(id)?;
    let evidence = extract_validated_json(body)?.into();
    Ok(owned(SubscriptionBinder::new(&state.store).cancel(&id, evidence)?))
}

/// POST /v1/subscriptions/{id}/suspend — Block access temporarily.
#[utoipa::path(
    post,
    path = "/v1/subscriptions/{id}/suspend",
    params(("id" = String, Path, description = "Subscription ID")),
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Suspended", body = Subscription),
        (status = 404, description = "Subscription not found", body = ErrorBody),
        (status = 409, description = "Illegal transition", body = ErrorBody),
    ),
    tag = "subscriptions"
)]
pub async fn suspend(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<TransitionRequest>, JsonRejection>,
) -> Result<Json<Subscription>, AppError> {
    let id = SubscriptionId::new(id)?;
    let evidence = extract_validated_json(body)?.into();
    Ok(owned(SubscriptionBinder::new(&state.store).suspend(&id, evidence)?))
}

/// POST /v1/subscriptions/{id}/resume — Lift a suspension.
#[utoipa::path(
    post,
    path = "/v1/subscriptions/{id}/resume",
    params(("id" = String, Path, description = "Subscription ID")),
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Resumed", body = Subscription),
        (status = 404, description = "Subscription not found", body = ErrorBody),
        (status = 409, description = "Illegal transition", body = ErrorBody),
    ),
    tag = "subscriptions"
)]
pub async fn resume(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<TransitionRequest>, JsonRejection>,
) -> Result<Json<Subscription>, AppError> {
    let id = SubscriptionId::new(id)?;
    let evidence = extract_validated_json(body)?.into();
    Ok(owned(SubscriptionBinder::new(&state.store).resume(&id, evidence)?))
}

/// POST /v1/subscriptions/{id}/activate — Convert a trial to Active.
#[utoipa::path(
    post,
    path = "/v1/subscriptions/{id}/activate",
    params(("id" = String, Path, description = "Subscription ID")),
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Activated", body = Subscription),
        (status = 404, description = "Subscription not found", body = ErrorBody),
        (status = 409, description = "Illegal transition", body = ErrorBody),
    ),
    tag = "subscriptions"
)]
pub async fn activate(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<TransitionRequest>, JsonRejection>,
) -> Result<Json<Subscription>, AppError> {
    let id = SubscriptionId::new(id)?;
    let evidence = extract_validated_json(body)?.into();
    Ok(owned(SubscriptionBinder::new(&state.store).activate(&id, evidence)?))
}

/// POST /v1/subscriptions/{id}/change-plan — Move to another plan,
/// subject to the current plan's upgrade/downgrade flags.
#[utoipa::path(
    post,
    path = "/v1/subscriptions/{id}/change-plan",
    params(("id" = String, Path, description = "Subscription ID")),
    request_body = ChangePlanRequest,
    responses(
        (status = 200, description = "Plan changed", body = Subscription),
        (status = 404, description = "Subscription or plan not found", body = ErrorBody),
        (status = 409, description = "Subscription not live", body = ErrorBody),
        (status = 422, description = "Direction not allowed or plan not assignable", body = ErrorBody),
    ),
    tag = "subscriptions"
)]
pub async fn change_plan(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<ChangePlanRequest>, JsonRejection>,
) -> Result<Json<Subscription>, AppError> {
    let id = SubscriptionId::new(id)?;
    let req = extract_json(body)?;
    Ok(owned(
        SubscriptionBinder::new(&state.store).change_plan(&id, &req.plan_id)?,
    ))
}

/// GET /v1/subscriptions/{id}/access/{module_id} — The plan's resolution
/// of a module, masked by the subscription's status and override.
#[utoipa::path(
    get,
    path = "/v1/subscriptions/{id}/access/{module_id}",
    params(
        ("id" = String, Path, description = "Subscription ID"),
        ("module_id" = String, Path, description = "Module ID"),
        BranchParams,
    ),
    responses(
        (status = 200, description = "Masked resolution", body = SubscriptionAccess),
        (status = 404, description = "Subscription or module not found", body = ErrorBody),
        (status = 409, description = "Single-role module without a role", body = ErrorBody),
    ),
    tag = "subscriptions"
)]
pub async fn subscription_access(
    State(state): State<AppState>,
    Path((id, module_id)): Path<(String, String)>,
    params: Result<Query<BranchParams>, QueryRejection>,
) -> Result<Json<SubscriptionAccess>, AppError> {
    let id = SubscriptionId::new(id)?;
    let module_id = ModuleId::new(module_id)?;
    let params = extract_query(params)?;
    let access = entl_matrix::subscription_access(
        &state.store.snapshot(),
        &id,
        &module_id,
        params.branch_id.as_ref(),
    )?;
    Ok(Json(access))
}

/// POST /v1/subscriptions/expire-due — Expire every Active or Trial
/// subscription whose term ended on or before `as_of`.
#[utoipa::path(
    post,
    path = "/v1/subscriptions/expire-due",
    request_body = ExpireDueRequest,
    responses(
        (status = 200, description = "Expired subscriptions", body = ExpireDueResponse),
    ),
    tag = "subscriptions"
)]
pub async fn expire_due(
    State(state): State<AppState>,
    body: Result<Json<ExpireDueRequest>, JsonRejection>,
) -> Result<Json<ExpireDueResponse>, AppError> {
    let req = extract_json(body)?;
    let expired = SubscriptionBinder::new(&state.store).expire_due(req.as_of)?;
    Ok(Json(ExpireDueResponse {
        as_of: req.as_of,
        expired,
    }))
}
