//! # Console Analytics API
//!
//! The statistics cards above the plan and subscription tables.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use entl_query::{PlanShare, PlanStats, SubscriptionStats};

use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct PlanAnalytics {
    #[serde(flatten)]
    pub stats: PlanStats,
    /// Subscriptions per plan, every plan listed.
    pub distribution: Vec<PlanShare>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/analytics/plans", get(plan_analytics))
        .route("/v1/analytics/subscriptions", get(subscription_analytics))
}

/// GET /v1/analytics/plans — Active tiers, average price, seats and the
/// per-plan subscription distribution.
#[utoipa::path(
    get,
    path = "/v1/analytics/plans",
    responses(
        (status = 200, description = "Plan statistics", body = PlanAnalytics),
    ),
    tag = "analytics"
)]
pub async fn plan_analytics(State(state): State<AppState>) -> Json<PlanAnalytics> {
    let view = state.store.snapshot();
    Json(PlanAnalytics {
        stats: entl_query::plan_stats(&view),
        distribution: entl_query::plan_distribution(&view),
    })
}

/// GET /v1/analytics/subscriptions — Totals by status and by plan.
#[utoipa::path(
    get,
    path = "/v1/analytics/subscriptions",
    responses(
        (status = 200, description = "Subscription statistics", body = SubscriptionStats),
    ),
    tag = "analytics"
)]
pub async fn subscription_analytics(State(state): State<AppState>) -> Json<SubscriptionStats> {
    Json(entl_query::subscription_stats(&state.store.snapshot()))
}
