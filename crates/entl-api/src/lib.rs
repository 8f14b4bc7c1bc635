//! # entl-api — Axum API Service for the Entitlement Backend
//!
//! ## API Surface
//!
//! | Prefix                         | Module                       | Domain              |
//! |--------------------------------|------------------------------|---------------------|
//! | `/v1/catalog/*`                | [`routes::catalog`]          | Modules, features, branches |
//! | `/v1/plans/*`                  | [`routes::plans`]            | Plans, grants, role assignments |
//! | `/v1/plans/*/matrix`, `*/resolve`, `*/check` | [`routes::matrix`] | Effective access |
//! | `/v1/subscriptions/*`          | [`routes::subscriptions`]    | Subscriptions       |
//! | `/v1/analytics/*`              | [`routes::analytics`]        | Console statistics  |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```
//!
//! ## OpenAPI
//!
//! Generated via utoipa derive macros, served at `/openapi.json`.

pub mod auth;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use std::collections::BTreeMap;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use entl_core::PlanStatus;

use crate::auth::AuthConfig;
use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`) and `/metrics` are mounted outside the auth
/// middleware so they remain accessible without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics = ApiMetrics::new();
    let metrics_on = state.config.metrics_enabled;

    // Body size limit: 2 MiB.
    let mut api = Router::new()
        .merge(routes::catalog::router())
        .merge(routes::plans::router())
        .merge(routes::matrix::router())
        .merge(routes::subscriptions::router())
        .merge(routes::analytics::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(from_fn(auth::auth_middleware));

    if metrics_on {
        api = api
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(Extension(metrics.clone()));
    }

    let api = api
        .layer(TraceLayer::new_for_http())
        .layer(Extension(auth_config))
        .with_state(state.clone());

    let mut unauthenticated = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness));

    if metrics_on {
        unauthenticated = unauthenticated
            .route("/metrics", get(prometheus_metrics))
            .layer(Extension(metrics));
    }

    let unauthenticated = unauthenticated.with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

/// GET /metrics — Prometheus scrape endpoint.
///
/// Refreshes the plan and subscription gauges from one store snapshot,
/// then encodes the whole registry in text exposition format.
async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> impl IntoResponse {
    let view = state.store.snapshot();

    let mut plans: BTreeMap<PlanStatus, usize> = BTreeMap::new();
    for record in view.plans() {
        *plans.entry(record.plan.status).or_default() += 1;
    }
    metrics.plans_total().reset();
    for status in [PlanStatus::Active, PlanStatus::Draft, PlanStatus::Archived] {
        let count = plans.get(&status).copied().unwrap_or(0);
        metrics
            .plans_total()
            .with_label_values(&[status.as_str()])
            .set(count as f64);
    }

    metrics.subscriptions_total().reset();
    for row in entl_query::subscription_status_counts(&view) {
        metrics
            .subscriptions_total()
            .with_label_values(&[row.status.label()])
            .set(row.count as f64);
    }

    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — when write-through is configured, the snapshot
/// file's directory must still exist, otherwise every mutation would fail.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if let Some(path) = &state.config.snapshot_path {
        let dir_ok = path
            .parent()
            .map(|dir| dir.as_os_str().is_empty() || dir.is_dir())
            .unwrap_or(true);
        if !dir_ok {
            tracing::warn!(path = %path.display(), "snapshot directory missing");
            return (StatusCode::SERVICE_UNAVAILABLE, "snapshot directory missing").into_response();
        }
    }

    (StatusCode::OK, "ready").into_response()
}

