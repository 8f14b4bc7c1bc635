//! # Integration Tests for entl-api
//!
//! Drives the full router against the demo fixture: catalog and plan
//! administration, matrix resolution, the subscription lifecycle,
//! authentication, metrics and the OpenAPI document.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use entl_api::state::{AppConfig, AppState};
use entl_store::{demo_snapshot, EntitlementStore};

/// Helper: build the test app over the demo fixture with auth disabled.
fn test_app() -> axum::Router {
    let store = EntitlementStore::import(demo_snapshot().unwrap()).unwrap();
    entl_api::app(AppState::with_store(store, AppConfig::default()))
}

/// Helper: build the test app with auth enabled.
fn test_app_with_auth(token: &str) -> axum::Router {
    let store = EntitlementStore::import(demo_snapshot().unwrap()).unwrap();
    let config = AppConfig {
        auth_token: Some(token.to_string()),
        ..AppConfig::default()
    };
    entl_api::app(AppState::with_store(store, config))
}

/// Helper: read response body as string.
async fn body_string(response: axum::http::Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: axum::http::Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn send_json(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let response = test_app().oneshot(get("/health/liveness")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_probe() {
    let response = test_app().oneshot(get("/health/readiness")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ready");
}

/// Helper: an app whose write-through file sits in a directory that does
/// not exist.
fn test_app_with_unwritable_snapshot(dir: &tempfile::TempDir) -> axum::Router {
    let path = dir.path().join("missing").join("store.json");
    let store = EntitlementStore::import(demo_snapshot().unwrap())
        .unwrap()
        .with_write_through(&path);
    let config = AppConfig {
        snapshot_path: Some(path),
        ..AppConfig::default()
    };
    entl_api::app(AppState::with_store(store, config))
}

#[tokio::test]
async fn test_readiness_fails_without_snapshot_directory() {
    let dir = tempfile::tempdir().unwrap();
    let response = test_app_with_unwritable_snapshot(&dir)
        .oneshot(get("/health/readiness"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_failed_write_through_is_internal_error_and_rolled_back() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app_with_unwritable_snapshot(&dir);
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/v1/plans/PLN-002/grants/finance.journal_entry")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "INTERNAL_ERROR");

    let response = app
        .oneshot(get(
            "/v1/plans/PLN-002/features/finance.journal_entry/check?action=view",
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["allowed"], true);
}

// -- Catalog ------------------------------------------------------------------

#[tokio::test]
async fn test_catalog_lists_modules_and_branches() {
    let response = test_app().oneshot(get("/v1/catalog")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["modules"].as_array().unwrap().len(), 6);
    assert_eq!(body["branches"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_register_feature_for_unknown_module_is_not_found() {
    let response = test_app()
        .oneshot(send_json(
            "POST",
            "/v1/catalog/features",
            json!({"id": "payroll.tax", "module_id": "payroll", "name": "Tax"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// -- Plans --------------------------------------------------------------------

#[tokio::test]
async fn test_list_plans() {
    let response = test_app().oneshot(get("/v1/plans")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["PLN-001", "PLN-002", "PLN-003", "PLN-004"]);
}

#[tokio::test]
async fn test_search_plans_by_module_name() {
    let response = test_app()
        .oneshot(get("/v1/plans?search=inventory"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["PLN-002", "PLN-003"]);
}

fn basic_plan(id: &str) -> Value {
    json!({
        "id": id,
        "name": "Basic",
        "plan_type": "Monthly",
        "price": {"kind": "amount", "minor_units": 4900, "currency": "USD"},
        "validity": {"days": 30},
        "limits": {"user_limit": 5, "company_limit": 1},
        "modules": ["hrms"]
    })
}

#[tokio::test]
async fn test_create_plan_then_conflict() {
    let app = test_app();
    let response = app
        .clone()
        .oneshot(send_json("POST", "/v1/plans", basic_plan("PLN-010")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["id"], "PLN-010");
    assert_eq!(body["status"], "Active");

    let response = app
        .oneshot(send_json("POST", "/v1/plans", basic_plan("PLN-010")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_get_unknown_plan_is_not_found() {
    let response = test_app().oneshot(get("/v1/plans/PLN-999")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_trial_plan_reports_unconfigured_finance() {
    let response = test_app().oneshot(get("/v1/plans/PLN-004")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["unconfigured_modules"], json!(["finance"]));
}

#[tokio::test]
async fn test_delete_without_view_is_rejected_and_grant_unchanged() {
    let app = test_app();
    let response = app
        .clone()
        .oneshot(send_json(
            "PUT",
            "/v1/plans/PLN-002/grants/finance.journal_entry",
            json!({"view": false, "delete": true}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let response = app
        .oneshot(get(
            "/v1/plans/PLN-002/features/finance.journal_entry/check?action=approve",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["allowed"], true);
}

#[tokio::test]
async fn test_set_grant_changes_check_result() {
    let app = test_app();
    let response = app
        .clone()
        .oneshot(send_json(
            "PUT",
            "/v1/plans/PLN-002/grants/finance.journal_entry",
            json!({"view": true, "create": true, "edit": true, "delete": true, "approve": true}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get(
            "/v1/plans/PLN-002/features/finance.journal_entry/check?action=delete",
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["allowed"], true);
}

#[tokio::test]
async fn test_role_assignment_kind_must_match_module() {
    let response = test_app()
        .oneshot(send_json(
            "PUT",
            "/v1/plans/PLN-003/modules/maintenance_service/roles",
            json!({"kind": "single", "role": "Technician"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_configuring_trial_finance_role() {
    let app = test_app();
    let response = app
        .clone()
        .oneshot(send_json(
            "PUT",
            "/v1/plans/PLN-004/modules/finance/roles",
            json!({"kind": "single", "role": "Accountant"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body, json!({"kind": "single_role", "role": "Accountant"}));

    let response = app
        .oneshot(get("/v1/plans/PLN-004/modules/finance/resolve"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["state"], "resolved");
    assert_eq!(body["role"], "Accountant");
}

#[tokio::test]
async fn test_archive_subscribed_plan_then_hard_delete_refused() {
    let app = test_app();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/v1/plans/PLN-003?hard=true")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/v1/plans/PLN-003")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["outcome"], "archived");
    assert_eq!(body["plan"]["status"], "Archived");
}

#[tokio::test]
async fn test_duplicate_plan() {
    let app = test_app();
    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/v1/plans/PLN-002/duplicate",
            json!({"new_id": "PLN-020", "name": "Professional Plus"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["id"], "PLN-020");
    assert_eq!(body["name"], "Professional Plus");

    let original = body_json(app.clone().oneshot(get("/v1/plans/PLN-002/matrix")).await.unwrap()).await;
    let copy = body_json(app.oneshot(get("/v1/plans/PLN-020/matrix")).await.unwrap()).await;
    assert_eq!(original["modules"], copy["modules"]);
}

// -- Matrix -------------------------------------------------------------------

#[tokio::test]
async fn test_plan_matrix_is_digested_and_stable() {
    let app = test_app();
    let first = body_json(app.clone().oneshot(get("/v1/plans/PLN-002/matrix")).await.unwrap()).await;
    let second = body_json(app.oneshot(get("/v1/plans/PLN-002/matrix")).await.unwrap()).await;
    let digest = first["digest"].as_str().unwrap();
    assert!(digest.starts_with("sha256:"));
    assert_eq!(digest.len(), "sha256:".len() + 64);
    assert_eq!(first["digest"], second["digest"]);
    assert_eq!(first["modules"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn test_resolve_unconfigured_module_is_conflict() {
    let response = test_app()
        .oneshot(get("/v1/plans/PLN-004/modules/finance/resolve"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "NOT_CONFIGURED");
    assert_eq!(body["error"]["details"]["plan_id"], "PLN-004");
    assert_eq!(body["error"]["details"]["module_id"], "finance");
}

#[tokio::test]
async fn test_resolve_branch_role_module_requires_branch() {
    let response = test_app()
        .oneshot(get("/v1/plans/PLN-003/modules/maintenance_service/resolve"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_resolve_branch_role_module_on_enabled_branch() {
    let response = test_app()
        .oneshot(get(
            "/v1/plans/PLN-003/modules/maintenance_service/resolve?branch_id=b5",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["state"], "resolved");
    assert_eq!(body["role"], "Company Admin");
    assert_eq!(body["branch_id"], "b5");
}

#[tokio::test]
async fn test_check_with_unknown_action_is_bad_request() {
    let response = test_app()
        .oneshot(get(
            "/v1/plans/PLN-002/features/finance.journal_entry/check?action=publish",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

// -- Subscriptions ------------------------------------------------------------

#[tokio::test]
async fn test_list_subscriptions_carries_plan_names() {
    let response = test_app().oneshot(get("/v1/subscriptions")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    let acme = rows.iter().find(|r| r["id"] == "sub_1").unwrap();
    assert_eq!(acme["plan_name"], "Enterprise Plus");
}

#[tokio::test]
async fn test_assign_plan_computes_end_date() {
    let response = test_app()
        .oneshot(send_json(
            "POST",
            "/v1/subscriptions",
            json!({
                "customer_id": "cust-new",
                "customer_name": "New Co",
                "plan_id": "PLN-003",
                "start_date": "2024-01-01",
                "billing_cycle": "Yearly"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["start_date"], "2024-01-01");
    assert_eq!(body["end_date"], "2024-12-31");
    assert_eq!(body["status"], "Active");
}

#[tokio::test]
async fn test_assign_unknown_plan_is_not_found() {
    let response = test_app()
        .oneshot(send_json(
            "POST",
            "/v1/subscriptions",
            json!({
                "customer_id": "cust-new",
                "customer_name": "New Co",
                "plan_id": "PLN-999",
                "start_date": "2024-01-01",
                "billing_cycle": "Monthly"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_unknown_subscription() {
    let response = test_app()
        .oneshot(get("/v1/subscriptions/sub_9"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"]["message"], "subscription sub_9 not found");
}

#[tokio::test]
async fn test_override_masks_subscription_access() {
    let app = test_app();
    let response = app
        .clone()
        .oneshot(get("/v1/subscriptions/sub_1/access/finance"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body.get("masked_by").is_none());
    assert_eq!(body["resolution"]["role"], "Finance Manager");

    let response = app
        .clone()
        .oneshot(send_json(
            "PUT",
            "/v1/subscriptions/sub_1/overrides/finance",
            json!({"enabled": false}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["module_overrides"]["finance"], false);

    let response = app
        .clone()
        .oneshot(get("/v1/subscriptions/sub_1/access/finance"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["masked_by"], "override_disabled");
    assert!(body["resolution"]["role"].is_null());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/v1/subscriptions/sub_1/overrides/finance")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get("/v1/subscriptions/sub_1/access/finance"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert!(body.get("masked_by").is_none());
}

#[tokio::test]
async fn test_expired_subscription_access_is_masked() {
    let response = test_app()
        .oneshot(get("/v1/subscriptions/sub_3/access/hrms"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "Expired");
    assert_eq!(body["masked_by"], "subscription_inactive");
}

#[tokio::test]
async fn test_subscription_lifecycle() {
    let app = test_app();
    let reason = json!({"reason": "invoice overdue", "actor": "billing"});

    let response = app
        .clone()
        .oneshot(send_json("POST", "/v1/subscriptions/sub_1/suspend", reason.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "Suspended");

    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/v1/subscriptions/sub_1/resume",
            json!({"reason": "paid"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "Active");

    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/v1/subscriptions/sub_1/cancel",
            json!({"reason": "customer left"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "Cancelled");
    assert_eq!(body["transitions"].as_array().unwrap().len(), 3);

    let response = app
        .oneshot(send_json(
            "POST",
            "/v1/subscriptions/sub_1/resume",
            json!({"reason": "changed mind"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "INVALID_STATE");
}

#[tokio::test]
async fn test_transition_requires_reason() {
    let response = test_app()
        .oneshot(send_json(
            "POST",
            "/v1/subscriptions/sub_1/suspend",
            json!({"reason": "  "}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_activate_trial_subscription() {
    let response = test_app()
        .oneshot(send_json(
            "POST",
            "/v1/subscriptions/sub_2/activate",
            json!({"reason": "converted"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "Active");
}

#[tokio::test]
async fn test_expire_due_sweep() {
    let app = test_app();
    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/v1/subscriptions/expire-due",
            json!({"as_of": "2024-04-01"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["expired"], json!(["sub_2"]));

    let response = app.oneshot(get("/v1/subscriptions/sub_2")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["status"], "Expired");
}

#[tokio::test]
async fn test_change_plan() {
    let app = test_app();
    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/v1/subscriptions/sub_2/change-plan",
            json!({"plan_id": "PLN-003"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["plan_id"], "PLN-003");

    let response = app
        .oneshot(send_json(
            "POST",
            "/v1/subscriptions/sub_2/change-plan",
            json!({"plan_id": "PLN-003"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// -- Analytics ----------------------------------------------------------------

#[tokio::test]
async fn test_plan_analytics() {
    let response = test_app().oneshot(get("/v1/analytics/plans")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total_plans"], 4);
    assert_eq!(body["active_tiers"], 4);
    assert!(body["distribution"].is_array());
}

#[tokio::test]
async fn test_subscription_analytics() {
    let response = test_app()
        .oneshot(get("/v1/analytics/subscriptions"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total"], 3);
}

// -- Authentication -----------------------------------------------------------

#[tokio::test]
async fn test_auth_rejects_missing_token() {
    let response = test_app_with_auth("s3cret")
        .oneshot(get("/v1/plans"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_auth_accepts_bearer_token() {
    let response = test_app_with_auth("s3cret")
        .oneshot(
            Request::builder()
                .uri("/v1/plans")
                .header("authorization", "Bearer s3cret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health_bypasses_auth() {
    let response = test_app_with_auth("s3cret")
        .oneshot(get("/health/liveness"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// -- Metrics ------------------------------------------------------------------

#[tokio::test]
async fn test_metrics_exposes_store_gauges() {
    let app = test_app();
    let _ = app.clone().oneshot(get("/v1/plans")).await.unwrap();

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("entl_plans_total{status=\"Active\"} 4"));
    assert!(body.contains("entl_subscriptions_total{status=\"Trial\"} 1"));
    assert!(body.contains("entl_http_requests_total"));
}

// -- OpenAPI ------------------------------------------------------------------

#[tokio::test]
async fn test_openapi_document() {
    let response = test_app().oneshot(get("/openapi.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["info"]["title"], "Entitlements API");
    assert!(body["paths"]["/v1/plans/{plan_id}/matrix"].is_object());
}
