//! # OpenAPI Specification Assembly
//!
//! Collects every utoipa-documented route into one OpenAPI document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Entitlements API",
        version = "0.1.0",
        description = "Plans, permission grants, module role assignments, effective access matrices and customer subscriptions for the ERP admin console.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        // Catalog
        crate::routes::catalog::get_catalog,
        crate::routes::catalog::register_module,
        crate::routes::catalog::register_feature,
        crate::routes::catalog::register_branch,
        // Plans
        crate::routes::plans::list_plans,
        crate::routes::plans::create_plan,
        crate::routes::plans::get_plan,
        crate::routes::plans::update_plan,
        crate::routes::plans::remove_plan,
        crate::routes::plans::duplicate_plan,
        crate::routes::plans::set_grant,
        crate::routes::plans::clear_grant,
        crate::routes::plans::set_role_assignment,
        // Matrix
        crate::routes::matrix::plan_matrix,
        crate::routes::matrix::resolve_module,
        crate::routes::matrix::check_feature,
        // Subscriptions
        crate::routes::subscriptions::list_subscriptions,
        crate::routes::subscriptions::assign_plan,
        crate::routes::subscriptions::get_subscription,
        crate::routes::subscriptions::set_override,
        crate::routes::subscriptions::clear_override,
        crate::routes::subscriptions::renew,
        crate::routes::subscriptions::cancel,
        crate::routes::subscriptions::suspend,
        crate::routes::subscriptions::resume,
        crate::routes::subscriptions::activate,
        crate::routes::subscriptions::change_plan,
        crate::routes::subscriptions::subscription_access,
        crate::routes::subscriptions::expire_due,
        // Analytics
        crate::routes::analytics::plan_analytics,
        crate::routes::analytics::subscription_analytics,
    ),
    components(schemas(
        // Catalog & plans
        entl_core::Module,
        entl_core::Feature,
        entl_core::Branch,
        entl_core::GrantType,
        entl_core::Plan,
        entl_core::NewPlan,
        entl_core::PlanUpdate,
        entl_core::PlanType,
        entl_core::PlanStatus,
        entl_core::Price,
        entl_core::Validity,
        entl_core::PlanLimits,
        entl_core::RenewalMode,
        entl_core::PermissionFlags,
        entl_core::PermissionGrant,
        entl_core::Action,
        entl_core::ModuleRoleAssignment,
        entl_core::RoleAssignmentInput,
        entl_core::BranchRoleRow,
        // Resolution
        entl_matrix::EffectiveMatrix,
        entl_matrix::ModuleMatrix,
        entl_matrix::BranchScope,
        entl_matrix::Resolution,
        entl_matrix::FeaturePermissions,
        entl_matrix::ModuleState,
        entl_matrix::SubscriptionAccess,
        entl_matrix::AccessMask,
        // Subscriptions
        entl_state::Subscription,
        entl_state::SubscriptionStatus,
        entl_state::TransitionRecord,
        entl_binder::AssignPlan,
        entl_binder::RenewRequest,
        // Query views
        entl_query::CatalogView,
        entl_query::CatalogModule,
        entl_query::PlanSummary,
        entl_query::PlanDetail,
        entl_query::SubscriptionSummary,
        entl_query::PlanStats,
        entl_query::PlanShare,
        entl_query::StatusCount,
        entl_query::SubscriptionStats,
        // Request/response DTOs
        crate::routes::plans::DuplicatePlanRequest,
        crate::routes::plans::GrantClearedResponse,
        crate::routes::plans::PlanRemovalResponse,
        crate::routes::plans::RemovalKind,
        crate::routes::matrix::CheckResponse,
        crate::routes::subscriptions::OverrideRequest,
        crate::routes::subscriptions::TransitionRequest,
        crate::routes::subscriptions::ChangePlanRequest,
        crate::routes::subscriptions::ExpireDueRequest,
        crate::routes::subscriptions::ExpireDueResponse,
        crate::routes::analytics::PlanAnalytics,
        // Errors
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "catalog", description = "Modules, features and branches"),
        (name = "plans", description = "Plans, permission grants and role assignments"),
        (name = "matrix", description = "Effective access resolution"),
        (name = "subscriptions", description = "Customer subscriptions and their lifecycle"),
        (name = "analytics", description = "Console statistics"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
