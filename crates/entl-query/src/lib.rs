//! # entl-query — Query Facade
//!
//! Read-only functions of a [`entl_store::StoreView`]: the plan and
//! subscription listings with their filters, plan detail, effective
//! matrices, the catalog, and the statistics the console shows above
//! its tables. Nothing here mutates the store.

pub mod filters;
pub mod stats;
pub mod views;

pub use filters::{PlanFilter, SubscriptionFilter};
pub use stats::{
    plan_distribution, plan_stats, subscription_stats, subscription_status_counts, PlanShare,
    PlanStats, StatusCount, SubscriptionStats,
};
pub use views::{
    catalog, get_effective_matrix, get_plan, get_subscription, list_plans, list_subscriptions,
    CatalogModule, CatalogView, PlanDetail, PlanSummary, SubscriptionSummary,
};
