//! # Read Models
//!
//! Console-shaped projections of a [`StoreView`]. Listings come back in id
//! order; all lookups of one call run against the same view.

use std::collections::BTreeMap;

use serde::Serialize;

use entl_core::{
    Branch, BranchId, EntlResult, Feature, GrantType, Module, ModuleId, ModuleRoleAssignment,
    PermissionGrant, Plan, PlanId, SubscriptionId,
};
use entl_matrix::{effective_matrix, EffectiveMatrix};
use entl_state::Subscription;
use entl_store::{PlanRecord, StoreView};

use crate::filters::{PlanFilter, SubscriptionFilter};

/// One row of the plan listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PlanSummary {
    #[serde(flatten)]
    pub plan: Plan,
    /// Names of the included modules, in module id order.
    pub module_names: Vec<String>,
    /// Subscriptions on the plan in any status.
    pub subscriber_count: usize,
}

/// A plan with everything stored beside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PlanDetail {
    pub plan: Plan,
    pub grants: Vec<PermissionGrant>,
    pub assignments: BTreeMap<ModuleId, ModuleRoleAssignment>,
    /// Included single-role modules without a role assignment.
    pub unconfigured_modules: Vec<ModuleId>,
}

/// A subscription with its plan's display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SubscriptionSummary {
    #[serde(flatten)]
    pub subscription: Subscription,
    pub plan_name: String,
}

/// One catalog module with its features.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CatalogModule {
    #[serde(flatten)]
    pub module: Module,
    pub features: Vec<Feature>,
}

/// The catalog as the console lists it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CatalogView {
    pub modules: Vec<CatalogModule>,
    pub branches: Vec<Branch>,
}

fn summarize(view: &StoreView, record: &PlanRecord) -> PlanSummary {
    let catalog = view.catalog();
    PlanSummary {
        plan: record.plan.clone(),
        module_names: record
            .plan
            .modules
            .iter()
            .filter_map(|m| catalog.modules.get(m).map(|module| module.name.clone()))
            .collect(),
        subscriber_count: view
            .subscriptions()
            .filter(|s| s.plan_id == record.plan.id)
            .count(),
    }
}

pub fn list_plans(view: &StoreView, filter: &PlanFilter) -> Vec<PlanSummary> {
    view.plans()
        .filter(|record| filter.matches(record, view.catalog()))
        .map(|record| summarize(view, record))
        .collect()
}

pub fn get_plan(view: &StoreView, plan_id: &PlanId) -> EntlResult<PlanDetail> {
    let record = view.plan(plan_id)?;
    let catalog = view.catalog();
    let unconfigured_modules = record
        .plan
        .modules
        .iter()
        .filter(|m| {
            catalog
                .modules
                .get(*m)
                .is_some_and(|module| module.grant_type == GrantType::SingleRole)
                && record.assignment(m).is_none()
        })
        .cloned()
        .collect();
    Ok(PlanDetail {
        plan: record.plan.clone(),
        grants: record.grants.values().cloned().collect(),
        assignments: record.assignments.clone(),
        unconfigured_modules,
    })
}

pub fn get_effective_matrix(
    view: &StoreView,
    plan_id: &PlanId,
    branch: Option<&BranchId>,
) -> EntlResult<EffectiveMatrix> {
    effective_matrix(view, plan_id, branch)
}

fn subscription_summary(view: &StoreView, sub: &Subscription) -> SubscriptionSummary {
    SubscriptionSummary {
        plan_name: view
            .plan(&sub.plan_id)
            .map(|record| record.plan.name.clone())
            .unwrap_or_default(),
        subscription: sub.clone(),
    }
}

pub fn list_subscriptions(view: &StoreView, filter: &SubscriptionFilter) -> Vec<SubscriptionSummary> {
    view.subscriptions()
        .filter(|sub| filter.matches(sub))
        .map(|sub| subscription_summary(view, sub))
        .collect()
}

pub fn get_subscription(view: &StoreView, id: &SubscriptionId) -> EntlResult<SubscriptionSummary> {
    let sub = view.subscription(id)?;
    Ok(subscription_summary(view, sub))
}

pub fn catalog(view: &StoreView) -> CatalogView {
    let catalog = view.catalog();
    CatalogView {
        modules: catalog
            .modules
            .values()
            .map(|module| CatalogModule {
                module: module.clone(),
                features: catalog.features_of(&module.id).cloned().collect(),
            })
            .collect(),
        branches: catalog.branches.values().cloned().collect(),
    }
}
