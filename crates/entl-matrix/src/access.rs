//! # Subscription Access
//!
//! A subscription sees its plan's resolution, narrowed by two masks:
//!
//! - a subscription whose status is neither Active nor Trial grants nothing;
//! - a module override of `false` denies everything in that module.
//!
//! An override of `true` is the same as no override. Overrides cannot
//! widen the plan.

use serde::Serialize;

use entl_core::{Action, BranchId, EntlResult, FeatureId, ModuleId, SubscriptionId};
use entl_state::SubscriptionStatus;
use entl_store::StoreView;

use crate::resolver::{resolve, Resolution};

/// Why a subscription's access was masked to deny-all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum AccessMask {
    SubscriptionInactive,
    OverrideDisabled,
}

/// Effective access of one subscription to one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SubscriptionAccess {
    pub subscription_id: SubscriptionId,
    pub status: SubscriptionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub masked_by: Option<AccessMask>,
    pub resolution: Resolution,
}

impl SubscriptionAccess {
    pub fn allows(&self, feature: &FeatureId, action: Action) -> bool {
        self.resolution.allows(feature, action)
    }
}

/// Resolve `module` for the subscription's plan, then apply the
/// subscription's status and override masks.
///
/// Resolution errors of the underlying plan (`NotConfigured`, a missing
/// branch for a branch-role module) are returned even when a mask would
/// deny everything.
pub fn subscription_access(
    view: &StoreView,
    subscription_id: &SubscriptionId,
    module_id: &ModuleId,
    branch: Option<&BranchId>,
) -> EntlResult<SubscriptionAccess> {
    let subscription = view.subscription(subscription_id)?;
    let resolution = resolve(view, &subscription.plan_id, module_id, branch)?;

    let mask = if !subscription.grants_access() {
        Some(AccessMask::SubscriptionInactive)
    } else if subscription.override_for(module_id) == Some(false) {
        Some(AccessMask::OverrideDisabled)
    } else {
        None
    };

    let resolution = match mask {
        Some(_) => resolution.denied(resolution.state),
        None => resolution,
    };

    Ok(SubscriptionAccess {
        subscription_id: subscription.id.clone(),
        status: subscription.status,
        masked_by: mask,
        resolution,
    })
}

/// Whether the subscription may perform `action` on `feature`.
pub fn subscription_check(
    view: &StoreView,
    subscription_id: &SubscriptionId,
    feature_id: &FeatureId,
    branch: Option<&BranchId>,
    action: Action,
) -> EntlResult<bool> {
    let feature = view.catalog().feature(feature_id)?;
    let access = subscription_access(view, subscription_id, &feature.module_id, branch)?;
    Ok(access.allows(feature_id, action))
}
