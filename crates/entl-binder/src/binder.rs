//! # Subscription Binder
//!
//! Binds customers to plans and drives their subscriptions through the
//! lifecycle in `entl-state`. Every operation is one store commit: the
//! subscription is re-read, changed and validated against the plan as of
//! that commit, and either fully applied or not at all.
//!
//! ## Renewal
//!
//! A subscription renews when it is Active or Expired, renewal was asked
//! for explicitly or `auto_renew` is set, and its plan's renewal mode is
//! not `None`. An Active subscription's next term starts where the current
//! one ends; an Expired one restarts on the renewal date.
//!
//! ## Plan Changes
//!
//! Direction is decided by price (`Custom` ranks highest). Moving up needs
//! the current plan's `upgrade_allowed`, moving down its
//! `downgrade_allowed`; equal prices are lateral and always allowed.
//! Overrides for modules the new plan lacks are dropped.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use entl_core::{
    BillingCycle, CustomerId, EntlError, EntlResult, ModuleId, PlanId, PlanType, RenewalMode,
    SubscriptionId,
};
use entl_state::{
    Subscription, SubscriptionError, SubscriptionStatus, SubscriptionTerms, TransitionEvidence,
};
use entl_store::EntitlementStore;

use crate::term::term_end;

/// Input for [`SubscriptionBinder::assign_plan`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AssignPlan {
    /// Generated when absent.
    #[serde(default)]
    pub subscription_id: Option<SubscriptionId>,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub plan_id: PlanId,
    pub start_date: NaiveDate,
    pub billing_cycle: BillingCycle,
    /// Defaults to the plan's renewal mode being `Auto`.
    #[serde(default)]
    pub auto_renew: Option<bool>,
    #[serde(default)]
    pub billing_contact: Option<String>,
    #[serde(default)]
    pub direct_debit: bool,
    #[serde(default)]
    pub custom_domain: bool,
}

/// Input for [`SubscriptionBinder::renew`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RenewRequest {
    /// An administrator asked for the renewal. Without it, only
    /// subscriptions with `auto_renew` renew.
    #[serde(default)]
    pub explicit: bool,
    pub as_of: NaiveDate,
}

/// Subscription operations over one [`EntitlementStore`].
#[derive(Debug, Clone, Copy)]
pub struct SubscriptionBinder<'s> {
    store: &'s EntitlementStore,
}

impl<'s> SubscriptionBinder<'s> {
    pub fn new(store: &'s EntitlementStore) -> Self {
        Self { store }
    }

    // ─── Assignment ─────────────────────────────────────────────────

    /// Subscribe a customer to an Active plan.
    pub fn assign_plan(&self, input: AssignPlan) -> EntlResult<Arc<Subscription>> {
        let customer_name = input.customer_name.trim().to_string();
        if customer_name.is_empty() {
            return Err(EntlError::validation("customer name must not be blank"));
        }

        let view = self.store.snapshot();
        let record = view.plan(&input.plan_id)?;
        let plan = &record.plan;
        if !plan.status.is_assignable() {
            return Err(EntlError::validation(format!(
                "plan {} is {} and cannot be assigned",
                plan.id, plan.status
            )));
        }

        let end_date = term_end(plan, input.start_date, input.billing_cycle)?;
        let status = if plan.plan_type == PlanType::Trial {
            SubscriptionStatus::Trial
        } else {
            SubscriptionStatus::Active
        };

        let subscription = Subscription::open(SubscriptionTerms {
            id: input.subscription_id.unwrap_or_else(SubscriptionId::generate),
            customer_id: input.customer_id,
            customer_name,
            plan_id: input.plan_id,
            start_date: input.start_date,
            end_date,
            billing_cycle: input.billing_cycle,
            status,
            auto_renew: input
                .auto_renew
                .unwrap_or(plan.renewal == RenewalMode::Auto),
            billing_contact: input.billing_contact,
            direct_debit: input.direct_debit,
            custom_domain: input.custom_domain,
        })?;

        // The store re-checks the plan at commit time.
        self.store.insert_subscription(subscription)
    }

    // ─── Overrides ──────────────────────────────────────────────────

    /// Set a module-level override. Enabling is only possible for modules
    /// the plan includes; it never widens access.
    pub fn set_module_override(
        &self,
        id: &SubscriptionId,
        module: &ModuleId,
        enabled: bool,
    ) -> EntlResult<Arc<Subscription>> {
        let (_, sub) = self.store.update_subscription(id, |sub, state| {
            state.catalog().module(module)?;
            let record = state.plan(&sub.plan_id)?;
            if enabled && !record.plan.includes(module) {
                return Err(EntlError::validation(format!(
                    "plan {} does not include module {module}",
                    sub.plan_id
                )));
            }
            Ok(sub.set_override(module.clone(), enabled)?)
        })?;
        tracing::info!(subscription_id = %id, module_id = %module, enabled, "module override set");
        Ok(sub)
    }

    /// Remove an override so the module follows the plan again.
    pub fn clear_module_override(
        &self,
        id: &SubscriptionId,
        module: &ModuleId,
    ) -> EntlResult<Arc<Subscription>> {
        let (removed, sub) = self.store.update_subscription(id, |sub, state| {
            state.catalog().module(module)?;
            Ok(sub.clear_override(module)?)
        })?;
        tracing::info!(subscription_id = %id, module_id = %module, removed, "module override cleared");
        Ok(sub)
    }

    // ─── Lifecycle ──────────────────────────────────────────────────

    /// Start the next term.
    pub fn renew(&self, id: &SubscriptionId, request: RenewRequest) -> EntlResult<Arc<Subscription>> {
        let (_, sub) = self.store.update_subscription(id, |sub, state| {
            let next_start = match sub.status {
                SubscriptionStatus::Active => sub.end_date,
                SubscriptionStatus::Expired => request.as_of,
                SubscriptionStatus::Cancelled => {
                    return Err(SubscriptionError::TerminalState { state: sub.status }.into())
                }
                from => {
                    return Err(SubscriptionError::InvalidTransition {
                        from,
                        to: SubscriptionStatus::Active,
                    }
                    .into())
                }
            };
            if !request.explicit && !sub.auto_renew {
                return Err(EntlError::InvalidState(format!(
                    "subscription {} does not auto-renew",
                    sub.id
                )));
            }
            let record = state.plan(&sub.plan_id)?;
            if record.plan.renewal == RenewalMode::None {
                return Err(EntlError::InvalidState(format!(
                    "plan {} cannot be renewed",
                    record.plan.id
                )));
            }
            let next_end = term_end(&record.plan, next_start, sub.billing_cycle)?;
            let reason = if request.explicit { "renewed" } else { "auto-renewed" };
            Ok(sub.renew(next_start, next_end, TransitionEvidence::new(reason))?)
        })?;
        tracing::info!(
            subscription_id = %id,
            start_date = %sub.start_date,
            end_date = %sub.end_date,
            "subscription renewed"
        );
        Ok(sub)
    }

    pub fn cancel(&self, id: &SubscriptionId, evidence: TransitionEvidence) -> EntlResult<Arc<Subscription>> {
        self.transition(id, "cancelled", |sub| sub.cancel(evidence))
    }

    pub fn suspend(&self, id: &SubscriptionId, evidence: TransitionEvidence) -> EntlResult<Arc<Subscription>> {
        self.transition(id, "suspended", |sub| sub.suspend(evidence))
    }

    pub fn resume(&self, id: &SubscriptionId, evidence: TransitionEvidence) -> EntlResult<Arc<Subscription>> {
        self.transition(id, "resumed", |sub| sub.resume(evidence))
    }

    /// Convert a trial into a paid subscription.
    pub fn activate(&self, id: &SubscriptionId, evidence: TransitionEvidence) -> EntlResult<Arc<Subscription>> {
        self.transition(id, "activated", |sub| sub.activate(evidence))
    }

    fn transition(
        &self,
        id: &SubscriptionId,
        verb: &'static str,
        f: impl FnOnce(&mut Subscription) -> Result<(), SubscriptionError>,
    ) -> EntlResult<Arc<Subscription>> {
        match self.store.update_subscription(id, |sub, _| Ok(f(sub)?)) {
            Ok((_, sub)) => {
                tracing::info!(subscription_id = %id, status = %sub.status, "subscription {verb}");
                Ok(sub)
            }
            Err(err) => {
                tracing::debug!(subscription_id = %id, error = %err, "subscription transition rejected");
                Err(err)
            }
        }
    }

    /// Expire every Active or Trial subscription whose term has ended as
    /// of `as_of`. Returns the ids that changed.
    pub fn expire_due(&self, as_of: NaiveDate) -> EntlResult<Vec<SubscriptionId>> {
        let expired = self.store.update_subscriptions(|sub| {
            if !sub.is_due(as_of) {
                return Ok(false);
            }
            sub.expire(TransitionEvidence::new(format!("term ended {}", sub.end_date)))?;
            Ok(true)
        })?;
        tracing::info!(as_of = %as_of, count = expired.len(), "expiry sweep complete");
        Ok(expired)
    }

    // ─── Plan Changes ───────────────────────────────────────────────

    /// Move a subscription to another plan.
    pub fn change_plan(&self, id: &SubscriptionId, new_plan: &PlanId) -> EntlResult<Arc<Subscription>> {
        let (from, sub) = self.store.update_subscription(id, |sub, state| {
            let current = &state.plan(&sub.plan_id)?.plan;
            let next = &state.plan(new_plan)?.plan;
            if current.id == next.id {
                return Err(EntlError::validation(format!(
                    "subscription {} is already on plan {}",
                    sub.id, next.id
                )));
            }
            if !next.status.is_assignable() {
                return Err(EntlError::validation(format!(
                    "plan {} is {} and cannot be assigned",
                    next.id, next.status
                )));
            }
            match next.price.rank_cmp(&current.price) {
                Ordering::Greater if !current.upgrade_allowed => {
                    return Err(EntlError::validation(format!(
                        "plan {} does not allow upgrades",
                        current.id
                    )));
                }
                Ordering::Less if !current.downgrade_allowed => {
                    return Err(EntlError::validation(format!(
                        "plan {} does not allow downgrades",
                        current.id
                    )));
                }
                _ => {}
            }
            let from = sub.plan_id.clone();
            sub.rebind(next.id.clone(), |m| next.includes(m))?;
            Ok(from)
        })?;
        tracing::info!(subscription_id = %id, from = %from, to = %new_plan, "subscription plan changed");
        Ok(sub)
    }
}
