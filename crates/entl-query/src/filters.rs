//! Listing filters. Every field is optional; set fields are ANDed.

use serde::Deserialize;

use entl_core::{BillingCycle, PlanId, PlanStatus, PlanType};
use entl_state::{Subscription, SubscriptionStatus};
use entl_store::{Catalog, PlanRecord};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct PlanFilter {
    pub status: Option<PlanStatus>,
    pub plan_type: Option<PlanType>,
    /// Case-insensitive match on plan id, plan name or the name of any
    /// included module.
    pub search: Option<String>,
}

impl PlanFilter {
    pub fn matches(&self, record: &PlanRecord, catalog: &Catalog) -> bool {
        let plan = &record.plan;
        if self.status.is_some_and(|s| s != plan.status) {
            return false;
        }
        if self.plan_type.is_some_and(|t| t != plan.plan_type) {
            return false;
        }
        match needle(self.search.as_deref()) {
            None => true,
            Some(needle) => {
                contains(plan.id.as_str(), &needle)
                    || contains(&plan.name, &needle)
                    || plan.modules.iter().any(|m| {
                        catalog
                            .modules
                            .get(m)
                            .is_some_and(|module| contains(&module.name, &needle))
                    })
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct SubscriptionFilter {
    pub status: Option<SubscriptionStatus>,
    pub plan_id: Option<PlanId>,
    pub billing_cycle: Option<BillingCycle>,
    /// Case-insensitive match on customer id or customer name.
    pub customer: Option<String>,
}

impl SubscriptionFilter {
    pub fn matches(&self, sub: &Subscription) -> bool {
        if self.status.is_some_and(|s| s != sub.status) {
            return false;
        }
        if self.plan_id.as_ref().is_some_and(|p| p != &sub.plan_id) {
            return false;
        }
        if self.billing_cycle.is_some_and(|c| c != sub.billing_cycle) {
            return false;
        }
        match needle(self.customer.as_deref()) {
            None => true,
            Some(needle) => {
                contains(sub.customer_id.as_str(), &needle) || contains(&sub.customer_name, &needle)
            }
        }
    }
}

/// Lowercased search term; blank terms match everything.
fn needle(term: Option<&str>) -> Option<String> {
    term.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}
