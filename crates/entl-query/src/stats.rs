//! Console statistics: the cards above the plan and subscription tables.

use serde::Serialize;

use entl_core::{PlanId, PlanStatus};
use entl_state::SubscriptionStatus;
use entl_store::StoreView;

/// Aggregate figures over Active plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PlanStats {
    pub total_plans: usize,
    /// Plans in Active status.
    pub active_tiers: usize,
    /// Mean fixed price of Active plans in minor units, rounded down.
    /// Custom-priced plans are left out; unset when none has a fixed price.
    pub average_price_minor_units: Option<u64>,
    /// Sum of `user_limit` over Active plans.
    pub total_user_seats: u64,
}

/// Subscriptions per plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PlanShare {
    pub plan_id: PlanId,
    pub plan_name: String,
    pub subscriptions: usize,
    /// Active, Trial or Suspended.
    pub live: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StatusCount {
    pub status: SubscriptionStatus,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SubscriptionStats {
    pub total: usize,
    pub by_status: Vec<StatusCount>,
    pub by_plan: Vec<PlanShare>,
}

pub fn plan_stats(view: &StoreView) -> PlanStats {
    let active: Vec<_> = view
        .plans()
        .map(|record| &record.plan)
        .filter(|plan| plan.status == PlanStatus::Active)
        .collect();
    let prices: Vec<u64> = active
        .iter()
        .filter_map(|plan| plan.price.fixed_minor_units())
        .collect();
    // Summed wide: client-supplied prices may add up past u64::MAX.
    let average_price_minor_units = match prices.len() as u128 {
        0 => None,
        n => u64::try_from(prices.iter().map(|&p| u128::from(p)).sum::<u128>() / n).ok(),
    };
    PlanStats {
        total_plans: view.plans().count(),
        active_tiers: active.len(),
        average_price_minor_units,
        total_user_seats: active.iter().map(|p| u64::from(p.limits.user_limit)).sum(),
    }
}

/// Subscriptions per plan, for every plan including those with none.
pub fn plan_distribution(view: &StoreView) -> Vec<PlanShare> {
    view.plans()
        .map(|record| {
            let subs = view.subscriptions().filter(|s| s.plan_id == record.plan.id);
            let (subscriptions, live) = subs.fold((0, 0), |(all, live), s| {
                (all + 1, live + usize::from(s.status.is_live()))
            });
            PlanShare {
                plan_id: record.plan.id.clone(),
                plan_name: record.plan.name.clone(),
                subscriptions,
                live,
            }
        })
        .collect()
}

/// Count per status, every status listed.
pub fn subscription_status_counts(view: &StoreView) -> Vec<StatusCount> {
    SubscriptionStatus::ALL
        .into_iter()
        .map(|status| StatusCount {
            status,
            count: view.subscriptions().filter(|s| s.status == status).count(),
        })
        .collect()
}

pub fn subscription_stats(view: &StoreView) -> SubscriptionStats {
    SubscriptionStats {
        total: view.subscriptions().count(),
        by_status: subscription_status_counts(view),
        by_plan: plan_distribution(view),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entl_core::{PlanUpdate, Price};
    use entl_store::{demo_snapshot, ArchiveMode, EntitlementStore};

    fn store() -> EntitlementStore {
        EntitlementStore::import(demo_snapshot().unwrap()).unwrap()
    }

    #[test]
    fn demo_plan_stats() {
        let store = store();
        let stats = plan_stats(&store.snapshot());
        assert_eq!(stats.total_plans, 4);
        assert_eq!(stats.active_tiers, 4);
        // (9900 + 99900 + 0) / 3; Enterprise Plus is custom-priced.
        assert_eq!(stats.average_price_minor_units, Some(36600));
        assert_eq!(stats.total_user_seats, 5 + 50 + 500 + 3);
    }

    #[test]
    fn archived_plans_leave_the_active_figures() {
        let store = store();
        store
            .archive_plan(&PlanId::new("PLN-002").unwrap(), ArchiveMode::Archive)
            .unwrap();
        let stats = plan_stats(&store.snapshot());
        assert_eq!(stats.total_plans, 4);
        assert_eq!(stats.active_tiers, 3);
        assert_eq!(stats.average_price_minor_units, Some(4950));
        assert_eq!(stats.total_user_seats, 508);
    }

    #[test]
    fn average_price_handles_prices_near_u64_max() {
        let store = store();
        let huge = u64::MAX / 2 + 1;
        for id in ["PLN-001", "PLN-002"] {
            store
                .update_plan(
                    &PlanId::new(id).unwrap(),
                    PlanUpdate {
                        price: Some(Price::usd(huge)),
                        ..Default::default()
                    },
                )
                .unwrap();
        }
        let stats = plan_stats(&store.snapshot());
        // Two huge prices plus the free trial.
        let expected = ((u128::from(huge) * 2) / 3) as u64;
        assert_eq!(stats.average_price_minor_units, Some(expected));
    }

    #[test]
    fn empty_store_has_no_average() {
        let store = EntitlementStore::new();
        let stats = plan_stats(&store.snapshot());
        assert_eq!(stats.average_price_minor_units, None);
        assert_eq!(stats.total_user_seats, 0);
    }

    #[test]
    fn distribution_and_status_counts() {
        let store = store();
        let stats = subscription_stats(&store.snapshot());
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_status.len(), 5);
        let count = |status: SubscriptionStatus| {
            stats
                .by_status
                .iter()
                .find(|c| c.status == status)
                .map(|c| c.count)
        };
        assert_eq!(count(SubscriptionStatus::Active), Some(1));
        assert_eq!(count(SubscriptionStatus::Trial), Some(1));
        assert_eq!(count(SubscriptionStatus::Expired), Some(1));
        assert_eq!(count(SubscriptionStatus::Cancelled), Some(0));

        let pln1 = &stats.by_plan[0];
        assert_eq!(pln1.plan_id.as_str(), "PLN-001");
        assert_eq!((pln1.subscriptions, pln1.live), (1, 0));
        assert_eq!(stats.by_plan[3].subscriptions, 0);
    }
}
