//! # entl-matrix — Matrix Resolver
//!
//! Pure functions over a [`entl_store::StoreView`]:
//!
//! - [`resolve`] / [`check`]: effective role and flags of one module
//!   under one plan.
//! - [`effective_matrix`]: every module of the catalog at once, with a
//!   content digest that versions the matrix.
//! - [`subscription_access`] / [`subscription_check`]: a plan resolution
//!   narrowed by a subscription's status and module overrides.
//!
//! Nothing here writes to the store. Callers take a snapshot once and run
//! every lookup of a request against it.

pub mod access;
pub mod matrix;
pub mod resolver;

pub use access::{subscription_access, subscription_check, AccessMask, SubscriptionAccess};
pub use matrix::{canonical_digest, effective_matrix, BranchScope, EffectiveMatrix, ModuleMatrix};
pub use resolver::{check, resolve, FeaturePermissions, ModuleState, Resolution};

#[cfg(test)]
mod proptests {
    use super::*;
    use entl_core::{Action, FeatureId, PlanId};
    use entl_store::{demo_snapshot, EntitlementStore};
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Clearing any set of grants on the all-access plan denies every
        /// action on exactly those features.
        #[test]
        fn missing_grant_denies_everything(mask in proptest::collection::vec(any::<bool>(), 14)) {
            let store = EntitlementStore::import(demo_snapshot().unwrap()).unwrap();
            let plan = PlanId::new("PLN-003").unwrap();
            let features: Vec<FeatureId> =
                store.snapshot().catalog().features.keys().cloned().collect();
            prop_assert_eq!(features.len(), mask.len());

            for (feature, clear) in features.iter().zip(&mask) {
                if *clear {
                    store.clear_permission_grant(&plan, feature).unwrap();
                }
            }

            let view = store.snapshot();
            let b5 = entl_core::BranchId::new("b5").unwrap();
            for (feature, cleared) in features.iter().zip(&mask) {
                for action in Action::ALL {
                    let allowed = check(&view, &plan, feature, Some(&b5), action).unwrap();
                    prop_assert_eq!(allowed, !cleared);
                }
            }
        }
    }
}
