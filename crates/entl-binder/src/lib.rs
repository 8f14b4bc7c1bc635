//! # entl-binder — Subscription Binder
//!
//! Assigns plans to customers and runs the subscription lifecycle against
//! an [`entl_store::EntitlementStore`]: term computation, module
//! overrides, renewal, suspension and cancellation, the expiry sweep and
//! plan changes.
//!
//! Nothing runs on a timer. Expiry happens when [`SubscriptionBinder::expire_due`]
//! is called.

pub mod binder;
pub mod term;

pub use binder::{AssignPlan, RenewRequest, SubscriptionBinder};
pub use term::term_end;
