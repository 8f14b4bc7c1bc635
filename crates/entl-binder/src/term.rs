//! Subscription term arithmetic.
//!
//! Terms are half-open: `end_date` is the first day no longer covered.
//! Trial and Enterprise plans run for the plan's validity in days;
//! Monthly and Yearly plans run one calendar billing period, clamped to the
//! end of shorter months (Jan 31 + 1 month = Feb 29 in a leap year).

use chrono::NaiveDate;

use entl_core::{add_days, BillingCycle, EntlResult, Plan, PlanType};

/// End date of a term on `plan` starting at `start`.
pub fn term_end(plan: &Plan, start: NaiveDate, cycle: BillingCycle) -> EntlResult<NaiveDate> {
    match plan.plan_type {
        PlanType::Trial | PlanType::Enterprise => add_days(start, plan.validity.days()),
        PlanType::Monthly | PlanType::Yearly => cycle.advance(start),
    }
}
