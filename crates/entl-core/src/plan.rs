//! # Subscription Plans
//!
//! A plan is a named bundle of included modules with pricing, validity,
//! user limits and lifecycle flags. Permission grants and role assignments
//! hang off the plan but are stored beside it, not inside it (see
//! `entl-store::PlanRecord`).
//!
//! Money is integer minor units. `Price::Custom` and `Validity::Custom`
//! model negotiated enterprise terms: a custom validity still carries a
//! length in days so subscription terms can be computed.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::catalog::validate_name;
use crate::error::EntlError;
use crate::identity::{ModuleId, PlanId};
use crate::temporal::{BillingCycle, Timestamp};

// ─── Enumerations ───────────────────────────────────────────────────

/// Commercial shape of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum PlanType {
    Trial,
    Monthly,
    Yearly,
    Enterprise,
}

impl PlanType {
    /// The billing period of a recurring plan. Trial and Enterprise terms
    /// run for the plan's validity instead.
    pub fn billing_period(&self) -> Option<BillingCycle> {
        match self {
            Self::Monthly => Some(BillingCycle::Monthly),
            Self::Yearly => Some(BillingCycle::Yearly),
            Self::Trial | Self::Enterprise => None,
        }
    }

    pub fn is_recurring(&self) -> bool {
        self.billing_period().is_some()
    }
}

impl std::fmt::Display for PlanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Trial => "Trial",
            Self::Monthly => "Monthly",
            Self::Yearly => "Yearly",
            Self::Enterprise => "Enterprise",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for PlanType {
    type Err = EntlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trial" => Ok(Self::Trial),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            "enterprise" => Ok(Self::Enterprise),
            _ => Err(EntlError::validation(format!("unknown plan type {s:?}"))),
        }
    }
}

/// Publication status of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum PlanStatus {
    Active,
    Draft,
    Archived,
}

impl PlanStatus {
    /// Only active plans can be assigned to new subscriptions.
    pub fn is_assignable(&self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Draft => "Draft",
            Self::Archived => "Archived",
        }
    }
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PlanStatus {
    type Err = EntlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "draft" => Ok(Self::Draft),
            "archived" => Ok(Self::Archived),
            _ => Err(EntlError::validation(format!("unknown plan status {s:?}"))),
        }
    }
}

/// Whether subscriptions on the plan renew on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum RenewalMode {
    Auto,
    Manual,
    /// The plan cannot be renewed at all.
    None,
}

// ─── Price & Validity ───────────────────────────────────────────────

/// List price of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Price {
    /// Fixed price in minor units (cents) of an ISO 4217 currency.
    Amount { minor_units: u64, currency: String },
    /// Negotiated per customer.
    Custom,
}

impl Price {
    pub fn usd(minor_units: u64) -> Self {
        Self::Amount {
            minor_units,
            currency: "USD".to_string(),
        }
    }

    /// Fixed amount in minor units, `None` for custom pricing.
    pub fn fixed_minor_units(&self) -> Option<u64> {
        match self {
            Self::Amount { minor_units, .. } => Some(*minor_units),
            Self::Custom => None,
        }
    }

    /// Order two prices for upgrade/downgrade decisions. Custom ranks
    /// above every fixed amount; two custom prices are equal.
    pub fn rank_cmp(&self, other: &Price) -> Ordering {
        match (self.fixed_minor_units(), other.fixed_minor_units()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    fn validate(&self) -> Result<(), EntlError> {
        if let Self::Amount { currency, .. } = self {
            if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
                return Err(EntlError::validation(format!(
                    "currency {currency:?} is not a three-letter ISO code"
                )));
            }
        }
        Ok(())
    }
}

/// How long one term of the plan lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum Validity {
    Days(u32),
    /// Negotiated term, still expressed in days.
    Custom(u32),
}

impl Validity {
    pub fn days(&self) -> u32 {
        match self {
            Self::Days(d) | Self::Custom(d) => *d,
        }
    }

    fn validate(&self) -> Result<(), EntlError> {
        if self.days() == 0 {
            return Err(EntlError::validation("validity must be at least one day"));
        }
        Ok(())
    }
}

/// Seat and company limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PlanLimits {
    pub user_limit: u32,
    #[serde(default)]
    pub external_user_limit: u32,
    pub company_limit: u32,
}

impl PlanLimits {
    fn validate(&self) -> Result<(), EntlError> {
        if self.user_limit == 0 {
            return Err(EntlError::validation("user limit must be at least 1"));
        }
        if self.company_limit == 0 {
            return Err(EntlError::validation("company limit must be at least 1"));
        }
        Ok(())
    }
}

// ─── Plan ───────────────────────────────────────────────────────────

/// A subscription plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Plan {
    pub id: PlanId,
    pub name: String,
    pub plan_type: PlanType,
    pub price: Price,
    pub validity: Validity,
    pub limits: PlanLimits,
    pub upgrade_allowed: bool,
    pub downgrade_allowed: bool,
    pub renewal: RenewalMode,
    pub status: PlanStatus,
    /// Modules the plan includes. A module outside this set grants nothing.
    pub modules: BTreeSet<ModuleId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Plan {
    pub fn includes(&self, module: &ModuleId) -> bool {
        self.modules.contains(module)
    }

    /// Re-check field invariants. Module existence is checked by the store.
    pub fn validate(&self) -> Result<(), EntlError> {
        validate_name("plan", &self.name)?;
        self.price.validate()?;
        self.validity.validate()?;
        self.limits.validate()
    }
}

fn default_true() -> bool {
    true
}

fn default_renewal() -> RenewalMode {
    RenewalMode::Manual
}

fn default_status() -> PlanStatus {
    PlanStatus::Draft
}

/// Input for creating a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewPlan {
    pub id: PlanId,
    pub name: String,
    pub plan_type: PlanType,
    pub price: Price,
    pub validity: Validity,
    pub limits: PlanLimits,
    #[serde(default = "default_true")]
    pub upgrade_allowed: bool,
    #[serde(default = "default_true")]
    pub downgrade_allowed: bool,
    #[serde(default = "default_renewal")]
    pub renewal: RenewalMode,
    #[serde(default = "default_status")]
    pub status: PlanStatus,
    #[serde(default)]
    pub modules: BTreeSet<ModuleId>,
}

impl NewPlan {
    /// Validate and stamp the plan.
    pub fn into_plan(self, now: Timestamp) -> Result<Plan, EntlError> {
        let plan = Plan {
            id: self.id,
            name: self.name.trim().to_string(),
            plan_type: self.plan_type,
            price: self.price,
            validity: self.validity,
            limits: self.limits,
            upgrade_allowed: self.upgrade_allowed,
            downgrade_allowed: self.downgrade_allowed,
            renewal: self.renewal,
            status: self.status,
            modules: self.modules,
            created_at: now,
            updated_at: now,
        };
        plan.validate()?;
        Ok(plan)
    }
}

/// Partial update of a plan. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PlanUpdate {
    pub name: Option<String>,
    pub plan_type: Option<PlanType>,
    pub price: Option<Price>,
    pub validity: Option<Validity>,
    pub limits: Option<PlanLimits>,
    pub upgrade_allowed: Option<bool>,
    pub downgrade_allowed: Option<bool>,
    pub renewal: Option<RenewalMode>,
    pub status: Option<PlanStatus>,
    pub modules: Option<BTreeSet<ModuleId>>,
}

impl PlanUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply onto a copy of `plan`, validating the result.
    pub fn apply(self, plan: &Plan, now: Timestamp) -> Result<Plan, EntlError> {
        let mut next = plan.clone();
        if let Some(name) = self.name {
            next.name = name.trim().to_string();
        }
        if let Some(v) = self.plan_type {
            next.plan_type = v;
        }
        if let Some(v) = self.price {
            next.price = v;
        }
        if let Some(v) = self.validity {
            next.validity = v;
        }
        if let Some(v) = self.limits {
            next.limits = v;
        }
        if let Some(v) = self.upgrade_allowed {
            next.upgrade_allowed = v;
        }
        if let Some(v) = self.downgrade_allowed {
            next.downgrade_allowed = v;
        }
        if let Some(v) = self.renewal {
            next.renewal = v;
        }
        if let Some(v) = self.status {
            next.status = v;
        }
        if let Some(v) = self.modules {
            next.modules = v;
        }
        next.validate()?;
        next.updated_at = now;
        Ok(next)
    }
}
