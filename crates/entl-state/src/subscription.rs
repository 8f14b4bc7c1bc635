//! # Subscription Lifecycle State Machine
//!
//! Models a customer's subscription to one plan, from assignment through
//! expiry or cancellation.
//!
//! ## States
//!
//! ```text
//! Trial ──▶ Active ──▶ Suspended ──▶ Active (resume)
//!   │         │  ▲          │
//!   │         │  └─ renew ──┼──── Expired ◀── (end_date passed)
//!   │         │             │
//!   └─────────┴─────────────┴──▶ Cancelled (terminal)
//! ```
//!
//! `Expired` is terminal for every transition except `renew`, which starts
//! a new term. `Cancelled` is terminal.
//!
//! Only `Active` and `Trial` subscriptions grant access. Module overrides
//! can only narrow what the plan grants; they are stored here and applied
//! by the matrix resolver.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use entl_core::{BillingCycle, CustomerId, EntlError, ModuleId, PlanId, SubscriptionId, Timestamp};

// ─── Subscription Status ────────────────────────────────────────────

/// The lifecycle status of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum SubscriptionStatus {
    /// Paid and in term.
    Active,
    /// Trial term on a trial plan.
    Trial,
    /// Term ended without renewal. Only `renew` leaves this state.
    Expired,
    /// Temporarily blocked, e.g. for non-payment.
    Suspended,
    /// Permanently ended (terminal).
    Cancelled,
}

impl SubscriptionStatus {
    pub const ALL: [SubscriptionStatus; 5] = [
        Self::Active,
        Self::Trial,
        Self::Expired,
        Self::Suspended,
        Self::Cancelled,
    ];

    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Expired | Self::Cancelled)
    }

    /// Whether a subscription in this state grants any access.
    pub fn grants_access(&self) -> bool {
        matches!(self, Self::Active | Self::Trial)
    }

    /// Live subscriptions pin their plan against hard deletion.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Active | Self::Trial | Self::Suspended)
    }

    /// Console label (`Active`, `Trial`, ...).
    pub fn label(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Trial => "Trial",
            Self::Expired => "Expired",
            Self::Suspended => "Suspended",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Active => "ACTIVE",
            Self::Trial => "TRIAL",
            Self::Expired => "EXPIRED",
            Self::Suspended => "SUSPENDED",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = EntlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|st| st.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| EntlError::validation(format!("unknown subscription status {s:?}")))
    }
}

// ─── Errors ─────────────────────────────────────────────────────────

/// Errors raised by subscription lifecycle transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// Attempted transition is not valid from the current state.
    #[error("invalid subscription transition: {from} -> {to}")]
    InvalidTransition {
        /// Current state.
        from: SubscriptionStatus,
        /// Attempted target state.
        to: SubscriptionStatus,
    },

    /// Subscription is in a terminal state.
    #[error("subscription is in terminal state {state}")]
    TerminalState {
        /// The terminal state.
        state: SubscriptionStatus,
    },

    /// A subscription can only start out Active or Trial.
    #[error("subscription cannot start in state {0}")]
    InvalidInitialState(SubscriptionStatus),
}

impl From<SubscriptionError> for EntlError {
    fn from(err: SubscriptionError) -> Self {
        EntlError::InvalidState(err.to_string())
    }
}

// ─── Transition Evidence ────────────────────────────────────────────

/// Why a transition happened and who triggered it.
#[derive(Debug, Clone, Default)]
pub struct TransitionEvidence {
    pub reason: String,
    /// Administrator or system component that triggered the transition.
    pub actor: Option<String>,
}

impl TransitionEvidence {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            actor: None,
        }
    }

    pub fn by(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }
}

/// Record of a subscription state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TransitionRecord {
    pub from_state: SubscriptionStatus,
    pub to_state: SubscriptionStatus,
    pub timestamp: Timestamp,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
}

// ─── Subscription ───────────────────────────────────────────────────

/// Fields fixed when a plan is assigned to a customer.
#[derive(Debug, Clone)]
pub struct SubscriptionTerms {
    pub id: SubscriptionId,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub plan_id: PlanId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub billing_cycle: BillingCycle,
    pub status: SubscriptionStatus,
    pub auto_renew: bool,
    pub billing_contact: Option<String>,
    pub direct_debit: bool,
    pub custom_domain: bool,
}

/// A customer's subscription to one plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Subscription {
    pub id: SubscriptionId,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub plan_id: PlanId,
    pub start_date: NaiveDate,
    /// Exclusive: the first day the subscription no longer covers.
    pub end_date: NaiveDate,
    pub billing_cycle: BillingCycle,
    pub status: SubscriptionStatus,
    pub auto_renew: bool,
    /// Per-module switches. Absent means "as the plan says"; `false`
    /// removes the module; `true` never adds one the plan lacks.
    #[serde(default)]
    pub module_overrides: BTreeMap<ModuleId, bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_contact: Option<String>,
    #[serde(default)]
    pub direct_debit: bool,
    #[serde(default)]
    pub custom_domain: bool,
    pub created_at: Timestamp,
    /// Ordered log of every status transition.
    #[serde(default)]
    pub transitions: Vec<TransitionRecord>,
}

impl Subscription {
    /// Open a new subscription in its initial state (Active or Trial).
    pub fn open(terms: SubscriptionTerms) -> Result<Self, SubscriptionError> {
        if !terms.status.grants_access() {
            return Err(SubscriptionError::InvalidInitialState(terms.status));
        }
        Ok(Self {
            id: terms.id,
            customer_id: terms.customer_id,
            customer_name: terms.customer_name,
            plan_id: terms.plan_id,
            start_date: terms.start_date,
            end_date: terms.end_date,
            billing_cycle: terms.billing_cycle,
            status: terms.status,
            auto_renew: terms.auto_renew,
            module_overrides: BTreeMap::new(),
            billing_contact: terms.billing_contact,
            direct_debit: terms.direct_debit,
            custom_domain: terms.custom_domain,
            created_at: Timestamp::now(),
            transitions: Vec::new(),
        })
    }

    /// Convert a trial into a paid subscription (TRIAL → ACTIVE).
    pub fn activate(&mut self, evidence: TransitionEvidence) -> Result<(), SubscriptionError> {
        self.require_state(&[SubscriptionStatus::Trial], SubscriptionStatus::Active)?;
        self.do_transition(SubscriptionStatus::Active, evidence);
        Ok(())
    }

    /// Suspend an active subscription (ACTIVE → SUSPENDED).
    pub fn suspend(&mut self, evidence: TransitionEvidence) -> Result<(), SubscriptionError> {
        self.require_state(&[SubscriptionStatus::Active], SubscriptionStatus::Suspended)?;
        self.do_transition(SubscriptionStatus::Suspended, evidence);
        Ok(())
    }

    /// Lift a suspension (SUSPENDED → ACTIVE).
    pub fn resume(&mut self, evidence: TransitionEvidence) -> Result<(), SubscriptionError> {
        self.require_state(&[SubscriptionStatus::Suspended], SubscriptionStatus::Active)?;
        self.do_transition(SubscriptionStatus::Active, evidence);
        Ok(())
    }

    /// Cancel from any non-terminal state.
    pub fn cancel(&mut self, evidence: TransitionEvidence) -> Result<(), SubscriptionError> {
        self.require_live()?;
        self.do_transition(SubscriptionStatus::Cancelled, evidence);
        Ok(())
    }

    /// End the term (ACTIVE or TRIAL → EXPIRED).
    pub fn expire(&mut self, evidence: TransitionEvidence) -> Result<(), SubscriptionError> {
        self.require_state(
            &[SubscriptionStatus::Active, SubscriptionStatus::Trial],
            SubscriptionStatus::Expired,
        )?;
        self.do_transition(SubscriptionStatus::Expired, evidence);
        Ok(())
    }

    /// Start a new term (ACTIVE or EXPIRED → ACTIVE).
    ///
    /// The caller computes the new term; this only moves the dates and
    /// records the transition.
    pub fn renew(
        &mut self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        evidence: TransitionEvidence,
    ) -> Result<(), SubscriptionError> {
        if !matches!(
            self.status,
            SubscriptionStatus::Active | SubscriptionStatus::Expired
        ) {
            return Err(match self.status {
                SubscriptionStatus::Cancelled => SubscriptionError::TerminalState {
                    state: self.status,
                },
                from => SubscriptionError::InvalidTransition {
                    from,
                    to: SubscriptionStatus::Active,
                },
            });
        }
        self.start_date = start_date;
        self.end_date = end_date;
        self.do_transition(SubscriptionStatus::Active, evidence);
        Ok(())
    }

    /// Move the subscription onto another plan, keeping only the
    /// overrides for modules in `retain`.
    pub fn rebind(
        &mut self,
        plan_id: PlanId,
        retain: impl Fn(&ModuleId) -> bool,
    ) -> Result<(), SubscriptionError> {
        self.require_live()?;
        self.plan_id = plan_id;
        self.module_overrides.retain(|m, _| retain(m));
        Ok(())
    }

    pub fn set_override(&mut self, module: ModuleId, enabled: bool) -> Result<(), SubscriptionError> {
        self.require_live()?;
        self.module_overrides.insert(module, enabled);
        Ok(())
    }

    /// Drop an override. Returns whether one was present.
    pub fn clear_override(&mut self, module: &ModuleId) -> Result<bool, SubscriptionError> {
        self.require_live()?;
        Ok(self.module_overrides.remove(module).is_some())
    }

    pub fn override_for(&self, module: &ModuleId) -> Option<bool> {
        self.module_overrides.get(module).copied()
    }

    /// Whether the term has ended as of `as_of` while still granting access.
    pub fn is_due(&self, as_of: NaiveDate) -> bool {
        self.status.grants_access() && self.end_date <= as_of
    }

    pub fn grants_access(&self) -> bool {
        self.status.grants_access()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn require_live(&self) -> Result<(), SubscriptionError> {
        if self.status.is_terminal() {
            return Err(SubscriptionError::TerminalState { state: self.status });
        }
        Ok(())
    }

    fn require_state(
        &self,
        allowed: &[SubscriptionStatus],
        target: SubscriptionStatus,
    ) -> Result<(), SubscriptionError> {
        self.require_live()?;
        if !allowed.contains(&self.status) {
            return Err(SubscriptionError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }
        Ok(())
    }

    fn do_transition(&mut self, to: SubscriptionStatus, evidence: TransitionEvidence) {
        self.transitions.push(TransitionRecord {
            from_state: self.status,
            to_state: to,
            timestamp: Timestamp::now(),
            reason: evidence.reason,
            actor: evidence.actor,
        });
        self.status = to;
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
