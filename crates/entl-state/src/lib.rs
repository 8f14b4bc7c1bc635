//! # entl-state — Subscription Lifecycle
//!
//! The subscription record and its status state machine:
//! `Trial → Active ⇄ Suspended`, `Active/Trial → Expired`,
//! `Active/Expired → Active` (renew), any non-terminal `→ Cancelled`.
//!
//! Every transition is validated against the current status and appended
//! to the subscription's transition log. Illegal transitions return
//! [`SubscriptionError`], which converts into
//! [`entl_core::EntlError::InvalidState`].
//!
//! Date arithmetic for new terms lives in `entl-binder`; this crate only
//! enforces which transitions are legal.

pub mod subscription;

pub use subscription::{
    Subscription, SubscriptionError, SubscriptionStatus, SubscriptionTerms, TransitionEvidence,
    TransitionRecord,
};
