//! # Error Taxonomy
//!
//! All entitlement operations fail with one of six classes:
//!
//! - `NotFound` — a referenced id is absent.
//! - `Validation` — an invariant would be violated (delete without view,
//!   duplicate default branch, malformed field).
//! - `Conflict` — the operation collides with existing state (duplicate id,
//!   hard delete of a plan that subscriptions reference).
//! - `InvalidState` — an illegal subscription lifecycle transition.
//! - `NotConfigured` — resolution requested for a single-role module with
//!   no role assignment.
//! - `Persistence` — the write-through snapshot could not be written.
//!
//! Errors are surfaced synchronously and never retried; operations that
//! fail leave the store unchanged.

use thiserror::Error;

/// Result alias used throughout the workspace.
pub type EntlResult<T> = Result<T, EntlError>;

/// The kind of record a `NotFound` error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Plan,
    Module,
    Feature,
    Branch,
    Subscription,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Plan => "plan",
            Self::Module => "module",
            Self::Feature => "feature",
            Self::Branch => "branch",
            Self::Subscription => "subscription",
        };
        f.write_str(s)
    }
}

/// Top-level error type for entitlement operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntlError {
    /// Referenced record does not exist.
    #[error("{kind} {id} not found")]
    NotFound {
        /// What kind of record was looked up.
        kind: EntityKind,
        /// The identifier that was not found.
        id: String,
    },

    /// Invariant violation or malformed input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Illegal subscription lifecycle transition.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A single-role module has no role assignment for the plan.
    #[error("module {module_id} has no role assignment in plan {plan_id}")]
    NotConfigured {
        /// Plan the resolution was requested for.
        plan_id: String,
        /// Module lacking a role assignment.
        module_id: String,
    },

    /// The committed state could not be written to durable storage. The
    /// in-memory state is left as it was before the operation.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl EntlError {
    /// Construct a `NotFound` error for any displayable id.
    pub fn not_found(kind: EntityKind, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Construct a `Validation` error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Short machine-readable class name, used in logs.
    pub fn class(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Validation(_) => "validation",
            Self::Conflict(_) => "conflict",
            Self::InvalidState(_) => "invalid_state",
            Self::NotConfigured { .. } => "not_configured",
            Self::Persistence(_) => "persistence",
        }
    }
}
