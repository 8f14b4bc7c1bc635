//! # Permission Grants
//!
//! A grant is the set of View/Create/Edit/Delete/Approve flags a plan
//! confers on one feature. Grants are explicit per `(plan, feature)` and
//! never inherited; a pair without a grant resolves to [`PermissionFlags::DENY_ALL`].
//!
//! ## Invariant
//!
//! `delete ⇒ view`. A grant that allows deleting records the holder cannot
//! see is rejected at construction.

use serde::{Deserialize, Serialize};

use crate::error::EntlError;
use crate::identity::{FeatureId, PlanId};

/// One of the five permissionable actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
    Approve,
}

impl Action {
    /// All actions in matrix column order.
    pub const ALL: [Action; 5] = [
        Action::View,
        Action::Create,
        Action::Edit,
        Action::Delete,
        Action::Approve,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Create => "create",
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::Approve => "approve",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Action {
    type Err = EntlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| EntlError::validation(format!("unknown action {s:?}")))
    }
}

/// The five permission flags of a grant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PermissionFlags {
    #[serde(default)]
    pub view: bool,
    #[serde(default)]
    pub create: bool,
    #[serde(default)]
    pub edit: bool,
    #[serde(default)]
    pub delete: bool,
    #[serde(default)]
    pub approve: bool,
}

impl PermissionFlags {
    /// Deny-by-default: what a missing grant resolves to.
    pub const DENY_ALL: PermissionFlags = PermissionFlags {
        view: false,
        create: false,
        edit: false,
        delete: false,
        approve: false,
    };

    /// Every action allowed.
    pub const ALLOW_ALL: PermissionFlags = PermissionFlags {
        view: true,
        create: true,
        edit: true,
        delete: true,
        approve: true,
    };

    /// Check the `delete ⇒ view` invariant.
    pub fn validate(&self) -> Result<(), EntlError> {
        if self.delete && !self.view {
            return Err(EntlError::validation(
                "delete permission requires view permission",
            ));
        }
        Ok(())
    }

    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::View => self.view,
            Action::Create => self.create,
            Action::Edit => self.edit,
            Action::Delete => self.delete,
            Action::Approve => self.approve,
        }
    }

    /// Whether any action is allowed.
    pub fn any(&self) -> bool {
        Action::ALL.into_iter().any(|a| self.allows(a))
    }

    /// Build flags from a list of allowed actions.
    pub fn from_actions(actions: &[Action]) -> Self {
        let mut flags = Self::DENY_ALL;
        for action in actions {
            match action {
                Action::View => flags.view = true,
                Action::Create => flags.create = true,
                Action::Edit => flags.edit = true,
                Action::Delete => flags.delete = true,
                Action::Approve => flags.approve = true,
            }
        }
        flags
    }
}

/// Explicit permission grant for a `(plan, feature)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PermissionGrant {
    pub plan_id: PlanId,
    pub feature_id: FeatureId,
    #[serde(flatten)]
    pub flags: PermissionFlags,
}

impl PermissionGrant {
    /// Construct a grant, enforcing `delete ⇒ view`.
    pub fn new(plan_id: PlanId, feature_id: FeatureId, flags: PermissionFlags) -> Result<Self, EntlError> {
        flags.validate().map_err(|_| {
            EntlError::validation(format!(
                "grant for feature {feature_id} in plan {plan_id}: delete permission requires view permission"
            ))
        })?;
        Ok(Self {
            plan_id,
            feature_id,
            flags,
        })
    }
}
