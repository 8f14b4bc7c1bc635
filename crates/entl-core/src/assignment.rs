//! # Module Role Assignments
//!
//! How a plan grants a role within one module. Single-role modules carry
//! one role for the whole module. Branch-role modules carry one row per
//! branch with its own role, an `enabled` switch and an `is_default` flag.
//!
//! ## Invariants (branch-role)
//!
//! - At most one row per branch.
//! - At most one row has `is_default = true`, and that row is enabled.
//! - An enabled row names a role.
//!
//! Upserting a single row with `is_default = true` moves the default onto
//! that row; the previous default is cleared in the same step. Replacing the
//! whole row set with a batch that carries two defaults is rejected.

use serde::{Deserialize, Serialize};

use crate::catalog::GrantType;
use crate::error::EntlError;
use crate::identity::{BranchId, Role};

/// One branch row of a branch-role module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BranchRoleRow {
    pub branch_id: BranchId,
    /// Unset while the branch is not enabled.
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub is_default: bool,
}

impl BranchRoleRow {
    pub fn enabled(branch_id: BranchId, role: Role) -> Self {
        Self {
            branch_id,
            role: Some(role),
            enabled: true,
            is_default: false,
        }
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    fn validate(&self) -> Result<(), EntlError> {
        if self.enabled && self.role.is_none() {
            return Err(EntlError::validation(format!(
                "enabled branch {} must name a role",
                self.branch_id
            )));
        }
        if self.is_default && !self.enabled {
            return Err(EntlError::validation(format!(
                "default branch {} must be enabled",
                self.branch_id
            )));
        }
        Ok(())
    }
}

/// The role configuration of one module within one plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModuleRoleAssignment {
    SingleRole { role: Role },
    /// Rows are kept sorted by branch id.
    BranchRole { branches: Vec<BranchRoleRow> },
}

/// A requested change to a module's role assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoleAssignmentInput {
    /// Set the role of a single-role module.
    Single { role: Role },
    /// Insert or replace one branch row.
    BranchRow { row: BranchRoleRow },
    /// Replace every branch row.
    Branches { rows: Vec<BranchRoleRow> },
}

impl ModuleRoleAssignment {
    pub fn grant_type(&self) -> GrantType {
        match self {
            Self::SingleRole { .. } => GrantType::SingleRole,
            Self::BranchRole { .. } => GrantType::BranchRole,
        }
    }

    /// Rows of a branch-role assignment; empty for single-role.
    pub fn rows(&self) -> &[BranchRoleRow] {
        match self {
            Self::SingleRole { .. } => &[],
            Self::BranchRole { branches } => branches,
        }
    }

    pub fn row(&self, branch: &BranchId) -> Option<&BranchRoleRow> {
        self.rows().iter().find(|r| &r.branch_id == branch)
    }

    pub fn default_branch(&self) -> Option<&BranchId> {
        self.rows()
            .iter()
            .find(|r| r.is_default)
            .map(|r| &r.branch_id)
    }

    /// Check every invariant of the assignment.
    pub fn validate(&self) -> Result<(), EntlError> {
        let Self::BranchRole { branches } = self else {
            return Ok(());
        };
        let mut defaults = 0usize;
        for (i, row) in branches.iter().enumerate() {
            row.validate()?;
            if branches[..i].iter().any(|r| r.branch_id == row.branch_id) {
                return Err(EntlError::validation(format!(
                    "branch {} listed more than once",
                    row.branch_id
                )));
            }
            if row.is_default {
                defaults += 1;
            }
        }
        if defaults > 1 {
            return Err(EntlError::validation(
                "at most one branch may be the default",
            ));
        }
        Ok(())
    }

    /// Compute the assignment that results from applying `input` to
    /// `current` for a module of `grant_type`.
    pub fn apply(
        current: Option<&ModuleRoleAssignment>,
        grant_type: GrantType,
        input: RoleAssignmentInput,
    ) -> Result<ModuleRoleAssignment, EntlError> {
        let next = match (grant_type, input) {
            (GrantType::SingleRole, RoleAssignmentInput::Single { role }) => {
                Self::SingleRole { role }
            }
            (GrantType::BranchRole, RoleAssignmentInput::BranchRow { row }) => {
                let mut branches = current.map(|a| a.rows().to_vec()).unwrap_or_default();
                if row.is_default {
                    for existing in branches.iter_mut() {
                        existing.is_default = false;
                    }
                }
                match branches.iter_mut().find(|r| r.branch_id == row.branch_id) {
                    Some(slot) => *slot = row,
                    None => branches.push(row),
                }
                branches.sort_by(|a, b| a.branch_id.cmp(&b.branch_id));
                Self::BranchRole { branches }
            }
            (GrantType::BranchRole, RoleAssignmentInput::Branches { mut rows }) => {
                rows.sort_by(|a, b| a.branch_id.cmp(&b.branch_id));
                Self::BranchRole { branches: rows }
            }
            (grant_type, _) => {
                return Err(EntlError::validation(format!(
                    "assignment kind does not match {grant_type} module"
                )));
            }
        };
        next.validate()?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn branch(id: &str) -> BranchId {
        BranchId::new(id).unwrap()
    }

    fn role(name: &str) -> Role {
        Role::new(name).unwrap()
    }

    fn abc_default() -> ModuleRoleAssignment {
        ModuleRoleAssignment::apply(
            None,
            GrantType::BranchRole,
            RoleAssignmentInput::BranchRow {
                row: BranchRoleRow::enabled(branch("b5"), role("Company Admin")).as_default(),
            },
        )
        .unwrap()
    }

    #[test]
    fn single_role_for_single_module() {
        let a = ModuleRoleAssignment::apply(
            None,
            GrantType::SingleRole,
            RoleAssignmentInput::Single {
                role: role("Project User"),
            },
        )
        .unwrap();
        assert_eq!(a.grant_type(), GrantType::SingleRole);
        assert!(a.rows().is_empty());
    }

    #[test]
    fn kind_mismatch_rejected() {
        let err = ModuleRoleAssignment::apply(
            None,
            GrantType::BranchRole,
            RoleAssignmentInput::Single { role: role("Admin") },
        )
        .unwrap_err();
        assert!(matches!(err, EntlError::Validation(_)));
    }

    #[test]
    fn new_default_overwrites_previous() {
        let current = abc_default();
        let next = ModuleRoleAssignment::apply(
            Some(&current),
            GrantType::BranchRole,
            RoleAssignmentInput::BranchRow {
                row: BranchRoleRow::enabled(branch("b1"), role("Manager")).as_default(),
            },
        )
        .unwrap();
        assert_eq!(next.default_branch(), Some(&branch("b1")));
        assert_eq!(next.rows().len(), 2);
        assert!(!next.row(&branch("b5")).unwrap().is_default);
        assert!(next.row(&branch("b5")).unwrap().enabled);
    }

    #[test]
    fn batch_with_two_defaults_rejected() {
        let rows = vec![
            BranchRoleRow::enabled(branch("b1"), role("Manager")).as_default(),
            BranchRoleRow::enabled(branch("b2"), role("Manager")).as_default(),
        ];
        let err = ModuleRoleAssignment::apply(
            None,
            GrantType::BranchRole,
            RoleAssignmentInput::Branches { rows },
        )
        .unwrap_err();
        assert!(matches!(err, EntlError::Validation(_)));
    }

    #[test]
    fn disabled_default_rejected() {
        let row = BranchRoleRow {
            branch_id: branch("b2"),
            role: Some(role("Manager")),
            enabled: false,
            is_default: true,
        };
        assert!(ModuleRoleAssignment::apply(
            None,
            GrantType::BranchRole,
            RoleAssignmentInput::BranchRow { row }
        )
        .is_err());
    }

    #[test]
    fn enabled_row_without_role_rejected() {
        let row = BranchRoleRow {
            branch_id: branch("b2"),
            role: None,
            enabled: true,
            is_default: false,
        };
        assert!(ModuleRoleAssignment::apply(
            None,
            GrantType::BranchRole,
            RoleAssignmentInput::BranchRow { row }
        )
        .is_err());
    }

    #[test]
    fn duplicate_branch_in_batch_rejected() {
        let rows = vec![
            BranchRoleRow::enabled(branch("b1"), role("Manager")),
            BranchRoleRow::enabled(branch("b1"), role("Viewer")),
        ];
        assert!(ModuleRoleAssignment::apply(
            None,
            GrantType::BranchRole,
            RoleAssignmentInput::Branches { rows }
        )
        .is_err());
    }

    #[test]
    fn input_deserializes_from_tagged_json() {
        let input: RoleAssignmentInput = serde_json::from_value(serde_json::json!({
            "kind": "branch_row",
            "row": {
                "branch_id": "b5",
                "role": "Company Admin",
                "enabled": true,
                "is_default": true
            }
        }))
        .unwrap();
        assert!(matches!(input, RoleAssignmentInput::BranchRow { ref row } if row.is_default));
    }

    proptest! {
        #[test]
        fn at_most_one_default_under_arbitrary_toggles(
            ops in proptest::collection::vec((0usize..5, any::<bool>(), any::<bool>()), 1..40)
        ) {
            let mut current: Option<ModuleRoleAssignment> = None;
            for (idx, enabled, is_default) in ops {
                let row = BranchRoleRow {
                    branch_id: branch(&format!("b{}", idx + 1)),
                    role: Some(role("Manager")),
                    enabled,
                    is_default,
                };
                match ModuleRoleAssignment::apply(
                    current.as_ref(),
                    GrantType::BranchRole,
                    RoleAssignmentInput::BranchRow { row },
                ) {
                    Ok(next) => current = Some(next),
                    Err(_) => prop_assert!(is_default && !enabled),
                }
                if let Some(a) = &current {
                    let defaults = a.rows().iter().filter(|r| r.is_default).count();
                    prop_assert!(defaults <= 1);
                    prop_assert!(a.rows().iter().all(|r| !r.is_default || r.enabled));
                }
            }
        }
    }
}
