//! # Resolution
//!
//! Answers "what role and which actions does plan P grant in module M,
//! for branch B?" against one [`StoreView`].
//!
//! ## Rules
//!
//! 1. A module not in `plan.modules` resolves to the empty resolution:
//!    no role, every feature denied.
//! 2. Single-role modules take the assignment's role. A missing assignment
//!    is `NotConfigured`. Any branch argument is ignored.
//! 3. Branch-role modules need a branch. The role is that branch row's
//!    role if the row exists and is enabled; otherwise (unknown branch,
//!    no row, disabled row) the resolution is empty. `is_default` plays
//!    no part.
//! 4. Feature flags come only from the explicit `(plan, feature)` grant.
//!    No grant means every action is denied. Nothing is inherited.

use serde::Serialize;

use entl_core::{
    Action, BranchId, EntlError, EntlResult, Feature, FeatureId, GrantType, ModuleId,
    ModuleRoleAssignment, PermissionFlags, PlanId, Role,
};
use entl_store::{PlanRecord, StoreView};

/// How a module resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ModuleState {
    /// The plan does not include the module.
    Excluded,
    /// Single-role module without a role assignment.
    Unconfigured,
    /// Branch-role module whose branch is unknown, missing or disabled.
    BranchInactive,
    /// A role applies and grants are in effect.
    Resolved,
}

impl ModuleState {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved)
    }
}

/// Effective flags for one feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FeaturePermissions {
    pub feature_id: FeatureId,
    pub feature_name: String,
    #[serde(flatten)]
    pub flags: PermissionFlags,
}

/// The outcome of resolving one `(plan, module, branch)` triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Resolution {
    pub plan_id: PlanId,
    pub module_id: ModuleId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<BranchId>,
    pub state: ModuleState,
    pub role: Option<Role>,
    /// Every catalog feature of the module, in id order.
    pub features: Vec<FeaturePermissions>,
}

impl Resolution {
    /// Flags for `feature`; deny-all if the feature is not in this module.
    pub fn flags(&self, feature: &FeatureId) -> PermissionFlags {
        self.features
            .iter()
            .find(|f| &f.feature_id == feature)
            .map(|f| f.flags)
            .unwrap_or(PermissionFlags::DENY_ALL)
    }

    pub fn allows(&self, feature: &FeatureId, action: Action) -> bool {
        self.flags(feature).allows(action)
    }

    /// Copy of this resolution with no role and every feature denied.
    pub(crate) fn denied(&self, state: ModuleState) -> Self {
        Self {
            plan_id: self.plan_id.clone(),
            module_id: self.module_id.clone(),
            branch_id: self.branch_id.clone(),
            state,
            role: None,
            features: self
                .features
                .iter()
                .map(|f| FeaturePermissions {
                    flags: PermissionFlags::DENY_ALL,
                    ..f.clone()
                })
                .collect(),
        }
    }
}

pub(crate) fn feature_flags<'a>(
    features: impl Iterator<Item = &'a Feature>,
    record: &PlanRecord,
    granted: bool,
) -> Vec<FeaturePermissions> {
    features
        .map(|f| FeaturePermissions {
            feature_id: f.id.clone(),
            feature_name: f.name.clone(),
            flags: if granted {
                record.flags(&f.id)
            } else {
                PermissionFlags::DENY_ALL
            },
        })
        .collect()
}

/// Role of a branch-role module for `branch`, if the row exists and is enabled.
pub(crate) fn branch_role<'a>(
    assignment: Option<&'a ModuleRoleAssignment>,
    branch: &BranchId,
) -> Option<&'a Role> {
    assignment
        .and_then(|a| a.row(branch))
        .filter(|row| row.enabled)
        .and_then(|row| row.role.as_ref())
}

/// Resolve the effective role and permissions of `module` under `plan`.
pub fn resolve(
    view: &StoreView,
    plan_id: &PlanId,
    module_id: &ModuleId,
    branch: Option<&BranchId>,
) -> EntlResult<Resolution> {
    let record = view.plan(plan_id)?;
    let catalog = view.catalog();
    let module = catalog.module(module_id)?;

    let outcome = |state: ModuleState, role: Option<Role>| Resolution {
        plan_id: plan_id.clone(),
        module_id: module_id.clone(),
        branch_id: match module.grant_type {
            GrantType::BranchRole => branch.cloned(),
            GrantType::SingleRole => None,
        },
        state,
        features: feature_flags(catalog.features_of(module_id), record, state.is_resolved()),
        role,
    };

    if !record.plan.includes(module_id) {
        return Ok(outcome(ModuleState::Excluded, None));
    }

    match module.grant_type {
        GrantType::SingleRole => match record.assignment(module_id) {
            Some(ModuleRoleAssignment::SingleRole { role }) => {
                Ok(outcome(ModuleState::Resolved, Some(role.clone())))
            }
            _ => Err(EntlError::NotConfigured {
                plan_id: plan_id.to_string(),
                module_id: module_id.to_string(),
            }),
        },
        GrantType::BranchRole => {
            let branch = branch.ok_or_else(|| {
                EntlError::validation(format!(
                    "module {module_id} is branch-role; a branch is required"
                ))
            })?;
            if !catalog.branches.contains_key(branch) {
                return Ok(outcome(ModuleState::BranchInactive, None));
            }
            match branch_role(record.assignment(module_id), branch) {
                Some(role) => Ok(outcome(ModuleState::Resolved, Some(role.clone()))),
                None => Ok(outcome(ModuleState::BranchInactive, None)),
            }
        }
    }
}

/// Whether `plan` allows `action` on `feature` (for `branch`, when the
/// feature's module is branch-role).
pub fn check(
    view: &StoreView,
    plan_id: &PlanId,
    feature_id: &FeatureId,
    branch: Option<&BranchId>,
    action: Action,
) -> EntlResult<bool> {
    let feature = view.catalog().feature(feature_id)?;
    let resolution = resolve(view, plan_id, &feature.module_id, branch)?;
    Ok(resolution.allows(feature_id, action))
}

#[cfg(test)]
mod tests {
    use super::*;
    use entl_core::{BranchRoleRow, PlanUpdate, RoleAssignmentInput};
    use entl_store::{demo_snapshot, EntitlementStore};

    fn store() -> EntitlementStore {
        EntitlementStore::import(demo_snapshot().unwrap()).unwrap()
    }

    fn pid(s: &str) -> PlanId {
        PlanId::new(s).unwrap()
    }

    fn mid(s: &str) -> ModuleId {
        ModuleId::new(s).unwrap()
    }

    fn fid(s: &str) -> FeatureId {
        FeatureId::new(s).unwrap()
    }

    fn bid(s: &str) -> BranchId {
        BranchId::new(s).unwrap()
    }

    #[test]
    fn professional_journal_entry() {
        let store = store();
        let r = resolve(&store.snapshot(), &pid("PLN-002"), &mid("finance"), None).unwrap();
        assert_eq!(r.state, ModuleState::Resolved);
        assert_eq!(r.role.as_ref().map(|r| r.as_str()), Some("Accountant"));
        let je = r.flags(&fid("finance.journal_entry"));
        assert!(je.view && je.create && je.edit && je.approve);
        assert!(!je.delete);
        assert_eq!(r.features.len(), 3);
    }

    #[test]
    fn delete_without_view_write_leaves_resolution_unchanged() {
        let store = store();
        let before = resolve(&store.snapshot(), &pid("PLN-002"), &mid("finance"), None).unwrap();
        let err = store.set_permission_grant(
            &pid("PLN-002"),
            &fid("finance.journal_entry"),
            PermissionFlags {
                delete: true,
                ..PermissionFlags::DENY_ALL
            },
        );
        assert!(matches!(err, Err(EntlError::Validation(_))));
        let after = resolve(&store.snapshot(), &pid("PLN-002"), &mid("finance"), None).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn excluded_module_resolves_empty() {
        let store = store();
        let r = resolve(&store.snapshot(), &pid("PLN-001"), &mid("inventory"), None).unwrap();
        assert_eq!(r.state, ModuleState::Excluded);
        assert!(r.role.is_none());
        assert!(r.features.iter().all(|f| !f.flags.any()));
    }

    #[test]
    fn unassigned_single_role_is_not_configured() {
        let store = store();
        let err = resolve(&store.snapshot(), &pid("PLN-004"), &mid("finance"), None).unwrap_err();
        assert!(matches!(err, EntlError::NotConfigured { .. }));
    }

    #[test]
    fn branch_role_requires_branch() {
        let store = store();
        let err = resolve(
            &store.snapshot(),
            &pid("PLN-003"),
            &mid("maintenance_service"),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, EntlError::Validation(_)));
    }

    #[test]
    fn enabled_branch_resolves_to_its_role() {
        let store = store();
        let r = resolve(
            &store.snapshot(),
            &pid("PLN-003"),
            &mid("maintenance_service"),
            Some(&bid("b5")),
        )
        .unwrap();
        assert_eq!(r.role.as_ref().map(|r| r.as_str()), Some("Company Admin"));
        assert!(r.allows(&fid("maintenance_service.work_orders"), Action::Delete));
    }

    #[test]
    fn disabled_or_unknown_branch_resolves_empty() {
        let store = store();
        let view = store.snapshot();
        for branch in ["b1", "b99"] {
            let r = resolve(&view, &pid("PLN-003"), &mid("maintenance_service"), Some(&bid(branch)))
                .unwrap();
            assert_eq!(r.state, ModuleState::BranchInactive);
            assert!(r.role.is_none());
            assert!(r.features.iter().all(|f| !f.flags.any()));
        }
    }

    #[test]
    fn default_flag_does_not_affect_resolution() {
        let store = store();
        store
            .set_module_role_assignment(
                &pid("PLN-003"),
                &mid("maintenance_service"),
                RoleAssignmentInput::BranchRow {
                    row: BranchRoleRow::enabled(bid("b2"), Role::new("Technician").unwrap()),
                },
            )
            .unwrap();
        let view = store.snapshot();
        let b2 = resolve(&view, &pid("PLN-003"), &mid("maintenance_service"), Some(&bid("b2"))).unwrap();
        let b5 = resolve(&view, &pid("PLN-003"), &mid("maintenance_service"), Some(&bid("b5"))).unwrap();
        assert_eq!(b2.state, ModuleState::Resolved);
        assert_eq!(b2.role.as_ref().map(|r| r.as_str()), Some("Technician"));
        let flags = |r: &Resolution| r.features.iter().map(|f| f.flags).collect::<Vec<_>>();
        assert_eq!(flags(&b2), flags(&b5));
    }

    #[test]
    fn single_role_ignores_branch() {
        let store = store();
        let view = store.snapshot();
        let a = resolve(&view, &pid("PLN-002"), &mid("hrms"), Some(&bid("b1"))).unwrap();
        let b = resolve(&view, &pid("PLN-002"), &mid("hrms"), None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn module_removed_from_plan_becomes_excluded() {
        let store = store();
        store
            .update_plan(
                &pid("PLN-002"),
                PlanUpdate {
                    modules: Some([mid("hrms")].into_iter().collect()),
                    ..Default::default()
                },
            )
            .unwrap();
        let r = resolve(&store.snapshot(), &pid("PLN-002"), &mid("finance"), None).unwrap();
        assert_eq!(r.state, ModuleState::Excluded);
    }

    #[test]
    fn unknown_plan_and_module() {
        let store = store();
        let view = store.snapshot();
        assert!(matches!(
            resolve(&view, &pid("PLN-404"), &mid("hrms"), None),
            Err(EntlError::NotFound { .. })
        ));
        assert!(matches!(
            resolve(&view, &pid("PLN-002"), &mid("payroll"), None),
            Err(EntlError::NotFound { .. })
        ));
    }

    #[test]
    fn check_convenience() {
        let store = store();
        let view = store.snapshot();
        assert!(check(&view, &pid("PLN-002"), &fid("finance.journal_entry"), None, Action::Approve).unwrap());
        assert!(!check(&view, &pid("PLN-002"), &fid("finance.journal_entry"), None, Action::Delete).unwrap());
        // crm.opportunities has no grant in PLN-002.
        assert!(!check(&view, &pid("PLN-002"), &fid("crm.opportunities"), None, Action::View).unwrap());
    }
}
