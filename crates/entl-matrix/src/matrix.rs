//! # Effective Matrix
//!
//! The whole plan at once: every catalog module with its resolution state,
//! role (or per-branch roles) and effective per-feature flags. This is
//! what the console's access matrix screen renders.
//!
//! The matrix carries a digest, `sha256:<hex>` over the canonical JSON of
//! its body, which serves as the matrix version. Two stores with the same
//! plan, grants, assignments and catalog produce the same digest, which is
//! how snapshot round trips are checked.

use serde::Serialize;
use sha2::{Digest, Sha256};

use entl_core::{BranchId, EntlError, EntlResult, GrantType, ModuleId, ModuleRoleAssignment, PlanId, Role};
use entl_store::StoreView;

use crate::resolver::{branch_role, feature_flags, FeaturePermissions, ModuleState};

/// One branch row as seen in the matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BranchScope {
    pub branch_id: BranchId,
    pub branch_name: String,
    pub role: Option<Role>,
    pub enabled: bool,
    pub is_default: bool,
}

/// One module row of the matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ModuleMatrix {
    pub module_id: ModuleId,
    pub module_name: String,
    pub grant_type: GrantType,
    pub state: ModuleState,
    /// Module role. For branch-role modules this is the role of the
    /// requested branch, or unset when no branch was requested.
    pub role: Option<Role>,
    /// Branch rows of a branch-role module, when no branch was requested.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<BranchScope>,
    pub features: Vec<FeaturePermissions>,
}

/// The effective permission matrix of one plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct EffectiveMatrix {
    pub plan_id: PlanId,
    pub plan_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<BranchId>,
    pub modules: Vec<ModuleMatrix>,
    /// `sha256:<hex>` over the canonical JSON of the fields above.
    pub digest: String,
}

impl EffectiveMatrix {
    pub fn module(&self, id: &ModuleId) -> Option<&ModuleMatrix> {
        self.modules.iter().find(|m| &m.module_id == id)
    }
}

/// Digest of any serializable value: SHA-256 over its JSON with object
/// keys in sorted order.
pub fn canonical_digest(value: &impl Serialize) -> EntlResult<String> {
    // serde_json::Value objects are BTreeMap-backed, so re-serializing the
    // value tree yields sorted keys.
    let tree = serde_json::to_value(value)
        .map_err(|e| EntlError::validation(format!("value cannot be canonicalized: {e}")))?;
    let bytes = serde_json::to_vec(&tree)
        .map_err(|e| EntlError::validation(format!("value cannot be canonicalized: {e}")))?;
    let hash = Sha256::digest(&bytes);
    let hex: String = hash.iter().map(|b| format!("{b:02x}")).collect();
    Ok(format!("sha256:{hex}"))
}

/// Build the effective matrix of `plan_id`, optionally for one branch.
pub fn effective_matrix(
    view: &StoreView,
    plan_id: &PlanId,
    branch: Option<&BranchId>,
) -> EntlResult<EffectiveMatrix> {
    let record = view.plan(plan_id)?;
    let catalog = view.catalog();
    let mut modules = Vec::with_capacity(catalog.modules.len());

    for module in catalog.modules.values() {
        let assignment = record.assignment(&module.id);
        let included = record.plan.includes(&module.id);
        let mut scopes = Vec::new();

        let (state, role) = match (included, module.grant_type) {
            (false, _) => (ModuleState::Excluded, None),
            (true, GrantType::SingleRole) => match assignment {
                Some(ModuleRoleAssignment::SingleRole { role }) => {
                    (ModuleState::Resolved, Some(role.clone()))
                }
                _ => (ModuleState::Unconfigured, None),
            },
            (true, GrantType::BranchRole) => match branch {
                Some(b) if catalog.branches.contains_key(b) => match branch_role(assignment, b) {
                    Some(role) => (ModuleState::Resolved, Some(role.clone())),
                    None => (ModuleState::BranchInactive, None),
                },
                Some(_) => (ModuleState::BranchInactive, None),
                None => {
                    let rows = assignment.map(|a| a.rows()).unwrap_or_default();
                    scopes = rows
                        .iter()
                        .map(|row| BranchScope {
                            branch_id: row.branch_id.clone(),
                            branch_name: catalog
                                .branches
                                .get(&row.branch_id)
                                .map(|b| b.name.clone())
                                .unwrap_or_default(),
                            role: row.role.clone(),
                            enabled: row.enabled,
                            is_default: row.is_default,
                        })
                        .collect();
                    if rows.iter().any(|r| r.enabled) {
                        (ModuleState::Resolved, None)
                    } else {
                        (ModuleState::BranchInactive, None)
                    }
                }
            },
        };

        modules.push(ModuleMatrix {
            module_id: module.id.clone(),
            module_name: module.name.clone(),
            grant_type: module.grant_type,
            state,
            role,
            scopes,
            features: feature_flags(catalog.features_of(&module.id), record, state.is_resolved()),
        });
    }

    let branch_id = branch.cloned();
    let digest = canonical_digest(&(plan_id, &branch_id, &modules))?;
    tracing::debug!(plan_id = %plan_id, digest = %digest, "effective matrix built");

    Ok(EffectiveMatrix {
        plan_id: plan_id.clone(),
        plan_name: record.plan.name.clone(),
        branch_id,
        modules,
        digest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use entl_core::{Action, FeatureId, PermissionFlags};
    use entl_store::{demo_snapshot, EntitlementStore, StoreSnapshot};

    fn store() -> EntitlementStore {
        EntitlementStore::import(demo_snapshot().unwrap()).unwrap()
    }

    fn pid(s: &str) -> PlanId {
        PlanId::new(s).unwrap()
    }

    fn mid(s: &str) -> ModuleId {
        ModuleId::new(s).unwrap()
    }

    #[test]
    fn matrix_lists_every_catalog_module() {
        let store = store();
        let m = effective_matrix(&store.snapshot(), &pid("PLN-002"), None).unwrap();
        assert_eq!(m.modules.len(), 6);
        assert_eq!(m.module(&mid("erp_central")).unwrap().state, ModuleState::Excluded);
        assert_eq!(m.module(&mid("finance")).unwrap().state, ModuleState::Resolved);
        assert!(m.digest.starts_with("sha256:"));
        assert_eq!(m.digest.len(), "sha256:".len() + 64);
    }

    #[test]
    fn unconfigured_module_is_reported_not_raised() {
        let store = store();
        let m = effective_matrix(&store.snapshot(), &pid("PLN-004"), None).unwrap();
        let finance = m.module(&mid("finance")).unwrap();
        assert_eq!(finance.state, ModuleState::Unconfigured);
        assert!(finance.features.iter().all(|f| !f.flags.any()));
    }

    #[test]
    fn branch_role_scopes_without_branch() {
        let store = store();
        let m = effective_matrix(&store.snapshot(), &pid("PLN-003"), None).unwrap();
        let maint = m.module(&mid("maintenance_service")).unwrap();
        assert_eq!(maint.scopes.len(), 5);
        assert_eq!(maint.scopes.iter().filter(|s| s.is_default).count(), 1);
        assert_eq!(maint.state, ModuleState::Resolved);
    }

    #[test]
    fn branch_role_with_branch() {
        let store = store();
        let view = store.snapshot();
        let b5 = BranchId::new("b5").unwrap();
        let m = effective_matrix(&view, &pid("PLN-003"), Some(&b5)).unwrap();
        let maint = m.module(&mid("maintenance_service")).unwrap();
        assert_eq!(maint.role.as_ref().map(|r| r.as_str()), Some("Company Admin"));
        assert!(maint.scopes.is_empty());

        let b1 = BranchId::new("b1").unwrap();
        let m1 = effective_matrix(&view, &pid("PLN-003"), Some(&b1)).unwrap();
        assert_eq!(
            m1.module(&mid("maintenance_service")).unwrap().state,
            ModuleState::BranchInactive
        );
        assert_ne!(m.digest, m1.digest);
    }

    #[test]
    fn digest_changes_with_grants() {
        let store = store();
        let before = effective_matrix(&store.snapshot(), &pid("PLN-002"), None).unwrap();
        store
            .set_permission_grant(
                &pid("PLN-002"),
                &FeatureId::new("crm.opportunities").unwrap(),
                PermissionFlags::from_actions(&[Action::View]),
            )
            .unwrap();
        let after = effective_matrix(&store.snapshot(), &pid("PLN-002"), None).unwrap();
        assert_ne!(before.digest, after.digest);
    }

    #[test]
    fn snapshot_round_trip_reproduces_digest() {
        let store = store();
        let json = serde_json::to_string(&store.export()).unwrap();
        let reloaded: StoreSnapshot = serde_json::from_str(&json).unwrap();
        let reloaded = EntitlementStore::import(reloaded).unwrap();
        for plan in ["PLN-001", "PLN-002", "PLN-003", "PLN-004"] {
            let a = effective_matrix(&store.snapshot(), &pid(plan), None).unwrap();
            let b = effective_matrix(&reloaded.snapshot(), &pid(plan), None).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn canonical_digest_ignores_map_insertion_order() {
        let mut a = std::collections::HashMap::new();
        a.insert("x", 1);
        a.insert("y", 2);
        let mut b = std::collections::HashMap::new();
        b.insert("y", 2);
        b.insert("x", 1);
        assert_eq!(canonical_digest(&a).unwrap(), canonical_digest(&b).unwrap());
    }
}
