//! # Plan Records
//!
//! A plan together with everything hanging off it: the explicit
//! permission grants and the per-module role assignments. Records are
//! immutable once committed and shared as `Arc<PlanRecord>`, so a reader
//! holding one sees the plan, its grants and its assignments as of the
//! same commit.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use entl_core::{FeatureId, ModuleId, ModuleRoleAssignment, PermissionFlags, PermissionGrant, Plan};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PlanRecord {
    pub plan: Plan,
    /// Explicit grants, keyed by feature. A feature without an entry is
    /// denied every action.
    pub grants: BTreeMap<FeatureId, PermissionGrant>,
    pub assignments: BTreeMap<ModuleId, ModuleRoleAssignment>,
}

impl PlanRecord {
    pub fn new(plan: Plan) -> Self {
        Self {
            plan,
            grants: BTreeMap::new(),
            assignments: BTreeMap::new(),
        }
    }

    /// Flags for `feature`; deny-all when no grant exists.
    pub fn flags(&self, feature: &FeatureId) -> PermissionFlags {
        self.grants
            .get(feature)
            .map(|g| g.flags)
            .unwrap_or(PermissionFlags::DENY_ALL)
    }

    pub fn assignment(&self, module: &ModuleId) -> Option<&ModuleRoleAssignment> {
        self.assignments.get(module)
    }
}
