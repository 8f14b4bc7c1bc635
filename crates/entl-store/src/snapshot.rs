//! # Store Snapshots
//!
//! The serializable image of the whole store. Exported snapshots are what
//! the API writes through to disk and what the CLI reads; hand-written
//! fixtures use the same shape in YAML.
//!
//! Importing a snapshot re-validates every invariant a live write would
//! have enforced (`delete ⇒ view`, a single enabled default branch, known
//! catalog references), so a snapshot that loads is indistinguishable from
//! a store built through the write API.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use entl_core::{
    Branch, EntityKind, EntlError, EntlResult, Feature, Module, ModuleId, ModuleRoleAssignment,
    PermissionGrant, Plan,
};
use entl_state::Subscription;

use crate::record::PlanRecord;
use crate::state::{Catalog, StoreState};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

fn current_version() -> u32 {
    SNAPSHOT_VERSION
}

/// Serializable image of the entire store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default = "current_version")]
    pub version: u32,
    #[serde(default)]
    pub catalog: CatalogSnapshot,
    #[serde(default)]
    pub plans: Vec<PlanSnapshot>,
    #[serde(default)]
    pub subscriptions: Vec<Subscription>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub modules: Vec<Module>,
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default)]
    pub branches: Vec<Branch>,
}

/// A plan with its grants and role assignments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSnapshot {
    pub plan: Plan,
    #[serde(default)]
    pub grants: Vec<PermissionGrant>,
    #[serde(default)]
    pub assignments: BTreeMap<ModuleId, ModuleRoleAssignment>,
}

impl StoreSnapshot {
    pub fn empty() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            catalog: CatalogSnapshot::default(),
            plans: Vec::new(),
            subscriptions: Vec::new(),
        }
    }

    /// Capture `state` as a snapshot.
    pub fn from_state(state: &StoreState) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            catalog: CatalogSnapshot {
                modules: state.catalog.modules.values().cloned().collect(),
                features: state.catalog.features.values().cloned().collect(),
                branches: state.catalog.branches.values().cloned().collect(),
            },
            plans: state
                .plans
                .values()
                .map(|rec| PlanSnapshot {
                    plan: rec.plan.clone(),
                    grants: rec.grants.values().cloned().collect(),
                    assignments: rec.assignments.clone(),
                })
                .collect(),
            subscriptions: state.subscriptions.values().map(|s| Subscription::clone(s)).collect(),
        }
    }

    /// Validate every invariant and build the store state.
    pub fn into_state(self) -> EntlResult<StoreState> {
        if self.version != SNAPSHOT_VERSION {
            return Err(EntlError::validation(format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                self.version
            )));
        }

        let catalog = build_catalog(self.catalog)?;

        let mut plans = BTreeMap::new();
        for entry in self.plans {
            let record = build_plan(&catalog, entry)?;
            let id = record.plan.id.clone();
            if plans.insert(id.clone(), Arc::new(record)).is_some() {
                return Err(EntlError::Conflict(format!("plan {id} listed more than once")));
            }
        }

        let mut subscriptions = BTreeMap::new();
        for sub in self.subscriptions {
            if !plans.contains_key(&sub.plan_id) {
                return Err(EntlError::not_found(EntityKind::Plan, &sub.plan_id));
            }
            if sub.end_date <= sub.start_date {
                return Err(EntlError::validation(format!(
                    "subscription {} ends on or before its start date",
                    sub.id
                )));
            }
            for module in sub.module_overrides.keys() {
                catalog.module(module)?;
            }
            let id = sub.id.clone();
            if subscriptions.insert(id.clone(), Arc::new(sub)).is_some() {
                return Err(EntlError::Conflict(format!(
                    "subscription {id} listed more than once"
                )));
            }
        }

        Ok(StoreState {
            catalog,
            plans,
            subscriptions,
        })
    }
}

fn build_catalog(snapshot: CatalogSnapshot) -> EntlResult<Catalog> {
    let mut catalog = Catalog::default();
    for module in snapshot.modules {
        module.validate()?;
        let id = module.id.clone();
        if catalog.modules.insert(id.clone(), module).is_some() {
            return Err(EntlError::Conflict(format!("module {id} listed more than once")));
        }
    }
    for feature in snapshot.features {
        feature.validate()?;
        catalog.module(&feature.module_id)?;
        let id = feature.id.clone();
        if catalog.features.insert(id.clone(), feature).is_some() {
            return Err(EntlError::Conflict(format!("feature {id} listed more than once")));
        }
    }
    for branch in snapshot.branches {
        branch.validate()?;
        let id = branch.id.clone();
        if catalog.branches.insert(id.clone(), branch).is_some() {
            return Err(EntlError::Conflict(format!("branch {id} listed more than once")));
        }
    }
    Ok(catalog)
}

fn build_plan(catalog: &Catalog, entry: PlanSnapshot) -> EntlResult<PlanRecord> {
    let plan = entry.plan;
    plan.validate()?;
    for module in &plan.modules {
        catalog.module(module)?;
    }

    let mut record = PlanRecord::new(plan);
    for grant in entry.grants {
        if grant.plan_id != record.plan.id {
            return Err(EntlError::validation(format!(
                "grant for feature {} names plan {} inside plan {}",
                grant.feature_id, grant.plan_id, record.plan.id
            )));
        }
        catalog.feature(&grant.feature_id)?;
        // Re-run the constructor so `delete ⇒ view` is checked.
        let grant = PermissionGrant::new(grant.plan_id, grant.feature_id, grant.flags)?;
        let feature = grant.feature_id.clone();
        if record.grants.insert(feature.clone(), grant).is_some() {
            return Err(EntlError::Conflict(format!(
                "plan {} grants feature {feature} more than once",
                record.plan.id
            )));
        }
    }

    for (module_id, assignment) in entry.assignments {
        let module = catalog.module(&module_id)?;
        if module.grant_type != assignment.grant_type() {
            return Err(EntlError::validation(format!(
                "assignment for {module_id} in plan {} does not match {} module",
                record.plan.id, module.grant_type
            )));
        }
        assignment.validate()?;
        for row in assignment.rows() {
            catalog.branch(&row.branch_id)?;
        }
        record.assignments.insert(module_id, assignment);
    }
    Ok(record)
}
