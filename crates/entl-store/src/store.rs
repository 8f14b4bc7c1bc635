//! # Entitlement Store
//!
//! Single owner of plans, catalog, grants, role assignments and
//! subscriptions.
//!
//! ## Concurrency
//!
//! The committed state is one `Arc<StoreState>` behind a `RwLock`.
//! [`EntitlementStore::snapshot`] clones the `Arc` under a read lock and
//! returns immediately, so readers never wait on each other and never see
//! a half-applied write.
//!
//! Every mutation is clone-validate-swap: the closure runs against a copy
//! of the state and the copy replaces the committed state only if the
//! closure succeeds. A failed operation leaves the store untouched.
//!
//! Plan writers additionally queue on a per-plan mutex and build the new
//! [`PlanRecord`] from a snapshot before taking the global write lock, so
//! the write lock is held only for the final map insert and writers of
//! different plans do not serialize on record construction.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use entl_core::{
    Branch, EntlError, EntlResult, Feature, FeatureId, Module, ModuleId,
    ModuleRoleAssignment, NewPlan, PermissionFlags, PermissionGrant, Plan, PlanId, PlanStatus,
    PlanUpdate, RoleAssignmentInput, SubscriptionId, Timestamp,
};
use entl_state::Subscription;

use crate::locks::PlanLocks;
use crate::persist::{read_snapshot, write_snapshot, PersistError, SnapshotFormat};
use crate::record::PlanRecord;
use crate::snapshot::StoreSnapshot;
use crate::state::{Catalog, StoreState, StoreView};

/// How [`EntitlementStore::archive_plan`] retires a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveMode {
    /// Mark the plan Archived. Always allowed.
    Archive,
    /// Remove the plan with its grants and assignments. Refused while any
    /// subscription, live or terminal, references it.
    HardDelete,
}

/// Result of retiring a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    Archived(Plan),
    Deleted(PlanId),
}

/// The in-memory entitlement store.
#[derive(Debug)]
pub struct EntitlementStore {
    state: RwLock<Arc<StoreState>>,
    plan_locks: PlanLocks,
    persistence: Option<Persistence>,
}

#[derive(Debug)]
struct Persistence {
    path: PathBuf,
    format: SnapshotFormat,
    /// Serializes file writes. Always taken after the state lock.
    write_lock: Mutex<()>,
}

impl Default for EntitlementStore {
    fn default() -> Self {
        Self::from_state(StoreState::default())
    }
}

impl EntitlementStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn from_state(state: StoreState) -> Self {
        Self {
            state: RwLock::new(Arc::new(state)),
            plan_locks: PlanLocks::default(),
            persistence: None,
        }
    }

    /// Build a store from a snapshot, re-validating every invariant.
    pub fn import(snapshot: StoreSnapshot) -> EntlResult<Self> {
        Ok(Self::from_state(snapshot.into_state()?))
    }

    /// Load and validate a snapshot file.
    pub fn load(path: &Path) -> Result<Self, PersistError> {
        let snapshot = read_snapshot(path)?;
        Self::import(snapshot).map_err(|source| PersistError::Invalid {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the full snapshot to `path` after every successful mutation.
    pub fn with_write_through(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = SnapshotFormat::for_path(&path);
        self.persistence = Some(Persistence {
            path,
            format,
            write_lock: Mutex::new(()),
        });
        self
    }

    /// Consistent point-in-time view of the whole store.
    pub fn snapshot(&self) -> StoreView {
        let guard = self.state.read();
        StoreView::new(Arc::clone(&*guard))
    }

    /// Serializable image of the current state.
    pub fn export(&self) -> StoreSnapshot {
        StoreSnapshot::from_state(&self.snapshot())
    }

    /// Write the current state to the configured snapshot file, if any.
    pub fn flush(&self) -> Result<(), PersistError> {
        let guard = self.state.read();
        self.persist(&guard)
    }

    fn persist(&self, state: &StoreState) -> Result<(), PersistError> {
        let Some(p) = &self.persistence else {
            return Ok(());
        };
        let _guard = p.write_lock.lock();
        write_snapshot(&p.path, &StoreSnapshot::from_state(state), p.format)
    }

    // ─── Commit machinery ───────────────────────────────────────────

    /// Apply `f` to a copy of the state, write it through, then publish it.
    /// A failed write leaves the published state untouched.
    fn commit<T>(&self, f: impl FnOnce(&mut StoreState) -> EntlResult<T>) -> EntlResult<T> {
        let mut guard = self.state.write();
        let mut next = (**guard).clone();
        let out = f(&mut next)?;
        if let Err(e) = self.persist(&next) {
            tracing::error!(error = %e, "snapshot write-through failed; commit rolled back");
            return Err(EntlError::Persistence(e.to_string()));
        }
        *guard = Arc::new(next);
        Ok(out)
    }

    /// Rebuild one plan's record under its lock and commit it.
    fn modify_plan<T>(
        &self,
        plan_id: &PlanId,
        f: impl FnOnce(&Catalog, &PlanRecord) -> EntlResult<(PlanRecord, T)>,
    ) -> EntlResult<T> {
        self.plan_locks.with(plan_id, || {
            let view = self.snapshot();
            let current = view.plan(plan_id)?;
            let (next, out) = f(view.catalog(), &**current)?;
            let next = Arc::new(next);
            self.commit(|state| {
                // The per-plan lock guarantees nobody replaced or removed
                // the record since `view` was taken.
                state.plans.insert(plan_id.clone(), next);
                Ok(())
            })?;
            Ok(out)
        })
    }

    // ─── Catalog ────────────────────────────────────────────────────

    pub fn register_module(&self, module: Module) -> EntlResult<Module> {
        module.validate()?;
        self.commit(|state| {
            if state.catalog.modules.contains_key(&module.id) {
                return Err(EntlError::Conflict(format!("module {} already exists", module.id)));
            }
            state.catalog.modules.insert(module.id.clone(), module.clone());
            Ok(())
        })?;
        tracing::info!(module_id = %module.id, grant_type = %module.grant_type, "module registered");
        Ok(module)
    }

    pub fn register_feature(&self, feature: Feature) -> EntlResult<Feature> {
        feature.validate()?;
        self.commit(|state| {
            state.catalog.module(&feature.module_id)?;
            if state.catalog.features.contains_key(&feature.id) {
                return Err(EntlError::Conflict(format!("feature {} already exists", feature.id)));
            }
            state.catalog.features.insert(feature.id.clone(), feature.clone());
            Ok(())
        })?;
        tracing::info!(feature_id = %feature.id, module_id = %feature.module_id, "feature registered");
        Ok(feature)
    }

    pub fn register_branch(&self, branch: Branch) -> EntlResult<Branch> {
        branch.validate()?;
        self.commit(|state| {
            if state.catalog.branches.contains_key(&branch.id) {
                return Err(EntlError::Conflict(format!("branch {} already exists", branch.id)));
            }
            state.catalog.branches.insert(branch.id.clone(), branch.clone());
            Ok(())
        })?;
        tracing::info!(branch_id = %branch.id, company_id = %branch.company_id, "branch registered");
        Ok(branch)
    }

    // ─── Plans ──────────────────────────────────────────────────────

    pub fn create_plan(&self, new: NewPlan) -> EntlResult<Plan> {
        let plan_id = new.id.clone();
        let plan = self.plan_locks.with(&plan_id, || {
            let plan = new.into_plan(Timestamp::now())?;
            self.commit(|state| {
                if state.plans.contains_key(&plan.id) {
                    return Err(EntlError::Conflict(format!("plan {} already exists", plan.id)));
                }
                for module in &plan.modules {
                    state.catalog.module(module)?;
                }
                state
                    .plans
                    .insert(plan.id.clone(), Arc::new(PlanRecord::new(plan.clone())));
                Ok(())
            })?;
            Ok::<_, EntlError>(plan)
        })?;
        tracing::info!(plan_id = %plan.id, plan_type = %plan.plan_type, status = %plan.status, "plan created");
        Ok(plan)
    }

    pub fn update_plan(&self, plan_id: &PlanId, update: PlanUpdate) -> EntlResult<Plan> {
        let plan = self.modify_plan(plan_id, |catalog, current| {
            if let Some(modules) = &update.modules {
                for module in modules {
                    catalog.module(module)?;
                }
            }
            let plan = update.apply(&current.plan, Timestamp::now())?;
            let mut next = current.clone();
            next.assignments.retain(|module, _| plan.includes(module));
            next.plan = plan.clone();
            Ok((next, plan))
        })?;
        tracing::info!(plan_id = %plan_id, status = %plan.status, "plan updated");
        Ok(plan)
    }

    pub fn archive_plan(&self, plan_id: &PlanId, mode: ArchiveMode) -> EntlResult<ArchiveOutcome> {
        match mode {
            ArchiveMode::Archive => {
                let plan = self.modify_plan(plan_id, |_, current| {
                    let mut next = current.clone();
                    next.plan.status = PlanStatus::Archived;
                    next.plan.updated_at = Timestamp::now();
                    let plan = next.plan.clone();
                    Ok((next, plan))
                })?;
                tracing::info!(plan_id = %plan_id, "plan archived");
                Ok(ArchiveOutcome::Archived(plan))
            }
            ArchiveMode::HardDelete => {
                self.plan_locks.with(plan_id, || {
                    self.commit(|state| {
                        state.plan(plan_id)?;
                        let bound = state.subscriptions_on(plan_id).count();
                        if bound > 0 {
                            let live = state.live_subscriptions_on(plan_id).count();
                            return Err(EntlError::Conflict(format!(
                                "plan {plan_id} is referenced by {bound} subscription(s), {live} live"
                            )));
                        }
                        state.plans.remove(plan_id);
                        Ok(())
                    })
                })?;
                tracing::info!(plan_id = %plan_id, "plan deleted");
                Ok(ArchiveOutcome::Deleted(plan_id.clone()))
            }
        }
    }

    /// Copy a plan with its grants and role assignments into a new Draft plan.
    pub fn duplicate_plan(
        &self,
        source: &PlanId,
        new_id: PlanId,
        new_name: Option<String>,
    ) -> EntlResult<Plan> {
        let view = self.snapshot();
        let original = view.plan(source)?;
        let now = Timestamp::now();

        let mut record = PlanRecord::clone(original);
        record.plan.id = new_id.clone();
        record.plan.name = new_name.unwrap_or_else(|| format!("{} (Copy)", original.plan.name));
        record.plan.status = PlanStatus::Draft;
        record.plan.created_at = now;
        record.plan.updated_at = now;
        record.plan.validate()?;
        record.grants = original
            .grants
            .values()
            .map(|g| PermissionGrant::new(new_id.clone(), g.feature_id.clone(), g.flags))
            .map(|g| g.map(|g| (g.feature_id.clone(), g)))
            .collect::<EntlResult<_>>()?;

        let plan = record.plan.clone();
        self.plan_locks.with(&new_id, || {
            self.commit(|state| {
                if state.plans.contains_key(&new_id) {
                    return Err(EntlError::Conflict(format!("plan {new_id} already exists")));
                }
                state.plans.insert(new_id.clone(), Arc::new(record));
                Ok(())
            })
        })?;
        tracing::info!(plan_id = %plan.id, source_plan_id = %source, "plan duplicated");
        Ok(plan)
    }

    // ─── Grants & role assignments ──────────────────────────────────

    pub fn set_permission_grant(
        &self,
        plan_id: &PlanId,
        feature_id: &FeatureId,
        flags: PermissionFlags,
    ) -> EntlResult<PermissionGrant> {
        let result = self.modify_plan(plan_id, |catalog, current| {
            catalog.feature(feature_id)?;
            let grant = PermissionGrant::new(plan_id.clone(), feature_id.clone(), flags)?;
            let mut next = current.clone();
            next.grants.insert(feature_id.clone(), grant.clone());
            Ok((next, grant))
        });
        match &result {
            Ok(_) => tracing::info!(plan_id = %plan_id, feature_id = %feature_id, "permission grant set"),
            Err(e) => tracing::debug!(plan_id = %plan_id, feature_id = %feature_id, error = %e, "permission grant rejected"),
        }
        result
    }

    /// Remove an explicit grant, returning the feature to deny-all.
    /// Returns whether a grant was present.
    pub fn clear_permission_grant(&self, plan_id: &PlanId, feature_id: &FeatureId) -> EntlResult<bool> {
        let removed = self.modify_plan(plan_id, |catalog, current| {
            catalog.feature(feature_id)?;
            let mut next = current.clone();
            let removed = next.grants.remove(feature_id).is_some();
            Ok((next, removed))
        })?;
        tracing::info!(plan_id = %plan_id, feature_id = %feature_id, removed, "permission grant cleared");
        Ok(removed)
    }

    pub fn set_module_role_assignment(
        &self,
        plan_id: &PlanId,
        module_id: &ModuleId,
        input: RoleAssignmentInput,
    ) -> EntlResult<ModuleRoleAssignment> {
        let result = self.modify_plan(plan_id, |catalog, current| {
            let module = catalog.module(module_id)?;
            if !current.plan.includes(module_id) {
                return Err(EntlError::validation(format!(
                    "module {module_id} is not included in plan {plan_id}"
                )));
            }
            let assignment = ModuleRoleAssignment::apply(
                current.assignment(module_id),
                module.grant_type,
                input,
            )?;
            for row in assignment.rows() {
                catalog.branch(&row.branch_id)?;
            }
            let mut next = current.clone();
            next.assignments.insert(module_id.clone(), assignment.clone());
            Ok((next, assignment))
        });
        match &result {
            Ok(a) => tracing::info!(
                plan_id = %plan_id,
                module_id = %module_id,
                default_branch = ?a.default_branch().map(|b| b.as_str()),
                "role assignment set"
            ),
            Err(e) => tracing::debug!(plan_id = %plan_id, module_id = %module_id, error = %e, "role assignment rejected"),
        }
        result
    }

    // ─── Subscriptions ──────────────────────────────────────────────

    /// Insert a new subscription. The plan must exist and be assignable
    /// at commit time.
    pub fn insert_subscription(&self, subscription: Subscription) -> EntlResult<Arc<Subscription>> {
        let sub = Arc::new(subscription);
        self.commit(|state| {
            let plan = state.plan(&sub.plan_id)?;
            if !plan.plan.status.is_assignable() {
                return Err(EntlError::validation(format!(
                    "plan {} is {} and cannot be assigned",
                    plan.plan.id, plan.plan.status
                )));
            }
            if state.subscriptions.contains_key(&sub.id) {
                return Err(EntlError::Conflict(format!("subscription {} already exists", sub.id)));
            }
            state.subscriptions.insert(sub.id.clone(), Arc::clone(&sub));
            Ok(())
        })?;
        tracing::info!(subscription_id = %sub.id, plan_id = %sub.plan_id, status = %sub.status, "subscription created");
        Ok(sub)
    }

    /// Apply `f` to a copy of one subscription and commit the result.
    /// `f` also sees the rest of the state as of the same commit.
    pub fn update_subscription<T>(
        &self,
        id: &SubscriptionId,
        f: impl FnOnce(&mut Subscription, &StoreState) -> EntlResult<T>,
    ) -> EntlResult<(T, Arc<Subscription>)> {
        self.commit(|state| {
            let mut sub = Subscription::clone(state.subscription(id)?);
            let out = f(&mut sub, state)?;
            let sub = Arc::new(sub);
            state.subscriptions.insert(id.clone(), Arc::clone(&sub));
            Ok((out, sub))
        })
    }

    /// Apply `f` to every subscription in one commit. `f` returns whether
    /// it changed the subscription; the ids of changed subscriptions are
    /// returned. Any error aborts the whole batch.
    pub fn update_subscriptions(
        &self,
        mut f: impl FnMut(&mut Subscription) -> EntlResult<bool>,
    ) -> EntlResult<Vec<SubscriptionId>> {
        self.commit(|state| {
            let mut changed = Vec::new();
            for (id, slot) in state.subscriptions.iter_mut() {
                let mut sub = Subscription::clone(&**slot);
                if f(&mut sub)? {
                    *slot = Arc::new(sub);
                    changed.push(id.clone());
                }
            }
            Ok(changed)
        })
    }

    /// Look up one plan in the current state.
    pub fn plan(&self, id: &PlanId) -> EntlResult<Arc<PlanRecord>> {
        self.snapshot().plan(id).map(Arc::clone)
    }

    pub fn subscription(&self, id: &SubscriptionId) -> EntlResult<Arc<Subscription>> {
        self.snapshot().subscription(id).map(Arc::clone)
    }
}
