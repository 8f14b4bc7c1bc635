//! # Store State and Read Views
//!
//! `StoreState` is the whole entitlement store at one commit. The live
//! store keeps it behind `Arc`; a [`StoreView`] is a clone of that `Arc`,
//! so it is free to take, never blocks writers, and never changes under
//! the reader.

use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::Arc;

use serde::Serialize;

use entl_core::{
    Branch, BranchId, EntityKind, EntlError, EntlResult, Feature, FeatureId, Module, ModuleId,
    PlanId, SubscriptionId,
};
use entl_state::Subscription;

use crate::record::PlanRecord;

/// The module/feature/branch vocabulary plans are built from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Catalog {
    pub modules: BTreeMap<ModuleId, Module>,
    pub features: BTreeMap<FeatureId, Feature>,
    pub branches: BTreeMap<BranchId, Branch>,
}

impl Catalog {
    pub fn module(&self, id: &ModuleId) -> EntlResult<&Module> {
        self.modules
            .get(id)
            .ok_or_else(|| EntlError::not_found(EntityKind::Module, id))
    }

    pub fn feature(&self, id: &FeatureId) -> EntlResult<&Feature> {
        self.features
            .get(id)
            .ok_or_else(|| EntlError::not_found(EntityKind::Feature, id))
    }

    pub fn branch(&self, id: &BranchId) -> EntlResult<&Branch> {
        self.branches
            .get(id)
            .ok_or_else(|| EntlError::not_found(EntityKind::Branch, id))
    }

    /// Features of `module`, in id order.
    pub fn features_of<'a>(&'a self, module: &'a ModuleId) -> impl Iterator<Item = &'a Feature> + 'a {
        self.features.values().filter(move |f| &f.module_id == module)
    }
}

/// Everything the store holds, as of one commit.
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    pub(crate) catalog: Catalog,
    pub(crate) plans: BTreeMap<PlanId, Arc<PlanRecord>>,
    pub(crate) subscriptions: BTreeMap<SubscriptionId, Arc<Subscription>>,
}

impl StoreState {
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn plan(&self, id: &PlanId) -> EntlResult<&Arc<PlanRecord>> {
        self.plans
            .get(id)
            .ok_or_else(|| EntlError::not_found(EntityKind::Plan, id))
    }

    pub fn plans(&self) -> impl Iterator<Item = &Arc<PlanRecord>> {
        self.plans.values()
    }

    pub fn subscription(&self, id: &SubscriptionId) -> EntlResult<&Arc<Subscription>> {
        self.subscriptions
            .get(id)
            .ok_or_else(|| EntlError::not_found(EntityKind::Subscription, id))
    }

    pub fn subscriptions(&self) -> impl Iterator<Item = &Arc<Subscription>> {
        self.subscriptions.values()
    }

    /// Live (Active/Trial/Suspended) subscriptions on `plan`.
    /// Every subscription bound to `plan`, whatever its status.
    pub fn subscriptions_on<'a>(
        &'a self,
        plan: &'a PlanId,
    ) -> impl Iterator<Item = &'a Arc<Subscription>> + 'a {
        self.subscriptions.values().filter(move |s| &s.plan_id == plan)
    }

    pub fn live_subscriptions_on<'a>(
        &'a self,
        plan: &'a PlanId,
    ) -> impl Iterator<Item = &'a Arc<Subscription>> + 'a {
        self.subscriptions
            .values()
            .filter(move |s| &s.plan_id == plan && s.status.is_live())
    }
}

/// Immutable point-in-time view of the store.
#[derive(Debug, Clone)]
pub struct StoreView(Arc<StoreState>);

impl StoreView {
    pub(crate) fn new(state: Arc<StoreState>) -> Self {
        Self(state)
    }
}

impl Deref for StoreView {
    type Target = StoreState;

    fn deref(&self) -> &StoreState {
        &self.0
    }
}
