//! # Catalog — Modules, Features, Branches
//!
//! The catalog is the fixed vocabulary plans are built from. Modules are
//! top-level product areas (Finance, HRMS); features are the permissionable
//! leaves inside a module (Journal Entry); branches are company sub-units
//! used by branch-role modules.
//!
//! The catalog is rarely mutated and only grows: entries are registered or
//! renamed, never removed, so a grant or assignment can never point at a
//! vanished catalog entry.

use serde::{Deserialize, Serialize};

use crate::error::EntlError;
use crate::identity::{BranchId, CompanyId, FeatureId, ModuleId};

/// How roles are granted within a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "kebab-case")]
pub enum GrantType {
    /// One role for the whole module.
    SingleRole,
    /// One role per enabled branch.
    BranchRole,
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SingleRole => f.write_str("single-role"),
            Self::BranchRole => f.write_str("branch-role"),
        }
    }
}

/// A top-level product area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Module {
    pub id: ModuleId,
    pub name: String,
    pub grant_type: GrantType,
}

/// A permissionable unit within a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Feature {
    pub id: FeatureId,
    pub module_id: ModuleId,
    pub name: String,
}

/// An organizational sub-unit of a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Branch {
    pub id: BranchId,
    pub name: String,
    pub company_id: CompanyId,
}

/// Validate a display name shared by catalog entries and plans.
pub(crate) fn validate_name(kind: &str, name: &str) -> Result<(), EntlError> {
    if name.trim().is_empty() {
        return Err(EntlError::validation(format!("{kind} name must not be blank")));
    }
    if name.len() > 255 {
        return Err(EntlError::validation(format!(
            "{kind} name must not exceed 255 characters"
        )));
    }
    Ok(())
}

impl Module {
    pub fn new(id: ModuleId, name: impl Into<String>, grant_type: GrantType) -> Result<Self, EntlError> {
        let name = name.into();
        validate_name("module", &name)?;
        Ok(Self { id, name, grant_type })
    }

    /// Re-check invariants on a record loaded from outside.
    pub fn validate(&self) -> Result<(), EntlError> {
        validate_name("module", &self.name)
    }
}

impl Feature {
    pub fn new(id: FeatureId, module_id: ModuleId, name: impl Into<String>) -> Result<Self, EntlError> {
        let name = name.into();
        validate_name("feature", &name)?;
        Ok(Self { id, module_id, name })
    }

    pub fn validate(&self) -> Result<(), EntlError> {
        validate_name("feature", &self.name)
    }
}

impl Branch {
    pub fn new(id: BranchId, name: impl Into<String>, company_id: CompanyId) -> Result<Self, EntlError> {
        let name = name.into();
        validate_name("branch", &name)?;
        Ok(Self { id, name, company_id })
    }

    pub fn validate(&self) -> Result<(), EntlError> {
        validate_name("branch", &self.name)
    }
}
