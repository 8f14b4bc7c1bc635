//! # entl-core — Foundational Types for the Entitlement Service
//!
//! Every other crate in the workspace depends on `entl-core`; it depends on
//! nothing internal. It defines the vocabulary the console and the backend
//! share: plans, the module/feature/branch catalog, permission grants, role
//! assignments, and the error taxonomy.
//!
//! ## Key Design Principles
//!
//! 1. **Validated identifier newtypes.** `PlanId`, `ModuleId`, `FeatureId`,
//!    `BranchId`, `SubscriptionId` cannot be constructed (or deserialized)
//!    from malformed strings, and cannot be confused with each other.
//!
//! 2. **Invariants at construction.** A `PermissionGrant` with `delete`
//!    but without `view` cannot be built. A `ModuleRoleAssignment` with two
//!    default branches cannot be built.
//!
//! 3. **Integer money.** Prices are minor units (`u64`), never floats.
//!
//! 4. **One error taxonomy.** `EntlError` carries the five failure classes
//!    (NotFound, Validation, Conflict, InvalidState, NotConfigured) that the
//!    API maps onto HTTP responses.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `entl-*` crates.
//! - No `unsafe` code, no `.unwrap()` outside tests.
//! - OpenAPI schema derives are gated behind the `openapi` feature.

pub mod assignment;
pub mod catalog;
pub mod error;
pub mod identity;
pub mod permission;
pub mod plan;
pub mod temporal;

pub use assignment::{BranchRoleRow, ModuleRoleAssignment, RoleAssignmentInput};
pub use catalog::{Branch, Feature, GrantType, Module};
pub use error::{EntityKind, EntlError, EntlResult};
pub use identity::{BranchId, CompanyId, CustomerId, FeatureId, ModuleId, PlanId, Role, SubscriptionId};
pub use permission::{Action, PermissionFlags, PermissionGrant};
pub use plan::{NewPlan, Plan, PlanLimits, PlanStatus, PlanType, PlanUpdate, Price, RenewalMode, Validity};
pub use temporal::{add_days, BillingCycle, Timestamp};
