//! # API Route Modules
//!
//! - `catalog` — modules, features and branches.
//! - `plans` — plan CRUD, duplication, permission grants, role assignments.
//! - `matrix` — effective matrices, single-module resolution, action checks.
//! - `subscriptions` — assignment, overrides, lifecycle, masked access,
//!   expiry sweep.
//! - `analytics` — console statistics.

pub mod analytics;
pub mod catalog;
pub mod matrix;
pub mod plans;
pub mod subscriptions;
