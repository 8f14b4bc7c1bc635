//! # Identifier Newtypes
//!
//! Newtype wrappers for every identifier the entitlement service handles.
//! A `FeatureId` cannot be passed where a `ModuleId` is expected, and none
//! of them can hold a malformed string: construction and deserialization
//! share the same validation.
//!
//! Catalog and plan identifiers are stable, human-assigned codes
//! (`PLN-002`, `finance`, `finance.journal_entry`): 1–64 characters of
//! ASCII alphanumerics, `-`, `_` and `.`. Customer identifiers come from
//! the external customer registry and are only required to be non-blank.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EntlError;

const MAX_CODE_LEN: usize = 64;
const MAX_FREE_LEN: usize = 128;

fn validate_code(kind: &str, value: &str) -> Result<(), EntlError> {
    if value.is_empty() {
        return Err(EntlError::validation(format!("{kind} must not be empty")));
    }
    if value.len() > MAX_CODE_LEN {
        return Err(EntlError::validation(format!(
            "{kind} must not exceed {MAX_CODE_LEN} characters"
        )));
    }
    if let Some(c) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(EntlError::validation(format!(
            "{kind} {value:?} contains invalid character {c:?}"
        )));
    }
    Ok(())
}

macro_rules! code_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Construct a validated identifier.
            pub fn new(value: impl Into<String>) -> Result<Self, EntlError> {
                let value = value.into();
                validate_code($label, &value)?;
                Ok(Self(value))
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = EntlError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = EntlError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }
    };
}

code_id!(
    /// Stable plan code, e.g. `PLN-002`.
    PlanId,
    "plan id"
);
code_id!(
    /// Top-level product area, e.g. `finance`.
    ModuleId,
    "module id"
);
code_id!(
    /// Permissionable unit within a module, e.g. `finance.journal_entry`.
    FeatureId,
    "feature id"
);
code_id!(
    /// Organizational sub-unit of a company.
    BranchId,
    "branch id"
);
code_id!(
    /// Owning company of a branch. Companies live outside this service.
    CompanyId,
    "company id"
);
code_id!(
    /// Customer subscription identifier, e.g. `sub_1`.
    SubscriptionId,
    "subscription id"
);

impl SubscriptionId {
    /// Generate a fresh random subscription identifier.
    pub fn generate() -> Self {
        Self(format!("sub_{}", Uuid::new_v4().simple()))
    }
}

/// Identifier of a customer in the external customer registry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(try_from = "String", into = "String")]
pub struct CustomerId(String);

impl CustomerId {
    /// Construct a customer id; surrounding whitespace is trimmed.
    pub fn new(value: impl Into<String>) -> Result<Self, EntlError> {
        let value = value.into().trim().to_string();
        if value.is_empty() {
            return Err(EntlError::validation("customer id must not be empty"));
        }
        if value.len() > MAX_FREE_LEN {
            return Err(EntlError::validation(format!(
                "customer id must not exceed {MAX_FREE_LEN} characters"
            )));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CustomerId {
    type Error = EntlError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CustomerId> for String {
    fn from(id: CustomerId) -> Self {
        id.0
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A role name granted within a module (`Admin`, `Manager`, `Project User`).
///
/// The console's `Select Role` placeholder is rejected: it means no role
/// has been chosen, which the store represents as a missing assignment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(try_from = "String", into = "String")]
pub struct Role(String);

impl Role {
    pub fn new(value: impl Into<String>) -> Result<Self, EntlError> {
        let value = value.into().trim().to_string();
        if value.is_empty() {
            return Err(EntlError::validation("role must not be blank"));
        }
        if value.len() > MAX_CODE_LEN {
            return Err(EntlError::validation(format!(
                "role must not exceed {MAX_CODE_LEN} characters"
            )));
        }
        if value.eq_ignore_ascii_case("select role") {
            return Err(EntlError::validation("role placeholder is not a role"));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Role {
    type Error = EntlError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.0
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
