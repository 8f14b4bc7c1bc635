//! # Temporal Types
//!
//! `Timestamp` is a UTC instant truncated to seconds, used for audit fields
//! (`created_at`, transition times). Subscription terms are calendar dates
//! (`chrono::NaiveDate`); an `end_date` is exclusive, the first day the
//! subscription no longer covers.
//!
//! `BillingCycle` advances a date by one calendar month or year. Month-end
//! starts clamp to the last day of the target month (Jan 31 → Feb 29 in a
//! leap year).

use chrono::{DateTime, Months, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EntlError;

/// A UTC-only timestamp, truncated to seconds precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse an RFC 3339 string. Only the `Z` suffix is accepted.
    pub fn parse(s: &str) -> Result<Self, EntlError> {
        if !s.ends_with('Z') {
            return Err(EntlError::validation(format!(
                "timestamp must use Z suffix (UTC only), got {s:?}"
            )));
        }
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| EntlError::validation(format!("invalid timestamp {s:?}: {e}")))?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// The UTC calendar date of this instant.
    pub fn date(&self) -> NaiveDate {
        self.0.date_naive()
    }

    /// Render as `YYYY-MM-DDTHH:MM:SSZ`.
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

/// How often a subscription is billed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum BillingCycle {
    Monthly,
    Yearly,
}

impl BillingCycle {
    /// Advance `from` by one billing period.
    pub fn advance(&self, from: NaiveDate) -> Result<NaiveDate, EntlError> {
        let months = match self {
            Self::Monthly => Months::new(1),
            Self::Yearly => Months::new(12),
        };
        from.checked_add_months(months)
            .ok_or_else(|| EntlError::validation(format!("date {from} out of range")))
    }
}

impl std::fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Monthly => f.write_str("Monthly"),
            Self::Yearly => f.write_str("Yearly"),
        }
    }
}

impl std::str::FromStr for BillingCycle {
    type Err = EntlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            _ => Err(EntlError::validation(format!("unknown billing cycle {s:?}"))),
        }
    }
}

/// Add `days` to `from`, failing on calendar overflow.
pub fn add_days(from: NaiveDate, days: u32) -> Result<NaiveDate, EntlError> {
    from.checked_add_days(chrono::Days::new(u64::from(days)))
        .ok_or_else(|| EntlError::validation(format!("date {from} + {days} days out of range")))
}
