use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Correlation id attached to every inbound call.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct CallId(pub String);

impl CallId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Half-open validity check shared by every time-bounded record.
///
/// `valid_from <= at < valid_to`; a missing `valid_to` never expires.
pub fn interval_contains(
    valid_from: DateTime<Utc>,
    valid_to: Option<DateTime<Utc>>,
    at: DateTime<Utc>,
) -> bool {
    if at < valid_from {
        return false;
    }
    match valid_to {
        Some(end) => at < end,
        None => true,
    }
}

/// One physical producer endpoint for a logical receiver and contract.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "camelCase"))]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VirtualizationRecord {
    pub receiver_id: String,
    pub contract_namespace: String,
    pub transport_profile: String,
    pub physical_address: String,
    pub valid_from: DateTime<Utc>,
    #[cfg_attr(feature = "serde-full", serde(default))]
    pub valid_to: Option<DateTime<Utc>>,
}

impl VirtualizationRecord {
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        interval_contains(self.valid_from, self.valid_to, at)
    }
}

/// Grant for a sender to call a receiver for one contract.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "camelCase"))]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PermissionRecord {
    pub sender_id: String,
    pub receiver_id: String,
    pub contract_namespace: String,
    pub valid_from: DateTime<Utc>,
    #[cfg_attr(feature = "serde-full", serde(default))]
    pub valid_to: Option<DateTime<Utc>>,
}

impl PermissionRecord {
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        interval_contains(self.valid_from, self.valid_to, at)
    }
}

/// The logical triple of an inbound call plus the instant it is evaluated at.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RouteRequest {
    pub sender_id: String,
    pub receiver_id: String,
    pub contract_namespace: String,
    pub at: DateTime<Utc>,
}

impl RouteRequest {
    pub fn new(
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        contract_namespace: impl Into<String>,
    ) -> Self {
        Self {
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            contract_namespace: contract_namespace.into(),
            at: Utc::now(),
        }
    }

    pub fn at(mut self, at: DateTime<Utc>) -> Self {
        self.at = at;
        self
    }
}

impl fmt::Display for RouteRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sender={} receiver={} contract={} at={}",
            self.sender_id,
            self.receiver_id,
            self.contract_namespace,
            self.at.to_rfc3339()
        )
    }
}
