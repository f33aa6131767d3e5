use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use routegate_core_types::{PermissionRecord, RouteRequest, VirtualizationRecord};
use serde::{Deserialize, Serialize};

use crate::authorization::AuthorizationIndex;
use crate::hierarchy::HierarchyLookup;
use crate::routing::{ReceiverCandidates, RouteResult, RoutingIndex};

/// Human readable trail of one refresh or reset cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProcessingLog {
    pub refresh_requested: bool,
    pub refresh_successful: bool,
    pub entries: Vec<String>,
}

impl ProcessingLog {
    pub fn requested() -> Self {
        Self {
            refresh_requested: true,
            ..Self::default()
        }
    }

    pub fn push(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }
}

impl fmt::Display for ProcessingLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, entry) in self.entries.iter().enumerate() {
            if idx > 0 {
                f.write_str("\n")?;
            }
            f.write_str(entry)?;
        }
        Ok(())
    }
}

/// Result of a refresh attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RefreshOutcome {
    pub success: bool,
    /// Whether the cache holds data after the attempt.
    pub initialized: bool,
    /// Set when a non-forced refresh found another one already running.
    pub skipped: bool,
    pub routes_loaded: usize,
    pub permissions_loaded: usize,
    pub log: ProcessingLog,
}

/// Operator facing result of a forced reset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResetOutcome {
    pub success: bool,
    pub permissions_loaded: usize,
    pub routes_loaded: usize,
    pub processing_log: Vec<String>,
}

impl From<RefreshOutcome> for ResetOutcome {
    fn from(outcome: RefreshOutcome) -> Self {
        Self {
            success: outcome.success,
            permissions_loaded: outcome.permissions_loaded,
            routes_loaded: outcome.routes_loaded,
            processing_log: outcome.log.entries,
        }
    }
}

/// On-disk shape of the local copy.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSnapshot {
    pub saved_at: Option<DateTime<Utc>>,
    pub virtualizations: Vec<VirtualizationRecord>,
    pub permissions: Vec<PermissionRecord>,
}

impl PersistedSnapshot {
    pub fn is_usable(&self) -> bool {
        !self.virtualizations.is_empty() && !self.permissions.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSource {
    Registry,
    LocalCopy,
}

impl fmt::Display for SnapshotSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotSource::Registry => f.write_str("registry"),
            SnapshotSource::LocalCopy => f.write_str("local copy"),
        }
    }
}

/// One consistent generation of routing plus authorization data.
///
/// Snapshots are never mutated once built; a refresh publishes a new one.
pub struct RegistrySnapshot {
    pub revision: u64,
    pub loaded_at: DateTime<Utc>,
    pub source: SnapshotSource,
    routing: RoutingIndex,
    authorization: AuthorizationIndex,
}

impl RegistrySnapshot {
    pub fn build(
        revision: u64,
        source: SnapshotSource,
        hierarchy: Arc<dyn HierarchyLookup>,
        virtualizations: Vec<VirtualizationRecord>,
        permissions: Vec<PermissionRecord>,
    ) -> Self {
        Self {
            revision,
            loaded_at: Utc::now(),
            source,
            routing: RoutingIndex::new(hierarchy.clone(), virtualizations),
            authorization: AuthorizationIndex::new(hierarchy, permissions),
        }
    }

    pub fn routes_loaded(&self) -> usize {
        self.routing.len()
    }

    pub fn permissions_loaded(&self) -> usize {
        self.authorization.len()
    }

    pub fn virtualizations(&self) -> &[VirtualizationRecord] {
        self.routing.records()
    }

    pub fn permissions(&self) -> &[PermissionRecord] {
        self.authorization.records()
    }

    pub fn resolve_route(&self, request: &RouteRequest, candidates: &ReceiverCandidates) -> RouteResult {
        self.routing.get_routing_information(request, candidates)
    }

    pub fn is_authorized(&self, request: &RouteRequest, candidates: &[String]) -> bool {
        self.authorization.is_authorized(request, candidates)
    }

    pub fn to_persisted(&self) -> PersistedSnapshot {
        PersistedSnapshot {
            saved_at: Some(Utc::now()),
            virtualizations: self.virtualizations().to_vec(),
            permissions: self.permissions().to_vec(),
        }
    }
}

impl fmt::Debug for RegistrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrySnapshot")
            .field("revision", &self.revision)
            .field("loaded_at", &self.loaded_at)
            .field("source", &self.source)
            .field("routes", &self.routes_loaded())
            .field("permissions", &self.permissions_loaded())
            .finish()
    }
}
