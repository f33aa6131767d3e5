use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use routegate_core_types::{PermissionRecord, RouteRequest, VirtualizationRecord};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::client::RegistryClient;
use crate::errors::{PersistError, RegistryError};
use crate::hierarchy::{HierarchyLookup, NoHierarchy};
use crate::local_copy::LocalCopy;
use crate::model::{
    ProcessingLog, RefreshOutcome, RegistrySnapshot, ResetOutcome, SnapshotSource,
};
use crate::routing::{ReceiverCandidates, RouteResult};

#[derive(Default)]
struct InitState {
    last: Option<RefreshOutcome>,
}

/// Process-wide routing and authorization cache.
///
/// Three independent primitives guard it:
/// `current` is read lock-free by every resolve call,
/// `refresh_lock` serializes fetch-and-persist cycles,
/// `init_lock` makes first-time initialization run once per wave of callers.
pub struct RegistryCache {
    client: Arc<dyn RegistryClient>,
    hierarchy: Arc<dyn HierarchyLookup>,
    local_copy: Option<LocalCopy>,
    address_delimiter: Option<String>,
    current: ArcSwapOption<RegistrySnapshot>,
    init_lock: Mutex<InitState>,
    init_attempts: AtomicU64,
    refresh_lock: Mutex<()>,
    revision: AtomicU64,
}

pub struct RegistryCacheBuilder {
    client: Arc<dyn RegistryClient>,
    hierarchy: Arc<dyn HierarchyLookup>,
    local_copy: Option<LocalCopy>,
    address_delimiter: Option<String>,
}

impl RegistryCacheBuilder {
    pub fn hierarchy(mut self, hierarchy: Arc<dyn HierarchyLookup>) -> Self {
        self.hierarchy = hierarchy;
        self
    }

    pub fn local_copy(mut self, local_copy: LocalCopy) -> Self {
        self.local_copy = Some(local_copy);
        self
    }

    /// Enables the deprecated multi-address receiver form.
    pub fn address_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        let delimiter = delimiter.into();
        self.address_delimiter = if delimiter.is_empty() {
            None
        } else {
            Some(delimiter)
        };
        self
    }

    pub fn build(self) -> RegistryCache {
        RegistryCache {
            client: self.client,
            hierarchy: self.hierarchy,
            local_copy: self.local_copy,
            address_delimiter: self.address_delimiter,
            current: ArcSwapOption::empty(),
            init_lock: Mutex::new(InitState::default()),
            init_attempts: AtomicU64::new(0),
            refresh_lock: Mutex::new(()),
            revision: AtomicU64::new(0),
        }
    }
}

impl RegistryCache {
    pub fn builder(client: Arc<dyn RegistryClient>) -> RegistryCacheBuilder {
        RegistryCacheBuilder {
            client,
            hierarchy: Arc::new(NoHierarchy),
            local_copy: None,
            address_delimiter: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.current.load().is_some()
    }

    /// Current snapshot, captured once per resolution.
    pub fn snapshot(&self) -> Option<Arc<RegistrySnapshot>> {
        self.current.load_full()
    }

    pub fn address_delimiter(&self) -> Option<&str> {
        self.address_delimiter.as_deref()
    }

    pub fn routes_loaded(&self) -> usize {
        self.current
            .load()
            .as_ref()
            .map(|snapshot| snapshot.routes_loaded())
            .unwrap_or(0)
    }

    pub fn permissions_loaded(&self) -> usize {
        self.current
            .load()
            .as_ref()
            .map(|snapshot| snapshot.permissions_loaded())
            .unwrap_or(0)
    }

    pub fn virtualizations(&self) -> Vec<VirtualizationRecord> {
        self.snapshot()
            .map(|snapshot| snapshot.virtualizations().to_vec())
            .unwrap_or_default()
    }

    pub fn permissions(&self) -> Vec<PermissionRecord> {
        self.snapshot()
            .map(|snapshot| snapshot.permissions().to_vec())
            .unwrap_or_default()
    }

    pub fn candidates_for(&self, receiver_id: &str, allow_legacy: bool) -> ReceiverCandidates {
        ReceiverCandidates::for_request(receiver_id, self.address_delimiter(), allow_legacy)
    }

    pub fn resolve_route(
        &self,
        request: &RouteRequest,
        allow_legacy: bool,
    ) -> Result<RouteResult, RegistryError> {
        let snapshot = self.snapshot().ok_or(RegistryError::NotInitialized)?;
        let candidates = self.candidates_for(&request.receiver_id, allow_legacy);
        let result = snapshot.resolve_route(request, &candidates);
        debug!(
            target: "registry-cache",
            request = %request,
            routed = result.is_routed(),
            visited = ?result.trace().visited,
            "route lookup"
        );
        Ok(result)
    }

    pub fn check_authorization(
        &self,
        request: &RouteRequest,
        candidates: &[String],
    ) -> Result<bool, RegistryError> {
        let snapshot = self.snapshot().ok_or(RegistryError::NotInitialized)?;
        Ok(snapshot.is_authorized(request, candidates))
    }

    /// Loads data once. Callers that queued behind a running attempt get
    /// that attempt's outcome instead of fetching again.
    pub async fn init(&self) -> RefreshOutcome {
        if self.is_initialized() {
            return self.already_initialized();
        }
        let seen = self.init_attempts.load(Ordering::Acquire);
        let mut state = self.init_lock.lock().await;
        if self.is_initialized() {
            return self.already_initialized();
        }
        if self.init_attempts.load(Ordering::Acquire) != seen {
            if let Some(last) = state.last.as_ref() {
                return last.clone();
            }
        }

        info!(target: "registry-cache", "initializing registry cache");
        let outcome = self.refresh(true).await;
        self.init_attempts.fetch_add(1, Ordering::AcqRel);
        state.last = Some(outcome.clone());
        outcome
    }

    /// Runs a fetch-and-rebuild cycle.
    ///
    /// A forced refresh waits for any running cycle. A non-forced one returns
    /// a skipped outcome when a cycle is already in progress.
    pub async fn refresh(&self, force: bool) -> RefreshOutcome {
        let _guard = if force {
            self.refresh_lock.lock().await
        } else {
            match self.refresh_lock.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    debug!(target: "registry-cache", "refresh already in progress; skipping");
                    let mut log = ProcessingLog::default();
                    log.push("Refresh already in progress, skipped");
                    return self.outcome(false, true, log);
                }
            }
        };
        self.run_cycle().await
    }

    /// Administrative forced refresh.
    pub async fn reset(&self) -> ResetOutcome {
        self.refresh(true).await.into()
    }

    async fn run_cycle(&self) -> RefreshOutcome {
        let mut log = ProcessingLog::requested();
        log.push("Refresh requested");

        match self.fetch_records(&mut log).await {
            Ok((virtualizations, permissions)) => {
                let snapshot = self.publish(SnapshotSource::Registry, virtualizations, permissions);
                log.refresh_successful = true;
                log.push(format!(
                    "Loaded {} routes and {} permissions from registry (revision {})",
                    snapshot.routes_loaded(),
                    snapshot.permissions_loaded(),
                    snapshot.revision
                ));
                info!(target: "registry-cache",
                    revision = snapshot.revision,
                    routes = snapshot.routes_loaded(),
                    permissions = snapshot.permissions_loaded(),
                    "registry cache refreshed"
                );
                self.persist(&snapshot, &mut log);
            }
            Err(err) => {
                warn!(target: "registry-cache", error = %err, "registry refresh failed");
                log.push(format!("Refresh failed: {err}"));
                if self.is_initialized() {
                    log.push("Continuing with previously loaded data");
                } else {
                    self.restore_local_copy(&mut log);
                }
            }
        }

        let success = log.refresh_successful;
        self.outcome(success, false, log)
    }

    async fn fetch_records(
        &self,
        log: &mut ProcessingLog,
    ) -> Result<(Vec<VirtualizationRecord>, Vec<PermissionRecord>), RegistryError> {
        let virtualizations = self.client.fetch_virtualizations().await?;
        log.push(format!(
            "Fetched {} virtualizations from registry",
            virtualizations.len()
        ));
        let permissions = self.client.fetch_permissions().await?;
        log.push(format!(
            "Fetched {} permissions from registry",
            permissions.len()
        ));
        if virtualizations.is_empty() {
            return Err(RegistryError::Empty("virtualizations"));
        }
        if permissions.is_empty() {
            return Err(RegistryError::Empty("permissions"));
        }
        Ok((virtualizations, permissions))
    }

    fn publish(
        &self,
        source: SnapshotSource,
        virtualizations: Vec<VirtualizationRecord>,
        permissions: Vec<PermissionRecord>,
    ) -> Arc<RegistrySnapshot> {
        let revision = self.revision.fetch_add(1, Ordering::AcqRel) + 1;
        let snapshot = Arc::new(RegistrySnapshot::build(
            revision,
            source,
            self.hierarchy.clone(),
            virtualizations,
            permissions,
        ));
        self.current.store(Some(snapshot.clone()));
        snapshot
    }

    fn persist(&self, snapshot: &RegistrySnapshot, log: &mut ProcessingLog) {
        let Some(local_copy) = self.local_copy.as_ref() else {
            return;
        };
        match local_copy.save(&snapshot.to_persisted()) {
            Ok(()) => log.push(format!(
                "Saved local copy to {}",
                local_copy.path().display()
            )),
            Err(err) => {
                warn!(target: "registry-cache", error = %err, "failed to save local copy");
                log.push(format!("Failed to save local copy: {err}"));
            }
        }
    }

    fn restore_local_copy(&self, log: &mut ProcessingLog) {
        let Some(local_copy) = self.local_copy.as_ref() else {
            log.push("No local copy configured; cache remains uninitialized");
            return;
        };
        match local_copy.load() {
            Ok(Some(persisted)) => {
                let snapshot = self.publish(
                    SnapshotSource::LocalCopy,
                    persisted.virtualizations,
                    persisted.permissions,
                );
                info!(target: "registry-cache",
                    path = %local_copy.path().display(),
                    routes = snapshot.routes_loaded(),
                    permissions = snapshot.permissions_loaded(),
                    "restored registry cache from local copy"
                );
                log.push(format!(
                    "Restored {} routes and {} permissions from local copy",
                    snapshot.routes_loaded(),
                    snapshot.permissions_loaded()
                ));
            }
            Ok(None) => {
                warn!(target: "registry-cache", path = %local_copy.path().display(), "no local copy available");
                log.push("No local copy found; cache remains uninitialized");
            }
            Err(err @ PersistError::Corrupt { .. }) => {
                warn!(target: "registry-cache", error = %err, "local copy discarded");
                log.push(format!("Local copy was unusable and has been removed: {err}"));
            }
            Err(err) => {
                warn!(target: "registry-cache", error = %err, "failed to read local copy");
                log.push(format!("Failed to read local copy: {err}"));
            }
        }
    }

    fn already_initialized(&self) -> RefreshOutcome {
        let mut log = ProcessingLog::default();
        log.push("Cache already initialized");
        self.outcome(true, false, log)
    }

    fn outcome(&self, success: bool, skipped: bool, log: ProcessingLog) -> RefreshOutcome {
        RefreshOutcome {
            success,
            initialized: self.is_initialized(),
            skipped,
            routes_loaded: self.routes_loaded(),
            permissions_loaded: self.permissions_loaded(),
            log,
        }
    }
}
