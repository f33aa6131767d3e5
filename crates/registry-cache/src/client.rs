//! Registry transport seam.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use routegate_core_types::{PermissionRecord, VirtualizationRecord};
use serde::de::DeserializeOwned;

use crate::errors::RegistryError;

/// Fetches the full record sets from the central registry.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    async fn fetch_virtualizations(&self) -> Result<Vec<VirtualizationRecord>, RegistryError>;
    async fn fetch_permissions(&self) -> Result<Vec<PermissionRecord>, RegistryError>;
}

/// JSON over HTTP: `GET {base}/virtualizations` and `GET {base}/permissions`.
pub struct HttpRegistryClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpRegistryClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RegistryError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| RegistryError::Fetch(format!("failed to build http client: {err}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RegistryError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|err| RegistryError::Fetch(format!("GET {url}: {err}")))?
            .error_for_status()
            .map_err(|err| RegistryError::Fetch(format!("GET {url}: {err}")))?;
        response
            .json::<T>()
            .await
            .map_err(|err| RegistryError::Fetch(format!("GET {url}: invalid body: {err}")))
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn fetch_virtualizations(&self) -> Result<Vec<VirtualizationRecord>, RegistryError> {
        self.get_json("virtualizations").await
    }

    async fn fetch_permissions(&self) -> Result<Vec<PermissionRecord>, RegistryError> {
        self.get_json("permissions").await
    }
}

/// In-memory registry used by tests and offline runs.
///
/// The record sets can be swapped at any time and the client can be told to
/// fail, which is how tests simulate a registry outage.
#[derive(Default)]
pub struct StaticRegistryClient {
    virtualizations: Mutex<Vec<VirtualizationRecord>>,
    permissions: Mutex<Vec<PermissionRecord>>,
    failing: Mutex<Option<String>>,
    fetches: AtomicUsize,
}

impl StaticRegistryClient {
    pub fn new(virtualizations: Vec<VirtualizationRecord>, permissions: Vec<PermissionRecord>) -> Self {
        Self {
            virtualizations: Mutex::new(virtualizations),
            permissions: Mutex::new(permissions),
            failing: Mutex::new(None),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn set_virtualizations(&self, records: Vec<VirtualizationRecord>) {
        *self.virtualizations.lock() = records;
    }

    pub fn set_permissions(&self, records: Vec<PermissionRecord>) {
        *self.permissions.lock() = records;
    }

    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.failing.lock() = Some(reason.into());
    }

    pub fn recover(&self) {
        *self.failing.lock() = None;
    }

    /// Number of virtualization fetches served, one per refresh cycle.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn check_failing(&self) -> Result<(), RegistryError> {
        match self.failing.lock().as_ref() {
            Some(reason) => Err(RegistryError::Fetch(reason.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RegistryClient for StaticRegistryClient {
    async fn fetch_virtualizations(&self) -> Result<Vec<VirtualizationRecord>, RegistryError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.check_failing()?;
        Ok(self.virtualizations.lock().clone())
    }

    async fn fetch_permissions(&self) -> Result<Vec<PermissionRecord>, RegistryError> {
        self.check_failing()?;
        Ok(self.permissions.lock().clone())
    }
}
