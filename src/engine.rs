//! Assembles the cache, admission controller and dispatcher from configuration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use routegate_admission::AdmissionController;
use routegate_dispatcher::{Forwarder, GatewayDispatcher, NoopForwarder};
use routegate_registry_cache::{
    spawn_refresh_loop, HierarchyLookup, HttpRegistryClient, LocalCopy, NoHierarchy,
    RegistryCache, RegistryClient, StaticHierarchy,
};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::GatewayConfig;

pub struct Engine {
    pub cache: Arc<RegistryCache>,
    pub admission: Arc<AdmissionController>,
    pub dispatcher: Arc<GatewayDispatcher>,
    refresh_interval: Duration,
    idle_eviction: Duration,
}

impl Engine {
    /// Builds an engine talking to the configured HTTP registry.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        config.validate().context("invalid gateway configuration")?;
        let client = HttpRegistryClient::new(
            config.registry.base_url.clone(),
            config.registry.request_timeout()?,
        )
        .context("failed to create registry client")?;
        Self::with_parts(config, Arc::new(client), Arc::new(NoopForwarder))
    }

    pub fn with_parts(
        config: &GatewayConfig,
        client: Arc<dyn RegistryClient>,
        forwarder: Arc<dyn Forwarder>,
    ) -> Result<Self> {
        config.validate().context("invalid gateway configuration")?;

        let hierarchy: Arc<dyn HierarchyLookup> = match config.hierarchy.path.as_ref() {
            Some(path) => {
                let loaded = StaticHierarchy::load_from_path(path).with_context(|| {
                    format!("failed to load hierarchy from {}", path.display())
                })?;
                info!(path = %path.display(), entries = loaded.len(), "loaded organization hierarchy");
                Arc::new(loaded)
            }
            None => Arc::new(NoHierarchy),
        };

        let mut builder = RegistryCache::builder(client).hierarchy(hierarchy);
        if let Some(path) = config.registry.local_copy_path.as_ref() {
            builder = builder.local_copy(LocalCopy::new(path));
        }
        if let Some(delimiter) = config.registry.address_delimiter.as_ref() {
            builder = builder.address_delimiter(delimiter.clone());
        }
        let cache = Arc::new(builder.build());

        let admission = AdmissionController::shared(config.admission.clone());
        let dispatcher = Arc::new(
            GatewayDispatcher::new(cache.clone(), admission.clone(), forwarder)
                .with_forward_timeout(config.dispatch.forward_timeout()),
        );

        Ok(Self {
            cache,
            admission,
            dispatcher,
            refresh_interval: config.registry.refresh_interval()?,
            idle_eviction: config.admission.sender.idle_eviction(),
        })
    }

    /// Starts the periodic refresh and sender-window pruning loops.
    pub fn spawn_maintenance(&self) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();
        if !self.refresh_interval.is_zero() {
            handles.push(spawn_refresh_loop(self.cache.clone(), self.refresh_interval));
        }
        if !self.idle_eviction.is_zero() {
            let admission = self.admission.clone();
            let max_idle = self.idle_eviction;
            handles.push(tokio::spawn(async move {
                let mut ticker = interval_at(Instant::now() + max_idle, max_idle);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    let removed = admission.prune_idle(max_idle);
                    if removed > 0 {
                        debug!(removed, "pruned idle sender windows");
                    }
                }
            }));
        }
        handles
    }
}
