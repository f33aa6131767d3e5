use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use routegate_admission::AdmissionController;
use routegate_registry_cache::{RegistryCache, RouteMatch, RouteResult};
use tracing::{debug, info, warn};

use crate::error::Rejection;
use crate::forwarder::Forwarder;
use crate::metrics::{ServiceStatistics, ServiceStats};
use crate::model::{DispatchOutcome, ForwardTarget, InboundCall};

#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, call: InboundCall) -> Result<DispatchOutcome, Rejection>;
}

pub struct GatewayDispatcher {
    cache: Arc<RegistryCache>,
    admission: Arc<AdmissionController>,
    forwarder: Arc<dyn Forwarder>,
    forward_timeout: Option<Duration>,
    stats: ServiceStats,
}

impl GatewayDispatcher {
    pub fn new(
        cache: Arc<RegistryCache>,
        admission: Arc<AdmissionController>,
        forwarder: Arc<dyn Forwarder>,
    ) -> Self {
        Self {
            cache,
            admission,
            forwarder,
            forward_timeout: None,
            stats: ServiceStats::default(),
        }
    }

    pub fn with_forward_timeout(mut self, timeout: Duration) -> Self {
        self.forward_timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    pub fn cache(&self) -> &Arc<RegistryCache> {
        &self.cache
    }

    pub fn admission(&self) -> &Arc<AdmissionController> {
        &self.admission
    }

    pub fn statistics(&self) -> Vec<ServiceStatistics> {
        self.stats.snapshot()
    }

    /// Resolves and authorizes without forwarding or admission.
    pub async fn plan(&self, call: &InboundCall) -> Result<ForwardTarget, Rejection> {
        if !self.cache.is_initialized() {
            self.cache.init().await;
        }
        let snapshot = self.cache.snapshot().ok_or(Rejection::NotInitialized)?;
        let request = &call.request;
        let candidates = self
            .cache
            .candidates_for(&request.receiver_id, call.allow_legacy);

        let found = match snapshot.resolve_route(request, &candidates) {
            RouteResult::Routed(found) => found,
            RouteResult::NoRoute(trace) => {
                debug!(target: "dispatcher", call = %call.call_id, visited = ?trace.visited, "no route");
                return Err(Rejection::NoRoute {
                    receiver: request.receiver_id.clone(),
                    contract: request.contract_namespace.clone(),
                });
            }
        };
        debug!(
            target: "dispatcher",
            call = %call.call_id,
            matched = %found.matched_address,
            visited = ?found.trace.visited,
            "route resolved"
        );

        if !snapshot.is_authorized(request, &found.authorization_candidates) {
            return Err(Rejection::NotAuthorized {
                sender: request.sender_id.clone(),
                receiver: request.receiver_id.clone(),
                contract: request.contract_namespace.clone(),
            });
        }

        select_target(call, &found)
    }
}

#[async_trait]
impl Dispatcher for GatewayDispatcher {
    async fn dispatch(&self, call: InboundCall) -> Result<DispatchOutcome, Rejection> {
        // Held until this future completes or is dropped.
        let _permit = self
            .admission
            .admit(&call.request.sender_id)
            .await
            .map_err(|err| {
                warn!(target: "dispatcher", call = %call.call_id, sender = %call.request.sender_id, error = %err, "call rejected by admission control");
                Rejection::from(err)
            })?;

        let target = self.plan(&call).await.map_err(|rejection| {
            info!(target: "dispatcher", call = %call.call_id, kind = rejection.kind(), "{}", rejection);
            rejection
        })?;

        let service = call.service_key();
        self.stats.record_call(&service);
        let started = Instant::now();
        let forwarding = self.forwarder.forward(&target, &call);
        let result = match self.forward_timeout {
            Some(timeout) => {
                let timed = tokio::time::timeout(timeout, forwarding).await;
                match timed {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(target: "dispatcher", call = %call.call_id, address = %target.physical_address, "forward timed out");
                        return Err(Rejection::Timeout {
                            address: target.physical_address,
                            timeout,
                        });
                    }
                }
            }
            None => forwarding.await,
        };
        let elapsed = started.elapsed();

        match result {
            Ok(response) => {
                self.stats.record_success(&service, elapsed);
                Ok(DispatchOutcome {
                    call_id: call.call_id,
                    target,
                    response,
                    elapsed,
                })
            }
            Err(source) => {
                warn!(target: "dispatcher", call = %call.call_id, address = %target.physical_address, error = %source, "forward failed");
                Err(Rejection::ForwardFailed {
                    address: target.physical_address,
                    source,
                })
            }
        }
    }
}

/// Narrows the matched records to a single physical address.
fn select_target(call: &InboundCall, found: &RouteMatch) -> Result<ForwardTarget, Rejection> {
    let records: Vec<_> = match call.transport_profile.as_deref() {
        Some(profile) => found
            .records
            .iter()
            .filter(|record| record.transport_profile == profile)
            .collect(),
        None => found.records.iter().collect(),
    };

    let Some(first) = records.first() else {
        return Err(Rejection::ProfileMismatch {
            receiver: call.request.receiver_id.clone(),
            profile: call.transport_profile.clone().unwrap_or_default(),
        });
    };

    let mut addresses: Vec<String> = Vec::new();
    for record in &records {
        if !addresses.contains(&record.physical_address) {
            addresses.push(record.physical_address.clone());
        }
    }
    if addresses.len() > 1 {
        return Err(Rejection::AmbiguousRoute {
            receiver: call.request.receiver_id.clone(),
            addresses,
        });
    }

    Ok(ForwardTarget {
        physical_address: first.physical_address.clone(),
        transport_profile: first.transport_profile.clone(),
        matched_receiver: found.matched_address.clone(),
    })
}
