use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use routegate_admission::{AdmissionConfig, AdmissionController, SenderThrottleConfig};
use routegate_core_types::{PermissionRecord, RouteRequest, VirtualizationRecord};
use routegate_dispatcher::{
    Dispatcher, ForwardError, ForwardResponse, ForwardTarget, Forwarder, GatewayDispatcher,
    InboundCall, NoopForwarder, Rejection,
};
use routegate_registry_cache::{RegistryCache, StaticHierarchy, StaticRegistryClient};

const CONTRACT: &str = "urn:riv:crm:scheduling:GetSubjectOfCareSchedule:1";

fn route(receiver: &str, profile: &str, address: &str) -> VirtualizationRecord {
    VirtualizationRecord {
        receiver_id: receiver.into(),
        contract_namespace: CONTRACT.into(),
        transport_profile: profile.into(),
        physical_address: address.into(),
        valid_from: Utc.timestamp_opt(0, 0).unwrap(),
        valid_to: None,
    }
}

fn grant(sender: &str, receiver: &str) -> PermissionRecord {
    PermissionRecord {
        sender_id: sender.into(),
        receiver_id: receiver.into(),
        contract_namespace: CONTRACT.into(),
        valid_from: Utc.timestamp_opt(0, 0).unwrap(),
        valid_to: None,
    }
}

fn cache_with(
    virtualizations: Vec<VirtualizationRecord>,
    permissions: Vec<PermissionRecord>,
) -> Arc<RegistryCache> {
    let client = Arc::new(StaticRegistryClient::new(virtualizations, permissions));
    Arc::new(
        RegistryCache::builder(client)
            .hierarchy(Arc::new(
                StaticHierarchy::default().with_parent("clinic", "region"),
            ))
            .address_delimiter("#")
            .build(),
    )
}

fn default_cache() -> Arc<RegistryCache> {
    cache_with(
        vec![
            route("receiver-1", "RIVTABP21", "https://producer-1/service"),
            route("region", "RIVTABP21", "https://region/service"),
        ],
        vec![grant("tp", "receiver-1"), grant("tp", "region")],
    )
}

fn dispatcher(cache: Arc<RegistryCache>, forwarder: Arc<dyn Forwarder>) -> GatewayDispatcher {
    GatewayDispatcher::new(
        cache,
        AdmissionController::shared(AdmissionConfig::default()),
        forwarder,
    )
}

fn call(sender: &str, receiver: &str) -> InboundCall {
    InboundCall::new(RouteRequest::new(sender, receiver, CONTRACT))
}

#[derive(Default)]
struct RecordingForwarder {
    calls: AtomicUsize,
}

#[async_trait]
impl Forwarder for RecordingForwarder {
    async fn forward(
        &self,
        target: &ForwardTarget,
        _call: &InboundCall,
    ) -> Result<ForwardResponse, ForwardError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ForwardResponse {
            status: 200,
            body: target.physical_address.clone().into_bytes(),
        })
    }
}

struct SlowForwarder(Duration);

#[async_trait]
impl Forwarder for SlowForwarder {
    async fn forward(
        &self,
        _target: &ForwardTarget,
        _call: &InboundCall,
    ) -> Result<ForwardResponse, ForwardError> {
        tokio::time::sleep(self.0).await;
        Ok(ForwardResponse::default())
    }
}

struct FailingForwarder;

#[async_trait]
impl Forwarder for FailingForwarder {
    async fn forward(
        &self,
        _target: &ForwardTarget,
        _call: &InboundCall,
    ) -> Result<ForwardResponse, ForwardError> {
        Err(ForwardError::Producer { status: 500 })
    }
}

#[tokio::test]
async fn routes_authorizes_and_forwards() {
    let forwarder = Arc::new(RecordingForwarder::default());
    let dispatcher = dispatcher(default_cache(), forwarder.clone());

    let outcome = dispatcher.dispatch(call("tp", "receiver-1")).await.unwrap();
    assert_eq!(outcome.target.physical_address, "https://producer-1/service");
    assert_eq!(outcome.response.body, b"https://producer-1/service".to_vec());
    assert_eq!(forwarder.calls.load(Ordering::SeqCst), 1);
    assert!(dispatcher.cache().is_initialized());
    assert_eq!(dispatcher.admission().inflight(), 0);

    let stats = dispatcher.statistics();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].service, format!("{CONTRACT}-receiver-1"));
    assert_eq!(stats[0].successful_calls, 1);
}

#[tokio::test]
async fn unknown_receiver_is_no_route() {
    let dispatcher = dispatcher(default_cache(), Arc::new(NoopForwarder));
    let rejection = dispatcher.dispatch(call("tp", "nobody")).await.unwrap_err();
    assert_eq!(rejection.kind(), "no_route");
}

#[tokio::test]
async fn missing_permission_is_not_authorized() {
    let forwarder = Arc::new(RecordingForwarder::default());
    let dispatcher = dispatcher(default_cache(), forwarder.clone());
    let rejection = dispatcher
        .dispatch(call("stranger", "receiver-1"))
        .await
        .unwrap_err();
    assert_eq!(rejection.kind(), "not_authorized");
    assert_eq!(forwarder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn hierarchy_route_and_grant_cover_child_receiver() {
    let dispatcher = dispatcher(default_cache(), Arc::new(NoopForwarder));
    let outcome = dispatcher.dispatch(call("tp", "clinic")).await.unwrap();
    assert_eq!(outcome.target.physical_address, "https://region/service");
    assert_eq!(outcome.target.matched_receiver, "region");
}

#[tokio::test]
async fn legacy_form_requires_opt_in() {
    let dispatcher = dispatcher(default_cache(), Arc::new(NoopForwarder));
    let plain = dispatcher
        .dispatch(call("tp", "unknown#receiver-1"))
        .await
        .unwrap_err();
    assert_eq!(plain.kind(), "no_route");

    let outcome = dispatcher
        .dispatch(call("tp", "unknown#receiver-1").with_legacy(true))
        .await
        .unwrap();
    assert_eq!(outcome.target.matched_receiver, "receiver-1");
}

#[tokio::test]
async fn empty_registry_reports_not_initialized() {
    let cache = cache_with(vec![route("receiver-1", "RIVTABP21", "https://p")], Vec::new());
    let dispatcher = dispatcher(cache, Arc::new(NoopForwarder));
    let rejection = dispatcher.dispatch(call("tp", "receiver-1")).await.unwrap_err();
    assert_eq!(rejection, Rejection::NotInitialized);
    assert_eq!(rejection.status(), 503);
}

#[tokio::test]
async fn transport_profile_filters_records() {
    let cache = cache_with(
        vec![
            route("receiver-1", "RIVTABP20", "https://old/service"),
            route("receiver-1", "RIVTABP21", "https://new/service"),
        ],
        vec![grant("tp", "receiver-1")],
    );
    let dispatcher = dispatcher(cache, Arc::new(NoopForwarder));

    let outcome = dispatcher
        .dispatch(call("tp", "receiver-1").with_profile("RIVTABP21"))
        .await
        .unwrap();
    assert_eq!(outcome.target.physical_address, "https://new/service");

    let mismatch = dispatcher
        .dispatch(call("tp", "receiver-1").with_profile("SOAP11"))
        .await
        .unwrap_err();
    assert_eq!(mismatch.kind(), "profile_mismatch");

    let ambiguous = dispatcher
        .dispatch(call("tp", "receiver-1"))
        .await
        .unwrap_err();
    assert_eq!(ambiguous.kind(), "ambiguous_route");
}

#[tokio::test]
async fn inflight_limit_rejects_before_routing() {
    let admission = AdmissionController::shared(AdmissionConfig {
        max_inflight: 1,
        ..AdmissionConfig::default()
    });
    let dispatcher = Arc::new(GatewayDispatcher::new(
        default_cache(),
        admission.clone(),
        Arc::new(SlowForwarder(Duration::from_millis(200))),
    ));

    let first = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move { dispatcher.dispatch(call("tp", "receiver-1")).await })
    };
    for _ in 0..100 {
        if admission.inflight() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let rejection = dispatcher.dispatch(call("tp", "receiver-1")).await.unwrap_err();
    assert_eq!(rejection.kind(), "overloaded");
    assert!(rejection.is_capacity());

    assert!(first.await.unwrap().is_ok());
    assert_eq!(admission.inflight(), 0);
    assert!(dispatcher.dispatch(call("tp", "receiver-1")).await.is_ok());
}

#[tokio::test]
async fn sender_throttle_surfaces_distinct_rejection() {
    let admission = AdmissionController::shared(AdmissionConfig {
        sender: SenderThrottleConfig {
            max_requests: 1,
            time_period_ms: 60_000,
            reject_execution: true,
            ..SenderThrottleConfig::default()
        },
        ..AdmissionConfig::default()
    });
    let dispatcher = GatewayDispatcher::new(default_cache(), admission, Arc::new(NoopForwarder));
    assert!(dispatcher.dispatch(call("tp", "receiver-1")).await.is_ok());
    let rejection = dispatcher.dispatch(call("tp", "receiver-1")).await.unwrap_err();
    assert_eq!(rejection.status(), 429);
}

#[tokio::test]
async fn forward_timeout_releases_slot() {
    let admission = AdmissionController::shared(AdmissionConfig {
        max_inflight: 1,
        ..AdmissionConfig::default()
    });
    let dispatcher = GatewayDispatcher::new(
        default_cache(),
        admission.clone(),
        Arc::new(SlowForwarder(Duration::from_secs(5))),
    )
    .with_forward_timeout(Duration::from_millis(20));

    let rejection = dispatcher.dispatch(call("tp", "receiver-1")).await.unwrap_err();
    assert_eq!(rejection.kind(), "timeout");
    assert_eq!(rejection.status(), 504);
    assert_eq!(admission.inflight(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancelled_dispatch_releases_slot() {
    let admission = AdmissionController::shared(AdmissionConfig {
        max_inflight: 1,
        ..AdmissionConfig::default()
    });
    let dispatcher = Arc::new(GatewayDispatcher::new(
        default_cache(),
        admission.clone(),
        Arc::new(SlowForwarder(Duration::from_secs(60))),
    ));

    let task = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move { dispatcher.dispatch(call("tp", "receiver-1")).await })
    };
    for _ in 0..200 {
        if admission.inflight() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(admission.inflight(), 1);

    task.abort();
    let _ = task.await;
    assert_eq!(admission.inflight(), 0);
}

#[tokio::test]
async fn producer_failure_is_forward_failed() {
    let dispatcher = dispatcher(default_cache(), Arc::new(FailingForwarder));
    let rejection = dispatcher.dispatch(call("tp", "receiver-1")).await.unwrap_err();
    assert_eq!(rejection.kind(), "forward_failed");
    assert_eq!(rejection.status(), 502);

    let stats = dispatcher.statistics();
    assert_eq!(stats[0].calls, 1);
    assert_eq!(stats[0].successful_calls, 0);
}
