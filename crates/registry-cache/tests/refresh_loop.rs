use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use routegate_core_types::{PermissionRecord, RouteRequest, VirtualizationRecord};
use routegate_registry_cache::{
    spawn_refresh_loop, LocalCopy, RegistryCache, RouteResult, StaticHierarchy,
    StaticRegistryClient,
};

fn route(receiver: &str, address: &str) -> VirtualizationRecord {
    VirtualizationRecord {
        receiver_id: receiver.into(),
        contract_namespace: "urn:riv:clinicalprocess:GetCareDocumentation:2".into(),
        transport_profile: "RIVTABP21".into(),
        physical_address: address.into(),
        valid_from: Utc.timestamp_opt(0, 0).unwrap(),
        valid_to: None,
    }
}

fn grant(sender: &str, receiver: &str) -> PermissionRecord {
    PermissionRecord {
        sender_id: sender.into(),
        receiver_id: receiver.into(),
        contract_namespace: "urn:riv:clinicalprocess:GetCareDocumentation:2".into(),
        valid_from: Utc.timestamp_opt(0, 0).unwrap(),
        valid_to: None,
    }
}

#[tokio::test]
async fn background_loop_picks_up_registry_changes() {
    let client = Arc::new(StaticRegistryClient::new(
        vec![route("receiver-1", "http://one")],
        vec![grant("tp", "receiver-1")],
    ));
    let cache = Arc::new(RegistryCache::builder(client.clone()).build());
    assert!(cache.init().await.success);

    client.set_virtualizations(vec![
        route("receiver-1", "http://one"),
        route("receiver-2", "http://two"),
    ]);
    let handle = spawn_refresh_loop(cache.clone(), Duration::from_millis(20));

    let mut observed = cache.routes_loaded();
    for _ in 0..50 {
        if observed == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        observed = cache.routes_loaded();
    }
    handle.abort();
    assert_eq!(observed, 2);
    assert!(client.fetch_count() >= 2);
}

#[tokio::test]
async fn outage_after_startup_keeps_serving_hierarchy_routes() {
    let dir = tempfile::tempdir().unwrap();
    let hierarchy = StaticHierarchy::default()
        .with_parent("region", "country")
        .with_parent("clinic", "region");
    let client = Arc::new(StaticRegistryClient::new(
        vec![route("region", "http://region")],
        vec![grant("tp", "country")],
    ));
    let cache = RegistryCache::builder(client.clone())
        .hierarchy(Arc::new(hierarchy))
        .local_copy(LocalCopy::new(dir.path().join("registry.json")))
        .build();
    assert!(cache.init().await.success);

    client.fail_with("registry offline");
    let outcome = cache.refresh(true).await;
    assert!(!outcome.success);

    let request = RouteRequest::new(
        "tp",
        "clinic",
        "urn:riv:clinicalprocess:GetCareDocumentation:2",
    );
    let RouteResult::Routed(found) = cache.resolve_route(&request, false).unwrap() else {
        panic!("expected hierarchy route");
    };
    assert_eq!(found.matched_address, "region");
    assert!(cache
        .check_authorization(&request, &found.authorization_candidates)
        .unwrap());
}
