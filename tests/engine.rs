use std::sync::Arc;

use chrono::{TimeZone, Utc};
use routegate_cli::{Engine, GatewayConfig};
use routegate_core_types::{PermissionRecord, RouteRequest, VirtualizationRecord};
use routegate_dispatcher::{Dispatcher, InboundCall, NoopForwarder};
use routegate_registry_cache::StaticRegistryClient;

const CONTRACT: &str = "urn:riv:itintegration:registry:GetLogicalAddressees:2";

fn records() -> (Vec<VirtualizationRecord>, Vec<PermissionRecord>) {
    let epoch = Utc.timestamp_opt(0, 0).unwrap();
    (
        vec![VirtualizationRecord {
            receiver_id: "region".into(),
            contract_namespace: CONTRACT.into(),
            transport_profile: "RIVTABP21".into(),
            physical_address: "https://region.example/service".into(),
            valid_from: epoch,
            valid_to: None,
        }],
        vec![PermissionRecord {
            sender_id: "tp".into(),
            receiver_id: "region".into(),
            contract_namespace: CONTRACT.into(),
            valid_from: epoch,
            valid_to: None,
        }],
    )
}

fn config_in(dir: &std::path::Path) -> GatewayConfig {
    let hierarchy = dir.join("hierarchy.yaml");
    std::fs::write(&hierarchy, "clinic:\n  - region\n").unwrap();
    let yaml = format!(
        r#"
registry:
  base_url: "http://registry.invalid"
  refresh_interval: "0s"
  local_copy_path: "{}"
admission:
  max_inflight: 4
dispatch:
  forward_timeout_ms: 1000
hierarchy:
  path: "{}"
"#,
        dir.join("local-copy.json").display(),
        hierarchy.display()
    );
    serde_yaml::from_str(&yaml).unwrap()
}

#[tokio::test]
async fn engine_wires_hierarchy_local_copy_and_dispatcher() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let (virtualizations, permissions) = records();
    let client = Arc::new(StaticRegistryClient::new(virtualizations, permissions));

    let engine = Engine::with_parts(&config, client, Arc::new(NoopForwarder)).unwrap();
    let handles = engine.spawn_maintenance();
    assert_eq!(handles.len(), 1);
    for handle in handles {
        handle.abort();
    }

    let call = InboundCall::new(RouteRequest::new("tp", "clinic", CONTRACT)).with_payload("ping");
    let outcome = engine.dispatcher.dispatch(call).await.unwrap();
    assert_eq!(outcome.target.physical_address, "https://region.example/service");
    assert_eq!(outcome.response.body, b"ping".to_vec());
    assert!(dir.path().join("local-copy.json").exists());
}

#[tokio::test]
async fn engine_restores_from_local_copy_when_registry_is_down() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let (virtualizations, permissions) = records();

    let online = Arc::new(StaticRegistryClient::new(virtualizations, permissions));
    let first = Engine::with_parts(&config, online, Arc::new(NoopForwarder)).unwrap();
    assert!(first.cache.init().await.success);

    let offline = Arc::new(StaticRegistryClient::default());
    offline.fail_with("connection refused");
    let second = Engine::with_parts(&config, offline, Arc::new(NoopForwarder)).unwrap();
    let reset = second.cache.reset().await;
    assert!(!reset.success);
    assert_eq!(reset.routes_loaded, 1);
    assert_eq!(reset.permissions_loaded, 1);
}

#[test]
fn invalid_configuration_is_rejected() {
    let mut config = GatewayConfig::default();
    config.admission.sender.max_requests = 5;
    config.admission.sender.time_period_ms = 0;
    let client = Arc::new(StaticRegistryClient::default());
    assert!(Engine::with_parts(&config, client, Arc::new(NoopForwarder)).is_err());
}
