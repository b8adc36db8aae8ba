//! End-to-end cycles: scripted metrics through detection to the webhook

use aiops_agent::{
    MetricSnapshot,
    agent::Agent,
    alerts::{AlertManager, AlertPayload},
    detector::{AnomalyKind, Severity},
    export::SnapshotCache,
};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

fn agent_for(server: &MockServer, snapshots: Vec<MetricSnapshot>) -> Agent {
    let config = create_test_config(Some(format!("{}/alerts", server.uri())));
    let sink = AlertManager::new(&config).unwrap();
    Agent::with_components(
        config,
        Box::new(ScriptedSource::new(snapshots)),
        Box::new(sink),
    )
}

#[tokio::test]
async fn test_breaches_are_posted_in_category_order() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/alerts"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&mock_server)
        .await;

    let mut agent = agent_for(&mock_server, vec![create_snapshot(90.0, 96.0, 50.0)]);
    let summary = agent.run_cycle().await;
    assert_eq!(summary.anomalies, 2);

    let requests = mock_server.received_requests().await.unwrap();
    let payloads: Vec<AlertPayload> = requests
        .iter()
        .map(|request| serde_json::from_slice(&request.body).unwrap())
        .collect();

    assert_eq!(payloads[0].anomaly.kind, AnomalyKind::CpuHigh);
    assert_eq!(payloads[0].anomaly.severity, Severity::Warning);
    assert_eq!(payloads[1].anomaly.kind, AnomalyKind::MemoryHigh);
    assert_eq!(payloads[1].anomaly.severity, Severity::Critical);
    assert!(
        payloads
            .iter()
            .all(|p| p.agent_name == "integration-agent" && p.environment == "test")
    );
}

#[tokio::test]
async fn test_repeated_breach_alerts_every_cycle() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&mock_server)
        .await;

    let mut agent = agent_for(&mock_server, vec![create_snapshot(99.0, 10.0, 10.0)]);
    for _ in 0..3 {
        agent.run_cycle().await;
    }
}

#[tokio::test]
async fn test_healthy_metrics_send_nothing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut agent = agent_for(
        &mock_server,
        vec![create_snapshot(80.0, 85.0, 90.0), create_snapshot(1.0, 1.0, 1.0)],
    );

    // exactly at the thresholds, then well below
    assert_eq!(agent.run_cycle().await.anomalies, 0);
    assert_eq!(agent.run_cycle().await.anomalies, 0);
}

#[tokio::test]
async fn test_snapshot_is_exported_after_cycle() {
    let mock_server = MockServer::start().await;
    let cache = SnapshotCache::new();

    let mut agent = agent_for(&mock_server, vec![create_snapshot(10.0, 20.0, 30.0)]);
    agent.add_exporter(cache.clone());
    let summary = agent.run_cycle().await;

    assert_eq!(summary.exported, 1);
    assert_eq!(summary.categories, 3);
    let record = cache.latest().unwrap();
    assert_eq!(record.snapshot, create_snapshot(10.0, 20.0, 30.0));
}
