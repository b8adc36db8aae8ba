//! Failure tests for the monitoring pipeline
//!
//! A failing webhook or an empty collection must never abort a cycle or keep
//! the remaining anomalies from being delivered.

use std::time::{Duration, Instant};

use aiops_agent::{
    MetricSnapshot,
    agent::Agent,
    alerts::{AlertManager, NotificationSink},
    detector::{Anomaly, AnomalyKind},
};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

#[tokio::test]
async fn test_webhook_500_does_not_block_later_alerts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let config = create_test_config(Some(mock_server.uri()));
    let sink = AlertManager::new(&config).unwrap();
    let mut agent = Agent::with_components(
        config,
        Box::new(ScriptedSource::repeating(create_snapshot(
            99.0, 99.0, 99.0,
        ))),
        Box::new(sink),
    );

    let summary = agent.run_cycle().await;
    assert_eq!(summary.anomalies, 3);
}

#[tokio::test]
async fn test_unreachable_webhook_is_swallowed() {
    let config = create_test_config(Some("http://127.0.0.1:9999/alerts".to_string()));
    let sink = AlertManager::new(&config).unwrap();
    let mut agent = Agent::with_components(
        config,
        Box::new(ScriptedSource::repeating(create_snapshot(
            99.0, 10.0, 10.0,
        ))),
        Box::new(sink),
    );

    assert_eq!(agent.run_cycle().await.anomalies, 1);
}

#[tokio::test]
async fn test_slow_webhook_times_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(Some(mock_server.uri()));
    config.alert_webhook_timeout = 1;
    let sink = AlertManager::new(&config).unwrap();

    let started = Instant::now();
    sink.send(&Anomaly::new(AnomalyKind::DiskHigh, 97.0, 90.0))
        .await;
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_empty_snapshot_completes_cycle() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(Some(mock_server.uri()));
    let sink = AlertManager::new(&config).unwrap();
    let mut agent = Agent::with_components(
        config,
        Box::new(ScriptedSource::repeating(MetricSnapshot::default())),
        Box::new(sink),
    );

    let summary = agent.run_cycle().await;
    assert_eq!(summary.categories, 0);
    assert_eq!(summary.anomalies, 0);
}
