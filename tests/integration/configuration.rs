//! Loading configuration files through the public entry point

use std::io::Write;

use aiops_agent::{
    config::{AgentConfig, LogFormat},
    error::ConfigError,
};
use assert_matches::assert_matches;
use tempfile::NamedTempFile;

fn file_with(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_yaml_file_overrides_defaults() {
    let file = file_with(
        ".yaml",
        r#"
agent_name: edge-node-7
collection_interval: 30
cpu_threshold: 70.5
alert_webhook_url: "https://hooks.example.com/aiops"
log_format: text
"#,
    );

    let config = AgentConfig::load(Some(file.path())).unwrap();

    assert_eq!(config.agent_name, "edge-node-7");
    assert_eq!(config.collection_interval, 30);
    assert_eq!(config.cpu_threshold, 70.5);
    assert_eq!(
        config.alert_webhook_url.as_deref(),
        Some("https://hooks.example.com/aiops")
    );
    assert_eq!(config.log_format, LogFormat::Text);
}

#[test]
fn test_json_file_is_accepted() {
    let file = file_with(".json", r#"{ "disk_threshold": 75, "health_port": 9100 }"#);

    let config = AgentConfig::load(Some(file.path())).unwrap();

    assert_eq!(config.disk_threshold, 75.0);
    assert_eq!(config.health_port, 9100);
}

#[test]
fn test_out_of_range_threshold_is_rejected() {
    let file = file_with(".yaml", "memory_threshold: 120\n");

    assert_matches!(
        AgentConfig::load(Some(file.path())),
        Err(ConfigError::Invalid(_))
    );
}

#[test]
fn test_unknown_key_is_rejected() {
    let file = file_with(".yaml", "cpu_treshold: 50\n");

    assert_matches!(
        AgentConfig::load(Some(file.path())),
        Err(ConfigError::Parse { .. })
    );
}

#[test]
fn test_missing_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.yaml");

    assert_matches!(
        AgentConfig::load(Some(&path)),
        Err(ConfigError::Io { .. })
    );
}
