use std::{net::Ipv4Addr, str::FromStr};

use crate::error::ConfigError;

pub const AGENT_NAME: &str = "AGENT_NAME";
pub const ENVIRONMENT: &str = "ENVIRONMENT";
pub const COLLECTION_INTERVAL: &str = "COLLECTION_INTERVAL";
pub const METRICS_EXPORT_ENABLED: &str = "METRICS_EXPORT_ENABLED";
pub const ANOMALY_DETECTION_ENABLED: &str = "ANOMALY_DETECTION_ENABLED";
pub const CPU_THRESHOLD: &str = "CPU_THRESHOLD";
pub const MEMORY_THRESHOLD: &str = "MEMORY_THRESHOLD";
pub const DISK_THRESHOLD: &str = "DISK_THRESHOLD";
pub const ALERT_ENABLED: &str = "ALERT_ENABLED";
pub const ALERT_WEBHOOK_URL: &str = "ALERT_WEBHOOK_URL";
pub const ALERT_WEBHOOK_TIMEOUT: &str = "ALERT_WEBHOOK_TIMEOUT";
pub const LOG_LEVEL: &str = "LOG_LEVEL";
pub const LOG_FORMAT: &str = "LOG_FORMAT";
pub const CPU_SAMPLE_MILLIS: &str = "CPU_SAMPLE_MILLIS";
pub const PER_CPU_ENABLED: &str = "PER_CPU_ENABLED";
pub const DISK_MOUNT_POINT: &str = "DISK_MOUNT_POINT";
pub const HEALTH_SERVER_ENABLED: &str = "HEALTH_SERVER_ENABLED";
pub const HEALTH_ADDR: &str = "HEALTH_ADDR";
pub const HEALTH_PORT: &str = "HEALTH_PORT";

const DEFAULT_PORT: u16 = 51243;

pub fn get_default_port() -> u16 {
    DEFAULT_PORT
}

const DEFAULT_ADDR: Ipv4Addr = Ipv4Addr::new(0, 0, 0, 0);

pub fn get_default_addr() -> Ipv4Addr {
    DEFAULT_ADDR
}

/// Flags are only enabled by a literal `true`, in any case.
pub fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

pub fn parse_value<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        })
}
