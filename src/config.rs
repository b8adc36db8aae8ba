use std::{
    net::IpAddr,
    path::Path,
    str::FromStr,
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    util::{self, parse_flag, parse_value},
};

/// Output format of the log stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

impl FromStr for LogFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("json") {
            Ok(LogFormat::Json)
        } else {
            Ok(LogFormat::Text)
        }
    }
}

impl TryFrom<String> for LogFormat {
    type Error = std::convert::Infallible;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Process-wide agent configuration, read-only once loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentConfig {
    pub agent_name: String,
    pub environment: String,

    /// Seconds between two collection cycles
    pub collection_interval: u64,
    pub metrics_export_enabled: bool,

    pub anomaly_detection_enabled: bool,
    pub cpu_threshold: f64,
    pub memory_threshold: f64,
    pub disk_threshold: f64,

    pub alert_enabled: bool,
    #[serde(skip_serializing)]
    pub alert_webhook_url: Option<String>,
    /// Seconds before a webhook request is abandoned
    pub alert_webhook_timeout: u64,

    pub log_level: String,
    pub log_format: LogFormat,

    /// Length of the blocking CPU usage sample
    pub cpu_sample_millis: u64,
    pub per_cpu_enabled: bool,
    /// Filesystem reported as the `disk` category
    pub disk_mount_point: String,

    pub health_server_enabled: bool,
    pub health_address: IpAddr,
    pub health_port: u16,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            agent_name: "aiops-agent".to_string(),
            environment: "production".to_string(),
            collection_interval: 60,
            metrics_export_enabled: true,
            anomaly_detection_enabled: true,
            cpu_threshold: 80.0,
            memory_threshold: 85.0,
            disk_threshold: 90.0,
            alert_enabled: true,
            alert_webhook_url: None,
            alert_webhook_timeout: 10,
            log_level: "INFO".to_string(),
            log_format: LogFormat::Json,
            cpu_sample_millis: 1000,
            per_cpu_enabled: true,
            disk_mount_point: "/".to_string(),
            health_server_enabled: false,
            health_address: IpAddr::V4(util::get_default_addr()),
            health_port: util::get_default_port(),
        }
    }
}

/// A partial configuration coming from one source (environment or file).
///
/// Unset fields leave the underlying value untouched when applied.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverrides {
    pub agent_name: Option<String>,
    pub environment: Option<String>,
    pub collection_interval: Option<u64>,
    pub metrics_export_enabled: Option<bool>,
    pub anomaly_detection_enabled: Option<bool>,
    pub cpu_threshold: Option<f64>,
    pub memory_threshold: Option<f64>,
    pub disk_threshold: Option<f64>,
    pub alert_enabled: Option<bool>,
    pub alert_webhook_url: Option<String>,
    pub alert_webhook_timeout: Option<u64>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub cpu_sample_millis: Option<u64>,
    pub per_cpu_enabled: Option<bool>,
    pub disk_mount_point: Option<String>,
    pub health_server_enabled: Option<bool>,
    pub health_address: Option<IpAddr>,
    pub health_port: Option<u16>,
}

impl ConfigOverrides {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads overrides through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let flag = |key: &str| text(key).map(|value| parse_flag(&value));

        fn number<T: FromStr>(
            key: &'static str,
            value: Option<String>,
        ) -> Result<Option<T>, ConfigError> {
            value.map(|value| parse_value(key, &value)).transpose()
        }

        Ok(Self {
            agent_name: text(util::AGENT_NAME),
            environment: text(util::ENVIRONMENT),
            collection_interval: number(
                util::COLLECTION_INTERVAL,
                text(util::COLLECTION_INTERVAL),
            )?,
            metrics_export_enabled: flag(util::METRICS_EXPORT_ENABLED),
            anomaly_detection_enabled: flag(util::ANOMALY_DETECTION_ENABLED),
            cpu_threshold: number(util::CPU_THRESHOLD, text(util::CPU_THRESHOLD))?,
            memory_threshold: number(util::MEMORY_THRESHOLD, text(util::MEMORY_THRESHOLD))?,
            disk_threshold: number(util::DISK_THRESHOLD, text(util::DISK_THRESHOLD))?,
            alert_enabled: flag(util::ALERT_ENABLED),
            alert_webhook_url: text(util::ALERT_WEBHOOK_URL),
            alert_webhook_timeout: number(
                util::ALERT_WEBHOOK_TIMEOUT,
                text(util::ALERT_WEBHOOK_TIMEOUT),
            )?,
            log_level: text(util::LOG_LEVEL),
            log_format: text(util::LOG_FORMAT)
                .map(|value| parse_value(util::LOG_FORMAT, &value))
                .transpose()?,
            cpu_sample_millis: number(util::CPU_SAMPLE_MILLIS, text(util::CPU_SAMPLE_MILLIS))?,
            per_cpu_enabled: flag(util::PER_CPU_ENABLED),
            disk_mount_point: text(util::DISK_MOUNT_POINT),
            health_server_enabled: flag(util::HEALTH_SERVER_ENABLED),
            health_address: number(util::HEALTH_ADDR, text(util::HEALTH_ADDR))?,
            health_port: number(util::HEALTH_PORT, text(util::HEALTH_PORT))?,
        })
    }

    /// Reads overrides from a YAML file, or JSON when the extension is `.json`.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let parsed: Result<Self, String> = if is_json {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(&content).map_err(|e| e.to_string())
        };

        parsed.map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }
}

impl AgentConfig {
    /// Loads defaults, then environment variables, then the optional config file.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = AgentConfig::default().apply(ConfigOverrides::from_env()?);

        if let Some(path) = path {
            config = config.apply(ConfigOverrides::from_file(path)?);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn apply(mut self, overrides: ConfigOverrides) -> Self {
        macro_rules! merge {
            ($($field:ident),* $(,)?) => {
                $(
                    if let Some(value) = overrides.$field {
                        self.$field = value;
                    }
                )*
            };
        }

        merge!(
            agent_name,
            environment,
            collection_interval,
            metrics_export_enabled,
            anomaly_detection_enabled,
            cpu_threshold,
            memory_threshold,
            disk_threshold,
            alert_enabled,
            alert_webhook_timeout,
            log_level,
            log_format,
            cpu_sample_millis,
            per_cpu_enabled,
            disk_mount_point,
            health_server_enabled,
            health_address,
            health_port,
        );

        if let Some(url) = overrides.alert_webhook_url {
            self.alert_webhook_url = Some(url).filter(|url| !url.trim().is_empty());
        }

        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collection_interval == 0 {
            return Err(ConfigError::Invalid(
                "collection_interval must be a positive number of seconds".to_string(),
            ));
        }

        if self.alert_webhook_timeout == 0 {
            return Err(ConfigError::Invalid(
                "alert_webhook_timeout must be a positive number of seconds".to_string(),
            ));
        }

        if self.cpu_sample_millis == 0 {
            return Err(ConfigError::Invalid(
                "cpu_sample_millis must be positive".to_string(),
            ));
        }

        for (name, threshold) in [
            ("cpu_threshold", self.cpu_threshold),
            ("memory_threshold", self.memory_threshold),
            ("disk_threshold", self.disk_threshold),
        ] {
            if !threshold.is_finite() || !(0.0..=100.0).contains(&threshold) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a percentage between 0 and 100, got {threshold}"
                )));
            }
        }

        if let Some(url) = &self.alert_webhook_url {
            reqwest::Url::parse(url).map_err(|e| {
                ConfigError::Invalid(format!("alert_webhook_url is not a valid URL: {e}"))
            })?;
        }

        Ok(())
    }

    pub fn collection_interval(&self) -> Duration {
        Duration::from_secs(self.collection_interval)
    }

    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.alert_webhook_timeout)
    }

    pub fn cpu_sample_window(&self) -> Duration {
        Duration::from_millis(self.cpu_sample_millis)
    }
}
