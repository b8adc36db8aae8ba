//! Static threshold anomaly detection
//!
//! Each cycle is evaluated on its own: a breach is reported every time it is
//! seen, with no grace period and no suppression of repeated alerts.
//!
//! ```text
//! value >  threshold, value <  95.0 → Severity::Warning
//! value >  threshold, value >= 95.0 → Severity::Critical
//! value <= threshold                → no anomaly
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::{MetricSnapshot, config::AgentConfig};

/// Values at or above this level are critical, whatever the threshold.
pub const CRITICAL_LEVEL: f64 = 95.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    CpuHigh,
    MemoryHigh,
    DiskHigh,
}

impl AnomalyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyKind::CpuHigh => "cpu_high",
            AnomalyKind::MemoryHigh => "memory_high",
            AnomalyKind::DiskHigh => "disk_high",
        }
    }

    /// Resource name as it appears in alert messages
    fn resource(&self) -> &'static str {
        match self {
            AnomalyKind::CpuHigh => "CPU",
            AnomalyKind::MemoryHigh => "memory",
            AnomalyKind::DiskHigh => "disk",
        }
    }
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl Severity {
    pub fn classify(value: f64) -> Severity {
        if value >= CRITICAL_LEVEL {
            Severity::Critical
        } else {
            Severity::Warning
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// A single threshold breach
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    #[serde(rename = "type")]
    pub kind: AnomalyKind,
    pub severity: Severity,
    pub message: String,
    pub value: f64,
    pub threshold: f64,
}

impl Anomaly {
    pub fn new(kind: AnomalyKind, value: f64, threshold: f64) -> Self {
        Self {
            kind,
            severity: Severity::classify(value),
            message: format!("High {} usage: {value:.2}%", kind.resource()),
            value,
            threshold,
        }
    }
}

/// Upper bounds per resource, in percent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub cpu: f64,
    pub memory: f64,
    pub disk: f64,
}

impl Thresholds {
    fn for_kind(&self, kind: AnomalyKind) -> f64 {
        match kind {
            AnomalyKind::CpuHigh => self.cpu,
            AnomalyKind::MemoryHigh => self.memory,
            AnomalyKind::DiskHigh => self.disk,
        }
    }
}

impl From<&AgentConfig> for Thresholds {
    fn from(config: &AgentConfig) -> Self {
        Self {
            cpu: config.cpu_threshold,
            memory: config.memory_threshold,
            disk: config.disk_threshold,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    enabled: bool,
    thresholds: Thresholds,
}

impl AnomalyDetector {
    pub fn new(config: &AgentConfig) -> Self {
        Self::with_thresholds(Thresholds::from(config), config.anomaly_detection_enabled)
    }

    pub fn with_thresholds(thresholds: Thresholds, enabled: bool) -> Self {
        Self {
            enabled,
            thresholds,
        }
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Returns one anomaly per breached category, in cpu, memory, disk order.
    #[instrument(skip_all)]
    pub fn detect(&self, snapshot: &MetricSnapshot) -> Vec<Anomaly> {
        if !self.enabled {
            return Vec::new();
        }

        let readings = [
            (
                AnomalyKind::CpuHigh,
                snapshot.cpu.as_ref().map(|cpu| cpu.usage_percent),
            ),
            (
                AnomalyKind::MemoryHigh,
                snapshot.memory.as_ref().map(|memory| memory.percent),
            ),
            (
                AnomalyKind::DiskHigh,
                snapshot.disk.as_ref().map(|disk| disk.percent),
            ),
        ];

        let anomalies: Vec<Anomaly> = readings
            .into_iter()
            .filter_map(|(kind, value)| self.evaluate(kind, value?))
            .collect();

        if !anomalies.is_empty() {
            warn!("detected {} anomalies", anomalies.len());
        }

        anomalies
    }

    fn evaluate(&self, kind: AnomalyKind, value: f64) -> Option<Anomaly> {
        if !value.is_finite() {
            debug!(%kind, "ignoring non-numeric reading {value}");
            return None;
        }

        let threshold = self.thresholds.for_kind(kind);
        (value > threshold).then(|| Anomaly::new(kind, value, threshold))
    }
}
