pub mod agent;
pub mod alerts;
pub mod collector;
pub mod config;
pub mod detector;
pub mod error;
pub mod export;
pub mod logging;
pub mod server;
pub mod util;

use serde::{Deserialize, Serialize};

/// One point-in-time collection of host metrics.
///
/// A category is either fully present or `None` when reading it failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<CpuMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk: Option<DiskMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<SystemMetrics>,
}

impl MetricSnapshot {
    /// Names of the categories present in this snapshot, in collection order.
    pub fn categories(&self) -> Vec<&'static str> {
        let mut names = Vec::with_capacity(5);
        if self.cpu.is_some() {
            names.push("cpu");
        }
        if self.memory.is_some() {
            names.push("memory");
        }
        if self.disk.is_some() {
            names.push("disk");
        }
        if self.network.is_some() {
            names.push("network");
        }
        if self.system.is_some() {
            names.push("system");
        }
        names
    }

    pub fn is_empty(&self) -> bool {
        self.categories().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuMetrics {
    pub usage_percent: f64,
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_cpu: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetrics {
    pub total: u64,
    pub available: u64,
    pub used: u64,
    pub percent: f64,
}

impl MemoryMetrics {
    /// Builds the memory reading, deriving `percent` from what is not available.
    pub fn from_raw(total: u64, available: u64, used: u64) -> Option<Self> {
        if total == 0 {
            return None;
        }
        let percent = total.saturating_sub(available) as f64 / total as f64 * 100.0;
        Some(Self {
            total,
            available,
            used,
            percent: round_percent(percent),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskMetrics {
    pub mount_point: String,
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub percent: f64,
}

impl DiskMetrics {
    /// `free` is the space available to unprivileged users. Blocks reserved for
    /// root are counted as used, so `used + free == total` and the percent can
    /// read slightly higher than `df` on filesystems with a reserve.
    pub fn from_raw(mount_point: impl Into<String>, total: u64, free: u64) -> Option<Self> {
        if total == 0 {
            return None;
        }
        let used = total.saturating_sub(free);
        let percent = used as f64 / (used + free) as f64 * 100.0;
        Some(Self {
            mount_point: mount_point.into(),
            total,
            used,
            free,
            percent: round_percent(percent),
        })
    }
}

/// Cumulative interface counters since boot, summed over all interfaces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkMetrics {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemMetrics {
    /// Seconds since boot
    pub uptime: u64,
    pub load_average: Option<LoadAverage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

pub(crate) fn round_percent(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
