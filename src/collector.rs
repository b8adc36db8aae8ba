//! Host metric collection
//!
//! [`SystemCollector`] reads the five snapshot categories through `sysinfo`.
//! Every category is read on its own; a failure is logged and the category is
//! left out of the snapshot while the others are still collected.

use std::{
    path::Path,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use sysinfo::{CpuRefreshKind, Disks, MemoryRefreshKind, Networks, RefreshKind, System};
use tracing::{debug, error, instrument};

use crate::{
    CpuMetrics, DiskMetrics, LoadAverage, MemoryMetrics, MetricSnapshot, NetworkMetrics,
    SystemMetrics, config::AgentConfig, error::CollectError, round_percent,
};

/// A source of metric snapshots, sampled once per agent cycle.
#[async_trait]
pub trait MetricSource: Send {
    /// Takes a fresh snapshot. Never fails as a whole; unreadable categories are absent.
    async fn collect(&mut self) -> MetricSnapshot;

    /// When the source was constructed. Agent uptime is measured from here.
    fn created_at(&self) -> Instant;
}

pub struct SystemCollector {
    system: System,
    sample_window: Duration,
    per_cpu: bool,
    mount_point: String,
    created_at: Instant,
}

impl SystemCollector {
    pub fn new(config: &AgentConfig) -> Self {
        let refresh = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::nothing().with_cpu_usage())
            .with_memory(MemoryRefreshKind::everything());

        debug!("metrics collector initialized");

        Self {
            system: System::new_with_specifics(refresh),
            sample_window: config
                .cpu_sample_window()
                .max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL),
            per_cpu: config.per_cpu_enabled,
            mount_point: config.disk_mount_point.clone(),
            created_at: Instant::now(),
        }
    }

    /// Usage is averaged over the sample window, which blocks this task.
    async fn sample_cpu(&mut self) -> Result<CpuMetrics, CollectError> {
        self.system.refresh_cpu_usage();
        tokio::time::sleep(self.sample_window).await;
        self.system.refresh_cpu_usage();

        let cpus = self.system.cpus();
        if cpus.is_empty() {
            return Err(CollectError::NoCpus);
        }

        let usage = self.system.global_cpu_usage() as f64;
        if !usage.is_finite() {
            return Err(CollectError::InvalidCpuSample);
        }

        let per_cpu = self.per_cpu.then(|| {
            cpus.iter()
                .map(|cpu| round_percent(cpu.cpu_usage() as f64))
                .collect()
        });

        Ok(CpuMetrics {
            usage_percent: round_percent(usage),
            count: cpus.len(),
            per_cpu,
        })
    }

    fn read_memory(&mut self) -> Result<MemoryMetrics, CollectError> {
        self.system.refresh_memory();

        MemoryMetrics::from_raw(
            self.system.total_memory(),
            self.system.available_memory(),
            self.system.used_memory(),
        )
        .ok_or(CollectError::MemoryUnavailable)
    }

    fn read_disk(&self) -> Result<DiskMetrics, CollectError> {
        let disks = Disks::new_with_refreshed_list();

        select_disk(
            disks
                .iter()
                .map(|disk| (disk.mount_point(), disk.total_space(), disk.available_space())),
            &self.mount_point,
        )
    }

    fn read_network() -> NetworkMetrics {
        let networks = Networks::new_with_refreshed_list();

        networks
            .iter()
            .fold(NetworkMetrics::default(), |mut acc, (_, data)| {
                acc.bytes_sent += data.total_transmitted();
                acc.bytes_recv += data.total_received();
                acc.packets_sent += data.total_packets_transmitted();
                acc.packets_recv += data.total_packets_received();
                acc
            })
    }

    fn read_system() -> SystemMetrics {
        SystemMetrics {
            uptime: System::uptime(),
            load_average: load_average(),
        }
    }
}

#[async_trait]
impl MetricSource for SystemCollector {
    #[instrument(skip_all)]
    async fn collect(&mut self) -> MetricSnapshot {
        let cpu = self.sample_cpu().await;
        let memory = self.read_memory();
        let disk = self.read_disk();

        let snapshot = MetricSnapshot {
            cpu: keep("cpu", cpu),
            memory: keep("memory", memory),
            disk: keep("disk", disk),
            network: Some(Self::read_network()),
            system: Some(Self::read_system()),
        };

        debug!(categories = ?snapshot.categories(), "collected metrics");
        snapshot
    }

    fn created_at(&self) -> Instant {
        self.created_at
    }
}

fn keep<T>(category: &'static str, result: Result<T, CollectError>) -> Option<T> {
    match result {
        Ok(metrics) => Some(metrics),
        Err(e) => {
            error!(category, "error collecting metrics: {e}");
            None
        }
    }
}

/// Picks the filesystem containing `target`: the longest mount point that prefixes it.
fn select_disk<'a>(
    disks: impl Iterator<Item = (&'a Path, u64, u64)>,
    target: &str,
) -> Result<DiskMetrics, CollectError> {
    let target_path = Path::new(target);

    let (mount, total, available) = disks
        .filter(|(mount, _, _)| target_path.starts_with(mount))
        .max_by_key(|(mount, _, _)| mount.as_os_str().len())
        .ok_or_else(|| CollectError::MountNotFound(target.to_string()))?;

    DiskMetrics::from_raw(mount.to_string_lossy(), total, available)
        .ok_or_else(|| CollectError::EmptyFilesystem(mount.display().to_string()))
}

#[cfg(not(windows))]
fn load_average() -> Option<LoadAverage> {
    let load = System::load_average();
    Some(LoadAverage {
        one: load.one,
        five: load.five,
        fifteen: load.fifteen,
    })
}

// sysinfo reports zeros here, which would be indistinguishable from an idle host
#[cfg(windows)]
fn load_average() -> Option<LoadAverage> {
    None
}
