//! The collection, detection and alerting loop
//!
//! ```text
//! ┌─────────────┐   snapshot   ┌──────────────────┐  anomalies  ┌──────────────┐
//! │ MetricSource│ ───────────▶ │ AnomalyDetector  │ ──────────▶ │ Notification │
//! └─────────────┘      │       └──────────────────┘  (one each) │     Sink     │
//!                      │                                        └──────────────┘
//!                      └──▶ MetricsExporter(s), when export is enabled
//! ```
//!
//! The [`Agent`] owns the pipeline and runs it on a fixed interval. An
//! [`AgentHandle`] can be cloned into other tasks (signal handler, health
//! endpoint) to stop the loop or query its health.
//!
//! Failures are contained per stage: collection per category, delivery per
//! anomaly, export per exporter. Anything that still escapes a cycle (a panic)
//! is caught at the cycle boundary, logged, and the loop waits the normal
//! interval before trying again.
//!
//! `stop()` only flips the running flag. The loop notices at the next cycle
//! boundary; a pending interval wait is cut short immediately.

use std::{
    any::Any,
    panic::AssertUnwindSafe,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Context;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    MetricSnapshot,
    alerts::{AlertManager, NotificationSink},
    collector::{MetricSource, SystemCollector},
    config::AgentConfig,
    detector::AnomalyDetector,
    error::AgentError,
    export::{ExportRecord, LogExporter, MetricsExporter},
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub agent_name: String,
    pub version: String,
    /// Seconds since the metric source was constructed
    pub uptime_seconds: f64,
}

/// Outcome of one collection cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Number of snapshot categories that were collected
    pub categories: usize,
    pub anomalies: usize,
    /// Number of exporters that accepted the snapshot
    pub exported: usize,
}

#[derive(Debug)]
struct AgentState {
    running: watch::Sender<bool>,
    started_at: Instant,
}

/// Cloneable control handle for a running [`Agent`]
#[derive(Debug, Clone)]
pub struct AgentHandle {
    state: Arc<AgentState>,
    agent_name: Arc<str>,
}

impl AgentHandle {
    pub(crate) fn new(agent_name: &str, started_at: Instant) -> Self {
        let (running, _) = watch::channel(false);
        Self {
            state: Arc::new(AgentState {
                running,
                started_at,
            }),
            agent_name: Arc::from(agent_name),
        }
    }

    /// Requests the loop to stop. Does not wait for the current cycle.
    pub fn stop(&self) {
        if self.state.running.send_replace(false) {
            info!("stopping agent");
        }
    }

    pub fn is_running(&self) -> bool {
        *self.state.running.borrow()
    }

    pub fn health_check(&self) -> HealthReport {
        HealthReport {
            status: if self.is_running() {
                HealthStatus::Healthy
            } else {
                HealthStatus::Stopped
            },
            agent_name: self.agent_name.to_string(),
            version: VERSION.to_string(),
            uptime_seconds: self.state.started_at.elapsed().as_secs_f64(),
        }
    }

    /// Marks the agent as running; false if it already was.
    pub(crate) fn mark_running(&self) -> bool {
        !self.state.running.send_replace(true)
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.running.subscribe()
    }
}

pub struct Agent {
    config: Arc<AgentConfig>,
    handle: AgentHandle,
    source: Box<dyn MetricSource>,
    detector: AnomalyDetector,
    sink: Box<dyn NotificationSink>,
    exporters: Vec<Box<dyn MetricsExporter>>,
}

impl Agent {
    /// Builds an agent reading the local host and alerting through the webhook.
    pub fn new(config: AgentConfig) -> anyhow::Result<Self> {
        let source = SystemCollector::new(&config);
        let sink = AlertManager::new(&config).context("failed to initialize alert manager")?;

        let mut agent = Self::with_components(config, Box::new(source), Box::new(sink));
        agent.add_exporter(LogExporter);
        Ok(agent)
    }

    pub fn with_components(
        config: AgentConfig,
        source: Box<dyn MetricSource>,
        sink: Box<dyn NotificationSink>,
    ) -> Self {
        let handle = AgentHandle::new(&config.agent_name, source.created_at());
        let detector = AnomalyDetector::new(&config);

        info!("agent initialized with config: {}", config.agent_name);

        Self {
            config: Arc::new(config),
            handle,
            source,
            detector,
            sink,
            exporters: Vec::new(),
        }
    }

    pub fn add_exporter(&mut self, exporter: impl MetricsExporter + 'static) {
        self.exporters.push(Box::new(exporter));
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn handle(&self) -> AgentHandle {
        self.handle.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_running()
    }

    pub fn stop(&self) {
        self.handle.stop();
    }

    pub fn health_check(&self) -> HealthReport {
        self.handle.health_check()
    }

    /// Runs the monitoring loop until [`AgentHandle::stop`] is called.
    pub async fn start(&mut self) -> Result<(), AgentError> {
        if !self.handle.mark_running() {
            return Err(AgentError::AlreadyRunning);
        }

        info!("starting agent");
        self.run_loop().await;
        Ok(())
    }

    async fn run_loop(&mut self) {
        let interval = self.config.collection_interval();
        let mut running = self.handle.subscribe();

        info!(
            "monitoring loop started with interval: {}s",
            interval.as_secs()
        );

        while self.handle.is_running() {
            match AssertUnwindSafe(self.run_cycle()).catch_unwind().await {
                Ok(summary) => debug!(?summary, "cycle complete"),
                Err(panic) => error!(
                    "error in monitoring iteration: {}",
                    panic_message(panic.as_ref())
                ),
            }

            wait_interval(interval, &mut running).await;
        }

        info!("monitoring loop stopped");
    }

    /// One pass of collect, detect, alert and export.
    #[instrument(skip(self))]
    pub async fn run_cycle(&mut self) -> CycleSummary {
        let snapshot = self.source.collect().await;
        let categories = snapshot.categories().len();

        let anomalies = self.detector.detect(&snapshot);
        for anomaly in &anomalies {
            self.sink.send(anomaly).await;
        }

        let exported = if self.config.metrics_export_enabled {
            self.export(snapshot)
        } else {
            0
        };

        CycleSummary {
            categories,
            anomalies: anomalies.len(),
            exported,
        }
    }

    fn export(&self, snapshot: MetricSnapshot) -> usize {
        let record = ExportRecord::stamp(snapshot);

        self.exporters
            .iter()
            .filter(|exporter| match exporter.export(&record) {
                Ok(()) => true,
                Err(e) => {
                    warn!(exporter = exporter.name(), "error exporting metrics: {e}");
                    false
                }
            })
            .count()
    }
}

/// Sleeps for the full interval unless the agent is stopped meanwhile.
async fn wait_interval(interval: Duration, running: &mut watch::Receiver<bool>) {
    let stopped = async {
        let _ = running.wait_for(|running| !running).await;
    };

    tokio::select! {
        _ = tokio::time::sleep(interval) => {}
        _ = stopped => debug!("interval wait interrupted by stop"),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
