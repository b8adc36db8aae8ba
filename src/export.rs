//! Metrics export
//!
//! After each cycle the snapshot is stamped with the current UTC time and handed
//! to every configured exporter. Exporters fail independently of each other.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{MetricSnapshot, error::ExportError};

/// A snapshot stamped with its export time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub snapshot: MetricSnapshot,
}

impl ExportRecord {
    pub fn stamp(snapshot: MetricSnapshot) -> Self {
        Self {
            timestamp: Utc::now(),
            snapshot,
        }
    }
}

pub trait MetricsExporter: Send + Sync {
    fn name(&self) -> &str;

    fn export(&self, record: &ExportRecord) -> Result<(), ExportError>;
}

/// Writes each record to the log as a single JSON line
#[derive(Debug, Clone, Default)]
pub struct LogExporter;

impl MetricsExporter for LogExporter {
    fn name(&self) -> &str {
        "log"
    }

    fn export(&self, record: &ExportRecord) -> Result<(), ExportError> {
        let json = serde_json::to_string(record)?;
        info!("Metrics exported: {json}");
        Ok(())
    }
}

/// Keeps the most recent record so it can be served over HTTP.
#[derive(Debug, Clone, Default)]
pub struct SnapshotCache {
    latest: Arc<RwLock<Option<ExportRecord>>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<ExportRecord> {
        match self.latest.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl MetricsExporter for SnapshotCache {
    fn name(&self) -> &str {
        "snapshot-cache"
    }

    fn export(&self, record: &ExportRecord) -> Result<(), ExportError> {
        let mut guard = match self.latest.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(record.clone());
        Ok(())
    }
}
