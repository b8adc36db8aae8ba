use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, header::CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::{config::AgentConfig, detector::Anomaly, error::AlertError};

/// Destination for detected anomalies.
///
/// Delivery is best-effort: implementations log failures instead of returning
/// them, so one bad delivery never stops the remaining ones.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, anomaly: &Anomaly);
}

/// Body of the webhook request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPayload {
    pub agent_name: String,
    pub environment: String,
    pub timestamp: DateTime<Utc>,
    pub anomaly: Anomaly,
}

#[derive(Debug, Clone)]
pub struct AlertManager {
    client: Client,
    agent_name: String,
    environment: String,
    enabled: bool,
    webhook_url: Option<String>,
}

impl AlertManager {
    pub fn new(config: &AgentConfig) -> Result<Self, AlertError> {
        let client = Client::builder()
            .timeout(config.webhook_timeout())
            .build()
            .map_err(AlertError::Client)?;

        debug!(
            enabled = config.alert_enabled,
            webhook = config.alert_webhook_url.is_some(),
            "alert manager initialized"
        );

        Ok(Self {
            client,
            agent_name: config.agent_name.clone(),
            environment: config.environment.clone(),
            enabled: config.alert_enabled,
            webhook_url: config.alert_webhook_url.clone(),
        })
    }

    pub fn payload(&self, anomaly: &Anomaly) -> AlertPayload {
        AlertPayload {
            agent_name: self.agent_name.clone(),
            environment: self.environment.clone(),
            timestamp: Utc::now(),
            anomaly: anomaly.clone(),
        }
    }

    /// Posts the payload once. Any non-2xx status counts as a failure.
    #[instrument(skip(self, payload))]
    pub async fn deliver(&self, url: &str, payload: &AlertPayload) -> Result<(), AlertError> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .json(payload)
            .send()
            .await
            .map_err(AlertError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AlertError::Status(status));
        }

        Ok(())
    }
}

#[async_trait]
impl NotificationSink for AlertManager {
    #[instrument(skip_all, fields(anomaly_type = %anomaly.kind))]
    async fn send(&self, anomaly: &Anomaly) {
        if !self.enabled {
            debug!("alerting is disabled, skipping alert");
            return;
        }

        warn!(
            severity = %anomaly.severity,
            "ALERT: {} (Severity: {})",
            anomaly.message,
            anomaly.severity
        );

        let Some(url) = &self.webhook_url else {
            return;
        };

        match self.deliver(url, &self.payload(anomaly)).await {
            Ok(()) => info!("alert sent successfully via webhook"),
            Err(e) => error!("error sending webhook alert: {e}"),
        }
    }
}
