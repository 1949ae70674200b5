use crate::plugin::GatewayPlugin;
use crate::{DeliveryError, Gateway};
use anyhow::Result;
use async_trait::async_trait;
use flapjack_common::types::{AlertRecord, AlertType, Condition, MediumType};
use serde::Deserialize;
use serde_json::Value;

const DEFAULT_EVENTS_URL: &str = "https://events.pagerduty.com/v2/enqueue";

/// PagerDuty Events v2 gateway. The medium address carries the integration
/// routing key; the check id is the dedup key so repeats and resolves
/// collapse onto one incident.
pub struct PagerdutyGateway {
    client: reqwest::Client,
    events_url: String,
}

impl PagerdutyGateway {
    pub fn new(events_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            events_url: events_url.unwrap_or_else(|| DEFAULT_EVENTS_URL.to_string()),
        }
    }

    fn event_action(alert: &AlertRecord) -> &'static str {
        match alert.notification_type {
            AlertType::Acknowledgement => "acknowledge",
            AlertType::Recovery => "resolve",
            AlertType::Problem
            | AlertType::ScheduledMaintenance
            | AlertType::Test => "trigger",
        }
    }

    fn severity(alert: &AlertRecord) -> &'static str {
        match alert.condition {
            Condition::Critical => "critical",
            Condition::Warning => "warning",
            Condition::Unknown => "error",
            Condition::Ok => "info",
        }
    }
}

#[async_trait]
impl Gateway for PagerdutyGateway {
    async fn deliver(&self, alert: &AlertRecord) -> Result<(), DeliveryError> {
        let payload = serde_json::json!({
            "routing_key": alert.address,
            "event_action": Self::event_action(alert),
            "dedup_key": alert.check_id,
            "payload": {
                "summary": alert.summary,
                "source": alert.check_name,
                "severity": Self::severity(alert),
                "timestamp": alert.enqueued_at.to_rfc3339(),
            },
        });

        let response = self
            .client
            .post(&self.events_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else if status.is_client_error() {
            Err(DeliveryError::Permanent(format!("HTTP {status}")))
        } else {
            Err(DeliveryError::Transient(format!("HTTP {status}")))
        }
    }

    fn medium_type(&self) -> MediumType {
        MediumType::Pagerduty
    }
}

// Plugin

#[derive(Deserialize)]
struct PagerdutyConfig {
    events_url: Option<String>,
}

pub struct PagerdutyPlugin;

impl GatewayPlugin for PagerdutyPlugin {
    fn medium_type(&self) -> MediumType {
        MediumType::Pagerduty
    }

    fn validate_config(&self, config: &Value) -> Result<()> {
        serde_json::from_value::<PagerdutyConfig>(config.clone())
            .map_err(|e| anyhow::anyhow!("Invalid pagerduty config: {e}"))?;
        Ok(())
    }

    fn create_gateway(&self, config: &Value) -> Result<std::sync::Arc<dyn Gateway>> {
        let cfg: PagerdutyConfig = serde_json::from_value(config.clone())
            .map_err(|e| anyhow::anyhow!("Invalid pagerduty config: {e}"))?;
        Ok(std::sync::Arc::new(PagerdutyGateway::new(cfg.events_url)))
    }
}
