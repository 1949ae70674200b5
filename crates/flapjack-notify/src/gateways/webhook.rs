use crate::plugin::GatewayPlugin;
use crate::{DeliveryError, Gateway};
use anyhow::Result;
use async_trait::async_trait;
use flapjack_common::types::{AlertRecord, MediumType};
use serde::Deserialize;
use serde_json::Value;

/// Posts the alert as JSON to the medium's address (the webhook URL).
pub struct WebhookGateway {
    client: reqwest::Client,
    body_template: Option<String>,
}

impl WebhookGateway {
    pub fn new(body_template: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            body_template,
        }
    }

    fn render_body(&self, alert: &AlertRecord) -> String {
        match &self.body_template {
            Some(template) => template
                .replace("{{check}}", &alert.check_name)
                .replace("{{condition}}", &alert.condition.to_string())
                .replace("{{type}}", &alert.notification_type.to_string())
                .replace("{{summary}}", &alert.summary)
                .replace("{{time}}", &alert.enqueued_at.to_rfc3339()),
            None => serde_json::to_string(alert).unwrap_or_default(),
        }
    }
}

#[async_trait]
impl Gateway for WebhookGateway {
    async fn deliver(&self, alert: &AlertRecord) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&alert.address)
            .header("Content-Type", "application/json")
            .body(self.render_body(alert))
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
        MediumType::Webhook
    }
}

// Plugin

#[derive(Deserialize)]
struct WebhookConfig {
    body_template: Option<String>,
}

pub struct WebhookPlugin;

impl GatewayPlugin for WebhookPlugin {
    fn medium_type(&self) -> MediumType {
        MediumType::Webhook
    }

    fn validate_config(&self, config: &Value) -> Result<()> {
        serde_json::from_value::<WebhookConfig>(config.clone())
            .map_err(|e| anyhow::anyhow!("Invalid webhook config: {e}"))?;
        Ok(())
    }

    fn create_gateway(&self, config: &Value) -> Result<std::sync::Arc<dyn Gateway>> {
        let cfg: WebhookConfig = serde_json::from_value(config.clone())
            .map_err(|e| anyhow::anyhow!("Invalid webhook config: {e}"))?;
        Ok(std::sync::Arc::new(WebhookGateway::new(cfg.body_template)))
    }
}
