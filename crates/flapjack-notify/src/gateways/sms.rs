use crate::gateways::headline;
use crate::plugin::GatewayPlugin;
use crate::{DeliveryError, Gateway};
use anyhow::Result;
use async_trait::async_trait;
use flapjack_common::types::{AlertRecord, MediumType};
use serde::Deserialize;
use serde_json::Value;

/// SMS payloads are capped to one segment.
const MAX_SMS_LENGTH: usize = 160;

pub struct SmsGateway {
    client: reqwest::Client,
    gateway_url: String,
    api_key: String,
}

impl SmsGateway {
    pub fn new(gateway_url: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            gateway_url: gateway_url.to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn format_message(alert: &AlertRecord) -> String {
        let message = format!("{}: {}", headline(alert), alert.summary);
        if message.chars().count() <= MAX_SMS_LENGTH {
            return message;
        }
        let truncated: String = message.chars().take(MAX_SMS_LENGTH - 3).collect();
        format!("{truncated}...")
    }
}

#[async_trait]
impl Gateway for SmsGateway {
    async fn deliver(&self, alert: &AlertRecord) -> Result<(), DeliveryError> {
        let payload = serde_json::json!({
            "to": alert.address,
            "message": Self::format_message(alert),
        });

        let response = self
            .client
            .post(&self.gateway_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
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
        MediumType::Sms
    }
}

// Plugin

#[derive(Deserialize)]
struct SmsConfig {
    gateway_url: String,
    api_key: String,
}

pub struct SmsPlugin;

impl GatewayPlugin for SmsPlugin {
    fn medium_type(&self) -> MediumType {
        MediumType::Sms
    }

    fn validate_config(&self, config: &Value) -> Result<()> {
        serde_json::from_value::<SmsConfig>(config.clone())
            .map_err(|e| anyhow::anyhow!("Invalid sms config: {e}"))?;
        Ok(())
    }

    fn create_gateway(&self, config: &Value) -> Result<std::sync::Arc<dyn Gateway>> {
        let cfg: SmsConfig = serde_json::from_value(config.clone())
            .map_err(|e| anyhow::anyhow!("Invalid sms config: {e}"))?;
        Ok(std::sync::Arc::new(SmsGateway::new(
            &cfg.gateway_url,
            &cfg.api_key,
        )))
    }

    fn redact_config(&self, config: &Value) -> Value {
        let mut redacted = config.clone();
        if let Some(obj) = redacted.as_object_mut() {
            if obj.contains_key("api_key") {
                obj.insert("api_key".to_string(), Value::String("***".to_string()));
            }
        }
        redacted
    }
}
