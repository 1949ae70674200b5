use crate::gateways::headline;
use crate::plugin::GatewayPlugin;
use crate::{DeliveryError, Gateway};
use anyhow::Result;
use async_trait::async_trait;
use flapjack_common::types::{AlertRecord, MediumType};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Deserialize;
use serde_json::Value;

pub struct EmailGateway {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl EmailGateway {
    pub fn new(
        smtp_host: &str,
        smtp_port: u16,
        username: Option<&str>,
        password: Option<&str>,
        from: &str,
    ) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_host)?.port(smtp_port);
        if let (Some(user), Some(pass)) = (username, password) {
            builder = builder.credentials(Credentials::new(user.to_string(), pass.to_string()));
        }
        Ok(Self {
            transport: builder.build(),
            from: from.to_string(),
        })
    }

    fn format_body(alert: &AlertRecord) -> String {
        let details_line = match &alert.details {
            Some(details) => format!("\nDetails: {details}"),
            None => String::new(),
        };
        if alert.is_rollup() {
            format!(
                "Rollup: {count} checks alerting\nChecks: {checks}\nCondition: {condition}\nTime: {time}",
                count = alert.rollup_checks.len(),
                checks = alert.rollup_checks.join(", "),
                condition = alert.condition,
                time = alert.enqueued_at,
            )
        } else {
            format!(
                "Alert: {kind}\nCheck: {check}\nCondition: {condition}\nSummary: {summary}{details_line}\nTime: {time}",
                kind = alert.notification_type,
                check = alert.check_name,
                condition = alert.condition,
                summary = alert.summary,
                details_line = details_line,
                time = alert.enqueued_at,
            )
        }
    }
}

#[async_trait]
impl Gateway for EmailGateway {
    async fn deliver(&self, alert: &AlertRecord) -> Result<(), DeliveryError> {
        let from = self
            .from
            .parse()
            .map_err(|e| DeliveryError::Permanent(format!("bad from address: {e}")))?;
        let to = alert
            .address
            .parse()
            .map_err(|e| DeliveryError::Permanent(format!("bad recipient address: {e}")))?;
        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(headline(alert))
            .header(ContentType::TEXT_PLAIN)
            .body(Self::format_body(alert))
            .map_err(|e| DeliveryError::Permanent(format!("message build failed: {e}")))?;

        match self.transport.send(message).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_permanent() => Err(DeliveryError::Permanent(e.to_string())),
            Err(e) => Err(DeliveryError::Transient(e.to_string())),
        }
    }

    fn medium_type(&self) -> MediumType {
        MediumType::Email
    }
}

// Plugin

#[derive(Deserialize)]
struct EmailConfig {
    smtp_host: String,
    smtp_port: u16,
    smtp_username: Option<String>,
    smtp_password: Option<String>,
    from: String,
}

pub struct EmailPlugin;

impl GatewayPlugin for EmailPlugin {
    fn medium_type(&self) -> MediumType {
        MediumType::Email
    }

    fn validate_config(&self, config: &Value) -> Result<()> {
        serde_json::from_value::<EmailConfig>(config.clone())
            .map_err(|e| anyhow::anyhow!("Invalid email config: {e}"))?;
        Ok(())
    }

    fn create_gateway(&self, config: &Value) -> Result<std::sync::Arc<dyn Gateway>> {
        let cfg: EmailConfig = serde_json::from_value(config.clone())
            .map_err(|e| anyhow::anyhow!("Invalid email config: {e}"))?;
        let gateway = EmailGateway::new(
            &cfg.smtp_host,
            cfg.smtp_port,
            cfg.smtp_username.as_deref(),
            cfg.smtp_password.as_deref(),
            &cfg.from,
        )?;
        Ok(std::sync::Arc::new(gateway))
    }

    fn redact_config(&self, config: &Value) -> Value {
        let mut redacted = config.clone();
        if let Some(obj) = redacted.as_object_mut() {
            if obj.contains_key("smtp_password") {
                obj.insert("smtp_password".to_string(), Value::String("***".to_string()));
            }
        }
        redacted
    }
}
