use crate::Gateway;
use anyhow::Result;
use flapjack_common::types::MediumType;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Factory for one gateway type. Configs arrive as JSON values straight
/// from the configuration file.
pub trait GatewayPlugin: Send + Sync {
    fn medium_type(&self) -> MediumType;

    fn validate_config(&self, config: &Value) -> Result<()>;

    fn create_gateway(&self, config: &Value) -> Result<Arc<dyn Gateway>>;

    /// Copy of the config safe for logging; secrets replaced with `***`.
    fn redact_config(&self, config: &Value) -> Value {
        config.clone()
    }
}

pub struct GatewayRegistry {
    plugins: HashMap<MediumType, Box<dyn GatewayPlugin>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
        }
    }

    pub fn register(&mut self, plugin: Box<dyn GatewayPlugin>) {
        self.plugins.insert(plugin.medium_type(), plugin);
    }

    pub fn create_gateway(
        &self,
        medium_type: MediumType,
        config: &Value,
    ) -> Result<Arc<dyn Gateway>> {
        let plugin = self
            .plugins
            .get(&medium_type)
            .ok_or_else(|| anyhow::anyhow!("No gateway plugin for medium type: {medium_type}"))?;
        plugin.validate_config(config)?;
        plugin.create_gateway(config)
    }

    pub fn has_plugin(&self, medium_type: MediumType) -> bool {
        self.plugins.contains_key(&medium_type)
    }

    pub fn medium_types(&self) -> Vec<MediumType> {
        let mut types: Vec<MediumType> = self.plugins.keys().copied().collect();
        types.sort();
        types
    }
}

impl Default for GatewayRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(crate::gateways::email::EmailPlugin));
        registry.register(Box::new(crate::gateways::sms::SmsPlugin));
        registry.register(Box::new(crate::gateways::webhook::WebhookPlugin));
        registry.register(Box::new(crate::gateways::pagerduty::PagerdutyPlugin));
        registry
    }
}
