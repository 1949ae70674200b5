use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub processor: ProcessorConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    /// Keyed by medium type name (`email`, `sms`, ...). Only media with a
    /// configured gateway get a dispatch pool.
    #[serde(default)]
    pub gateways: BTreeMap<String, GatewayConfig>,
    /// Optional JSON seed file declaring contacts, media, rules and checks.
    #[serde(default)]
    pub seed: Option<String>,
    /// Drop state history older than this many seconds; 0 keeps everything.
    #[serde(default)]
    pub states_retention: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorConfig {
    #[serde(default)]
    pub initial_failure_delay: u32,
    #[serde(default = "default_repeat_failure_delay")]
    pub repeat_failure_delay: u32,
    #[serde(default)]
    pub new_check_scheduled_maintenance_duration: u64,
    #[serde(default = "default_auto_create_checks")]
    pub auto_create_checks: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            initial_failure_delay: 0,
            repeat_failure_delay: default_repeat_failure_delay(),
            new_check_scheduled_maintenance_duration: 0,
            auto_create_checks: default_auto_create_checks(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Backoff ceiling in seconds.
    #[serde(default = "default_max_backoff")]
    pub max_backoff: u64,
    /// Seconds granted to in-flight deliveries at shutdown.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace: u64,
    #[serde(default = "default_workers_per_medium")]
    pub workers_per_medium: usize,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            max_backoff: default_max_backoff(),
            shutdown_grace: default_shutdown_grace(),
            workers_per_medium: default_workers_per_medium(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Outbound queue name; defaults to `<medium>_notifications`.
    #[serde(default)]
    pub queue: Option<String>,
    /// Per-delivery timeout in seconds.
    #[serde(default = "default_gateway_timeout")]
    pub timeout: u64,
    /// Gateway-specific settings, passed to the plugin as-is.
    #[serde(default)]
    pub config: serde_json::Value,
}

fn default_repeat_failure_delay() -> u32 {
    300
}

fn default_auto_create_checks() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_max_backoff() -> u64 {
    60
}

fn default_shutdown_grace() -> u64 {
    10
}

fn default_workers_per_medium() -> usize {
    4
}

fn default_gateway_timeout() -> u64 {
    30
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}
