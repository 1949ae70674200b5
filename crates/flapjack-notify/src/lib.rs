//! Notification half of the pipeline: route resolution, per-medium alert
//! queues, dispatcher worker pools, and the delivery gateways.
//!
//! Gateways are side-effectful externals; the dispatcher treats them as
//! opaque [`Gateway`] implementations with a deliver-once contract and owns
//! all retry policy itself.

pub mod dispatcher;
pub mod gateways;
pub mod plugin;
pub mod queue;
pub mod resolver;
pub mod routing;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use flapjack_common::types::{AlertRecord, MediumType};

pub use dispatcher::{Dispatcher, NotifierSettings};
pub use queue::AlertQueue;
pub use resolver::{Resolution, Resolver};

/// How a delivery attempt failed.
///
/// Transient failures (network errors, 5xx responses, timeouts) are
/// requeued with backoff; permanent failures (bad addresses, 4xx
/// responses) are dropped and counted.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("delivery failed, will retry: {0}")]
    Transient(String),

    #[error("delivery failed permanently: {0}")]
    Permanent(String),
}

/// A delivery channel for one medium type.
///
/// Implementations send exactly once per call and report the outcome; the
/// dispatcher wraps calls in a timeout and handles retries, so a gateway
/// must not retry internally.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn deliver(&self, alert: &AlertRecord) -> Result<(), DeliveryError>;

    fn medium_type(&self) -> MediumType;
}
