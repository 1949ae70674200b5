use crate::queue::AlertQueue;
use crate::{DeliveryError, Gateway};
use flapjack_common::stats::PipelineStats;
use flapjack_common::types::AlertRecord;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct NotifierSettings {
    /// Delivery attempts per alert before permanent failure.
    pub max_attempts: u32,
    /// Backoff ceiling in seconds.
    pub max_backoff_secs: u64,
    /// Seconds granted to in-flight handler calls at shutdown.
    pub shutdown_grace_secs: u64,
    /// Worker pool size per medium type.
    pub workers_per_medium: usize,
}

impl Default for NotifierSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            max_backoff_secs: 60,
            shutdown_grace_secs: 10,
            workers_per_medium: 4,
        }
    }
}

/// Per-medium worker pool pulling alerts off a queue and invoking the
/// medium's gateway.
///
/// The gateway call runs under a per-call timeout; a timeout counts as a
/// transient failure. Transient failures requeue with exponential backoff
/// until `max_attempts`, then escalate to permanent. Permanent failures are
/// dropped and counted without touching the check's `alerting_media`, so
/// the next event can retry.
pub struct Dispatcher {
    queue: Arc<AlertQueue>,
    gateway: Arc<dyn Gateway>,
    timeout: Duration,
    settings: NotifierSettings,
    stats: Arc<PipelineStats>,
}

impl Dispatcher {
    pub fn new(
        queue: Arc<AlertQueue>,
        gateway: Arc<dyn Gateway>,
        timeout: Duration,
        settings: NotifierSettings,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            queue,
            gateway,
            timeout,
            settings,
            stats,
        }
    }

    /// Spawns the worker pool. Each worker completes its in-flight alert on
    /// shutdown and exits; callers bound the wait with `shutdown_grace`.
    pub fn spawn_workers(self: Arc<Self>, shutdown: &watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        (0..self.settings.workers_per_medium)
            .map(|worker| {
                let dispatcher = self.clone();
                let mut shutdown = shutdown.clone();
                tokio::spawn(async move {
                    dispatcher.run_worker(worker, &mut shutdown).await;
                })
            })
            .collect()
    }

    async fn run_worker(&self, worker: usize, shutdown: &mut watch::Receiver<bool>) {
        let medium = self.gateway.medium_type();
        tracing::debug!(medium = %medium, worker, queue = %self.queue.name(), "Dispatch worker started");
        while let Some(alert) = self.queue.receive(shutdown).await {
            self.dispatch(alert).await;
        }
        tracing::debug!(medium = %medium, worker, "Dispatch worker stopped");
    }

    /// Delivers one alert and applies the retry/drop policy.
    pub async fn dispatch(&self, mut alert: AlertRecord) {
        let medium = self.gateway.medium_type();
        let outcome = match tokio::time::timeout(self.timeout, self.gateway.deliver(&alert)).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Transient(format!(
                "handler exceeded {}s timeout",
                self.timeout.as_secs()
            ))),
        };

        match outcome {
            Ok(()) => {
                PipelineStats::incr(&self.stats.alerts_delivered);
                tracing::info!(
                    medium = %medium,
                    check = %alert.check_name,
                    notification_type = %alert.notification_type,
                    attempts = alert.attempts + 1,
                    "Alert delivered"
                );
            }
            Err(DeliveryError::Transient(reason)) => {
                alert.attempts += 1;
                if alert.attempts >= self.settings.max_attempts {
                    PipelineStats::incr(&self.stats.alerts_failed);
                    tracing::error!(
                        medium = %medium,
                        check = %alert.check_name,
                        attempts = alert.attempts,
                        reason = %reason,
                        "Alert dropped after exhausting attempts"
                    );
                } else {
                    let backoff = self.backoff(alert.attempts);
                    tracing::warn!(
                        medium = %medium,
                        check = %alert.check_name,
                        attempt = alert.attempts,
                        backoff_secs = backoff.as_secs(),
                        reason = %reason,
                        "Transient delivery failure, requeued"
                    );
                    self.queue.enqueue_after(backoff, alert);
                }
            }
            Err(DeliveryError::Permanent(reason)) => {
                PipelineStats::incr(&self.stats.alerts_failed);
                tracing::error!(
                    medium = %medium,
                    check = %alert.check_name,
                    reason = %reason,
                    "Permanent delivery failure, dropped"
                );
            }
        }
    }

    fn backoff(&self, attempts: u32) -> Duration {
        let secs = 2u64
            .saturating_pow(attempts)
            .min(self.settings.max_backoff_secs);
        Duration::from_secs(secs)
    }
}
