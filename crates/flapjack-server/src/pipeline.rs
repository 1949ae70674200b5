//! The receive -> process -> resolve -> enqueue loop.

use flapjack_common::stats::PipelineStats;
use flapjack_common::types::{Event, MediumType, Notification};
use flapjack_notify::{AlertQueue, Resolver};
use flapjack_processor::processor::ProcessError;
use flapjack_processor::{Processor, Receiver};
use flapjack_store::retry::RetryPolicy;
use flapjack_store::Store;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

pub type QueueSet = HashMap<MediumType, Arc<AlertQueue>>;

pub struct Pipeline<S: Store> {
    receiver: Receiver,
    processor: Processor<S>,
    resolver: Resolver<S>,
    queues: Arc<QueueSet>,
    stats: Arc<PipelineStats>,
    retry: RetryPolicy,
}

impl<S: Store> Pipeline<S> {
    pub fn new(
        receiver: Receiver,
        processor: Processor<S>,
        resolver: Resolver<S>,
        queues: Arc<QueueSet>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            receiver,
            processor,
            resolver,
            queues,
            stats,
            retry: RetryPolicy::default(),
        }
    }

    /// Runs until shutdown; the in-flight event is completed before exit.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("Pipeline started");
        while let Some(event) = self.receiver.receive(&mut shutdown).await {
            if let Some(notification) = self.process_event(&event).await {
                if let Some(resolution) = self.resolve(&notification).await {
                    self.enqueue_alerts(resolution.alerts);
                }
            }
        }
        tracing::info!("Pipeline stopped");
    }

    async fn process_event(&self, event: &Event) -> Option<Notification> {
        let mut retries = 0;
        loop {
            match self.processor.process(event) {
                Ok(notification) => return notification,
                Err(ProcessError::Store(error)) if error.is_transient() => {
                    match self.retry.delay_for(retries) {
                        Some(delay) => {
                            tracing::warn!(
                                check = %event.check_name(),
                                error = %error,
                                retry = retries + 1,
                                "Transient store error while processing, retrying"
                            );
                            tokio::time::sleep(delay).await;
                            retries += 1;
                        }
                        None => {
                            tracing::error!(
                                check = %event.check_name(),
                                error = %error,
                                "Store retries exhausted, dropping event"
                            );
                            return None;
                        }
                    }
                }
                Err(ProcessError::Store(error)) => {
                    tracing::warn!(
                        check = %event.check_name(),
                        error = %error,
                        "Dropping event"
                    );
                    return None;
                }
            }
        }
    }

    async fn resolve(
        &self,
        notification: &Notification,
    ) -> Option<flapjack_notify::Resolution> {
        let mut retries = 0;
        loop {
            match self.resolver.resolve(notification) {
                Ok(resolution) => return Some(resolution),
                Err(error) if error.is_transient() => {
                    match self.retry.delay_for(retries) {
                        Some(delay) => {
                            tracing::warn!(error = %error, "Transient store error while resolving, retrying");
                            tokio::time::sleep(delay).await;
                            retries += 1;
                        }
                        None => {
                            tracing::error!(error = %error, "Store retries exhausted, dropping notification");
                            return None;
                        }
                    }
                }
                Err(error) => {
                    tracing::warn!(
                        check_id = %notification.check_id,
                        error = %error,
                        "Dropping notification"
                    );
                    return None;
                }
            }
        }
    }

    fn enqueue_alerts(&self, alerts: Vec<flapjack_common::types::AlertRecord>) {
        for alert in alerts {
            match self.queues.get(&alert.medium_type) {
                Some(queue) => {
                    PipelineStats::incr(&self.stats.alerts_enqueued);
                    queue.enqueue(alert);
                }
                None => {
                    PipelineStats::incr(&self.stats.alerts_failed);
                    tracing::warn!(
                        medium = %alert.medium_type,
                        check = %alert.check_name,
                        "No gateway configured for medium, dropping alert"
                    );
                }
            }
        }
    }
}
