use crate::queue::EventQueue;
use flapjack_common::stats::PipelineStats;
use flapjack_common::types::Event;
use std::sync::Arc;
use tokio::sync::watch;

/// Pulls raw payloads off the inbound queue and turns them into validated
/// events. Malformed payloads are counted and dropped; they never block the
/// queue. The receiver owns no durable state.
pub struct Receiver {
    queue: Arc<EventQueue>,
    stats: Arc<PipelineStats>,
}

impl Receiver {
    pub fn new(queue: Arc<EventQueue>, stats: Arc<PipelineStats>) -> Self {
        Self { queue, stats }
    }

    /// Blocks until a valid event is available or shutdown fires.
    pub async fn receive(&self, shutdown: &mut watch::Receiver<bool>) -> Option<Event> {
        loop {
            let payload = self.queue.receive(shutdown).await?;
            PipelineStats::incr(&self.stats.events_received);
            match Event::parse(&payload) {
                Ok(event) => return Some(event),
                Err(error) => {
                    PipelineStats::incr(&self.stats.events_rejected);
                    tracing::warn!(
                        error = %error,
                        payload_bytes = payload.len(),
                        "Rejected inbound event"
                    );
                }
            }
        }
    }
}
