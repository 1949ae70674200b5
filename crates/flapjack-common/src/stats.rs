use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide pipeline counters.
///
/// Failures in the pipeline never surface as in-band responses; they land
/// here and in structured log entries.
#[derive(Debug, Default)]
pub struct PipelineStats {
    pub events_received: AtomicU64,
    pub events_rejected: AtomicU64,
    pub metrics_received: AtomicU64,
    pub notifications_emitted: AtomicU64,
    pub problems_suppressed: AtomicU64,
    pub acks_rejected: AtomicU64,
    pub alerts_enqueued: AtomicU64,
    pub alerts_delivered: AtomicU64,
    pub alerts_failed: AtomicU64,
    pub invariant_repairs: AtomicU64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    /// Logs a snapshot of every counter; called on shutdown.
    pub fn log_summary(&self) {
        tracing::info!(
            events_received = Self::get(&self.events_received),
            events_rejected = Self::get(&self.events_rejected),
            metrics_received = Self::get(&self.metrics_received),
            notifications_emitted = Self::get(&self.notifications_emitted),
            problems_suppressed = Self::get(&self.problems_suppressed),
            acks_rejected = Self::get(&self.acks_rejected),
            alerts_enqueued = Self::get(&self.alerts_enqueued),
            alerts_delivered = Self::get(&self.alerts_delivered),
            alerts_failed = Self::get(&self.alerts_failed),
            invariant_repairs = Self::get(&self.invariant_repairs),
            "Pipeline counters"
        );
    }
}
