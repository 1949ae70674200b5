use chrono::{DateTime, Duration, Utc};
use flapjack_common::types::AlertRecord;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Mutex;
use tokio::sync::{watch, Notify};

struct QueuedAlert {
    ready_at: DateTime<Utc>,
    seq: u64,
    alert: AlertRecord,
}

// Min-heap ordering on (ready_at, seq): earliest ready first, FIFO among
// equals.
impl PartialEq for QueuedAlert {
    fn eq(&self, other: &Self) -> bool {
        self.ready_at == other.ready_at && self.seq == other.seq
    }
}

impl Eq for QueuedAlert {}

impl PartialOrd for QueuedAlert {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedAlert {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.ready_at, other.seq).cmp(&(self.ready_at, self.seq))
    }
}

/// Per-medium FIFO of dispatchable alerts with delayed re-entry for
/// backoff requeues.
///
/// Shutdown semantics: a blocked [`receive`] returns `None` as soon as the
/// signal fires; queued alerts stay put for the next startup.
///
/// [`receive`]: AlertQueue::receive
pub struct AlertQueue {
    name: String,
    heap: Mutex<BinaryHeap<QueuedAlert>>,
    seq: AtomicU64,
    notify: Notify,
}

impl AlertQueue {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            heap: Mutex::new(BinaryHeap::new()),
            seq: AtomicU64::new(0),
            notify: Notify::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn enqueue(&self, alert: AlertRecord) {
        self.enqueue_at(Utc::now(), alert);
    }

    /// Requeue with a delay; used for transient-failure backoff.
    pub fn enqueue_after(&self, delay: std::time::Duration, alert: AlertRecord) {
        let delay = Duration::from_std(delay).unwrap_or(Duration::zero());
        self.enqueue_at(Utc::now() + delay, alert);
    }

    fn enqueue_at(&self, ready_at: DateTime<Utc>, alert: AlertRecord) {
        let seq = self.seq.fetch_add(1, AtomicOrdering::Relaxed);
        self.heap
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(QueuedAlert {
                ready_at,
                seq,
                alert,
            });
        self.notify.notify_one();
    }

    /// Blocks until an alert is ready or shutdown fires.
    pub async fn receive(&self, shutdown: &mut watch::Receiver<bool>) -> Option<AlertRecord> {
        loop {
            if *shutdown.borrow() {
                return None;
            }
            let notified = self.notify.notified();
            let now = Utc::now();
            let next_ready = {
                let mut heap = self.heap.lock().unwrap_or_else(|e| e.into_inner());
                match heap.peek().map(|top| top.ready_at) {
                    Some(ready_at) if ready_at <= now => {
                        if let Some(queued) = heap.pop() {
                            // Another entry may be ready too; wake a sibling.
                            self.notify.notify_one();
                            return Some(queued.alert);
                        }
                        None
                    }
                    Some(ready_at) => Some(ready_at - now),
                    None => None,
                }
            };
            match next_ready.and_then(|d| d.to_std().ok()) {
                Some(wait) => {
                    tokio::select! {
                        _ = notified => {}
                        _ = tokio::time::sleep(wait) => {}
                        changed = shutdown.changed() => {
                            if changed.is_err() {
                                return None;
                            }
                        }
                    }
                }
                None => {
                    tokio::select! {
                        _ = notified => {}
                        changed = shutdown.changed() => {
                            if changed.is_err() {
                                return None;
                            }
                        }
                    }
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.heap.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
