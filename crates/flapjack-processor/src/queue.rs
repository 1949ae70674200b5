use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::{watch, Notify};

/// Inbound FIFO of raw event payloads.
///
/// Producers push serialized JSON; the receiver blocks on [`receive`] until
/// a payload or shutdown arrives. Payloads stay queued until taken, so
/// nothing is lost if the consumer is slow.
///
/// [`receive`]: EventQueue::receive
#[derive(Default)]
pub struct EventQueue {
    items: Mutex<VecDeque<String>>,
    notify: Notify,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, payload: String) {
        self.items
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(payload);
        self.notify.notify_one();
    }

    /// Blocks until a payload is available or the shutdown signal fires.
    /// Returns `None` on shutdown with the queue drained.
    pub async fn receive(&self, shutdown: &mut watch::Receiver<bool>) -> Option<String> {
        loop {
            // Register for wakeup before checking the queue, otherwise a
            // push between the check and the await would be missed.
            let notified = self.notify.notified();
            if let Some(payload) = self
                .items
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .pop_front()
            {
                return Some(payload);
            }
            if *shutdown.borrow() {
                return None;
            }
            tokio::select! {
                _ = notified => {}
                changed = shutdown.changed() => {
                    // A dropped sender counts as shutdown.
                    if changed.is_err() {
                        return None;
                    }
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn receives_in_fifo_order() {
        let queue = EventQueue::new();
        let (_tx, mut shutdown) = watch::channel(false);
        queue.push("a".into());
        queue.push("b".into());
        assert_eq!(queue.receive(&mut shutdown).await.as_deref(), Some("a"));
        assert_eq!(queue.receive(&mut shutdown).await.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn drains_before_honouring_shutdown() {
        let queue = EventQueue::new();
        let (tx, mut shutdown) = watch::channel(false);
        queue.push("a".into());
        tx.send(true).unwrap();
        assert_eq!(queue.receive(&mut shutdown).await.as_deref(), Some("a"));
        assert!(queue.receive(&mut shutdown).await.is_none());
    }

    #[tokio::test]
    async fn wakes_blocked_receiver_on_push() {
        let queue = std::sync::Arc::new(EventQueue::new());
        let (_tx, mut shutdown) = watch::channel(false);
        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.receive(&mut shutdown).await })
        };
        tokio::task::yield_now().await;
        queue.push("late".into());
        let received = consumer.await.unwrap();
        assert_eq!(received.as_deref(), Some("late"));
    }
}
