//! Administrative control surface consumed by the external gateway and the
//! command-line front-end (both out of scope here).
//!
//! Acknowledgements are expressed as synthetic `action` events through the
//! inbound queue rather than direct mutations, so per-check event ordering
//! is preserved and the ack notification flows through the normal pipeline.

use crate::pipeline::QueueSet;
use chrono::{DateTime, Utc};
use flapjack_common::stats::PipelineStats;
use flapjack_common::types::{Condition, Event, EventType};
use flapjack_notify::Resolver;
use flapjack_processor::{maintenance, EventQueue};
use flapjack_store::{EntityClass, Store, StoreError, StoreResult};
use std::sync::Arc;

const MAINT_CLASSES: &[EntityClass] = &[
    EntityClass::Check,
    EntityClass::ScheduledMaintenance,
    EntityClass::UnscheduledMaintenance,
    EntityClass::Medium,
    EntityClass::Route,
];

/// Snapshot answer to `CurrentState`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CheckStatus {
    pub id: String,
    pub name: String,
    pub condition: Condition,
    pub failing: bool,
    pub summary: Option<String>,
    pub notification_count: u64,
    pub in_scheduled_maintenance: bool,
    pub in_unscheduled_maintenance: bool,
}

pub struct Admin<S: Store> {
    store: Arc<S>,
    events: Arc<EventQueue>,
    resolver: Arc<Resolver<S>>,
    queues: Arc<QueueSet>,
    stats: Arc<PipelineStats>,
}

impl<S: Store> Admin<S> {
    pub fn new(
        store: Arc<S>,
        events: Arc<EventQueue>,
        resolver: Arc<Resolver<S>>,
        queues: Arc<QueueSet>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            store,
            events,
            resolver,
            queues,
            stats,
        }
    }

    /// Queues an event exactly as an external probe would.
    pub fn ingest(&self, event: &Event) -> anyhow::Result<()> {
        let payload = serde_json::to_string(event)?;
        self.events.push(payload);
        Ok(())
    }

    pub fn current_state(&self, check_id: &str) -> StoreResult<CheckStatus> {
        let now = Utc::now();
        self.store.read(|ops| {
            let check = ops.check(check_id).ok_or_else(|| StoreError::Missing {
                class: EntityClass::Check,
                id: check_id.to_string(),
            })?;
            let summary = check
                .current_state_id
                .as_deref()
                .and_then(|state_id| ops.state(state_id))
                .map(|state| state.summary.clone());
            Ok(CheckStatus {
                id: check.id.clone(),
                name: check.name.clone(),
                condition: check.condition,
                failing: check.failing,
                summary,
                notification_count: check.notification_count,
                in_scheduled_maintenance: maintenance::in_scheduled(ops, check_id, now),
                in_unscheduled_maintenance: maintenance::in_unscheduled(ops, check_id, now),
            })
        })
    }

    /// Enqueues an acknowledgement for a failing check. Returns `false`
    /// without queueing when the check is healthy or the duration is zero,
    /// mirroring the maintenance contract.
    pub fn acknowledge(
        &self,
        check_id: &str,
        duration_secs: u64,
        summary: &str,
    ) -> StoreResult<bool> {
        let (name, ack_hash, failing) = self.store.read(|ops| {
            let check = ops.check(check_id).ok_or_else(|| StoreError::Missing {
                class: EntityClass::Check,
                id: check_id.to_string(),
            })?;
            Ok((check.name.clone(), check.ack_hash.clone(), check.failing))
        })?;
        if !failing || duration_secs == 0 {
            return Ok(false);
        }

        let event = Event {
            entity: name,
            check: None,
            event_type: EventType::Action,
            state: Condition::Critical,
            summary: summary.to_string(),
            details: None,
            time: Utc::now().timestamp(),
            tags: None,
            initial_failure_delay: None,
            repeat_failure_delay: None,
            acknowledgement_id: Some(ack_hash),
            duration: Some(duration_secs),
        };
        match serde_json::to_string(&event) {
            Ok(payload) => {
                self.events.push(payload);
                Ok(true)
            }
            Err(error) => {
                tracing::error!(error = %error, "Failed to serialize acknowledgement event");
                Ok(false)
            }
        }
    }

    pub fn schedule_maintenance(
        &self,
        check_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        summary: &str,
    ) -> StoreResult<String> {
        self.store.with_lock(MAINT_CLASSES, |ops| {
            maintenance::schedule(ops, check_id, start, end, summary)
        })
    }

    /// Ends a scheduled maintenance window at `at`; see the maintenance
    /// manager for the delete/truncate/no-op cases.
    pub fn end_maintenance(
        &self,
        check_id: &str,
        window_id: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        self.store.with_lock(MAINT_CLASSES, |ops| {
            match ops.scheduled_window(window_id) {
                Some(window) if window.check_id == check_id => {}
                _ => {
                    return Err(StoreError::Missing {
                        class: EntityClass::ScheduledMaintenance,
                        id: window_id.to_string(),
                    })
                }
            }
            maintenance::end_scheduled(ops, window_id, at)
        })
    }

    /// Sends a test alert to every medium of the contact, bypassing rules.
    /// Returns the number of alerts enqueued.
    pub fn test_notification(&self, check_id: &str, contact_id: &str) -> StoreResult<usize> {
        let alerts = self.resolver.resolve_test(check_id, contact_id)?;
        let mut enqueued = 0;
        for alert in alerts {
            match self.queues.get(&alert.medium_type) {
                Some(queue) => {
                    PipelineStats::incr(&self.stats.alerts_enqueued);
                    queue.enqueue(alert);
                    enqueued += 1;
                }
                None => {
                    tracing::warn!(
                        medium = %alert.medium_type,
                        "No gateway configured for medium, test alert dropped"
                    );
                }
            }
        }
        Ok(enqueued)
    }
}
