use crate::maintenance;
use chrono::{DateTime, Duration, Utc};
use flapjack_common::stats::PipelineStats;
use flapjack_common::types::{
    Condition, Event, EventType, Notification, NotificationKind,
};
use flapjack_store::entities::{CheckRecord, StateRecord, TagRecord};
use flapjack_store::{
    clear_alerting_state, EntityClass, EntityOps, Store, StoreError, StoreResult,
};
use std::sync::Arc;

/// Every class an event application may touch; the whole update runs under
/// one lock span.
const EVENT_CLASSES: &[EntityClass] = &[
    EntityClass::Check,
    EntityClass::State,
    EntityClass::ScheduledMaintenance,
    EntityClass::UnscheduledMaintenance,
    EntityClass::Tag,
    EntityClass::Medium,
    EntityClass::Route,
];

#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    /// Fallback hold-down in seconds for checks without an override.
    pub initial_failure_delay: u32,
    /// Fallback repeat throttle in seconds.
    pub repeat_failure_delay: u32,
    /// Auto-create checks named by events; otherwise such events are dropped.
    pub auto_create_checks: bool,
    /// Scheduled maintenance opened for newly created checks, in seconds.
    pub new_check_maintenance_secs: u64,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            initial_failure_delay: 0,
            repeat_failure_delay: 300,
            auto_create_checks: true,
            new_check_maintenance_secs: 0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Applies events to checks: resolves the check, appends the state sample,
/// walks the transition table, and emits at most one notification per
/// event. Events for one check are handled serially; the store lock keeps
/// the check, its latest state, its most-severe pointer and its routes
/// consistent within an event.
pub struct Processor<S> {
    store: Arc<S>,
    settings: ProcessorSettings,
    stats: Arc<PipelineStats>,
}

impl<S: Store> Processor<S> {
    pub fn new(store: Arc<S>, settings: ProcessorSettings, stats: Arc<PipelineStats>) -> Self {
        Self {
            store,
            settings,
            stats,
        }
    }

    pub fn process(&self, event: &Event) -> Result<Option<Notification>, ProcessError> {
        match event.event_type {
            EventType::Metric => {
                // Samples for an external metrics pipeline; no state change.
                PipelineStats::incr(&self.stats.metrics_received);
                Ok(None)
            }
            EventType::Action => self.process_action(event),
            EventType::Service => self.process_service(event),
        }
    }

    fn process_service(&self, event: &Event) -> Result<Option<Notification>, ProcessError> {
        let notification = self
            .store
            .with_lock(EVENT_CLASSES, |ops| self.apply_service_event(ops, event))?;
        if notification.is_some() {
            PipelineStats::incr(&self.stats.notifications_emitted);
        }
        Ok(notification)
    }

    fn apply_service_event(
        &self,
        ops: &mut dyn EntityOps,
        event: &Event,
    ) -> StoreResult<Option<Notification>> {
        let name = event.check_name();
        let t = event.timestamp();

        let mut check = match ops.check_by_name(&name) {
            Some(check) => check.clone(),
            None => {
                if !self.settings.auto_create_checks {
                    tracing::info!(check = %name, "Dropping event for unknown check");
                    return Ok(None);
                }
                self.create_check(ops, event, &name, t)?
            }
        };
        if !check.enabled {
            tracing::debug!(check = %name, "Dropping event for disabled check");
            return Ok(None);
        }

        // Event-level overrides stick to the check.
        if let Some(delay) = event.initial_failure_delay {
            check.initial_failure_delay = Some(delay);
        }
        if let Some(delay) = event.repeat_failure_delay {
            check.repeat_failure_delay = Some(delay);
        }
        if let Some(tags) = &event.tags {
            let changed = self.link_tags(ops, &mut check, tags)?;
            if changed {
                check.routes_stale = true;
            }
        }

        if let Some(current) = ops.latest_state(&check.id) {
            if current.created_at == t && current.condition == event.state {
                // Same sample delivered twice; idempotent.
                tracing::debug!(check = %name, time = t.timestamp(), "Duplicate event, skipping");
                ops.save_check(check)?;
                return Ok(None);
            }
            if t <= current.created_at {
                tracing::warn!(
                    check = %name,
                    event_time = t.timestamp(),
                    current_time = current.created_at.timestamp(),
                    "Out-of-order event, dropping"
                );
                ops.save_check(check)?;
                return Ok(None);
            }
        }

        let prev = check.condition;
        let new = event.state;
        let state = StateRecord::new(
            &check.id,
            new,
            &event.summary,
            event.details.as_deref(),
            t,
        );
        let state_id = state.id.clone();
        ops.add_state(state)?;

        check.condition = new;
        check.failing = new.is_unhealthy();
        check.current_state_id = Some(state_id.clone());

        let decision = self.transition(ops, &mut check, prev, new, &state_id, t);

        let notification = match decision {
            Emit::None => None,
            Emit::Problem => {
                if maintenance::in_maintenance(ops, &check.id, t) {
                    PipelineStats::incr(&self.stats.problems_suppressed);
                    tracing::info!(check = %name, condition = %new, "Problem suppressed (maintenance)");
                    ops.save_check(check.clone())?;
                    clear_alerting_state(ops, &check.id);
                    return Ok(None);
                }
                check.last_problem_at = Some(t);
                check.notification_count += 1;
                Some(self.notification(&check, &state_id, NotificationKind::Problem, new, event, t))
            }
            Emit::Recovery => {
                check.notification_count += 1;
                check.reset_episode();
                Some(self.notification(
                    &check,
                    &state_id,
                    NotificationKind::Recovery,
                    new,
                    event,
                    t,
                ))
            }
        };

        ops.save_check(check)?;
        Ok(notification)
    }

    /// The transition table: decides what, if anything, this sample emits.
    fn transition(
        &self,
        ops: &dyn EntityOps,
        check: &mut CheckRecord,
        prev: Condition,
        new: Condition,
        state_id: &str,
        t: DateTime<Utc>,
    ) -> Emit {
        match (prev.is_healthy(), new.is_healthy()) {
            (true, true) => Emit::None,
            (false, true) => Emit::Recovery,
            (true, false) => {
                check.failure_started_at = Some(t);
                check.failing_streak = 1;
                check.most_severe_id = Some(state_id.to_string());
                if self.past_hold_down(check, t) && self.past_repeat_throttle(check, t) {
                    Emit::Problem
                } else {
                    Emit::None
                }
            }
            (false, false) => {
                check.failing_streak += 1;
                let escalated = new > prev;
                let most_severe = check
                    .most_severe_id
                    .as_deref()
                    .and_then(|id| ops.state(id))
                    .map(|s| s.condition);
                if most_severe.map_or(true, |severest| new > severest) {
                    check.most_severe_id = Some(state_id.to_string());
                }
                if check.failure_started_at.is_none() {
                    // Episode bookkeeping lost (e.g. check re-enabled while
                    // failing); restart the hold-down counter here.
                    check.failure_started_at = Some(t);
                }
                if escalated {
                    // Severity escalation overrides both the hold-down and
                    // the repeat throttle.
                    Emit::Problem
                } else if self.past_hold_down(check, t) && self.past_repeat_throttle(check, t) {
                    Emit::Problem
                } else {
                    Emit::None
                }
            }
        }
    }

    fn past_hold_down(&self, check: &CheckRecord, t: DateTime<Utc>) -> bool {
        let delay = check
            .initial_failure_delay
            .unwrap_or(self.settings.initial_failure_delay);
        match check.failure_started_at {
            Some(started) => t - started >= Duration::seconds(delay as i64),
            None => true,
        }
    }

    fn past_repeat_throttle(&self, check: &CheckRecord, t: DateTime<Utc>) -> bool {
        let delay = check
            .repeat_failure_delay
            .unwrap_or(self.settings.repeat_failure_delay);
        match check.last_problem_at {
            Some(last) => t - last >= Duration::seconds(delay as i64),
            None => true,
        }
    }

    fn process_action(&self, event: &Event) -> Result<Option<Notification>, ProcessError> {
        let notification = self
            .store
            .with_lock(EVENT_CLASSES, |ops| self.apply_action_event(ops, event))?;
        if notification.is_some() {
            PipelineStats::incr(&self.stats.notifications_emitted);
        }
        Ok(notification)
    }

    fn apply_action_event(
        &self,
        ops: &mut dyn EntityOps,
        event: &Event,
    ) -> StoreResult<Option<Notification>> {
        let name = event.check_name();
        let Some(check) = ops.check_by_name(&name) else {
            tracing::warn!(check = %name, "Acknowledgement for unknown check, dropping");
            return Ok(None);
        };
        let mut check = check.clone();
        let t = event.timestamp();

        // Validation guarantees both fields on action events.
        let ack_id = event.acknowledgement_id.as_deref().unwrap_or_default();
        let duration = event.duration.unwrap_or_default();

        if ack_id != check.ack_hash {
            PipelineStats::incr(&self.stats.acks_rejected);
            tracing::warn!(check = %name, ack_id = %ack_id, "Acknowledgement token mismatch");
            return Ok(None);
        }

        let acked = maintenance::acknowledge(ops, &check.id, duration, &event.summary, t)?;
        if !acked {
            tracing::debug!(check = %name, "Acknowledgement was a no-op");
            return Ok(None);
        }

        let Some(state_id) = check.current_state_id.clone() else {
            return Ok(None);
        };
        check.notification_count += 1;
        let condition = check.condition;
        let notification = self.notification(
            &check,
            &state_id,
            NotificationKind::Acknowledgement,
            condition,
            event,
            t,
        );
        ops.save_check(check)?;
        Ok(Some(notification))
    }

    fn create_check(
        &self,
        ops: &mut dyn EntityOps,
        event: &Event,
        name: &str,
        t: DateTime<Utc>,
    ) -> StoreResult<CheckRecord> {
        let mut check = CheckRecord::new(name);
        check.initial_failure_delay = event.initial_failure_delay;
        check.repeat_failure_delay = event.repeat_failure_delay;
        if let Some(tags) = &event.tags {
            self.link_tags(ops, &mut check, tags)?;
        }
        ops.save_check(check.clone())?;

        if self.settings.new_check_maintenance_secs > 0 {
            let end = t + Duration::seconds(self.settings.new_check_maintenance_secs as i64);
            maintenance::schedule(ops, &check.id, t, end, "new check")?;
        }
        tracing::info!(check = %name, id = %check.id, "Created check");
        Ok(check)
    }

    /// Links the named tags to the check (creating tags as needed).
    /// Returns true when the check's tag set grew.
    fn link_tags(
        &self,
        ops: &mut dyn EntityOps,
        check: &mut CheckRecord,
        tag_names: &[String],
    ) -> StoreResult<bool> {
        let mut changed = false;
        for tag_name in tag_names {
            let mut tag = match ops.tag_by_name(tag_name) {
                Some(tag) => tag.clone(),
                None => TagRecord::new(tag_name),
            };
            tag.checks.insert(check.id.clone());
            if check.tags.insert(tag.id.clone()) {
                changed = true;
            }
            ops.save_tag(tag)?;
        }
        Ok(changed)
    }

    fn notification(
        &self,
        check: &CheckRecord,
        state_id: &str,
        kind: NotificationKind,
        condition: Condition,
        event: &Event,
        t: DateTime<Utc>,
    ) -> Notification {
        Notification {
            check_id: check.id.clone(),
            state_id: state_id.to_string(),
            kind,
            condition,
            summary: event.summary.clone(),
            details: event.details.clone(),
            timestamp: t,
        }
    }
}

enum Emit {
    None,
    Problem,
    Recovery,
}
