//! Maintenance window queries and mutations.
//!
//! Everything here takes `EntityOps` so calls compose inside the caller's
//! lock span; all mutations to a check's windows are serialized by that
//! lock. At most one open unscheduled window exists per check; overlapping
//! scheduled windows are permitted.

use chrono::{DateTime, Duration, Utc};
use flapjack_store::entities::UnscheduledMaintenanceRecord;
use flapjack_store::{clear_alerting_state, EntityClass, EntityOps, StoreError, StoreResult};

/// Is the check inside any scheduled window at `t`?
pub fn in_scheduled(ops: &dyn EntityOps, check_id: &str, t: DateTime<Utc>) -> bool {
    ops.scheduled_windows(check_id)
        .iter()
        .any(|w| w.active_at(t))
}

/// Is the check inside an unscheduled (acknowledgement) window at `t`?
pub fn in_unscheduled(ops: &dyn EntityOps, check_id: &str, t: DateTime<Utc>) -> bool {
    ops.unscheduled_windows(check_id)
        .iter()
        .any(|w| w.active_at(t))
}

/// Scheduled and unscheduled windows are independent suppressors: a problem
/// is withheld while either is active.
pub fn in_maintenance(ops: &dyn EntityOps, check_id: &str, t: DateTime<Utc>) -> bool {
    in_scheduled(ops, check_id, t) || in_unscheduled(ops, check_id, t)
}

/// The open unscheduled window at `t`, if any.
pub fn current_unscheduled<'a>(
    ops: &'a dyn EntityOps,
    check_id: &str,
    t: DateTime<Utc>,
) -> Option<&'a UnscheduledMaintenanceRecord> {
    ops.unscheduled_windows(check_id)
        .into_iter()
        .find(|w| w.active_at(t))
}

/// Declares a scheduled window. Returns the window id.
pub fn schedule(
    ops: &mut dyn EntityOps,
    check_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    summary: &str,
) -> StoreResult<String> {
    if ops.check(check_id).is_none() {
        return Err(StoreError::Missing {
            class: EntityClass::Check,
            id: check_id.to_string(),
        });
    }
    if end <= start {
        return Err(StoreError::Conflict {
            class: EntityClass::ScheduledMaintenance,
            detail: format!("window end {end} not after start {start}"),
        });
    }
    let window = flapjack_store::entities::ScheduledMaintenanceRecord::new(
        check_id, start, end, summary,
    );
    let window_id = window.id.clone();
    ops.save_scheduled_window(window);
    Ok(window_id)
}

/// Ends a scheduled window at `at`.
///
/// `at <= start` deletes the window outright; `at < end` truncates it and
/// clears the alerting routes so the next unhealthy sample re-notifies;
/// a window already over is left alone and `false` is returned.
pub fn end_scheduled(
    ops: &mut dyn EntityOps,
    window_id: &str,
    at: DateTime<Utc>,
) -> StoreResult<bool> {
    let Some(window) = ops.scheduled_window(window_id) else {
        return Err(StoreError::Missing {
            class: EntityClass::ScheduledMaintenance,
            id: window_id.to_string(),
        });
    };
    let mut window = window.clone();

    if at <= window.start_time {
        ops.delete_scheduled_window(window_id);
        return Ok(true);
    }
    if at < window.end_time {
        window.end_time = at;
        let check_id = window.check_id.clone();
        ops.save_scheduled_window(window);
        clear_alerting_state(ops, &check_id);
        return Ok(true);
    }
    Ok(false)
}

/// Opens an unscheduled window `[now, now + duration)` for a failing check,
/// truncating any window already open. Acknowledging a healthy check, or
/// with a zero duration, is a no-op returning `false`.
pub fn acknowledge(
    ops: &mut dyn EntityOps,
    check_id: &str,
    duration_secs: u64,
    summary: &str,
    now: DateTime<Utc>,
) -> StoreResult<bool> {
    let Some(check) = ops.check(check_id) else {
        return Err(StoreError::Missing {
            class: EntityClass::Check,
            id: check_id.to_string(),
        });
    };
    if !check.failing || duration_secs == 0 {
        return Ok(false);
    }

    if let Some(open) = current_unscheduled(ops, check_id, now) {
        let mut truncated = open.clone();
        truncated.end_time = now;
        ops.save_unscheduled_window(truncated);
    }
    let window = UnscheduledMaintenanceRecord::new(
        check_id,
        now,
        now + Duration::seconds(duration_secs as i64),
        summary,
    );
    ops.save_unscheduled_window(window);
    Ok(true)
}

/// Drops windows that ended before `cutoff` (truncated into the past).
pub fn expire_windows(ops: &mut dyn EntityOps, check_id: &str, cutoff: DateTime<Utc>) -> usize {
    let expired_scheduled: Vec<String> = ops
        .scheduled_windows(check_id)
        .iter()
        .filter(|w| w.end_time <= cutoff)
        .map(|w| w.id.clone())
        .collect();
    let expired_unscheduled: Vec<String> = ops
        .unscheduled_windows(check_id)
        .iter()
        .filter(|w| w.end_time <= cutoff)
        .map(|w| w.id.clone())
        .collect();
    let removed = expired_scheduled.len() + expired_unscheduled.len();
    for id in expired_scheduled {
        ops.delete_scheduled_window(&id);
    }
    for id in expired_unscheduled {
        ops.delete_unscheduled_window(&id);
    }
    removed
}
