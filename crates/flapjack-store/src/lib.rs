//! Entity persistence layer for the notification pipeline.
//!
//! The pipeline's shared mutable state lives behind the [`Store`] trait.
//! Its one structural requirement is the composable multi-class lock:
//! every mutation touching a check together with its states, maintenance
//! windows, routes or media runs inside a single [`Store::with_lock`] span.
//! [`memory::MemoryStore`] is the reference engine; a Redis-like backend
//! can implement the same contract.

pub mod entities;
pub mod memory;
pub mod retry;


use chrono::{DateTime, Utc};
use entities::{
    CheckRecord, ContactRecord, MediumRecord, RouteRecord, RuleRecord,
    ScheduledMaintenanceRecord, StateRecord, TagRecord, UnscheduledMaintenanceRecord,
};

/// Named entity classes, used to declare the span of a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityClass {
    Check,
    State,
    ScheduledMaintenance,
    UnscheduledMaintenance,
    Tag,
    Contact,
    Medium,
    Rule,
    Route,
}

impl std::fmt::Display for EntityClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityClass::Check => "check",
            EntityClass::State => "state",
            EntityClass::ScheduledMaintenance => "scheduled_maintenance",
            EntityClass::UnscheduledMaintenance => "unscheduled_maintenance",
            EntityClass::Tag => "tag",
            EntityClass::Contact => "contact",
            EntityClass::Medium => "medium",
            EntityClass::Rule => "rule",
            EntityClass::Route => "route",
        };
        write!(f, "{name}")
    }
}

/// Errors surfaced by store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A required entity does not exist. Permanent: callers log and drop
    /// the current work item.
    #[error("store: no {class} with id {id}")]
    Missing { class: EntityClass, id: String },

    /// Unique-index violation (e.g. duplicate check name).
    #[error("store: {class} conflict: {detail}")]
    Conflict { class: EntityClass, detail: String },

    /// A state sample would break the per-check `created_at` monotonicity.
    #[error("store: out-of-order state for check {check_id}")]
    OutOfOrder { check_id: String },

    /// Backend hiccup worth retrying with backoff.
    #[error("store: transient: {0}")]
    Transient(String),

    /// The lock deadline elapsed before acquisition.
    #[error("store: lock acquisition timed out")]
    LockTimeout,
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_) | StoreError::LockTimeout)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Typed entity operations, handed to the closure of a lock span.
///
/// This is the realization of the abstract Get / Save / Delete /
/// FindByIndex / SortedRange contract: lookups by id, unique-index lookups
/// (`check_by_name`, `tag_by_name`), and score-ordered range reads over the
/// state and maintenance sequences.
pub trait EntityOps {
    // Checks
    fn check(&self, id: &str) -> Option<&CheckRecord>;
    fn check_by_name(&self, name: &str) -> Option<&CheckRecord>;
    fn check_ids(&self) -> Vec<String>;
    /// Upsert; enforces name uniqueness.
    fn save_check(&mut self, check: CheckRecord) -> StoreResult<()>;
    /// Removes the check and everything it owns (states, windows, routes).
    fn delete_check(&mut self, id: &str) -> StoreResult<()>;

    // States
    fn state(&self, id: &str) -> Option<&StateRecord>;
    /// Append-only; rejects samples at or before the check's latest state.
    fn add_state(&mut self, state: StateRecord) -> StoreResult<()>;
    fn latest_state(&self, check_id: &str) -> Option<&StateRecord>;
    /// States with `lo <= created_at < hi`, ascending.
    fn states_in_range(
        &self,
        check_id: &str,
        lo: DateTime<Utc>,
        hi: DateTime<Utc>,
    ) -> Vec<&StateRecord>;
    /// Drops states older than `cutoff`, keeping the current state.
    /// Returns the number removed.
    fn prune_states_before(&mut self, check_id: &str, cutoff: DateTime<Utc>) -> usize;

    // Maintenance windows
    fn scheduled_window(&self, id: &str) -> Option<&ScheduledMaintenanceRecord>;
    fn save_scheduled_window(&mut self, window: ScheduledMaintenanceRecord);
    fn delete_scheduled_window(&mut self, id: &str);
    fn scheduled_windows(&self, check_id: &str) -> Vec<&ScheduledMaintenanceRecord>;

    fn unscheduled_window(&self, id: &str) -> Option<&UnscheduledMaintenanceRecord>;
    fn save_unscheduled_window(&mut self, window: UnscheduledMaintenanceRecord);
    fn delete_unscheduled_window(&mut self, id: &str);
    fn unscheduled_windows(&self, check_id: &str) -> Vec<&UnscheduledMaintenanceRecord>;

    // Tags
    fn tag(&self, id: &str) -> Option<&TagRecord>;
    fn tag_by_name(&self, name: &str) -> Option<&TagRecord>;
    fn save_tag(&mut self, tag: TagRecord) -> StoreResult<()>;

    // Contacts and media
    fn contact(&self, id: &str) -> Option<&ContactRecord>;
    fn save_contact(&mut self, contact: ContactRecord);
    fn medium(&self, id: &str) -> Option<&MediumRecord>;
    fn save_medium(&mut self, medium: MediumRecord);
    fn media_for_contact(&self, contact_id: &str) -> Vec<&MediumRecord>;

    // Rules and routes
    fn rule(&self, id: &str) -> Option<&RuleRecord>;
    fn save_rule(&mut self, rule: RuleRecord);
    fn delete_rule(&mut self, id: &str);
    fn rules(&self) -> Vec<&RuleRecord>;

    fn route(&self, id: &str) -> Option<&RouteRecord>;
    fn save_route(&mut self, route: RouteRecord);
    fn delete_route(&mut self, id: &str);
    fn routes_for_check(&self, check_id: &str) -> Vec<&RouteRecord>;
}

/// The persistence contract consumed by the pipeline.
///
/// Implementations must be shareable across the processor, resolver and
/// dispatcher tasks (`Send + Sync`).
pub trait Store: Send + Sync + 'static {
    /// Acquires a lock spanning `classes` and runs `f` as one logical
    /// transaction. An implementation may lock a superset of the requested
    /// classes; it must never lock less.
    fn with_lock<R>(
        &self,
        classes: &[EntityClass],
        f: impl FnOnce(&mut dyn EntityOps) -> StoreResult<R>,
    ) -> StoreResult<R>;

    /// Shared-access snapshot read.
    fn read<R>(&self, f: impl FnOnce(&dyn EntityOps) -> R) -> R;
}

/// Clears the alerting state of a check: every route's `is_alerting` flag,
/// the check's `alerting_media` set, and the per-medium reverse index.
/// Used when suppression starts, on acknowledgement, and after recovery so
/// the next unhealthy sample re-notifies.
///
/// A medium id left dangling in `alerting_media` is logged and removed
/// rather than propagated (self-healing per the error-handling design).
pub fn clear_alerting_state(ops: &mut dyn EntityOps, check_id: &str) {
    let Some(check) = ops.check(check_id) else {
        return;
    };
    let mut check = check.clone();

    let route_ids: Vec<String> = ops
        .routes_for_check(check_id)
        .iter()
        .filter(|r| r.is_alerting)
        .map(|r| r.id.clone())
        .collect();
    for route_id in route_ids {
        if let Some(route) = ops.route(&route_id) {
            let mut route = route.clone();
            route.is_alerting = false;
            ops.save_route(route);
        }
    }

    let media: Vec<String> = check.alerting_media.keys().cloned().collect();
    for medium_id in media {
        match ops.medium(&medium_id) {
            Some(medium) => {
                let mut medium = medium.clone();
                medium.alerting_checks.remove(check_id);
                if !medium.in_rollup() {
                    medium.last_rollup_size = 0;
                }
                ops.save_medium(medium);
            }
            None => {
                tracing::error!(
                    check = %check.name,
                    medium_id = %medium_id,
                    "alerting_media references a nonexistent medium, removing"
                );
            }
        }
    }
    check.alerting_media.clear();

    if let Err(error) = ops.save_check(check) {
        tracing::error!(check_id = %check_id, error = %error, "Failed to clear alerting state");
    }
}
