use chrono::{DateTime, Utc};
use flapjack_common::id;
use flapjack_common::types::Condition;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The monitored entity. All relations are index sets of neighbour ids;
/// traversal goes through the store, never through embedded structs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRecord {
    pub id: String,
    /// Human name; unique across checks.
    pub name: String,
    pub enabled: bool,
    pub condition: Condition,
    /// Always equal to `condition.is_unhealthy()`.
    pub failing: bool,
    pub notification_count: u64,
    /// Per-check hold-down override in seconds.
    pub initial_failure_delay: Option<u32>,
    /// Per-check repeat throttle override in seconds.
    pub repeat_failure_delay: Option<u32>,
    /// First 8 hex chars of SHA-1 of the id; invariant across renames.
    pub ack_hash: String,

    pub tags: BTreeSet<String>,
    pub contacts: BTreeSet<String>,
    pub routes: BTreeSet<String>,
    pub current_state_id: Option<String>,
    /// Most severe state of the current failure episode.
    pub most_severe_id: Option<String>,
    /// Media with an undelivered-or-delivered problem outstanding, with the
    /// condition they last alerted at. The resolver uses the condition to
    /// detect severity escalation.
    pub alerting_media: BTreeMap<String, Condition>,
    /// Set when the tag set or rule set changed; the resolver recomputes
    /// routes before the next resolution.
    pub routes_stale: bool,

    pub failure_started_at: Option<DateTime<Utc>>,
    pub last_problem_at: Option<DateTime<Utc>>,
    pub failing_streak: u32,
}

impl CheckRecord {
    pub fn new(name: &str) -> Self {
        let check_id = id::new_id();
        let ack_hash = id::ack_hash(&check_id);
        Self {
            id: check_id,
            name: name.to_string(),
            enabled: true,
            condition: Condition::Ok,
            failing: false,
            notification_count: 0,
            initial_failure_delay: None,
            repeat_failure_delay: None,
            ack_hash,
            tags: BTreeSet::new(),
            contacts: BTreeSet::new(),
            routes: BTreeSet::new(),
            current_state_id: None,
            most_severe_id: None,
            alerting_media: BTreeMap::new(),
            routes_stale: true,
            failure_started_at: None,
            last_problem_at: None,
            failing_streak: 0,
        }
    }

    /// Clears the failure-episode bookkeeping, e.g. on recovery or re-enable.
    pub fn reset_episode(&mut self) {
        self.failure_started_at = None;
        self.last_problem_at = None;
        self.failing_streak = 0;
        self.most_severe_id = None;
    }
}
