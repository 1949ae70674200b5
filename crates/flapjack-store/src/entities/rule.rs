use chrono::{DateTime, Duration, NaiveTime, Utc, Weekday};
use chrono::Datelike;
use flapjack_common::id;
use flapjack_common::types::Condition;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A weekly delivery window, evaluated in the owning contact's timezone.
/// `start > end` wraps past midnight, the window belonging to the day it
/// starts on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeRestriction {
    pub days: Vec<Weekday>,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRestriction {
    pub fn is_active(&self, t: DateTime<Utc>, timezone_offset_secs: i32) -> bool {
        let local = t + Duration::seconds(timezone_offset_secs as i64);
        let time = local.time();
        if self.start <= self.end {
            self.days.contains(&local.weekday()) && self.start <= time && time < self.end
        } else {
            // Overnight window: the portion after midnight belongs to the
            // previous day's entry.
            (self.days.contains(&local.weekday()) && time >= self.start)
                || (self.days.contains(&local.weekday().pred()) && time < self.end)
        }
    }
}

/// A contact's routing policy: which conditions they want to hear about,
/// when, and through which media.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleRecord {
    pub id: String,
    pub contact_id: String,
    /// Subset of the condition vocabulary; empty means "any unhealthy".
    pub conditions_list: BTreeSet<Condition>,
    pub time_restrictions: Vec<TimeRestriction>,
    /// Tag names this rule is scoped to; empty makes the rule generic.
    pub tags: BTreeSet<String>,
    pub media: BTreeSet<String>,
}

impl RuleRecord {
    pub fn new(contact_id: &str) -> Self {
        Self {
            id: id::new_id(),
            contact_id: contact_id.to_string(),
            conditions_list: BTreeSet::new(),
            time_restrictions: Vec::new(),
            tags: BTreeSet::new(),
            media: BTreeSet::new(),
        }
    }

    /// Generic rules (no tags) match every check.
    pub fn is_generic(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn matches_condition(&self, condition: Condition) -> bool {
        if self.conditions_list.is_empty() {
            condition.is_unhealthy()
        } else {
            self.conditions_list.contains(&condition)
        }
    }

    /// A rule with no restrictions is always active.
    pub fn active_at(&self, t: DateTime<Utc>, timezone_offset_secs: i32) -> bool {
        self.time_restrictions.is_empty()
            || self
                .time_restrictions
                .iter()
                .any(|r| r.is_active(t, timezone_offset_secs))
    }
}
