//! In-memory reference engine.
//!
//! One `RwLock` guards every table; its write guard is a superset of any
//! requested class list, which satisfies the multi-class lock contract.
//! State sequences are kept per check in a `BTreeMap` keyed by
//! `created_at`, giving the sorted-range reads and enforcing strict
//! monotonicity on insert.

use crate::entities::{
    CheckRecord, ContactRecord, MediumRecord, RouteRecord, RuleRecord,
    ScheduledMaintenanceRecord, StateRecord, TagRecord, UnscheduledMaintenanceRecord,
};
use crate::{EntityClass, EntityOps, Store, StoreError, StoreResult};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

#[derive(Default)]
struct Tables {
    checks: HashMap<String, CheckRecord>,
    checks_by_name: HashMap<String, String>,
    states: HashMap<String, StateRecord>,
    /// check_id -> created_at millis -> state_id
    states_by_check: HashMap<String, BTreeMap<i64, String>>,
    scheduled: HashMap<String, ScheduledMaintenanceRecord>,
    unscheduled: HashMap<String, UnscheduledMaintenanceRecord>,
    tags: HashMap<String, TagRecord>,
    tags_by_name: HashMap<String, String>,
    contacts: HashMap<String, ContactRecord>,
    media: HashMap<String, MediumRecord>,
    rules: HashMap<String, RuleRecord>,
    routes: HashMap<String, RouteRecord>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn with_lock<R>(
        &self,
        _classes: &[EntityClass],
        f: impl FnOnce(&mut dyn EntityOps) -> StoreResult<R>,
    ) -> StoreResult<R> {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        f(&mut *guard)
    }

    fn read<R>(&self, f: impl FnOnce(&dyn EntityOps) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        f(&*guard)
    }
}

impl EntityOps for Tables {
    fn check(&self, id: &str) -> Option<&CheckRecord> {
        self.checks.get(id)
    }

    fn check_by_name(&self, name: &str) -> Option<&CheckRecord> {
        self.checks_by_name
            .get(name)
            .and_then(|id| self.checks.get(id))
    }

    fn check_ids(&self) -> Vec<String> {
        self.checks.keys().cloned().collect()
    }

    fn save_check(&mut self, check: CheckRecord) -> StoreResult<()> {
        if let Some(existing_id) = self.checks_by_name.get(&check.name) {
            if existing_id != &check.id {
                return Err(StoreError::Conflict {
                    class: EntityClass::Check,
                    detail: format!("name '{}' already taken", check.name),
                });
            }
        }
        // A rename leaves the old name index entry behind; drop it.
        if let Some(previous) = self.checks.get(&check.id) {
            if previous.name != check.name {
                self.checks_by_name.remove(&previous.name);
            }
        }
        self.checks_by_name.insert(check.name.clone(), check.id.clone());
        self.checks.insert(check.id.clone(), check);
        Ok(())
    }

    fn delete_check(&mut self, id: &str) -> StoreResult<()> {
        let check = self.checks.remove(id).ok_or_else(|| StoreError::Missing {
            class: EntityClass::Check,
            id: id.to_string(),
        })?;
        self.checks_by_name.remove(&check.name);
        if let Some(sequence) = self.states_by_check.remove(id) {
            for state_id in sequence.values() {
                self.states.remove(state_id);
            }
        }
        self.scheduled.retain(|_, w| w.check_id != id);
        self.unscheduled.retain(|_, w| w.check_id != id);
        self.routes.retain(|_, r| r.check_id != id);
        for tag_id in &check.tags {
            if let Some(tag) = self.tags.get_mut(tag_id) {
                tag.checks.remove(id);
            }
        }
        for medium in self.media.values_mut() {
            medium.alerting_checks.remove(id);
            medium.last_alerts.remove(id);
        }
        Ok(())
    }

    fn state(&self, id: &str) -> Option<&StateRecord> {
        self.states.get(id)
    }

    fn add_state(&mut self, state: StateRecord) -> StoreResult<()> {
        let sequence = self
            .states_by_check
            .entry(state.check_id.clone())
            .or_default();
        let key = state.created_at.timestamp_millis();
        if let Some((&last, _)) = sequence.last_key_value() {
            if key <= last {
                return Err(StoreError::OutOfOrder {
                    check_id: state.check_id.clone(),
                });
            }
        }
        sequence.insert(key, state.id.clone());
        self.states.insert(state.id.clone(), state);
        Ok(())
    }

    fn latest_state(&self, check_id: &str) -> Option<&StateRecord> {
        let sequence = self.states_by_check.get(check_id)?;
        let (_, state_id) = sequence.last_key_value()?;
        self.states.get(state_id)
    }

    fn states_in_range(
        &self,
        check_id: &str,
        lo: DateTime<Utc>,
        hi: DateTime<Utc>,
    ) -> Vec<&StateRecord> {
        let Some(sequence) = self.states_by_check.get(check_id) else {
            return Vec::new();
        };
        sequence
            .range(lo.timestamp_millis()..hi.timestamp_millis())
            .filter_map(|(_, state_id)| self.states.get(state_id))
            .collect()
    }

    fn prune_states_before(&mut self, check_id: &str, cutoff: DateTime<Utc>) -> usize {
        let current = self
            .checks
            .get(check_id)
            .and_then(|c| c.current_state_id.clone());
        let Some(sequence) = self.states_by_check.get_mut(check_id) else {
            return 0;
        };
        let cutoff_ms = cutoff.timestamp_millis();
        let expired: Vec<(i64, String)> = sequence
            .range(..cutoff_ms)
            .filter(|(_, state_id)| current.as_deref() != Some(state_id.as_str()))
            .map(|(k, v)| (*k, v.clone()))
            .collect();
        for (key, state_id) in &expired {
            sequence.remove(key);
            self.states.remove(state_id);
        }
        expired.len()
    }

    fn scheduled_window(&self, id: &str) -> Option<&ScheduledMaintenanceRecord> {
        self.scheduled.get(id)
    }

    fn save_scheduled_window(&mut self, window: ScheduledMaintenanceRecord) {
        self.scheduled.insert(window.id.clone(), window);
    }

    fn delete_scheduled_window(&mut self, id: &str) {
        self.scheduled.remove(id);
    }

    fn scheduled_windows(&self, check_id: &str) -> Vec<&ScheduledMaintenanceRecord> {
        let mut windows: Vec<&ScheduledMaintenanceRecord> = self
            .scheduled
            .values()
            .filter(|w| w.check_id == check_id)
            .collect();
        windows.sort_by_key(|w| w.start_time);
        windows
    }

    fn unscheduled_window(&self, id: &str) -> Option<&UnscheduledMaintenanceRecord> {
        self.unscheduled.get(id)
    }

    fn save_unscheduled_window(&mut self, window: UnscheduledMaintenanceRecord) {
        self.unscheduled.insert(window.id.clone(), window);
    }

    fn delete_unscheduled_window(&mut self, id: &str) {
        self.unscheduled.remove(id);
    }

    fn unscheduled_windows(&self, check_id: &str) -> Vec<&UnscheduledMaintenanceRecord> {
        let mut windows: Vec<&UnscheduledMaintenanceRecord> = self
            .unscheduled
            .values()
            .filter(|w| w.check_id == check_id)
            .collect();
        windows.sort_by_key(|w| w.start_time);
        windows
    }

    fn tag(&self, id: &str) -> Option<&TagRecord> {
        self.tags.get(id)
    }

    fn tag_by_name(&self, name: &str) -> Option<&TagRecord> {
        self.tags_by_name.get(name).and_then(|id| self.tags.get(id))
    }

    fn save_tag(&mut self, tag: TagRecord) -> StoreResult<()> {
        if let Some(existing_id) = self.tags_by_name.get(&tag.name) {
            if existing_id != &tag.id {
                return Err(StoreError::Conflict {
                    class: EntityClass::Tag,
                    detail: format!("name '{}' already taken", tag.name),
                });
            }
        }
        self.tags_by_name.insert(tag.name.clone(), tag.id.clone());
        self.tags.insert(tag.id.clone(), tag);
        Ok(())
    }

    fn contact(&self, id: &str) -> Option<&ContactRecord> {
        self.contacts.get(id)
    }

    fn save_contact(&mut self, contact: ContactRecord) {
        self.contacts.insert(contact.id.clone(), contact);
    }

    fn medium(&self, id: &str) -> Option<&MediumRecord> {
        self.media.get(id)
    }

    fn save_medium(&mut self, medium: MediumRecord) {
        self.media.insert(medium.id.clone(), medium);
    }

    fn media_for_contact(&self, contact_id: &str) -> Vec<&MediumRecord> {
        let mut media: Vec<&MediumRecord> = self
            .media
            .values()
            .filter(|m| m.contact_id == contact_id)
            .collect();
        media.sort_by(|a, b| a.id.cmp(&b.id));
        media
    }

    fn rule(&self, id: &str) -> Option<&RuleRecord> {
        self.rules.get(id)
    }

    fn save_rule(&mut self, rule: RuleRecord) {
        self.rules.insert(rule.id.clone(), rule);
    }

    fn delete_rule(&mut self, id: &str) {
        self.rules.remove(id);
        self.routes.retain(|_, r| r.rule_id != id);
        for tag in self.tags.values_mut() {
            tag.rules.remove(id);
        }
    }

    fn rules(&self) -> Vec<&RuleRecord> {
        let mut rules: Vec<&RuleRecord> = self.rules.values().collect();
        rules.sort_by(|a, b| a.id.cmp(&b.id));
        rules
    }

    fn route(&self, id: &str) -> Option<&RouteRecord> {
        self.routes.get(id)
    }

    fn save_route(&mut self, route: RouteRecord) {
        self.routes.insert(route.id.clone(), route);
    }

    fn delete_route(&mut self, id: &str) {
        self.routes.remove(id);
    }

    fn routes_for_check(&self, check_id: &str) -> Vec<&RouteRecord> {
        let mut routes: Vec<&RouteRecord> = self
            .routes
            .values()
            .filter(|r| r.check_id == check_id)
            .collect();
        routes.sort_by(|a, b| a.id.cmp(&b.id));
        routes
    }
}
