use crate::routing;
use chrono::Duration;
use flapjack_common::id;
use flapjack_common::stats::PipelineStats;
use flapjack_common::types::{
    AlertRecord, AlertType, Notification, NotificationKind,
};
use flapjack_store::entities::{CheckRecord, MediumRecord};
use flapjack_store::{EntityClass, EntityOps, Store, StoreError, StoreResult};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

const RESOLVE_CLASSES: &[EntityClass] = &[
    EntityClass::Check,
    EntityClass::Tag,
    EntityClass::Contact,
    EntityClass::Medium,
    EntityClass::Rule,
    EntityClass::Route,
];

/// The outcome of resolving one notification: the alerts to enqueue plus
/// the contact -> rules and rule -> routes mappings that produced them.
#[derive(Debug, Default)]
pub struct Resolution {
    pub alerts: Vec<AlertRecord>,
    pub contact_rules: BTreeMap<String, BTreeSet<String>>,
    pub rule_routes: BTreeMap<String, BTreeSet<String>>,
}

/// Expands a notification into the alert set.
///
/// Stateless between calls; all alerting bookkeeping (route flags,
/// `alerting_media`, rollup sizes) lives on the entities, mutated under one
/// lock span per notification so readers see a consistent snapshot.
pub struct Resolver<S> {
    store: Arc<S>,
    stats: Arc<PipelineStats>,
}

struct PendingAlert {
    medium_id: String,
    contact_id: String,
    rule_id: String,
    route_id: String,
}

impl<S: Store> Resolver<S> {
    pub fn new(store: Arc<S>, stats: Arc<PipelineStats>) -> Self {
        Self { store, stats }
    }

    pub fn resolve(&self, notification: &Notification) -> StoreResult<Resolution> {
        let resolution = self.store.with_lock(RESOLVE_CLASSES, |ops| {
            let Some(check) = ops.check(&notification.check_id) else {
                return Err(StoreError::Missing {
                    class: EntityClass::Check,
                    id: notification.check_id.clone(),
                });
            };
            if check.routes_stale {
                routing::recompute_routes(ops, &notification.check_id)?;
            }
            let check = ops
                .check(&notification.check_id)
                .cloned()
                .ok_or_else(|| StoreError::Missing {
                    class: EntityClass::Check,
                    id: notification.check_id.clone(),
                })?;

            match notification.kind {
                NotificationKind::Problem => self.resolve_problem(ops, check, notification),
                NotificationKind::Recovery => {
                    self.resolve_clearing(ops, check, notification, AlertType::Recovery)
                }
                NotificationKind::Acknowledgement => {
                    self.resolve_clearing(ops, check, notification, AlertType::Acknowledgement)
                }
                NotificationKind::Test => self.resolve_test_routes(ops, check, notification),
            }
        })?;
        Ok(resolution)
    }

    /// Problem expansion: severity filter, time restrictions, de-duplication
    /// against `alerting_media` (severity escalation overrides), rollover
    /// throttle, then rollup digesting per medium.
    fn resolve_problem(
        &self,
        ops: &mut dyn EntityOps,
        mut check: CheckRecord,
        notification: &Notification,
    ) -> StoreResult<Resolution> {
        let mut resolution = Resolution::default();
        let mut pending: Vec<PendingAlert> = Vec::new();
        let mut seen_media: BTreeSet<String> = BTreeSet::new();

        for route in ops.routes_for_check(&check.id) {
            if !route.matches_condition(notification.condition) {
                continue;
            }
            let Some(rule) = ops.rule(&route.rule_id) else {
                tracing::error!(
                    check = %check.name,
                    route_id = %route.id,
                    rule_id = %route.rule_id,
                    "Route references a missing rule, skipping"
                );
                PipelineStats::incr(&self.stats.invariant_repairs);
                continue;
            };
            let Some(contact) = ops.contact(&route.contact_id) else {
                tracing::warn!(
                    check = %check.name,
                    contact_id = %route.contact_id,
                    "Route references a missing contact, skipping"
                );
                continue;
            };
            // Inactive rules are skipped outright; they neither alert nor
            // block future notifications.
            if !rule.active_at(notification.timestamp, contact.timezone_offset_secs) {
                continue;
            }

            for medium_id in &rule.media {
                if seen_media.contains(medium_id) {
                    continue;
                }
                let Some(medium) = ops.medium(medium_id) else {
                    tracing::error!(
                        check = %check.name,
                        medium_id = %medium_id,
                        "Rule references a missing medium, skipping"
                    );
                    PipelineStats::incr(&self.stats.invariant_repairs);
                    continue;
                };
                // Already alerting at this severity or worse: only an
                // escalation gets through.
                if let Some(alerted_at) = check.alerting_media.get(medium_id) {
                    if notification.condition <= *alerted_at {
                        continue;
                    }
                }
                if self.rollover_throttled(medium, &check.id, notification) {
                    continue;
                }
                seen_media.insert(medium_id.clone());
                pending.push(PendingAlert {
                    medium_id: medium_id.clone(),
                    contact_id: contact.id.clone(),
                    rule_id: rule.id.clone(),
                    route_id: route.id.clone(),
                });
            }
        }

        for item in &pending {
            resolution
                .contact_rules
                .entry(item.contact_id.clone())
                .or_default()
                .insert(item.rule_id.clone());
            resolution
                .rule_routes
                .entry(item.rule_id.clone())
                .or_default()
                .insert(item.route_id.clone());

            if let Some(route) = ops.route(&item.route_id) {
                let mut route = route.clone();
                route.is_alerting = true;
                ops.save_route(route);
            }
            check
                .alerting_media
                .insert(item.medium_id.clone(), notification.condition);

            if let Some(medium) = ops.medium(&item.medium_id) {
                let mut medium = medium.clone();
                medium.alerting_checks.insert(check.id.clone());
                medium
                    .last_alerts
                    .insert(check.id.clone(), (notification.condition, notification.timestamp));
                ops.save_medium(medium);
            }
        }

        // Alert construction, digesting per medium where over the rollup
        // threshold.
        for item in &pending {
            let Some(medium) = ops.medium(&item.medium_id) else {
                continue;
            };
            if medium.in_rollup() {
                continue; // handled below, once per medium
            }
            resolution.alerts.push(self.alert(
                &check,
                medium,
                &item.contact_id,
                AlertType::Problem,
                notification,
                Vec::new(),
            ));
        }
        let rollup_media: BTreeSet<String> = pending
            .iter()
            .map(|item| item.medium_id.clone())
            .collect();
        for medium_id in rollup_media {
            let Some(medium) = ops.medium(&medium_id) else {
                continue;
            };
            if !medium.in_rollup() {
                continue;
            }
            // Re-issue the digest only when the alerting set changed.
            if medium.last_rollup_size == medium.alerting_checks.len() {
                continue;
            }
            let mut medium = medium.clone();
            let names = self.check_names(ops, &medium.alerting_checks);
            medium.last_rollup_size = medium.alerting_checks.len();
            let contact_id = medium.contact_id.clone();
            resolution.alerts.push(self.alert(
                &check,
                &medium,
                &contact_id,
                AlertType::Problem,
                notification,
                names,
            ));
            ops.save_medium(medium);
        }

        ops.save_check(check)?;
        Ok(resolution)
    }

    /// Recovery and acknowledgement resolution: one alert per previously
    /// alerting medium, then the alerting state is cleared so the next
    /// unhealthy sample re-notifies.
    fn resolve_clearing(
        &self,
        ops: &mut dyn EntityOps,
        mut check: CheckRecord,
        notification: &Notification,
        alert_type: AlertType,
    ) -> StoreResult<Resolution> {
        let mut resolution = Resolution::default();

        for route in ops.routes_for_check(&check.id) {
            if !route.is_alerting {
                continue;
            }
            resolution
                .contact_rules
                .entry(route.contact_id.clone())
                .or_default()
                .insert(route.rule_id.clone());
            resolution
                .rule_routes
                .entry(route.rule_id.clone())
                .or_default()
                .insert(route.id.clone());
        }

        let alerting: Vec<String> = check.alerting_media.keys().cloned().collect();
        for medium_id in alerting {
            let Some(medium) = ops.medium(&medium_id) else {
                tracing::error!(
                    check = %check.name,
                    medium_id = %medium_id,
                    "alerting_media references a nonexistent medium, removing"
                );
                PipelineStats::incr(&self.stats.invariant_repairs);
                continue;
            };
            let mut medium = medium.clone();
            medium.alerting_checks.remove(&check.id);

            if medium.last_rollup_size > 0 {
                if medium.in_rollup() {
                    // Still digesting: re-issue the problem digest with the
                    // shrunken set.
                    let names = self.check_names(ops, &medium.alerting_checks);
                    medium.last_rollup_size = medium.alerting_checks.len();
                    let contact_id = medium.contact_id.clone();
                    resolution.alerts.push(self.alert(
                        &check,
                        &medium,
                        &contact_id,
                        AlertType::Problem,
                        notification,
                        names,
                    ));
                } else {
                    let names = self.check_names(ops, &medium.alerting_checks);
                    medium.last_rollup_size = 0;
                    let contact_id = medium.contact_id.clone();
                    resolution.alerts.push(self.alert(
                        &check,
                        &medium,
                        &contact_id,
                        alert_type,
                        notification,
                        names,
                    ));
                }
            } else {
                let contact_id = medium.contact_id.clone();
                resolution.alerts.push(self.alert(
                    &check,
                    &medium,
                    &contact_id,
                    alert_type,
                    notification,
                    Vec::new(),
                ));
            }
            ops.save_medium(medium);
        }

        check.alerting_media.clear();
        let route_ids: Vec<String> = ops
            .routes_for_check(&check.id)
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
        ops.save_check(check)?;
        Ok(resolution)
    }

    /// Test notifications fan out over the matching routes' media with no
    /// side effects on alerting state.
    fn resolve_test_routes(
        &self,
        ops: &mut dyn EntityOps,
        check: CheckRecord,
        notification: &Notification,
    ) -> StoreResult<Resolution> {
        let mut resolution = Resolution::default();
        let mut seen_media: BTreeSet<String> = BTreeSet::new();

        for route in ops.routes_for_check(&check.id) {
            let Some(rule) = ops.rule(&route.rule_id) else {
                continue;
            };
            for medium_id in &rule.media {
                if !seen_media.insert(medium_id.clone()) {
                    continue;
                }
                if let Some(medium) = ops.medium(medium_id) {
                    let contact_id = medium.contact_id.clone();
                    resolution.alerts.push(self.alert(
                        &check,
                        medium,
                        &contact_id,
                        AlertType::Test,
                        notification,
                        Vec::new(),
                    ));
                }
            }
        }
        Ok(resolution)
    }

    /// Admin surface: a test alert for every medium of one contact,
    /// bypassing rule matching entirely.
    pub fn resolve_test(&self, check_id: &str, contact_id: &str) -> StoreResult<Vec<AlertRecord>> {
        self.store.with_lock(RESOLVE_CLASSES, |ops| {
            let check = ops.check(check_id).cloned().ok_or_else(|| StoreError::Missing {
                class: EntityClass::Check,
                id: check_id.to_string(),
            })?;
            let contact = ops.contact(contact_id).ok_or_else(|| StoreError::Missing {
                class: EntityClass::Contact,
                id: contact_id.to_string(),
            })?;
            let notification = Notification {
                check_id: check.id.clone(),
                state_id: check.current_state_id.clone().unwrap_or_default(),
                kind: NotificationKind::Test,
                condition: check.condition,
                summary: format!("test notification for {}", check.name),
                details: None,
                timestamp: chrono::Utc::now(),
            };
            let alerts = ops
                .media_for_contact(&contact.id)
                .into_iter()
                .map(|medium| {
                    self.alert(
                        &check,
                        medium,
                        contact_id,
                        AlertType::Test,
                        &notification,
                        Vec::new(),
                    )
                })
                .collect();
            Ok(alerts)
        })
    }

    fn rollover_throttled(
        &self,
        medium: &MediumRecord,
        check_id: &str,
        notification: &Notification,
    ) -> bool {
        if medium.rollover_interval == 0 {
            return false;
        }
        match medium.last_alerts.get(check_id) {
            Some((condition, at)) => {
                *condition == notification.condition
                    && notification.timestamp - *at
                        < Duration::seconds(medium.rollover_interval as i64)
            }
            None => false,
        }
    }

    fn check_names(&self, ops: &dyn EntityOps, check_ids: &BTreeSet<String>) -> Vec<String> {
        check_ids
            .iter()
            .map(|check_id| match ops.check(check_id) {
                Some(check) => check.name.clone(),
                None => check_id.clone(),
            })
            .collect()
    }

    fn alert(
        &self,
        check: &CheckRecord,
        medium: &MediumRecord,
        contact_id: &str,
        alert_type: AlertType,
        notification: &Notification,
        rollup_checks: Vec<String>,
    ) -> AlertRecord {
        let summary = if rollup_checks.is_empty() {
            notification.summary.clone()
        } else {
            format!(
                "{} checks alerting: {}",
                rollup_checks.len(),
                rollup_checks.join(", ")
            )
        };
        AlertRecord {
            id: id::new_id(),
            check_id: check.id.clone(),
            check_name: check.name.clone(),
            contact_id: contact_id.to_string(),
            medium_id: medium.id.clone(),
            medium_type: medium.medium_type,
            address: medium.address.clone(),
            notification_type: alert_type,
            condition: notification.condition,
            summary,
            details: notification.details.clone(),
            rollup_checks,
            attempts: 0,
            enqueued_at: notification.timestamp,
        }
    }
}
