use crate::dispatcher::{Dispatcher, NotifierSettings};
use crate::plugin::GatewayRegistry;
use crate::queue::AlertQueue;
use crate::resolver::Resolver;
use crate::routing;
use crate::{DeliveryError, Gateway};
use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc, Weekday};
use flapjack_common::stats::PipelineStats;
use flapjack_common::types::{
    AlertRecord, AlertType, Condition, MediumType, Notification, NotificationKind,
};
use flapjack_store::entities::{
    CheckRecord, ContactRecord, MediumRecord, RuleRecord, TagRecord, TimeRestriction,
};
use flapjack_store::memory::MemoryStore;
use flapjack_store::{EntityClass, Store};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

const ALL: &[EntityClass] = &[
    EntityClass::Check,
    EntityClass::Tag,
    EntityClass::Contact,
    EntityClass::Medium,
    EntityClass::Rule,
    EntityClass::Route,
];

fn utc(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

fn resolver(store: &Arc<MemoryStore>) -> Resolver<MemoryStore> {
    Resolver::new(store.clone(), Arc::new(PipelineStats::new()))
}

fn add_contact(store: &MemoryStore, name: &str) -> String {
    store
        .with_lock(ALL, |ops| {
            let contact = ContactRecord::new(name, 0);
            let contact_id = contact.id.clone();
            ops.save_contact(contact);
            Ok(contact_id)
        })
        .unwrap()
}

fn add_medium(store: &MemoryStore, contact_id: &str, medium_type: MediumType) -> String {
    store
        .with_lock(ALL, |ops| {
            let medium = MediumRecord::new(contact_id, medium_type, "ops@example.com");
            let medium_id = medium.id.clone();
            let mut contact = ops.contact(contact_id).unwrap().clone();
            contact.media.insert(medium_id.clone());
            ops.save_contact(contact);
            ops.save_medium(medium);
            Ok(medium_id)
        })
        .unwrap()
}

fn add_rule(
    store: &MemoryStore,
    contact_id: &str,
    conditions: &[Condition],
    tags: &[&str],
    media: &[&str],
) -> String {
    store
        .with_lock(ALL, |ops| {
            let mut rule = RuleRecord::new(contact_id);
            rule.conditions_list = conditions.iter().copied().collect();
            rule.tags = tags.iter().map(|t| t.to_string()).collect();
            rule.media = media.iter().map(|m| m.to_string()).collect();
            let rule_id = rule.id.clone();
            let mut contact = ops.contact(contact_id).unwrap().clone();
            contact.rules.insert(rule_id.clone());
            ops.save_contact(contact);
            ops.save_rule(rule);
            routing::mark_all_checks_stale(ops)?;
            Ok(rule_id)
        })
        .unwrap()
}

fn add_check(store: &MemoryStore, name: &str, tags: &[&str]) -> String {
    store
        .with_lock(ALL, |ops| {
            let mut check = CheckRecord::new(name);
            for tag_name in tags {
                let mut tag = match ops.tag_by_name(tag_name) {
                    Some(tag) => tag.clone(),
                    None => TagRecord::new(tag_name),
                };
                tag.checks.insert(check.id.clone());
                check.tags.insert(tag.id.clone());
                ops.save_tag(tag)?;
            }
            let check_id = check.id.clone();
            ops.save_check(check)?;
            Ok(check_id)
        })
        .unwrap()
}

fn notification(check_id: &str, kind: NotificationKind, condition: Condition, secs: i64) -> Notification {
    Notification {
        check_id: check_id.to_string(),
        state_id: "state-1".to_string(),
        kind,
        condition,
        summary: "summary".to_string(),
        details: None,
        timestamp: utc(secs),
    }
}

fn problem(check_id: &str, condition: Condition, secs: i64) -> Notification {
    notification(check_id, NotificationKind::Problem, condition, secs)
}

// ── Routing ──

#[test]
fn tag_subset_rules_route_only_matching_checks() {
    // Rule on {prod} for critical via email; check C {prod, web} matches,
    // check D {staging} does not.
    let store = Arc::new(MemoryStore::new());
    let contact = add_contact(&store, "ops");
    let medium = add_medium(&store, &contact, MediumType::Email);
    add_rule(&store, &contact, &[Condition::Critical], &["prod"], &[&medium]);
    let check_c = add_check(&store, "web1", &["prod", "web"]);
    let check_d = add_check(&store, "stage1", &["staging"]);
    let resolver = resolver(&store);

    let resolution = resolver.resolve(&problem(&check_c, Condition::Critical, 0)).unwrap();
    assert_eq!(resolution.alerts.len(), 1);
    assert_eq!(resolution.alerts[0].medium_type, MediumType::Email);
    assert_eq!(resolution.alerts[0].contact_id, contact);
    assert_eq!(resolution.contact_rules.len(), 1);

    let resolution = resolver.resolve(&problem(&check_d, Condition::Critical, 0)).unwrap();
    assert!(resolution.alerts.is_empty());
}

#[test]
fn generic_rules_match_every_check() {
    let store = Arc::new(MemoryStore::new());
    let contact = add_contact(&store, "ops");
    let medium = add_medium(&store, &contact, MediumType::Sms);
    add_rule(&store, &contact, &[], &[], &[&medium]);
    let check = add_check(&store, "anything", &["whatever"]);
    let resolver = resolver(&store);

    let resolution = resolver.resolve(&problem(&check, Condition::Warning, 0)).unwrap();
    assert_eq!(resolution.alerts.len(), 1);
}

#[test]
fn severity_filter_drops_unsubscribed_conditions() {
    let store = Arc::new(MemoryStore::new());
    let contact = add_contact(&store, "ops");
    let medium = add_medium(&store, &contact, MediumType::Email);
    add_rule(&store, &contact, &[Condition::Critical], &[], &[&medium]);
    let check = add_check(&store, "web1", &[]);
    let resolver = resolver(&store);

    let resolution = resolver.resolve(&problem(&check, Condition::Warning, 0)).unwrap();
    assert!(resolution.alerts.is_empty());

    // The pair must not be marked alerting by a filtered-out notification.
    store.read(|ops| {
        assert!(ops.check(&check).unwrap().alerting_media.is_empty());
    });
}

#[test]
fn route_recompute_follows_rule_changes() {
    let store = Arc::new(MemoryStore::new());
    let contact = add_contact(&store, "ops");
    let medium = add_medium(&store, &contact, MediumType::Email);
    let check = add_check(&store, "web1", &["prod"]);
    let resolver = resolver(&store);

    assert!(resolver
        .resolve(&problem(&check, Condition::Critical, 0))
        .unwrap()
        .alerts
        .is_empty());

    add_rule(&store, &contact, &[], &["prod"], &[&medium]);
    let resolution = resolver.resolve(&problem(&check, Condition::Critical, 10)).unwrap();
    assert_eq!(resolution.alerts.len(), 1);
    store.read(|ops| {
        assert!(!ops.check(&check).unwrap().routes_stale);
        assert_eq!(ops.routes_for_check(&check).len(), 1);
    });
}

#[test]
fn time_restricted_rules_skip_out_of_window_notifications() {
    let store = Arc::new(MemoryStore::new());
    let contact = add_contact(&store, "ops");
    let medium = add_medium(&store, &contact, MediumType::Email);
    let rule_id = add_rule(&store, &contact, &[], &[], &[&medium]);
    store
        .with_lock(ALL, |ops| {
            let mut rule = ops.rule(&rule_id).unwrap().clone();
            rule.time_restrictions = vec![TimeRestriction {
                days: vec![Weekday::Mon],
                start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            }];
            ops.save_rule(rule);
            Ok(())
        })
        .unwrap();
    let check = add_check(&store, "web1", &[]);
    let resolver = resolver(&store);

    // Monday 12:00 UTC.
    let in_window = resolver
        .resolve(&problem(&check, Condition::Critical, 1_699_876_800))
        .unwrap();
    assert_eq!(in_window.alerts.len(), 1);

    // Clear alerting state, then try Monday 22:00 UTC.
    resolver
        .resolve(&notification(&check, NotificationKind::Recovery, Condition::Ok, 1_699_876_900))
        .unwrap();
    let out_of_window = resolver
        .resolve(&problem(&check, Condition::Critical, 1_699_912_800))
        .unwrap();
    assert!(out_of_window.alerts.is_empty());
    // Skipped rules do not count as alerting.
    store.read(|ops| {
        assert!(ops.check(&check).unwrap().alerting_media.is_empty());
    });
}

// ── De-duplication and clearing ──

#[test]
fn repeat_problems_do_not_re_alert_without_escalation() {
    let store = Arc::new(MemoryStore::new());
    let contact = add_contact(&store, "ops");
    let medium = add_medium(&store, &contact, MediumType::Email);
    add_rule(&store, &contact, &[], &[], &[&medium]);
    let check = add_check(&store, "web1", &[]);
    let resolver = resolver(&store);

    assert_eq!(
        resolver.resolve(&problem(&check, Condition::Warning, 0)).unwrap().alerts.len(),
        1
    );
    // Same severity again: deduplicated.
    assert!(resolver
        .resolve(&problem(&check, Condition::Warning, 1000))
        .unwrap()
        .alerts
        .is_empty());
    // Escalation gets through.
    let escalated = resolver.resolve(&problem(&check, Condition::Critical, 2000)).unwrap();
    assert_eq!(escalated.alerts.len(), 1);
    assert_eq!(escalated.alerts[0].condition, Condition::Critical);

    store.read(|ops| {
        let check = ops.check(&check).unwrap();
        assert_eq!(check.alerting_media.get(&medium), Some(&Condition::Critical));
        assert!(ops.routes_for_check(&check.id).iter().all(|r| r.is_alerting));
    });
}

#[test]
fn recovery_alerts_each_alerting_medium_and_clears() {
    let store = Arc::new(MemoryStore::new());
    let contact = add_contact(&store, "ops");
    let email = add_medium(&store, &contact, MediumType::Email);
    let sms = add_medium(&store, &contact, MediumType::Sms);
    add_rule(&store, &contact, &[], &[], &[&email, &sms]);
    let check = add_check(&store, "web1", &[]);
    let resolver = resolver(&store);

    assert_eq!(
        resolver.resolve(&problem(&check, Condition::Critical, 0)).unwrap().alerts.len(),
        2
    );
    let recovery = resolver
        .resolve(&notification(&check, NotificationKind::Recovery, Condition::Ok, 100))
        .unwrap();
    assert_eq!(recovery.alerts.len(), 2);
    assert!(recovery
        .alerts
        .iter()
        .all(|a| a.notification_type == AlertType::Recovery));

    store.read(|ops| {
        let check = ops.check(&check).unwrap();
        assert!(check.alerting_media.is_empty());
        assert!(ops.routes_for_check(&check.id).iter().all(|r| !r.is_alerting));
        assert!(ops.medium(&email).unwrap().alerting_checks.is_empty());
    });
}

#[test]
fn acknowledgement_targets_previously_alerting_media() {
    let store = Arc::new(MemoryStore::new());
    let contact = add_contact(&store, "ops");
    let medium = add_medium(&store, &contact, MediumType::Email);
    add_rule(&store, &contact, &[], &[], &[&medium]);
    let check = add_check(&store, "web1", &[]);
    let resolver = resolver(&store);

    resolver.resolve(&problem(&check, Condition::Critical, 0)).unwrap();
    let ack = resolver
        .resolve(&notification(
            &check,
            NotificationKind::Acknowledgement,
            Condition::Critical,
            5,
        ))
        .unwrap();
    assert_eq!(ack.alerts.len(), 1);
    assert_eq!(ack.alerts[0].notification_type, AlertType::Acknowledgement);

    store.read(|ops| {
        assert!(ops.check(&check).unwrap().alerting_media.is_empty());
    });
}

#[test]
fn acknowledgement_with_nothing_alerting_is_silent() {
    let store = Arc::new(MemoryStore::new());
    let contact = add_contact(&store, "ops");
    let medium = add_medium(&store, &contact, MediumType::Email);
    add_rule(&store, &contact, &[], &[], &[&medium]);
    let check = add_check(&store, "web1", &[]);
    let resolver = resolver(&store);

    let ack = resolver
        .resolve(&notification(
            &check,
            NotificationKind::Acknowledgement,
            Condition::Critical,
            5,
        ))
        .unwrap();
    assert!(ack.alerts.is_empty());
}

#[test]
fn rollover_interval_throttles_identical_alerts() {
    let store = Arc::new(MemoryStore::new());
    let contact = add_contact(&store, "ops");
    let medium = add_medium(&store, &contact, MediumType::Email);
    store
        .with_lock(ALL, |ops| {
            let mut medium = ops.medium(&medium).unwrap().clone();
            medium.rollover_interval = 300;
            ops.save_medium(medium);
            Ok(())
        })
        .unwrap();
    add_rule(&store, &contact, &[], &[], &[&medium]);
    let check = add_check(&store, "web1", &[]);
    let resolver = resolver(&store);

    assert_eq!(
        resolver.resolve(&problem(&check, Condition::Critical, 0)).unwrap().alerts.len(),
        1
    );
    resolver
        .resolve(&notification(&check, NotificationKind::Recovery, Condition::Ok, 10))
        .unwrap();
    // Identical condition inside the interval: throttled.
    assert!(resolver
        .resolve(&problem(&check, Condition::Critical, 100))
        .unwrap()
        .alerts
        .is_empty());
    // Past the interval it flows again.
    assert_eq!(
        resolver.resolve(&problem(&check, Condition::Critical, 400)).unwrap().alerts.len(),
        1
    );
}

// ── Rollup ──

fn rollup_fixture() -> (Arc<MemoryStore>, String, Vec<String>) {
    let store = Arc::new(MemoryStore::new());
    let contact = add_contact(&store, "ops");
    let medium = add_medium(&store, &contact, MediumType::Email);
    store
        .with_lock(ALL, |ops| {
            let mut medium = ops.medium(&medium).unwrap().clone();
            medium.rollup_threshold = Some(2);
            ops.save_medium(medium);
            Ok(())
        })
        .unwrap();
    add_rule(&store, &contact, &[], &[], &[&medium]);
    let checks = (1..=4)
        .map(|i| add_check(&store, &format!("web{i}"), &[]))
        .collect();
    (store, medium, checks)
}

#[test]
fn exceeding_rollup_threshold_switches_to_digest() {
    let (store, _medium, checks) = rollup_fixture();
    let resolver = resolver(&store);

    let first = resolver.resolve(&problem(&checks[0], Condition::Critical, 0)).unwrap();
    assert_eq!(first.alerts.len(), 1);
    assert!(!first.alerts[0].is_rollup());

    let second = resolver.resolve(&problem(&checks[1], Condition::Critical, 10)).unwrap();
    assert_eq!(second.alerts.len(), 1);
    assert!(!second.alerts[0].is_rollup());

    // Third simultaneous check crosses the threshold of 2.
    let third = resolver.resolve(&problem(&checks[2], Condition::Critical, 20)).unwrap();
    assert_eq!(third.alerts.len(), 1);
    assert!(third.alerts[0].is_rollup());
    assert_eq!(third.alerts[0].rollup_checks.len(), 3);

    // A fourth changes the set: the digest is re-issued.
    let fourth = resolver.resolve(&problem(&checks[3], Condition::Critical, 30)).unwrap();
    assert_eq!(fourth.alerts.len(), 1);
    assert!(fourth.alerts[0].is_rollup());
    assert_eq!(fourth.alerts[0].rollup_checks.len(), 4);
}

#[test]
fn recovery_shrinks_or_ends_the_rollup() {
    let (store, medium, checks) = rollup_fixture();
    let resolver = resolver(&store);
    for (i, check) in checks.iter().enumerate() {
        resolver
            .resolve(&problem(check, Condition::Critical, (i as i64) * 10))
            .unwrap();
    }

    // 4 alerting -> 3: still above the threshold, digest re-issued.
    let shrink = resolver
        .resolve(&notification(&checks[0], NotificationKind::Recovery, Condition::Ok, 100))
        .unwrap();
    assert_eq!(shrink.alerts.len(), 1);
    assert!(shrink.alerts[0].is_rollup());
    assert_eq!(shrink.alerts[0].notification_type, AlertType::Problem);
    assert_eq!(shrink.alerts[0].rollup_checks.len(), 3);

    // 3 -> 2: at the threshold again, a rollup recovery closes the digest.
    let end = resolver
        .resolve(&notification(&checks[1], NotificationKind::Recovery, Condition::Ok, 200))
        .unwrap();
    assert_eq!(end.alerts.len(), 1);
    assert!(end.alerts[0].is_rollup());
    assert_eq!(end.alerts[0].notification_type, AlertType::Recovery);
    store.read(|ops| {
        assert_eq!(ops.medium(&medium).unwrap().last_rollup_size, 0);
    });

    // Remaining checks recover individually.
    let individual = resolver
        .resolve(&notification(&checks[2], NotificationKind::Recovery, Condition::Ok, 300))
        .unwrap();
    assert_eq!(individual.alerts.len(), 1);
    assert!(!individual.alerts[0].is_rollup());
}

// ── Test notifications ──

#[test]
fn test_notification_targets_every_medium_of_the_contact() {
    let store = Arc::new(MemoryStore::new());
    let contact = add_contact(&store, "ops");
    add_medium(&store, &contact, MediumType::Email);
    add_medium(&store, &contact, MediumType::Sms);
    let check = add_check(&store, "web1", &[]);
    let resolver = resolver(&store);

    let alerts = resolver.resolve_test(&check, &contact).unwrap();
    assert_eq!(alerts.len(), 2);
    assert!(alerts.iter().all(|a| a.notification_type == AlertType::Test));
    // No alerting side effects.
    store.read(|ops| {
        assert!(ops.check(&check).unwrap().alerting_media.is_empty());
    });
}

// ── Queue ──

#[tokio::test]
async fn alert_queue_is_fifo_for_ready_entries() {
    let queue = AlertQueue::new("email");
    let (_tx, mut shutdown) = watch::channel(false);
    queue.enqueue(test_alert("a"));
    queue.enqueue(test_alert("b"));
    assert_eq!(queue.receive(&mut shutdown).await.unwrap().id, "a");
    assert_eq!(queue.receive(&mut shutdown).await.unwrap().id, "b");
}

#[tokio::test]
async fn delayed_entries_wait_their_turn() {
    let queue = AlertQueue::new("email");
    let (_tx, mut shutdown) = watch::channel(false);
    queue.enqueue_after(Duration::from_secs(60), test_alert("late"));
    queue.enqueue(test_alert("now"));
    assert_eq!(queue.receive(&mut shutdown).await.unwrap().id, "now");
    assert!(queue.len() == 1);
}

#[tokio::test]
async fn queue_shutdown_leaves_entries_behind() {
    let queue = AlertQueue::new("email");
    let (tx, mut shutdown) = watch::channel(false);
    queue.enqueue(test_alert("stranded"));
    tx.send(true).unwrap();
    assert!(queue.receive(&mut shutdown).await.is_none());
    assert_eq!(queue.len(), 1);
}

// ── Dispatcher ──

enum Outcome {
    Deliver,
    Transient,
    Permanent,
}

struct MockGateway {
    script: Mutex<VecDeque<Outcome>>,
    sent: Mutex<Vec<AlertRecord>>,
}

impl MockGateway {
    fn new(script: Vec<Outcome>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            sent: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn deliver(&self, alert: &AlertRecord) -> Result<(), DeliveryError> {
        let outcome = self.script.lock().unwrap().pop_front();
        match outcome {
            Some(Outcome::Transient) => Err(DeliveryError::Transient("5xx".into())),
            Some(Outcome::Permanent) => Err(DeliveryError::Permanent("4xx".into())),
            _ => {
                self.sent.lock().unwrap().push(alert.clone());
                Ok(())
            }
        }
    }

    fn medium_type(&self) -> MediumType {
        MediumType::Email
    }
}

fn test_alert(id: &str) -> AlertRecord {
    AlertRecord {
        id: id.to_string(),
        check_id: "c1".into(),
        check_name: "web1".into(),
        contact_id: "p1".into(),
        medium_id: "m1".into(),
        medium_type: MediumType::Email,
        address: "ops@example.com".into(),
        notification_type: AlertType::Problem,
        condition: Condition::Critical,
        summary: "down".into(),
        details: None,
        rollup_checks: vec![],
        attempts: 0,
        enqueued_at: utc(0),
    }
}

fn dispatcher(gateway: Arc<MockGateway>, stats: Arc<PipelineStats>) -> Arc<Dispatcher> {
    Arc::new(Dispatcher::new(
        Arc::new(AlertQueue::new("email")),
        gateway,
        Duration::from_secs(30),
        NotifierSettings::default(),
        stats,
    ))
}

#[tokio::test]
async fn transient_failure_requeues_with_incremented_attempts() {
    let gateway = MockGateway::new(vec![Outcome::Transient]);
    let stats = Arc::new(PipelineStats::new());
    let queue = Arc::new(AlertQueue::new("email"));
    let dispatcher = Arc::new(Dispatcher::new(
        queue.clone(),
        gateway.clone(),
        Duration::from_secs(30),
        NotifierSettings::default(),
        stats.clone(),
    ));

    dispatcher.dispatch(test_alert("a")).await;
    assert_eq!(queue.len(), 1);
    assert_eq!(PipelineStats::get(&stats.alerts_failed), 0);
    assert!(gateway.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn attempts_cap_escalates_to_permanent_failure() {
    let gateway = MockGateway::new(vec![Outcome::Transient]);
    let stats = Arc::new(PipelineStats::new());
    let queue = Arc::new(AlertQueue::new("email"));
    let dispatcher = Arc::new(Dispatcher::new(
        queue.clone(),
        gateway,
        Duration::from_secs(30),
        NotifierSettings::default(),
        stats.clone(),
    ));

    let mut alert = test_alert("a");
    alert.attempts = 2; // third and final attempt
    dispatcher.dispatch(alert).await;
    assert!(queue.is_empty());
    assert_eq!(PipelineStats::get(&stats.alerts_failed), 1);
}

#[tokio::test]
async fn permanent_failure_drops_without_requeue() {
    let gateway = MockGateway::new(vec![Outcome::Permanent]);
    let stats = Arc::new(PipelineStats::new());
    let dispatcher = dispatcher(gateway, stats.clone());
    dispatcher.dispatch(test_alert("a")).await;
    assert_eq!(PipelineStats::get(&stats.alerts_failed), 1);
    assert_eq!(PipelineStats::get(&stats.alerts_delivered), 0);
}

#[tokio::test]
async fn worker_pool_delivers_and_stops_on_shutdown() {
    let gateway = MockGateway::new(vec![]);
    let stats = Arc::new(PipelineStats::new());
    let queue = Arc::new(AlertQueue::new("email"));
    let dispatcher = Arc::new(Dispatcher::new(
        queue.clone(),
        gateway.clone(),
        Duration::from_secs(30),
        NotifierSettings::default(),
        stats.clone(),
    ));
    let (tx, shutdown) = watch::channel(false);
    let handles = dispatcher.spawn_workers(&shutdown);
    assert_eq!(handles.len(), 4);

    queue.enqueue(test_alert("a"));
    queue.enqueue(test_alert("b"));

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if gateway.sent.lock().unwrap().len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("both alerts delivered");

    tx.send(true).unwrap();
    for handle in handles {
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("worker exits on shutdown")
            .unwrap();
    }
    assert_eq!(PipelineStats::get(&stats.alerts_delivered), 2);
}

// ── Plugin registry ──

#[test]
fn registry_default_has_builtin_gateways() {
    let registry = GatewayRegistry::default();
    assert_eq!(
        registry.medium_types(),
        vec![
            MediumType::Email,
            MediumType::Sms,
            MediumType::Pagerduty,
            MediumType::Webhook,
        ]
    );
}

#[test]
fn registry_rejects_unknown_medium_and_bad_config() {
    let registry = GatewayRegistry::default();
    assert!(registry
        .create_gateway(MediumType::Jabber, &serde_json::json!({}))
        .is_err());
    assert!(registry
        .create_gateway(MediumType::Sms, &serde_json::json!({}))
        .is_err());
    assert!(registry
        .create_gateway(
            MediumType::Sms,
            &serde_json::json!({"gateway_url": "https://sms.example.com", "api_key": "k"})
        )
        .is_ok());
}

#[test]
fn email_plugin_redacts_password() {
    let plugin = crate::gateways::email::EmailPlugin;
    let config = serde_json::json!({
        "smtp_host": "smtp.example.com",
        "smtp_port": 587,
        "smtp_password": "hunter2",
        "from": "noreply@example.com"
    });
    let redacted = crate::plugin::GatewayPlugin::redact_config(&plugin, &config);
    assert_eq!(redacted["smtp_password"], "***");
}
