use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health condition of a check.
///
/// The variant order doubles as the severity order used by the processor:
/// `ok < unknown < warning < critical`. `unknown` ranks below the named
/// failures but above healthy, so an `unknown -> warning` transition counts
/// as an escalation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Ok,
    Unknown,
    Warning,
    Critical,
}

impl Condition {
    pub fn is_healthy(self) -> bool {
        matches!(self, Condition::Ok)
    }

    pub fn is_unhealthy(self) -> bool {
        !self.is_healthy()
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Condition::Ok => write!(f, "ok"),
            Condition::Unknown => write!(f, "unknown"),
            Condition::Warning => write!(f, "warning"),
            Condition::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Condition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ok" => Ok(Condition::Ok),
            "unknown" => Ok(Condition::Unknown),
            "warning" => Ok(Condition::Warning),
            "critical" => Ok(Condition::Critical),
            _ => Err(format!("unknown condition: {s}")),
        }
    }
}

/// Kind of an inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Service,
    Action,
    Metric,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::Service => write!(f, "service"),
            EventType::Action => write!(f, "action"),
            EventType::Metric => write!(f, "metric"),
        }
    }
}

/// Errors produced while parsing or validating an inbound event payload.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("event: malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("event: {0}")]
    Invalid(String),
}

/// An inbound check-result event, as read from the event queue.
///
/// `entity` names the check; when the optional `check` sub-identifier is
/// present the combined name is `entity:check`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub entity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<String>,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub state: Condition,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Unix seconds.
    pub time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_failure_delay: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_failure_delay: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledgement_id: Option<String>,
    /// Acknowledgement duration in seconds (action events only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
}

impl Event {
    /// Parses and validates a raw queue payload.
    pub fn parse(payload: &str) -> Result<Event, EventError> {
        let event: Event = serde_json::from_str(payload)?;
        event.validate()?;
        Ok(event)
    }

    fn validate(&self) -> Result<(), EventError> {
        if self.entity.trim().is_empty() {
            return Err(EventError::Invalid("empty entity".into()));
        }
        if self.summary.trim().is_empty() {
            return Err(EventError::Invalid("empty summary".into()));
        }
        if self.time < 0 {
            return Err(EventError::Invalid(format!(
                "negative timestamp {}",
                self.time
            )));
        }
        if self.event_type == EventType::Action {
            if self.acknowledgement_id.is_none() {
                return Err(EventError::Invalid(
                    "action event without acknowledgement_id".into(),
                ));
            }
            if self.duration.is_none() {
                return Err(EventError::Invalid("action event without duration".into()));
            }
        }
        Ok(())
    }

    /// The combined check name (`entity` or `entity:check`).
    pub fn check_name(&self) -> String {
        match &self.check {
            Some(check) => format!("{}:{}", self.entity, check),
            None => self.entity.clone(),
        }
    }

    /// Event time as a UTC timestamp. Validation rejects negative values,
    /// so the fallback is unreachable in practice.
    pub fn timestamp(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.time, 0).unwrap_or_default()
    }
}

/// Why a notification was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Problem,
    Acknowledgement,
    Recovery,
    Test,
}

/// Internal work item emitted by the check processor and consumed by the
/// route resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub check_id: String,
    pub state_id: String,
    pub kind: NotificationKind,
    pub condition: Condition,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Delivery channel type of a medium.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MediumType {
    Email,
    Sms,
    SmsNexmo,
    Sns,
    Pagerduty,
    Jabber,
    Slack,
    Webhook,
}

impl std::fmt::Display for MediumType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediumType::Email => write!(f, "email"),
            MediumType::Sms => write!(f, "sms"),
            MediumType::SmsNexmo => write!(f, "sms_nexmo"),
            MediumType::Sns => write!(f, "sns"),
            MediumType::Pagerduty => write!(f, "pagerduty"),
            MediumType::Jabber => write!(f, "jabber"),
            MediumType::Slack => write!(f, "slack"),
            MediumType::Webhook => write!(f, "webhook"),
        }
    }
}

impl std::str::FromStr for MediumType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "email" => Ok(MediumType::Email),
            "sms" => Ok(MediumType::Sms),
            "sms_nexmo" => Ok(MediumType::SmsNexmo),
            "sns" => Ok(MediumType::Sns),
            "pagerduty" => Ok(MediumType::Pagerduty),
            "jabber" => Ok(MediumType::Jabber),
            "slack" => Ok(MediumType::Slack),
            "webhook" => Ok(MediumType::Webhook),
            _ => Err(format!("unknown medium type: {s}")),
        }
    }
}

/// Disposition an alert reports to its recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    Problem,
    Acknowledgement,
    Recovery,
    ScheduledMaintenance,
    Test,
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertType::Problem => write!(f, "problem"),
            AlertType::Acknowledgement => write!(f, "acknowledgement"),
            AlertType::Recovery => write!(f, "recovery"),
            AlertType::ScheduledMaintenance => write!(f, "scheduled_maintenance"),
            AlertType::Test => write!(f, "test"),
        }
    }
}

/// A dispatchable delivery item targeted at one (contact, medium).
///
/// Serialized form matches the outbound queue wire contract: `alert_id`,
/// `check_id`, `contact_id`, `address`, `notification_type`, `condition`,
/// `summary`, `details`, `attempts`, `enqueued_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    #[serde(rename = "alert_id")]
    pub id: String,
    pub check_id: String,
    pub check_name: String,
    pub contact_id: String,
    pub medium_id: String,
    pub medium_type: MediumType,
    pub address: String,
    pub notification_type: AlertType,
    pub condition: Condition,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Non-empty when this alert is a rollup digest; lists the names of the
    /// checks currently alerting on the medium.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rollup_checks: Vec<String>,
    pub attempts: u32,
    pub enqueued_at: DateTime<Utc>,
}

impl AlertRecord {
    pub fn is_rollup(&self) -> bool {
        !self.rollup_checks.is_empty()
    }
}
