use chrono::{DateTime, Utc};
use flapjack_common::id;
use flapjack_common::types::{Condition, MediumType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A delivery channel owned by a contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediumRecord {
    pub id: String,
    pub contact_id: String,
    pub medium_type: MediumType,
    /// Email address, phone number, webhook URL, routing key -- whatever the
    /// channel type expects.
    pub address: String,
    /// Minimum seconds between identical alerts on this medium. 0 disables
    /// the throttle.
    pub rollover_interval: u32,
    /// Switch to a digest alert when more than this many checks alert
    /// simultaneously on this medium.
    pub rollup_threshold: Option<u32>,

    /// Reverse index: checks currently alerting through this medium.
    pub alerting_checks: BTreeSet<String>,
    /// Size of the alerting set when the last rollup digest was issued;
    /// 0 means no digest is outstanding.
    pub last_rollup_size: usize,
    /// Last alert emitted per check, for the rollover-interval throttle.
    pub last_alerts: BTreeMap<String, (Condition, DateTime<Utc>)>,
}

impl MediumRecord {
    pub fn new(contact_id: &str, medium_type: MediumType, address: &str) -> Self {
        Self {
            id: id::new_id(),
            contact_id: contact_id.to_string(),
            medium_type,
            address: address.to_string(),
            rollover_interval: 0,
            rollup_threshold: None,
            alerting_checks: BTreeSet::new(),
            last_rollup_size: 0,
            last_alerts: BTreeMap::new(),
        }
    }

    /// True when the alerting-check count is over the rollup threshold.
    pub fn in_rollup(&self) -> bool {
        match self.rollup_threshold {
            Some(threshold) => self.alerting_checks.len() > threshold as usize,
            None => false,
        }
    }
}
