use flapjack_common::id;
use flapjack_common::types::Condition;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Materialized join of a rule with a matching check, carrying the
/// per-pair alerting flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRecord {
    pub id: String,
    pub check_id: String,
    pub rule_id: String,
    pub contact_id: String,
    pub is_alerting: bool,
    /// Copied from the rule at materialization time.
    pub conditions_list: BTreeSet<Condition>,
}

impl RouteRecord {
    pub fn new(
        check_id: &str,
        rule_id: &str,
        contact_id: &str,
        conditions_list: BTreeSet<Condition>,
    ) -> Self {
        Self {
            id: id::new_id(),
            check_id: check_id.to_string(),
            rule_id: rule_id.to_string(),
            contact_id: contact_id.to_string(),
            is_alerting: false,
            conditions_list,
        }
    }

    pub fn matches_condition(&self, condition: Condition) -> bool {
        if self.conditions_list.is_empty() {
            condition.is_unhealthy()
        } else {
            self.conditions_list.contains(&condition)
        }
    }
}
