use chrono::{DateTime, Utc};
use flapjack_common::id;
use flapjack_common::types::Condition;
use serde::{Deserialize, Serialize};

/// One sample in a check's history. Immutable once saved; the store keeps
/// the per-check sequence strictly monotonic in `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateRecord {
    pub id: String,
    pub check_id: String,
    pub condition: Condition,
    pub summary: String,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StateRecord {
    pub fn new(
        check_id: &str,
        condition: Condition,
        summary: &str,
        details: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id::new_id(),
            check_id: check_id.to_string(),
            condition,
            summary: summary.to_string(),
            details: details.map(str::to_string),
            created_at,
        }
    }
}
