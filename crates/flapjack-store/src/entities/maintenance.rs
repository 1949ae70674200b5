use chrono::{DateTime, Utc};
use flapjack_common::id;
use serde::{Deserialize, Serialize};

/// A pre-declared `[start_time, end_time)` suppression window. Overlapping
/// scheduled windows are permitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledMaintenanceRecord {
    pub id: String,
    pub check_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub summary: String,
}

impl ScheduledMaintenanceRecord {
    pub fn new(
        check_id: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        summary: &str,
    ) -> Self {
        Self {
            id: id::new_id(),
            check_id: check_id.to_string(),
            start_time,
            end_time,
            summary: summary.to_string(),
        }
    }

    pub fn active_at(&self, t: DateTime<Utc>) -> bool {
        self.start_time <= t && t < self.end_time
    }
}

/// A suppression window opened by an acknowledgement. At most one open
/// unscheduled window exists per check at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnscheduledMaintenanceRecord {
    pub id: String,
    pub check_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub summary: String,
}

impl UnscheduledMaintenanceRecord {
    pub fn new(
        check_id: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        summary: &str,
    ) -> Self {
        Self {
            id: id::new_id(),
            check_id: check_id.to_string(),
            start_time,
            end_time,
            summary: summary.to_string(),
        }
    }

    pub fn active_at(&self, t: DateTime<Utc>) -> bool {
        self.start_time <= t && t < self.end_time
    }
}
