use flapjack_common::id;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A human recipient. Owns media; belongs to rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactRecord {
    pub id: String,
    pub name: String,
    /// UTC offset of the contact's local timezone, in seconds. Rule time
    /// restrictions are evaluated in this timezone.
    pub timezone_offset_secs: i32,
    pub media: BTreeSet<String>,
    pub rules: BTreeSet<String>,
}

impl ContactRecord {
    pub fn new(name: &str, timezone_offset_secs: i32) -> Self {
        Self {
            id: id::new_id(),
            name: name.to_string(),
            timezone_offset_secs,
            media: BTreeSet::new(),
            rules: BTreeSet::new(),
        }
    }
}
