use flapjack_common::id;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Free-form label attached to checks and rules. The set of tags on a check
/// is the join key for rule matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagRecord {
    pub id: String,
    pub name: String,
    pub checks: BTreeSet<String>,
    pub rules: BTreeSet<String>,
}

impl TagRecord {
    pub fn new(name: &str) -> Self {
        Self {
            id: id::new_id(),
            name: name.to_string(),
            checks: BTreeSet::new(),
            rules: BTreeSet::new(),
        }
    }
}
