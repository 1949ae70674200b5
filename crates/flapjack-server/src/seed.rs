//! JSON seed bootstrap: declares contacts (with media and rules) and
//! checks so a deployment starts routable without a write API.

use flapjack_common::types::{Condition, MediumType};
use flapjack_notify::routing;
use flapjack_store::entities::{
    CheckRecord, ContactRecord, MediumRecord, RuleRecord, TagRecord, TimeRestriction,
};
use flapjack_store::{EntityClass, Store, StoreResult};
use serde::Deserialize;
use std::collections::BTreeMap;

const SEED_CLASSES: &[EntityClass] = &[
    EntityClass::Check,
    EntityClass::Tag,
    EntityClass::Contact,
    EntityClass::Medium,
    EntityClass::Rule,
    EntityClass::Route,
];

#[derive(Debug, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub contacts: Vec<ContactSeed>,
    #[serde(default)]
    pub checks: Vec<CheckSeed>,
}

#[derive(Debug, Deserialize)]
pub struct ContactSeed {
    pub name: String,
    #[serde(default)]
    pub timezone_offset_secs: i32,
    #[serde(default)]
    pub media: Vec<MediumSeed>,
    #[serde(default)]
    pub rules: Vec<RuleSeed>,
}

#[derive(Debug, Deserialize)]
pub struct MediumSeed {
    #[serde(rename = "type")]
    pub medium_type: MediumType,
    pub address: String,
    #[serde(default)]
    pub rollover_interval: u32,
    #[serde(default)]
    pub rollup_threshold: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct RuleSeed {
    /// Condition names; empty means any unhealthy.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Which of the contact's media this rule delivers through.
    #[serde(default)]
    pub media_types: Vec<MediumType>,
    #[serde(default)]
    pub time_restrictions: Vec<TimeRestriction>,
}

#[derive(Debug, Deserialize)]
pub struct CheckSeed {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub initial_failure_delay: Option<u32>,
    #[serde(default)]
    pub repeat_failure_delay: Option<u32>,
}

pub fn load_file(store: &impl Store, path: &str) -> anyhow::Result<SeedSummary> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read seed file '{path}': {e}"))?;
    let seed: SeedFile = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse seed file '{path}': {e}"))?;
    let summary = apply(store, &seed)?;
    tracing::info!(
        contacts = summary.contacts,
        media = summary.media,
        rules = summary.rules,
        checks = summary.checks,
        "Seed applied"
    );
    Ok(summary)
}

#[derive(Debug, Default)]
pub struct SeedSummary {
    pub contacts: usize,
    pub media: usize,
    pub rules: usize,
    pub checks: usize,
}

pub fn apply(store: &impl Store, seed: &SeedFile) -> StoreResult<SeedSummary> {
    store.with_lock(SEED_CLASSES, |ops| {
        let mut summary = SeedSummary::default();

        for contact_seed in &seed.contacts {
            let mut contact =
                ContactRecord::new(&contact_seed.name, contact_seed.timezone_offset_secs);

            let mut media_by_type: BTreeMap<MediumType, String> = BTreeMap::new();
            for medium_seed in &contact_seed.media {
                let mut medium = MediumRecord::new(
                    &contact.id,
                    medium_seed.medium_type,
                    &medium_seed.address,
                );
                medium.rollover_interval = medium_seed.rollover_interval;
                medium.rollup_threshold = medium_seed.rollup_threshold;
                media_by_type.insert(medium.medium_type, medium.id.clone());
                contact.media.insert(medium.id.clone());
                ops.save_medium(medium);
                summary.media += 1;
            }

            for rule_seed in &contact_seed.rules {
                let mut rule = RuleRecord::new(&contact.id);
                rule.conditions_list = rule_seed.conditions.iter().copied().collect();
                rule.tags = rule_seed.tags.iter().cloned().collect();
                rule.time_restrictions = rule_seed.time_restrictions.clone();
                for medium_type in &rule_seed.media_types {
                    match media_by_type.get(medium_type) {
                        Some(medium_id) => {
                            rule.media.insert(medium_id.clone());
                        }
                        None => {
                            tracing::warn!(
                                contact = %contact_seed.name,
                                medium = %medium_type,
                                "Rule references a medium the contact does not have, skipping"
                            );
                        }
                    }
                }
                for tag_name in &rule_seed.tags {
                    let mut tag = match ops.tag_by_name(tag_name) {
                        Some(tag) => tag.clone(),
                        None => TagRecord::new(tag_name),
                    };
                    tag.rules.insert(rule.id.clone());
                    ops.save_tag(tag)?;
                }
                contact.rules.insert(rule.id.clone());
                ops.save_rule(rule);
                summary.rules += 1;
            }

            ops.save_contact(contact);
            summary.contacts += 1;
        }

        for check_seed in &seed.checks {
            let mut check = CheckRecord::new(&check_seed.name);
            check.initial_failure_delay = check_seed.initial_failure_delay;
            check.repeat_failure_delay = check_seed.repeat_failure_delay;
            for tag_name in &check_seed.tags {
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
            routing::recompute_routes(ops, &check_id)?;
            summary.checks += 1;
        }

        Ok(summary)
    })
}
