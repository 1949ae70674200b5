//! Route materialization: the explicit join of rules with matching checks.
//!
//! Routes are recomputed at the mutation sites (tag-set or rule changes set
//! `routes_stale`; the resolver calls [`recompute_routes`] before the next
//! resolution). There is no implicit hook machinery.

use flapjack_store::entities::RouteRecord;
use flapjack_store::{EntityOps, StoreResult};
use std::collections::{BTreeMap, BTreeSet};

/// Rebuilds the route set for one check.
///
/// A rule matches when its tag set is a (possibly empty) subset of the
/// check's tags; generic rules match every check but only alert the
/// contacts that configured them. Routes for rules that no longer match
/// are dropped; surviving routes keep their `is_alerting` flag.
pub fn recompute_routes(ops: &mut dyn EntityOps, check_id: &str) -> StoreResult<()> {
    let Some(check) = ops.check(check_id) else {
        return Ok(());
    };
    let mut check = check.clone();

    let check_tag_names: BTreeSet<String> = check
        .tags
        .iter()
        .filter_map(|tag_id| ops.tag(tag_id))
        .map(|tag| tag.name.clone())
        .collect();

    let matching: BTreeMap<String, (String, BTreeSet<_>)> = ops
        .rules()
        .into_iter()
        .filter(|rule| rule.tags.is_subset(&check_tag_names))
        .map(|rule| {
            (
                rule.id.clone(),
                (rule.contact_id.clone(), rule.conditions_list.clone()),
            )
        })
        .collect();

    let existing: BTreeMap<String, String> = ops
        .routes_for_check(check_id)
        .iter()
        .map(|route| (route.rule_id.clone(), route.id.clone()))
        .collect();

    for (rule_id, route_id) in &existing {
        if !matching.contains_key(rule_id) {
            ops.delete_route(route_id);
            check.routes.remove(route_id);
        }
    }

    check.contacts.clear();
    for (rule_id, (contact_id, conditions)) in &matching {
        check.contacts.insert(contact_id.clone());
        match existing.get(rule_id) {
            Some(route_id) => {
                // Refresh the conditions copy; the rule may have changed.
                if let Some(route) = ops.route(route_id) {
                    if &route.conditions_list != conditions {
                        let mut route = route.clone();
                        route.conditions_list = conditions.clone();
                        ops.save_route(route);
                    }
                }
            }
            None => {
                let route = RouteRecord::new(check_id, rule_id, contact_id, conditions.clone());
                check.routes.insert(route.id.clone());
                ops.save_route(route);
            }
        }
    }

    check.routes_stale = false;
    tracing::debug!(
        check = %check.name,
        routes = check.routes.len(),
        "Recomputed routes"
    );
    ops.save_check(check)?;
    Ok(())
}

/// Marks every check's routes stale; called after rule mutations, which can
/// affect any check.
pub fn mark_all_checks_stale(ops: &mut dyn EntityOps) -> StoreResult<()> {
    for check_id in ops.check_ids() {
        if let Some(check) = ops.check(&check_id) {
            let mut check = check.clone();
            check.routes_stale = true;
            ops.save_check(check)?;
        }
    }
    Ok(())
}
