pub mod email;
pub mod pagerduty;
pub mod sms;
pub mod webhook;

/// Subject/headline prefix shared by the text-ish gateways.
pub(crate) fn headline(alert: &flapjack_common::types::AlertRecord) -> String {
    if alert.is_rollup() {
        format!(
            "[flapjack][{}] {} checks alerting",
            alert.condition,
            alert.rollup_checks.len()
        )
    } else {
        format!(
            "[flapjack][{}] {} {}",
            alert.condition, alert.check_name, alert.notification_type
        )
    }
}
