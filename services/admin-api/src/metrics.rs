//! Prometheus counters for back-office writes.

use std::sync::OnceLock;

use prometheus::{register_int_counter_vec, IntCounterVec};
use tracing::warn;

pub const METRICS_PREFIX: &str = "foodx_admin";

fn changes() -> Option<&'static IntCounterVec> {
    static CHANGES: OnceLock<Option<IntCounterVec>> = OnceLock::new();
    CHANGES
        .get_or_init(|| {
            register_int_counter_vec!(
                format!("{}_changes_total", METRICS_PREFIX),
                "Catalog, party and order writes by entity and action",
                &["entity", "action"]
            )
            .map_err(|e| warn!(error = %e, "Failed to register admin metrics"))
            .ok()
        })
        .as_ref()
}

pub fn record_change(entity: &str, action: &str) {
    if let Some(counter) = changes() {
        counter.with_label_values(&[entity, action]).inc();
    }
}

pub fn change_count(entity: &str, action: &str) -> u64 {
    changes()
        .map(|counter| counter.with_label_values(&[entity, action]).get())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_changes_are_counted_per_label() {
        let before = change_count("product", "archived");
        record_change("product", "archived");
        record_change("product", "archived");
        assert_eq!(change_count("product", "archived"), before + 2);
    }
}
