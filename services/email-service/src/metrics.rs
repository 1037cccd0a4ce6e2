//! Prometheus counters for the mailbox, exported through the default registry.

use std::sync::OnceLock;

use prometheus::{register_int_counter_vec, IntCounterVec};
use tracing::warn;

pub const METRICS_PREFIX: &str = "foodx_email";

struct EmailMetrics {
    messages: IntCounterVec,
    events: IntCounterVec,
}

impl EmailMetrics {
    fn register() -> prometheus::Result<Self> {
        Ok(Self {
            messages: register_int_counter_vec!(
                format!("{}_messages_total", METRICS_PREFIX),
                "Emails handled by outcome (sent, failed, received)",
                &["outcome"]
            )?,
            events: register_int_counter_vec!(
                format!("{}_delivery_events_total", METRICS_PREFIX),
                "Provider delivery events by type",
                &["event"]
            )?,
        })
    }
}

fn metrics() -> Option<&'static EmailMetrics> {
    static METRICS: OnceLock<Option<EmailMetrics>> = OnceLock::new();
    METRICS
        .get_or_init(|| match EmailMetrics::register() {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                warn!(error = %e, "Failed to register email metrics");
                None
            }
        })
        .as_ref()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    Sent,
    Failed,
    Received,
}

impl MessageOutcome {
    fn label(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Received => "received",
        }
    }
}

pub fn record_message(outcome: MessageOutcome) {
    if let Some(metrics) = metrics() {
        metrics.messages.with_label_values(&[outcome.label()]).inc();
    }
}

pub fn message_count(outcome: MessageOutcome) -> u64 {
    metrics()
        .map(|m| m.messages.with_label_values(&[outcome.label()]).get())
        .unwrap_or(0)
}

pub fn record_event(event: &str) {
    if let Some(metrics) = metrics() {
        metrics.events.with_label_values(&[event]).inc();
    }
}
