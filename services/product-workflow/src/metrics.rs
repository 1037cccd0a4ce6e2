//! Prometheus metrics for workflow runs, exported through the default registry.

use std::sync::OnceLock;

use prometheus::{register_histogram, register_int_counter_vec, Histogram, IntCounterVec};
use tracing::warn;

pub const METRICS_PREFIX: &str = "foodx_workflow";

/// Buckets for a whole brief/RFQ/project run, in seconds.
const RUN_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

struct WorkflowMetrics {
    runs: IntCounterVec,
    duration: Histogram,
}

impl WorkflowMetrics {
    fn register() -> prometheus::Result<Self> {
        Ok(Self {
            runs: register_int_counter_vec!(
                format!("{}_runs_total", METRICS_PREFIX),
                "Workflow runs by outcome (created, replayed, failed)",
                &["outcome"]
            )?,
            duration: register_histogram!(
                format!("{}_duration_seconds", METRICS_PREFIX),
                "Latency of a complete workflow run in seconds",
                RUN_BUCKETS.to_vec()
            )?,
        })
    }
}

fn metrics() -> Option<&'static WorkflowMetrics> {
    static METRICS: OnceLock<Option<WorkflowMetrics>> = OnceLock::new();
    METRICS
        .get_or_init(|| match WorkflowMetrics::register() {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                warn!(error = %e, "Failed to register workflow metrics");
                None
            }
        })
        .as_ref()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Created,
    Replayed,
    Failed,
}

impl RunOutcome {
    fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Replayed => "replayed",
            Self::Failed => "failed",
        }
    }
}

pub fn record_run(outcome: RunOutcome, seconds: f64) {
    if let Some(metrics) = metrics() {
        metrics.runs.with_label_values(&[outcome.label()]).inc();
        if outcome != RunOutcome::Replayed {
            metrics.duration.observe(seconds);
        }
    }
}

pub fn run_count(outcome: RunOutcome) -> u64 {
    metrics()
        .map(|m| m.runs.with_label_values(&[outcome.label()]).get())
        .unwrap_or(0)
}
