//! Prometheus metric names and recording helpers.

use metrics::{counter, gauge, histogram};

pub fn record_retrieval(outcome: &'static str, elapsed_secs: f64) {
    counter!("viewer_retrievals_total", "outcome" => outcome).increment(1);
    histogram!("viewer_retrieval_duration_seconds").record(elapsed_secs);
}

pub fn record_render_pass(outcome: &'static str) {
    counter!("viewer_render_passes_total", "outcome" => outcome).increment(1);
}

pub fn record_invalid_artifact(kind: &'static str) {
    counter!("viewer_artifacts_invalid_total", "kind" => kind).increment(1);
}

pub fn record_overlay_png(bytes: usize) {
    histogram!("viewer_overlay_png_bytes").record(bytes as f64);
}

pub fn record_sessions(active: usize) {
    gauge!("viewer_sessions_active").set(active as f64);
}
