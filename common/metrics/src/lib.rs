use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Installs the Prometheus recorder as the global `metrics` recorder.
/// The host application owns the returned handle and decides where to render it.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    const BUCKETS: &[f64] = &[
        0.1, 0.5, 1.0, 5.0, 10.0, 50.0, 100.0, 250.0, 500.0, 1000.0,
    ];

    PrometheusBuilder::new()
        .set_buckets(BUCKETS)?
        .install_recorder()
}

// Shorthand for common metric types
pub fn inc(name: &'static str, labels: &[(String, String)], value: u64) {
    metrics::counter!(name, labels).increment(value);
}

pub fn gauge(name: &'static str, labels: &[(String, String)], value: f64) {
    metrics::gauge!(name, labels).set(value);
}

pub fn histogram(name: &'static str, labels: &[(String, String)], value: f64) {
    metrics::histogram!(name, labels).record(value);
}

// Records the milliseconds between creation and drop as a histogram entry
pub struct TimingGuard {
    name: &'static str,
    labels: Vec<(String, String)>,
    start: Instant,
}

pub fn timing_guard(name: &'static str, labels: &[(String, String)]) -> TimingGuard {
    TimingGuard {
        name,
        labels: labels.to_vec(),
        start: Instant::now(),
    }
}

impl TimingGuard {
    pub fn label(mut self, key: &str, value: &str) -> Self {
        self.labels.push((key.to_string(), value.to_string()));
        self
    }

    // Consumes the guard, reporting the timing right away.
    pub fn fin(self) {}
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        histogram(
            self.name,
            &self.labels,
            self.start.elapsed().as_secs_f64() * 1000.0,
        );
    }
}
