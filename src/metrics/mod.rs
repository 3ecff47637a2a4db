//! Metrics collection for observability

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec_with_registry, register_counter_with_registry,
    register_histogram_with_registry, Counter, CounterVec, Encoder, Histogram, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Global metrics registry
pub static METRICS: Lazy<Arc<Metrics>> = Lazy::new(|| {
    Arc::new(Metrics::new().expect("Failed to initialize metrics"))
});

/// Metrics collector
pub struct Metrics {
    registry: Registry,

    // Trim metrics
    pub trim_runs: Counter,
    pub turns_evicted: Counter,
    pub partial_deletions: Counter,
    pub unshrinkable: Counter,

    // Completion metrics
    pub completion_requests: CounterVec,
    pub completion_total_tokens: Histogram,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let trim_runs = register_counter_with_registry!(
            Opts::new("context_trim_runs_total", "Trims that had to reduce the context"),
            registry
        )?;

        let turns_evicted = register_counter_with_registry!(
            Opts::new("context_turns_evicted_total", "Whole turns evicted by the turn cap"),
            registry
        )?;

        let partial_deletions = register_counter_with_registry!(
            Opts::new("context_partial_deletions_total", "Prefix deletions applied to turns"),
            registry
        )?;

        let unshrinkable = register_counter_with_registry!(
            Opts::new("context_unshrinkable_total", "Trims that could not reach the budget"),
            registry
        )?;

        let completion_requests = register_counter_vec_with_registry!(
            Opts::new("completion_requests_total", "Total chat completion requests"),
            &["status"],
            registry
        )?;

        let completion_total_tokens = register_histogram_with_registry!(
            "completion_total_tokens",
            "Provider-reported total tokens per exchange",
            registry
        )?;

        Ok(Self {
            registry,
            trim_runs,
            turns_evicted,
            partial_deletions,
            unshrinkable,
            completion_requests,
            completion_total_tokens,
        })
    }

    /// Get the metrics registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_trim(&self) {
        self.trim_runs.inc();
    }

    pub fn record_evictions(&self, count: usize) {
        self.turns_evicted.inc_by(count as f64);
    }

    pub fn record_partial_deletion(&self) {
        self.partial_deletions.inc();
    }

    pub fn record_unshrinkable(&self) {
        self.unshrinkable.inc();
    }

    /// Record a completion request and, on success, its reported total
    pub fn record_completion(&self, success: bool, total_tokens: Option<usize>) {
        let status = if success { "success" } else { "error" };
        self.completion_requests.with_label_values(&[status]).inc();
        if let Some(total) = total_tokens {
            self.completion_total_tokens.observe(total as f64);
        }
    }

    /// Export this collector's metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap_or_default();

        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initialization() {
        let metrics = Metrics::new();
        assert!(metrics.is_ok());
    }

    #[test]
    fn test_record_trim_counters() {
        let metrics = Metrics::new().unwrap();
        metrics.record_trim();
        metrics.record_evictions(3);
        metrics.record_partial_deletion();

        assert_eq!(metrics.trim_runs.get(), 1.0);
        assert_eq!(metrics.turns_evicted.get(), 3.0);
        assert_eq!(metrics.partial_deletions.get(), 1.0);
    }

    #[test]
    fn test_export_contains_completion_metrics() {
        let metrics = Metrics::new().unwrap();
        metrics.record_completion(true, Some(1200));
        metrics.record_completion(false, None);

        let exported = metrics.export_prometheus();
        assert!(exported.contains("completion_requests_total"));
        assert!(exported.contains("completion_total_tokens"));
    }
}
