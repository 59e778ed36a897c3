use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::warn;

const DURATION_BUCKETS_MS: &[f64] = &[
    1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 10000.0,
];

static METRICS: OnceCell<Metrics> = OnceCell::new();

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder once per process; later calls share it.
    pub fn init() -> &'static Metrics {
        METRICS.get_or_init(|| {
            let builder = match PrometheusBuilder::new()
                .set_buckets_for_metric(Matcher::Full("analysis_duration_ms".into()), DURATION_BUCKETS_MS)
            {
                Ok(b) => b,
                Err(e) => {
                    warn!(error = %e, "prometheus: falling back to summaries");
                    PrometheusBuilder::new()
                }
            };

            let handle = match builder.install_recorder() {
                Ok(h) => h,
                Err(e) => {
                    // Another recorder already owns the global slot; render an empty registry.
                    warn!(error = %e, "prometheus: recorder not installed");
                    PrometheusBuilder::new().build_recorder().handle()
                }
            };

            describe();
            Self { handle }
        })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe() {
    describe_counter!("analysis_requests_total", "Analyses dispatched to a scorer, by model");
    describe_counter!("analysis_flagged_total", "Requests short-circuited by moderation");
    describe_counter!("analysis_errors_total", "Responses carrying an error, by model");
    describe_counter!("remote_cache_hits_total", "Remote scorer cache hits");
    describe_counter!("remote_cache_misses_total", "Remote scorer cache misses");
    describe_gauge!("remote_cache_capacity", "Remote scorer cache capacity");
    describe_histogram!("analysis_duration_ms", "Scoring latency in milliseconds");
}
