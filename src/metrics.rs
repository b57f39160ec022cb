use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Fails if one is already installed.
    pub fn init() -> Result<Self, BuildError> {
        let handle = PrometheusBuilder::new().install_recorder()?;
        ensure_described();
        Ok(Self { handle })
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

/// One-time series descriptions (so they show up on /metrics with help text).
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("collector_feed_errors_total", "Feed fetch/parse failures.");
        describe_counter!("collector_items_inserted_total", "New items stored.");
        describe_counter!(
            "collector_items_duplicate_total",
            "Items skipped because their link is already stored."
        );
        describe_counter!(
            "collector_items_skipped_total",
            "Items rejected (missing link/title or storage error)."
        );
        describe_counter!("collector_translations_total", "Successful translations.");
        describe_counter!(
            "collector_translation_failures_total",
            "Translation attempts that failed or were refused by quota."
        );
        describe_counter!("collector_evicted_total", "Items removed by retention.");
        describe_histogram!("collector_cycle_ms", "Cycle duration in milliseconds.");
        describe_gauge!(
            "collector_last_cycle_ts",
            "Unix ts when the last collection cycle finished."
        );
    });
}
