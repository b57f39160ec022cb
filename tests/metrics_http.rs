// tests/metrics_http.rs
mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use common::{collector, feeds, raw, url_of, PrefixTranslator, ScriptedFetcher};
use news_collector::metrics::Metrics;
use news_collector::store::NewsStore;

#[tokio::test]
async fn metrics_endpoint_exposes_collector_series() {
    let metrics = Metrics::init().expect("recorder installs once per test binary");

    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .items(&url_of("Reuters"), vec![raw("EN Stocks rise", "https://r/1")])
            .failing(&url_of("Broken"), 500),
    );
    let store = NewsStore::open_in_memory().await.unwrap();
    let c = collector(
        feeds(&["Reuters", "Broken"]),
        fetcher,
        Arc::new(PrefixTranslator::default()),
        store,
        Duration::from_secs(60),
    );
    let report = c.run_once().await;
    assert_eq!(report.inserted, 1);

    let resp = metrics
        .router()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    for needle in [
        "collector_items_inserted_total",
        "collector_translations_total",
        "collector_feed_errors_total{feed=\"Broken\"}",
        "collector_cycle_ms",
        "collector_last_cycle_ts",
    ] {
        assert!(text.contains(needle), "missing {needle} in:\n{text}");
    }
}
