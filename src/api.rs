//! Read-only HTTP API over the store.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, Request, State},
    http::{header::HeaderName, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::error;

use crate::collector::{StatusBoard, StatusSnapshot};
use crate::config::AppConfig;
use crate::ingest::FeedSource;
use crate::store::{ListQuery, NewsItem, NewsStore, SourceCount, StoreError, StoreStatus};

pub const API_KEY_HEADER: &str = "x-api-key";
pub const API_KEY_QUERY: &str = "api_key";
/// Upper bound for `/api/news?limit=`.
pub const MAX_LIST_LIMIT: u32 = 1000;

#[derive(Clone)]
pub struct AppState {
    pub store: NewsStore,
    pub status: StatusBoard,
    pub config: Arc<AppConfig>,
    pub feeds: Arc<Vec<FeedSource>>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        store: NewsStore,
        status: StatusBoard,
        config: AppConfig,
        feeds: Vec<FeedSource>,
    ) -> Self {
        Self {
            store,
            status,
            config: Arc::new(config),
            feeds: Arc::new(feeds),
            started_at: Utc::now(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/news", get(list_news))
        .route("/api/sources", get(list_sources))
        .route("/api/stats", get(stats))
        .route("/api/status", get(status))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    Router::new()
        .route("/api/health", get(health))
        .merge(protected)
        .layer(cors_layer(&state.config.api.allowed_origins))
        .with_state(state)
}

/// `*` allows any origin; `*.example.com` matches subdomains; anything else is exact.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static(API_KEY_HEADER),
            axum::http::header::CONTENT_TYPE,
        ]);
    if origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }
    let patterns: Arc<Vec<String>> = Arc::new(origins.to_vec());
    base.allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
        origin
            .to_str()
            .map(|o| patterns.iter().any(|p| origin_matches(p, o)))
            .unwrap_or(false)
    }))
}

pub fn origin_matches(pattern: &str, origin: &str) -> bool {
    match pattern.find("*.") {
        Some(star) => {
            let (scheme, suffix) = (&pattern[..star], &pattern[star + 1..]);
            origin.starts_with(scheme)
                && origin.ends_with(suffix)
                && origin.len() > scheme.len() + suffix.len()
        }
        None => pattern.eq_ignore_ascii_case(origin),
    }
}

async fn require_api_key(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(expected) = state.config.api.api_key.as_deref() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "success": false, "error": "API key not configured" })),
        )
            .into_response();
    };
    let from_header = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let from_query = Query::<HashMap<String, String>>::try_from_uri(req.uri())
        .ok()
        .and_then(|Query(q)| q.get(API_KEY_QUERY).cloned());

    match from_header.or(from_query) {
        Some(k) if k == expected => next.run(req).await,
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "error": "invalid or missing API key" })),
        )
            .into_response(),
    }
}

pub struct ApiError(StoreError);

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "store query failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": self.0.to_string() })),
        )
            .into_response()
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "status": "online",
        "timestamp": Utc::now(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct NewsParams {
    pub source: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Serialize)]
struct NewsResp {
    success: bool,
    count: usize,
    items: Vec<NewsItem>,
}

async fn list_news(
    State(state): State<AppState>,
    Query(params): Query<NewsParams>,
) -> Result<Json<NewsResp>, ApiError> {
    let q = ListQuery {
        source: params.source.filter(|s| !s.trim().is_empty()),
        limit: Some(params.limit.unwrap_or(MAX_LIST_LIMIT).min(MAX_LIST_LIMIT)),
    };
    let items = state.store.list(&q).await?;
    Ok(Json(NewsResp {
        success: true,
        count: items.len(),
        items,
    }))
}

#[derive(Serialize)]
struct SourcesResp {
    success: bool,
    sources: Vec<SourceCount>,
}

async fn list_sources(State(state): State<AppState>) -> Result<Json<SourcesResp>, ApiError> {
    Ok(Json(SourcesResp {
        success: true,
        sources: state.store.count_by_source().await?,
    }))
}

async fn stats(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let s = state.store.aggregate_stats().await?;
    Ok(Json(json!({
        "success": true,
        "total_items": s.total_items,
        "total_sources": s.total_sources,
        "last_collected_at": s.last_collected_at,
    })))
}

#[derive(Serialize)]
struct StatusResp<'a> {
    success: bool,
    uptime_secs: i64,
    store: StoreStatus,
    collector: StatusSnapshot,
    config: &'a AppConfig,
    feeds: Vec<&'a str>,
}

async fn status(State(state): State<AppState>) -> Result<Response, ApiError> {
    let store = state.store.status().await?;
    let body = StatusResp {
        success: true,
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
        store,
        collector: state.status.snapshot(),
        config: &state.config,
        feeds: state.feeds.iter().map(|f| f.name.as_str()).collect(),
    };
    Ok(Json(body).into_response())
}
