use std::collections::HashMap;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use scrape_breaker::BreakerStats;
use scrape_core::MetricsSnapshot;
use serde::Serialize;

use crate::api_types::ApiResponse;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct MetricsBody {
    #[serde(flatten)]
    pub snapshot: MetricsSnapshot,
    pub per_host: HashMap<String, BreakerStats>,
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let registry = state.executor.metrics();
    if !registry.enabled() {
        return ApiResponse::error(StatusCode::SERVICE_UNAVAILABLE, "metrics collection is disabled")
            .into_response();
    }

    let body = MetricsBody {
        snapshot: registry.snapshot(),
        per_host: state.executor.host_stats().await,
    };
    Json(body).into_response()
}
