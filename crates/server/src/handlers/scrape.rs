use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use scrape_core::{Job, JobRequest};

use crate::api_types::ApiResponse;
use crate::AppState;

/// `POST /scrape` body. Exactly one of `urls` / `site_url` must be present;
/// `site_url` is treated as the seed of a pagination job.
#[derive(Debug, Deserialize)]
pub struct SubmitBody {
    pub urls: Option<Vec<String>>,
    pub site_url: Option<String>,
    #[serde(default)]
    pub max_pages: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job_id: Uuid,
    pub status: &'static str,
}

pub async fn submit(State(state): State<AppState>, raw: Bytes) -> impl IntoResponse {
    let body: SubmitBody = match serde_json::from_slice(&raw) {
        Ok(b) => b,
        Err(_) => return ApiResponse::error(StatusCode::BAD_REQUEST, "invalid JSON body").into_response(),
    };

    let request = match (body.urls, body.site_url) {
        (Some(_), Some(_)) => {
            return ApiResponse::error(
                StatusCode::BAD_REQUEST,
                "specify either urls or site_url, not both",
            )
            .into_response();
        }
        (Some(urls), None) if !urls.is_empty() => JobRequest::Batch { urls },
        (None, Some(seed_url)) if !seed_url.is_empty() => JobRequest::Pagination {
            seed_url,
            max_pages: body.max_pages.unwrap_or(state.default_max_pages),
        },
        _ => {
            return ApiResponse::error(StatusCode::BAD_REQUEST, "neither urls nor site_url provided")
                .into_response();
        }
    };

    match state.executor.submit(request).await {
        Ok(job_id) => {
            (StatusCode::ACCEPTED, Json(SubmitResponse { job_id, status: "accepted" })).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to persist submitted job");
            ApiResponse::error(StatusCode::INTERNAL_SERVER_ERROR, "job store unavailable").into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub job: Job,
    pub metrics: Option<scrape_core::MetricsSnapshot>,
}

pub async fn status(State(state): State<AppState>, Query(query): Query<StatusQuery>) -> impl IntoResponse {
    let Some(id) = query.id else {
        return ApiResponse::error(StatusCode::BAD_REQUEST, "missing id query parameter").into_response();
    };

    let Ok(job_id) = Uuid::parse_str(&id) else {
        return ApiResponse::error(StatusCode::NOT_FOUND, "unknown job id").into_response();
    };

    match state.executor.store().get_job(job_id).await {
        Ok(Some(job)) => {
            let metrics = state.executor.metrics().enabled().then(|| state.executor.metrics().snapshot());
            (StatusCode::OK, Json(StatusResponse { job, metrics })).into_response()
        }
        Ok(None) => ApiResponse::error(StatusCode::NOT_FOUND, "unknown job id").into_response(),
        Err(e) => {
            tracing::error!(error = %e, "store lookup failed");
            ApiResponse::error(StatusCode::INTERNAL_SERVER_ERROR, "job store unavailable").into_response()
        }
    }
}
