//! Error envelope shared by every endpoint. Success responses return the
//! bare, spec-mandated top-level shape for their endpoint; only errors are
//! wrapped, as `{"error": true, "context": {}, "data": {"message": ...}}`.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub error: bool,
    pub context: EmptyContext,
    pub data: T,
}

#[derive(Debug, Default, Serialize)]
pub struct EmptyContext {}

#[derive(Debug, Serialize)]
pub struct ErrorData {
    pub message: String,
}

impl ApiResponse<ErrorData> {
    pub fn error(status: StatusCode, message: impl Into<String>) -> impl IntoResponse {
        (
            status,
            Json(ApiResponse {
                error: true,
                context: EmptyContext {},
                data: ErrorData { message: message.into() },
            }),
        )
    }
}
