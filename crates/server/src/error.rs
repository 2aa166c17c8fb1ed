use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use real_or_render_core::pipeline::analysis_error::AnalysisError;

/// Everything a handler can fail with, mapped onto an HTTP status.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Analysis(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Analysis(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("{self}");
        } else {
            log::warn!("Rejected request: {self}");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
