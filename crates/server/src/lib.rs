//! HTTP boundary for the deepfake detector: multipart upload handling,
//! response shaping and error-to-status mapping.

pub mod api;
pub mod error;

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;

use real_or_render_core::media::domain::video_reader::VideoReader;
use real_or_render_core::pipeline::analyze_image_use_case::AnalyzeImageUseCase;
use real_or_render_core::pipeline::analyze_video_use_case::AnalyzeVideoUseCase;

/// Builds a fresh video reader for each request.
pub type ReaderFactory = Arc<dyn Fn() -> Box<dyn VideoReader> + Send + Sync>;

/// Read-only state shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub image: AnalyzeImageUseCase,
    pub video: AnalyzeVideoUseCase,
    pub new_reader: ReaderFactory,
    /// Average scores strictly above this are labelled "real".
    pub real_threshold: f64,
    /// Where uploaded videos are staged; the system temp dir when `None`.
    pub upload_dir: Option<PathBuf>,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/predict_image", post(api::predict_image))
        .route("/predict_video", post(api::predict_video))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}
