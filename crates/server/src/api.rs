use std::io::Write;
use std::path::Path;

use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;

use real_or_render_core::pipeline::analysis_result::{AggregateResult, Label};

use crate::error::ApiError;
use crate::AppState;

const FILE_FIELD: &str = "file";
const DEFAULT_VIDEO_SUFFIX: &str = ".mp4";

#[derive(Debug, Serialize)]
pub struct ImagePrediction {
    pub prediction: f64,
    pub label: Label,
    pub face_confidence: f64,
    pub face_box: [i32; 4],
    pub corrected_original_base64: String,
    pub boxed_image_base64: String,
}

#[derive(Debug, Serialize)]
pub struct VideoPrediction {
    pub average_prediction: f64,
    pub average_face_confidence: f64,
    pub processed_frame_count: usize,
    pub first_raw_frame_base64: String,
    pub first_boxed_frame_base64: String,
    pub label: Label,
}

/// The `file` part of a multipart upload.
struct Upload {
    file_name: String,
    bytes: Bytes,
}

pub async fn predict_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ImagePrediction>, ApiError> {
    let upload = read_upload(multipart).await?;
    log::info!(
        "Image upload {} ({} bytes)",
        upload.file_name,
        upload.bytes.len()
    );

    let use_case = state.image.clone();
    let result = tokio::task::spawn_blocking(move || use_case.execute(&upload.bytes))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    let label = result.label(state.real_threshold);
    Ok(Json(ImagePrediction {
        prediction: result.average_prediction,
        label,
        face_confidence: result.average_face_confidence,
        face_box: result.representative_box.map_or([0; 4], |b| b.to_array()),
        corrected_original_base64: result.raw_preview,
        boxed_image_base64: result.annotated_preview,
    }))
}

pub async fn predict_video(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<VideoPrediction>, ApiError> {
    let upload = read_upload(multipart).await?;
    log::info!(
        "Video upload {} ({} bytes)",
        upload.file_name,
        upload.bytes.len()
    );

    let blocking_state = state.clone();
    let result: AggregateResult =
        tokio::task::spawn_blocking(move || analyze_video_upload(&blocking_state, &upload))
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(VideoPrediction {
        label: result.label(state.real_threshold),
        average_prediction: result.average_prediction,
        average_face_confidence: result.average_face_confidence,
        processed_frame_count: result.processed_unit_count,
        first_raw_frame_base64: result.raw_preview,
        first_boxed_frame_base64: result.annotated_preview,
    }))
}

/// Stages the upload on disk, analyses it and removes the file again.
///
/// The temp file is deleted on drop, so early returns and panics clean up
/// as well.
fn analyze_video_upload(state: &AppState, upload: &Upload) -> Result<AggregateResult, ApiError> {
    let suffix = video_suffix(&upload.file_name);
    let mut builder = tempfile::Builder::new();
    builder.prefix("upload-").suffix(&suffix);
    let staged = match &state.upload_dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    };
    let mut staged = staged.map_err(|e| ApiError::Internal(format!("temp file: {e}")))?;
    staged
        .write_all(&upload.bytes)
        .and_then(|_| staged.flush())
        .map_err(|e| ApiError::Internal(format!("temp file: {e}")))?;
    log::debug!("Staged video at {}", staged.path().display());

    let mut reader = (state.new_reader)();
    let outcome = state.video.execute(reader.as_mut(), staged.path());
    drop(reader);

    if let Err(e) = staged.close() {
        log::warn!("Could not remove staged upload: {e}");
    }
    Ok(outcome?)
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let Some(file_name) = field.file_name().map(str::to_string) else {
            return Err(ApiError::BadRequest(
                "Expected 'file' field to be a file upload.".to_string(),
            ));
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Could not read upload: {e}")))?;
        if bytes.is_empty() {
            return Err(ApiError::BadRequest("Received empty file.".to_string()));
        }
        return Ok(Upload { file_name, bytes });
    }
    Err(ApiError::BadRequest(
        "'file' field missing in form data.".to_string(),
    ))
}

/// Keeps the upload's extension so the demuxer can use it as a hint.
fn video_suffix(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_else(|| DEFAULT_VIDEO_SUFFIX.to_string())
}
