/// YuNet face detector using ONNX Runtime via `ort`.
///
/// Handles BGR/CHW preprocessing, inference, anchor-free decoding of the
/// twelve stride outputs, score filtering and NMS.
use std::path::Path;
use std::sync::Mutex;

use image::imageops::FilterType;
use ndarray::Array4;
use ort::session::Session;

use crate::detection::domain::face_detector::{FaceDetector, RawDetection};
use crate::detection::infrastructure::math::{bbox_iou, corners};
use crate::shared::config::DetectionSettings;
use crate::shared::frame::Frame;
use crate::shared::onnx_session::{first_input_dims, load_session};
use crate::BoxError;

/// Feature-map strides, in the order the model emits its outputs.
const STRIDES: [usize; 3] = [8, 16, 32];

/// cls, obj, bbox and kps outputs for each stride.
const NUM_OUTPUTS: usize = STRIDES.len() * 4;

/// Dynamic-shape inputs are zero-padded up to a multiple of the largest stride.
const PAD_ALIGN: usize = 32;

/// YuNet detector backed by an ONNX Runtime session.
///
/// `Session::run` needs exclusive access, so concurrent requests serialise
/// on the session lock.
pub struct OnnxYunetDetector {
    session: Mutex<Session>,
    fixed_input: Option<(u32, u32)>,
    settings: DetectionSettings,
}

impl OnnxYunetDetector {
    /// Load a YuNet ONNX model.
    ///
    /// If the model declares a fixed `[1, 3, H, W]` input, frames are resized
    /// to it and detections scaled back; otherwise frames are padded.
    pub fn new(model_path: &Path, settings: DetectionSettings) -> Result<Self, BoxError> {
        let session = load_session(model_path)?;
        if session.outputs().len() < NUM_OUTPUTS {
            return Err(format!(
                "YuNet model must have {NUM_OUTPUTS} outputs, found {}",
                session.outputs().len()
            )
            .into());
        }

        let dims = first_input_dims(&session);
        let fixed_input = match dims.as_slice() {
            [_, _, Some(h), Some(w)] => Some((*w as u32, *h as u32)),
            _ => None,
        };
        log::info!(
            "YuNet input: {}",
            fixed_input.map_or("dynamic".to_string(), |(w, h)| format!("{w}x{h}"))
        );

        Ok(Self {
            session: Mutex::new(session),
            fixed_input,
            settings,
        })
    }

    fn infer(&self, input: Array4<f32>) -> Result<Vec<Vec<f32>>, BoxError> {
        let input_value = ort::value::Tensor::from_array(input)?;
        let mut session = self
            .session
            .lock()
            .map_err(|_| "YuNet session lock poisoned")?;
        let outputs = session.run(ort::inputs![input_value])?;
        if outputs.len() < NUM_OUTPUTS {
            return Err(format!("YuNet produced {} outputs", outputs.len()).into());
        }
        (0..NUM_OUTPUTS)
            .map(|i| -> Result<Vec<f32>, BoxError> {
                let tensor = outputs[i].try_extract_array::<f32>()?;
                Ok(tensor.iter().copied().collect())
            })
            .collect()
    }
}

impl FaceDetector for OnnxYunetDetector {
    fn detect(&self, frame: &Frame) -> Result<Vec<RawDetection>, BoxError> {
        let prepared = preprocess(frame, self.fixed_input)?;
        let outputs = self.infer(prepared.tensor)?;

        let mut dets = decode(
            &outputs,
            prepared.width,
            prepared.height,
            self.settings.score_threshold,
        )?;
        let mut kept = nms(&mut dets, self.settings.nms_threshold, self.settings.top_k);
        for d in &mut kept {
            d.x *= prepared.scale_x;
            d.width *= prepared.scale_x;
            d.y *= prepared.scale_y;
            d.height *= prepared.scale_y;
        }
        Ok(kept)
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

struct Prepared {
    tensor: Array4<f32>,
    width: usize,
    height: usize,
    /// Multiply model-space x/width by this to get frame pixels.
    scale_x: f32,
    scale_y: f32,
}

/// Builds a `[1, 3, H, W]` BGR tensor with raw 0–255 values.
fn preprocess(frame: &Frame, fixed_input: Option<(u32, u32)>) -> Result<Prepared, BoxError> {
    let (fw, fh) = (frame.width(), frame.height());
    if fw == 0 || fh == 0 {
        return Err("cannot detect faces in an empty frame".into());
    }

    match fixed_input {
        Some((w, h)) if (w, h) != (fw, fh) => {
            let image = frame
                .to_rgb_image()
                .ok_or("frame buffer does not match its dimensions")?;
            let resized = image::imageops::resize(&image, w, h, FilterType::Triangle);
            let resized = Frame::from_rgb_image(resized, frame.index());
            Ok(Prepared {
                tensor: bgr_chw(&resized, w as usize, h as usize),
                width: w as usize,
                height: h as usize,
                scale_x: fw as f32 / w as f32,
                scale_y: fh as f32 / h as f32,
            })
        }
        Some(_) => Ok(Prepared {
            tensor: bgr_chw(frame, fw as usize, fh as usize),
            width: fw as usize,
            height: fh as usize,
            scale_x: 1.0,
            scale_y: 1.0,
        }),
        None => {
            let width = align_to(fw as usize, PAD_ALIGN);
            let height = align_to(fh as usize, PAD_ALIGN);
            Ok(Prepared {
                tensor: bgr_chw(frame, width, height),
                width,
                height,
                scale_x: 1.0,
                scale_y: 1.0,
            })
        }
    }
}

/// Copies `frame` into the top-left of a zero tensor of the given size,
/// swapping RGB to BGR.
fn bgr_chw(frame: &Frame, width: usize, height: usize) -> Array4<f32> {
    let mut tensor = Array4::<f32>::zeros((1, 3, height, width));
    let src = frame.as_ndarray();
    let rows = (frame.height() as usize).min(height);
    let cols = (frame.width() as usize).min(width);
    for y in 0..rows {
        for x in 0..cols {
            for c in 0..3 {
                tensor[[0, 2 - c, y, x]] = src[[y, x, c]] as f32;
            }
        }
    }
    tensor
}

fn align_to(value: usize, divisor: usize) -> usize {
    value.div_ceil(divisor) * divisor
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decodes the per-stride outputs into boxes in model-input pixels.
///
/// `outputs` holds, in order, cls×3, obj×3, bbox×3 and kps×3 for strides
/// 8, 16 and 32. Landmarks are not used.
fn decode(
    outputs: &[Vec<f32>],
    width: usize,
    height: usize,
    score_threshold: f32,
) -> Result<Vec<RawDetection>, BoxError> {
    if outputs.len() < NUM_OUTPUTS {
        return Err(format!("expected {NUM_OUTPUTS} YuNet outputs, got {}", outputs.len()).into());
    }

    let mut dets = Vec::new();
    for (i, &stride) in STRIDES.iter().enumerate() {
        let cols = width / stride;
        let rows = height / stride;
        let cells = cols * rows;

        let cls = &outputs[i];
        let obj = &outputs[i + STRIDES.len()];
        let bbox = &outputs[i + STRIDES.len() * 2];
        if cls.len() < cells || obj.len() < cells || bbox.len() < cells * 4 {
            return Err(format!(
                "stride {stride}: output length mismatch for {cols}x{rows} grid"
            )
            .into());
        }

        let s = stride as f32;
        for row in 0..rows {
            for col in 0..cols {
                let idx = row * cols + col;
                let score = (cls[idx].clamp(0.0, 1.0) * obj[idx].clamp(0.0, 1.0)).sqrt();
                if !score.is_finite() || score < score_threshold {
                    continue;
                }

                let b = &bbox[idx * 4..idx * 4 + 4];
                let cx = (col as f32 + b[0]) * s;
                let cy = (row as f32 + b[1]) * s;
                let w = b[2].exp() * s;
                let h = b[3].exp() * s;
                dets.push(RawDetection {
                    x: cx - w / 2.0,
                    y: cy - h / 2.0,
                    width: w,
                    height: h,
                    confidence: score,
                });
            }
        }
    }
    Ok(dets)
}

// ---------------------------------------------------------------------------
// NMS
// ---------------------------------------------------------------------------

/// Greedy NMS over the `top_k` highest-scoring detections.
fn nms(dets: &mut Vec<RawDetection>, iou_thresh: f32, top_k: usize) -> Vec<RawDetection> {
    dets.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    dets.truncate(top_k);

    let mut keep: Vec<RawDetection> = Vec::new();
    for det in dets.iter() {
        if keep.iter().all(|k| iou(k, det) <= iou_thresh) {
            keep.push(*det);
        }
    }
    keep
}

fn iou(a: &RawDetection, b: &RawDetection) -> f32 {
    bbox_iou(
        &corners(a.x, a.y, a.width, a.height),
        &corners(b.x, b.y, b.width, b.height),
    ) as f32
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
