use crate::shared::frame::Frame;
use crate::BoxError;

/// A face as reported by the detector, in frame pixel coordinates.
///
/// `(x, y)` is the top-left corner. Values may fall outside the frame or be
/// fractional; clamping happens in the candidate extractor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawDetection {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

/// Domain interface for face detection.
///
/// Detection is stateless per frame, so one detector can be shared across
/// request threads.
pub trait FaceDetector: Send + Sync {
    fn detect(&self, frame: &Frame) -> Result<Vec<RawDetection>, BoxError>;
}
