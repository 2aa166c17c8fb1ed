use std::sync::Arc;

use thiserror::Error;

use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;
use crate::BoxError;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("frame has no pixels ({width}x{height})")]
    InvalidFrame { width: u32, height: u32 },
    #[error("face detector failed: {0}")]
    Detector(#[source] BoxError),
}

/// A detected face clamped to its frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceCandidate {
    pub bbox: BoundingBox,
    pub confidence: f32,
}

/// Runs the detector and turns its raw output into frame-clamped boxes,
/// dropping detections that have no area once clamped.
#[derive(Clone)]
pub struct FaceCandidateExtractor {
    detector: Arc<dyn FaceDetector>,
}

impl FaceCandidateExtractor {
    pub fn new(detector: Arc<dyn FaceDetector>) -> Self {
        Self { detector }
    }

    /// Candidates come back in the detector's order.
    pub fn extract(&self, frame: &Frame) -> Result<Vec<FaceCandidate>, ExtractError> {
        if frame.is_empty() {
            return Err(ExtractError::InvalidFrame {
                width: frame.width(),
                height: frame.height(),
            });
        }

        let detections = self.detector.detect(frame).map_err(ExtractError::Detector)?;
        let total = detections.len();

        let candidates: Vec<FaceCandidate> = detections
            .into_iter()
            .filter_map(|d| {
                BoundingBox::clamped(d.x, d.y, d.width, d.height, frame.width(), frame.height())
                    .map(|bbox| FaceCandidate {
                        bbox,
                        confidence: d.confidence,
                    })
            })
            .collect();

        if candidates.len() < total {
            log::debug!(
                "Frame {}: discarded {} degenerate detection(s)",
                frame.index(),
                total - candidates.len()
            );
        }
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_detector::RawDetection;
    use approx::assert_relative_eq;

    struct StubDetector(Vec<RawDetection>);

    impl FaceDetector for StubDetector {
        fn detect(&self, _frame: &Frame) -> Result<Vec<RawDetection>, BoxError> {
            Ok(self.0.clone())
        }
    }

    struct FailingDetector;

    impl FaceDetector for FailingDetector {
        fn detect(&self, _frame: &Frame) -> Result<Vec<RawDetection>, BoxError> {
            Err("inference failed".into())
        }
    }

    fn det(x: f32, y: f32, width: f32, height: f32, confidence: f32) -> RawDetection {
        RawDetection {
            x,
            y,
            width,
            height,
            confidence,
        }
    }

    fn frame(w: u32, h: u32) -> Frame {
        Frame::new(vec![0u8; (w * h * 3) as usize], w, h, 0)
    }

    fn extractor(dets: Vec<RawDetection>) -> FaceCandidateExtractor {
        FaceCandidateExtractor::new(Arc::new(StubDetector(dets)))
    }

    #[test]
    fn test_clamps_and_keeps_detector_order() {
        let ex = extractor(vec![
            det(95.0, 95.0, 20.0, 20.0, 0.6),
            det(10.0, 10.0, 30.0, 30.0, 0.9),
        ]);
        let candidates = ex.extract(&frame(100, 100)).unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].bbox.to_array(), [95, 95, 99, 99]);
        assert_relative_eq!(candidates[0].confidence, 0.6);
        assert_eq!(candidates[1].bbox.to_array(), [10, 10, 40, 40]);
        assert_relative_eq!(candidates[1].confidence, 0.9);
    }

    #[test]
    fn test_degenerate_detections_are_dropped() {
        let ex = extractor(vec![
            det(10.0, 10.0, 0.0, 30.0, 0.9),
            det(200.0, 10.0, 30.0, 30.0, 0.9),
            det(20.0, 20.0, 10.0, 10.0, 0.7),
        ]);
        let candidates = ex.extract(&frame(100, 100)).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].bbox.to_array(), [20, 20, 30, 30]);
    }

    #[test]
    fn test_no_detections_is_empty_not_error() {
        let candidates = extractor(Vec::new()).extract(&frame(50, 50)).unwrap();
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_empty_frame_is_rejected() {
        let err = extractor(Vec::new())
            .extract(&Frame::new(Vec::new(), 0, 0, 0))
            .unwrap_err();
        assert!(matches!(
            err,
            ExtractError::InvalidFrame {
                width: 0,
                height: 0
            }
        ));
    }

    #[test]
    fn test_detector_failure_is_propagated() {
        let ex = FaceCandidateExtractor::new(Arc::new(FailingDetector));
        let err = ex.extract(&frame(10, 10)).unwrap_err();
        assert!(matches!(err, ExtractError::Detector(_)));
        assert!(err.to_string().contains("inference failed"));
    }
}
