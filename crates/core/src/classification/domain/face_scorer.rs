use std::sync::Arc;

use image::imageops::FilterType;
use ndarray::Array4;
use thiserror::Error;

use crate::classification::domain::face_classifier::FaceClassifier;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::{Frame, CHANNELS};
use crate::BoxError;

/// Why a single face could not be scored. Callers skip the face and carry on.
#[derive(Error, Debug)]
pub enum ScoringFailure {
    #[error("face crop is empty")]
    EmptyCrop,
    #[error("classifier failed: {0}")]
    Classifier(#[source] BoxError),
}

/// Crops a face, resizes it to the classifier's input and returns its score.
#[derive(Clone)]
pub struct FaceScorer {
    classifier: Arc<dyn FaceClassifier>,
    input_size: u32,
}

impl FaceScorer {
    pub fn new(classifier: Arc<dyn FaceClassifier>, input_size: u32) -> Self {
        Self {
            classifier,
            input_size,
        }
    }

    pub fn score(&self, frame: &Frame, bbox: &BoundingBox) -> Result<f32, ScoringFailure> {
        let crop = frame.crop(bbox);
        if crop.is_empty() {
            return Err(ScoringFailure::EmptyCrop);
        }
        let input = self.to_input(&crop)?;
        self.classifier
            .predict(input.view())
            .map_err(ScoringFailure::Classifier)
    }

    /// Bilinear resize to `input_size`², then `[1, S, S, 3]` scaled by 1/255.
    fn to_input(&self, crop: &Frame) -> Result<Array4<f32>, ScoringFailure> {
        let image = crop.to_rgb_image().ok_or(ScoringFailure::EmptyCrop)?;
        let size = self.input_size;
        let resized = image::imageops::resize(&image, size, size, FilterType::Triangle);

        let s = size as usize;
        let data: Vec<f32> = resized
            .into_raw()
            .into_iter()
            .map(|v| v as f32 / 255.0)
            .collect();
        Array4::from_shape_vec((1, s, s, CHANNELS), data)
            .map_err(|e| ScoringFailure::Classifier(e.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::ArrayView4;
    use std::sync::Mutex;

    /// Records the shape and mean of every tensor it sees.
    #[derive(Default)]
    struct RecordingClassifier {
        seen: Mutex<Vec<(Vec<usize>, f32)>>,
        score: f32,
    }

    impl FaceClassifier for RecordingClassifier {
        fn predict(&self, input: ArrayView4<'_, f32>) -> Result<f32, BoxError> {
            let mean = input.mean().unwrap_or(0.0);
            self.seen.lock().unwrap().push((input.shape().to_vec(), mean));
            Ok(self.score)
        }
    }

    struct FailingClassifier;

    impl FaceClassifier for FailingClassifier {
        fn predict(&self, _input: ArrayView4<'_, f32>) -> Result<f32, BoxError> {
            Err("model exploded".into())
        }
    }

    fn white_frame(w: u32, h: u32) -> Frame {
        Frame::new(vec![255u8; (w * h * 3) as usize], w, h, 0)
    }

    #[test]
    fn test_score_feeds_normalised_nhwc_tensor() {
        let classifier = Arc::new(RecordingClassifier {
            score: 0.73,
            ..Default::default()
        });
        let scorer = FaceScorer::new(classifier.clone(), 256);
        let bbox = BoundingBox {
            x0: 10,
            y0: 10,
            x1: 50,
            y1: 70,
        };

        let score = scorer.score(&white_frame(100, 100), &bbox).unwrap();
        assert_relative_eq!(score, 0.73);

        let seen = classifier.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, vec![1, 256, 256, 3]);
        assert_relative_eq!(seen[0].1, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_score_respects_configured_input_size() {
        let classifier = Arc::new(RecordingClassifier::default());
        let scorer = FaceScorer::new(classifier.clone(), 64);
        let bbox = BoundingBox {
            x0: 0,
            y0: 0,
            x1: 5,
            y1: 5,
        };
        scorer.score(&white_frame(10, 10), &bbox).unwrap();
        assert_eq!(classifier.seen.lock().unwrap()[0].0, vec![1, 64, 64, 3]);
    }

    #[test]
    fn test_empty_crop_is_a_failure() {
        let scorer = FaceScorer::new(Arc::new(RecordingClassifier::default()), 256);
        let bbox = BoundingBox {
            x0: 200,
            y0: 200,
            x1: 300,
            y1: 300,
        };
        let err = scorer.score(&white_frame(100, 100), &bbox).unwrap_err();
        assert!(matches!(err, ScoringFailure::EmptyCrop));
    }

    #[test]
    fn test_classifier_error_is_wrapped() {
        let scorer = FaceScorer::new(Arc::new(FailingClassifier), 32);
        let bbox = BoundingBox {
            x0: 0,
            y0: 0,
            x1: 5,
            y1: 5,
        };
        let err = scorer.score(&white_frame(10, 10), &bbox).unwrap_err();
        assert!(matches!(err, ScoringFailure::Classifier(_)));
    }
}
