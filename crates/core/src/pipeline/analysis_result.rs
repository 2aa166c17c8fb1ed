use serde::Serialize;

use crate::shared::bounding_box::BoundingBox;

/// One detected face and, if scoring succeeded, its classifier score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceObservation {
    pub bbox: BoundingBox,
    pub detector_confidence: f32,
    pub classifier_score: Option<f32>,
}

impl FaceObservation {
    pub fn is_scored(&self) -> bool {
        self.classifier_score.is_some()
    }
}

/// Every face found on one frame, in detector order.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameResult {
    pub frame_index: usize,
    pub observations: Vec<FaceObservation>,
}

impl FrameResult {
    /// `(classifier score, detector confidence)` of each scored face.
    pub fn scored(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.observations
            .iter()
            .filter_map(|o| o.classifier_score.map(|s| (s, o.detector_confidence)))
    }

    pub fn scored_count(&self) -> usize {
        self.scored().count()
    }

    /// Mean classifier score over scored faces; `None` if none were scored.
    pub fn mean_score(&self) -> Option<f64> {
        mean(self.scored().map(|(s, _)| s as f64))
    }

    /// Mean detector confidence over the same scored faces.
    pub fn mean_confidence(&self) -> Option<f64> {
        mean(self.scored().map(|(_, c)| c as f64))
    }

    /// All valid boxes, scored or not, for the annotated preview.
    pub fn boxes(&self) -> Vec<BoundingBox> {
        self.observations.iter().map(|o| o.bbox).collect()
    }

    /// Box of the most confident scored face.
    ///
    /// The leader must beat a running maximum that starts at zero, so the
    /// first of several equal confidences wins. When no face clears zero the
    /// first scored face's box is used instead.
    pub fn representative_box(&self) -> Option<BoundingBox> {
        let mut best_confidence = 0.0f32;
        let mut best = None;
        for o in self.observations.iter().filter(|o| o.is_scored()) {
            if o.detector_confidence > best_confidence {
                best_confidence = o.detector_confidence;
                best = Some(o.bbox);
            }
        }
        best.or_else(|| {
            self.observations
                .iter()
                .find(|o| o.is_scored())
                .map(|o| o.bbox)
        })
    }
}

pub(crate) fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Real,
    Fake,
}

impl Label {
    /// `Real` only when `score` is strictly above `threshold`.
    pub fn from_score(score: f64, threshold: f64) -> Self {
        if score > threshold {
            Label::Real
        } else {
            Label::Fake
        }
    }
}

/// The outcome of analysing one image or video.
///
/// A "unit" is a scored face for images and a contributing frame for videos.
/// Construction requires at least one unit; an upload with none is reported
/// as [`AnalysisError::NoFacesProcessed`](super::analysis_error::AnalysisError::NoFacesProcessed).
#[derive(Clone, Debug, PartialEq)]
pub struct AggregateResult {
    pub average_prediction: f64,
    pub average_face_confidence: f64,
    pub representative_box: Option<BoundingBox>,
    pub processed_unit_count: usize,
    /// `data:image/jpeg;base64,...` of the analysed frame.
    pub raw_preview: String,
    /// Same frame with every detected box drawn.
    pub annotated_preview: String,
}

impl AggregateResult {
    pub fn label(&self, threshold: f64) -> Label {
        Label::from_score(self.average_prediction, threshold)
    }
}
