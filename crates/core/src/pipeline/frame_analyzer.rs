use crate::classification::domain::face_scorer::FaceScorer;
use crate::detection::domain::face_candidate_extractor::{ExtractError, FaceCandidateExtractor};
use crate::media::domain::box_overlay::draw_boxes;
use crate::media::domain::preview_encoder::PreviewEncoder;
use crate::pipeline::analysis_error::AnalysisError;
use crate::pipeline::analysis_result::{FaceObservation, FrameResult};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Detects and scores every face on a single frame.
///
/// Shared by the image and video use cases. A face that fails to score is
/// kept with no score so it still shows up in the annotated preview.
#[derive(Clone)]
pub struct FrameAnalyzer {
    extractor: FaceCandidateExtractor,
    scorer: FaceScorer,
}

impl FrameAnalyzer {
    pub fn new(extractor: FaceCandidateExtractor, scorer: FaceScorer) -> Self {
        Self { extractor, scorer }
    }

    pub fn analyze(&self, frame: &Frame) -> Result<FrameResult, ExtractError> {
        let candidates = self.extractor.extract(frame)?;

        let observations: Vec<FaceObservation> = candidates
            .into_iter()
            .map(|candidate| {
                let classifier_score = match self.scorer.score(frame, &candidate.bbox) {
                    Ok(score) => {
                        log::debug!(
                            "Frame {}: face at {:?} confidence {:.4}, score {score:.4}",
                            frame.index(),
                            candidate.bbox.to_array(),
                            candidate.confidence
                        );
                        Some(score)
                    }
                    Err(e) => {
                        log::warn!(
                            "Frame {}: could not score face at {:?}: {e}",
                            frame.index(),
                            candidate.bbox.to_array()
                        );
                        None
                    }
                };
                FaceObservation {
                    bbox: candidate.bbox,
                    detector_confidence: candidate.confidence,
                    classifier_score,
                }
            })
            .collect();

        Ok(FrameResult {
            frame_index: frame.index(),
            observations,
        })
    }
}

/// Encodes the raw frame and a copy with `boxes` drawn, in that order.
pub(crate) fn render_previews(
    encoder: &dyn PreviewEncoder,
    frame: &Frame,
    boxes: &[BoundingBox],
) -> Result<(String, String), AnalysisError> {
    let raw = encoder.encode(frame).map_err(AnalysisError::Preview)?;
    let annotated = encoder
        .encode(&draw_boxes(frame, boxes))
        .map_err(AnalysisError::Preview)?;
    Ok((raw, annotated))
}
