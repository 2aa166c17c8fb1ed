use std::sync::Arc;

use crate::detection::domain::face_candidate_extractor::ExtractError;
use crate::media::domain::frame_decoder::FrameDecoder;
use crate::media::domain::preview_encoder::PreviewEncoder;
use crate::pipeline::analysis_error::AnalysisError;
use crate::pipeline::analysis_result::AggregateResult;
use crate::pipeline::frame_analyzer::{render_previews, FrameAnalyzer};

/// Scores every face in a still image and averages the results.
///
/// The image is decoded upright (EXIF orientation applied) before detection,
/// so boxes and previews share the corrected orientation.
#[derive(Clone)]
pub struct AnalyzeImageUseCase {
    analyzer: FrameAnalyzer,
    decoder: Arc<dyn FrameDecoder>,
    encoder: Arc<dyn PreviewEncoder>,
}

impl AnalyzeImageUseCase {
    pub fn new(
        analyzer: FrameAnalyzer,
        decoder: Arc<dyn FrameDecoder>,
        encoder: Arc<dyn PreviewEncoder>,
    ) -> Self {
        Self {
            analyzer,
            decoder,
            encoder,
        }
    }

    pub fn execute(&self, bytes: &[u8]) -> Result<AggregateResult, AnalysisError> {
        let frame = self.decoder.decode(bytes).map_err(AnalysisError::Decode)?;
        log::debug!("Decoded image {}x{}", frame.width(), frame.height());

        let result = self.analyzer.analyze(&frame).map_err(|e| match e {
            ExtractError::Detector(source) => AnalysisError::Detection(source),
            invalid @ ExtractError::InvalidFrame { .. } => AnalysisError::Decode(invalid.into()),
        })?;
        log::info!("Detected {} face candidate(s)", result.observations.len());

        let (Some(average_prediction), Some(average_face_confidence)) =
            (result.mean_score(), result.mean_confidence())
        else {
            log::warn!(
                "No faces were successfully scored ({} detected)",
                result.observations.len()
            );
            return Err(AnalysisError::NoFacesProcessed);
        };

        let scored = result.scored_count();
        let representative_box = result.representative_box();
        if representative_box.is_none() {
            log::warn!("Scored faces but no representative box; reporting an empty box");
        }
        log::info!(
            "Processed {scored} face(s). Avg score: {average_prediction:.4}, avg confidence: {average_face_confidence:.4}"
        );

        let (raw_preview, annotated_preview) =
            render_previews(self.encoder.as_ref(), &frame, &result.boxes())?;

        Ok(AggregateResult {
            average_prediction,
            average_face_confidence,
            representative_box,
            processed_unit_count: scored,
            raw_preview,
            annotated_preview,
        })
    }
}
