use std::path::Path;
use std::sync::Arc;

use crate::media::domain::preview_encoder::PreviewEncoder;
use crate::media::domain::video_reader::VideoReader;
use crate::pipeline::analysis_error::AnalysisError;
use crate::pipeline::analysis_result::{mean, AggregateResult, FrameResult};
use crate::pipeline::frame_analyzer::{render_previews, FrameAnalyzer};
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::BoxError;

/// Samples every `frame_stride`-th frame of a video and averages the
/// per-frame results.
///
/// The overall score is a mean of per-frame means, so a frame with many
/// faces weighs the same as a frame with one. The first frame that yields a
/// scored face is kept for the previews.
#[derive(Clone)]
pub struct AnalyzeVideoUseCase {
    analyzer: FrameAnalyzer,
    encoder: Arc<dyn PreviewEncoder>,
    frame_stride: usize,
}

impl AnalyzeVideoUseCase {
    pub fn new(
        analyzer: FrameAnalyzer,
        encoder: Arc<dyn PreviewEncoder>,
        frame_stride: usize,
    ) -> Self {
        Self {
            analyzer,
            encoder,
            frame_stride: frame_stride.max(1),
        }
    }

    /// Analyses the video at `path`. `reader` is closed before this returns,
    /// whatever the outcome.
    pub fn execute(
        &self,
        reader: &mut dyn VideoReader,
        path: &Path,
    ) -> Result<AggregateResult, AnalysisError> {
        let (mut session, metadata) =
            ReaderSession::open(reader, path).map_err(AnalysisError::Open)?;
        let (width, height) = metadata.display_size();
        log::info!(
            "Analysing {} ({width}x{height}, ~{} frames, every {} frame(s))",
            path.display(),
            metadata.total_frames,
            self.frame_stride
        );

        let mut score_means = Vec::new();
        let mut confidence_means = Vec::new();
        let mut first: Option<(Frame, FrameResult)> = None;

        for item in session.frames() {
            let frame = match item {
                Ok(frame) => frame,
                Err(e) => {
                    log::warn!("Skipping undecodable frame: {e}");
                    continue;
                }
            };
            if frame.index() % self.frame_stride != 0 {
                continue;
            }

            let result = match self.analyzer.analyze(&frame) {
                Ok(result) => result,
                Err(e) => {
                    log::warn!("Skipping frame {}: {e}", frame.index());
                    continue;
                }
            };

            let (Some(score), Some(confidence)) = (result.mean_score(), result.mean_confidence())
            else {
                continue;
            };
            log::debug!(
                "Frame {}: {} scored face(s), mean score {score:.4}",
                frame.index(),
                result.scored_count()
            );
            score_means.push(score);
            confidence_means.push(confidence);
            if first.is_none() {
                log::info!(
                    "Frame {} is the first with scored faces; keeping it for previews",
                    frame.index()
                );
                first = Some((frame, result));
            }
        }
        drop(session);

        let (Some(average_prediction), Some(average_face_confidence)) = (
            mean(score_means.iter().copied()),
            mean(confidence_means.iter().copied()),
        ) else {
            log::warn!("No frames with scorable faces in {}", path.display());
            return Err(AnalysisError::NoFacesProcessed);
        };
        let Some((frame, result)) = first else {
            return Err(AnalysisError::NoFacesProcessed);
        };

        log::info!(
            "Processed {} frame(s). Avg score: {average_prediction:.4}, avg confidence: {average_face_confidence:.4}",
            score_means.len()
        );

        let (raw_preview, annotated_preview) =
            render_previews(self.encoder.as_ref(), &frame, &result.boxes())?;

        Ok(AggregateResult {
            average_prediction,
            average_face_confidence,
            representative_box: result.representative_box(),
            processed_unit_count: score_means.len(),
            raw_preview,
            annotated_preview,
        })
    }
}

/// Borrows an opened reader and closes it when dropped.
struct ReaderSession<'a> {
    reader: &'a mut dyn VideoReader,
}

impl<'a> ReaderSession<'a> {
    fn open(
        reader: &'a mut dyn VideoReader,
        path: &Path,
    ) -> Result<(Self, VideoMetadata), BoxError> {
        let mut session = Self { reader };
        let metadata = session.reader.open(path)?;
        Ok((session, metadata))
    }

    fn frames(&mut self) -> Box<dyn Iterator<Item = Result<Frame, BoxError>> + '_> {
        self.reader.frames()
    }
}

impl Drop for ReaderSession<'_> {
    fn drop(&mut self) {
        self.reader.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_detector::RawDetection;
    use crate::media::infrastructure::ffmpeg_reader::{create_test_video, FfmpegReader};
    use crate::pipeline::test_support::{
        analyzer, det, solid_frame, FailingEncoder, RecordingEncoder, Scripted,
        ScriptedClassifier, ScriptedReader,
    };
    use approx::assert_relative_eq;

    fn use_case(
        detections: Vec<Scripted<Vec<RawDetection>>>,
        scores: Vec<Scripted<f32>>,
        stride: usize,
    ) -> (AnalyzeVideoUseCase, Arc<RecordingEncoder>) {
        let encoder = Arc::new(RecordingEncoder::default());
        let uc = AnalyzeVideoUseCase::new(
            analyzer(detections, ScriptedClassifier::new(scores)),
            encoder.clone(),
            stride,
        );
        (uc, encoder)
    }

    fn frames(count: usize) -> Vec<Scripted<Frame>> {
        (0..count).map(|i| Ok(solid_frame(64, 64, i))).collect()
    }

    fn face(x: f32, confidence: f32) -> RawDetection {
        det(x, 10.0, 10.0, 10.0, confidence)
    }

    #[test]
    fn test_mean_of_frame_means() {
        // Sampled frames 0 and 5: {0.1, 0.9} and {0.4}.
        let (uc, _) = use_case(
            vec![
                Ok(vec![face(0.0, 0.8), face(20.0, 0.6)]),
                Ok(vec![face(0.0, 0.5)]),
            ],
            vec![Ok(0.1), Ok(0.9), Ok(0.4)],
            5,
        );
        let mut reader = ScriptedReader::new(frames(10));
        let result = uc.execute(&mut reader, Path::new("clip.mp4")).unwrap();

        assert_relative_eq!(result.average_prediction, 0.45, epsilon = 1e-6);
        assert_relative_eq!(result.average_face_confidence, 0.6, epsilon = 1e-6);
        assert_eq!(result.processed_unit_count, 2);
        assert_eq!(reader.close_count(), 1);
    }

    #[test]
    fn test_only_every_stride_frame_is_analysed() {
        // 12 frames at stride 5 → frames 0, 5 and 10 reach the detector.
        let (uc, _) = use_case(
            vec![
                Ok(vec![face(0.0, 0.9)]),
                Ok(vec![face(0.0, 0.9)]),
                Ok(vec![face(0.0, 0.9)]),
                Ok(vec![face(0.0, 0.9)]),
            ],
            vec![Ok(0.2), Ok(0.4), Ok(0.6), Ok(1.0)],
            5,
        );
        let mut reader = ScriptedReader::new(frames(12));
        let result = uc.execute(&mut reader, Path::new("clip.mp4")).unwrap();

        assert_eq!(result.processed_unit_count, 3);
        assert_relative_eq!(result.average_prediction, 0.4, epsilon = 1e-6);
    }

    #[test]
    fn test_first_contributing_frame_is_previewed() {
        // Frame 0 has no faces, frame 2 contributes, frame 4 contributes too.
        let (uc, encoder) = use_case(
            vec![
                Ok(Vec::new()),
                Ok(vec![face(5.0, 0.7), face(30.0, 0.2)]),
                Ok(vec![face(40.0, 0.9)]),
            ],
            vec![Err("blurry"), Ok(0.3), Ok(0.9)],
            2,
        );
        let mut reader = ScriptedReader::new(frames(5));
        let result = uc.execute(&mut reader, Path::new("clip.mp4")).unwrap();

        let previews = encoder.frames();
        assert_eq!(previews.len(), 2);
        assert_eq!(previews[0].index(), 2);
        // Unscored box at x=5 is still drawn on the retained frame.
        let annotated = previews[1].to_rgb_image().unwrap();
        assert_eq!(annotated.get_pixel(5, 10).0, [0, 255, 0]);
        assert_eq!(annotated.get_pixel(30, 10).0, [0, 255, 0]);
        assert_eq!(result.representative_box.unwrap().to_array(), [30, 10, 40, 20]);
        assert_eq!(result.processed_unit_count, 2);
    }

    #[test]
    fn test_no_faces_in_any_frame() {
        let (uc, encoder) = use_case(vec![], vec![], 5);
        let mut reader = ScriptedReader::new(frames(11));
        let err = uc.execute(&mut reader, Path::new("clip.mp4")).unwrap_err();

        assert!(matches!(err, AnalysisError::NoFacesProcessed));
        assert!(encoder.frames().is_empty());
        assert_eq!(reader.close_count(), 1);
    }

    #[test]
    fn test_empty_video_is_no_faces_processed() {
        let (uc, _) = use_case(vec![], vec![], 5);
        let mut reader = ScriptedReader::new(Vec::new());
        assert!(matches!(
            uc.execute(&mut reader, Path::new("clip.mp4")).unwrap_err(),
            AnalysisError::NoFacesProcessed
        ));
    }

    #[test]
    fn test_bad_frames_are_skipped() {
        // Frame 0 fails to decode, frame 1 is empty, frame 2 fails detection.
        let (uc, _) = use_case(
            vec![Err("detector hiccup"), Ok(vec![face(0.0, 0.9)])],
            vec![Ok(0.8)],
            1,
        );
        let mut reader = ScriptedReader::new(vec![
            Err("corrupt packet"),
            Ok(Frame::new(Vec::new(), 0, 0, 1)),
            Ok(solid_frame(32, 32, 2)),
            Ok(solid_frame(32, 32, 3)),
        ]);
        let result = uc.execute(&mut reader, Path::new("clip.mp4")).unwrap();

        assert_eq!(result.processed_unit_count, 1);
        assert_relative_eq!(result.average_prediction, 0.8, epsilon = 1e-6);
    }

    #[test]
    fn test_open_failure_still_closes_reader() {
        let (uc, _) = use_case(vec![], vec![], 5);
        let mut reader = ScriptedReader::failing_open();
        let err = uc.execute(&mut reader, Path::new("clip.mov")).unwrap_err();

        assert!(matches!(err, AnalysisError::Open(_)));
        assert_eq!(reader.close_count(), 1);
    }

    #[test]
    fn test_preview_failure_closes_reader_first() {
        let uc = AnalyzeVideoUseCase::new(
            analyzer(
                vec![Ok(vec![face(0.0, 0.9)])],
                ScriptedClassifier::new(vec![Ok(0.6)]),
            ),
            Arc::new(FailingEncoder),
            5,
        );
        let mut reader = ScriptedReader::new(frames(3));
        let err = uc.execute(&mut reader, Path::new("clip.mp4")).unwrap_err();

        assert!(matches!(err, AnalysisError::Preview(_)));
        assert_eq!(reader.close_count(), 1);
    }

    #[test]
    fn test_zero_stride_is_treated_as_one() {
        let (uc, _) = use_case(
            vec![Ok(vec![face(0.0, 0.9)]), Ok(vec![face(0.0, 0.9)])],
            vec![Ok(0.2), Ok(0.4)],
            0,
        );
        let mut reader = ScriptedReader::new(frames(2));
        let result = uc.execute(&mut reader, Path::new("clip.mp4")).unwrap();
        assert_eq!(result.processed_unit_count, 2);
    }

    #[test]
    fn test_decodes_real_video_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        create_test_video(&path, 11, 64, 48, 25);

        let detections = (0..3).map(|_| Ok(vec![face(0.0, 0.9)])).collect();
        let (uc, encoder) = use_case(detections, vec![Ok(0.6), Ok(0.6), Ok(0.6)], 5);
        let mut reader = FfmpegReader::new();
        let result = uc.execute(&mut reader, &path).unwrap();

        assert_eq!(result.processed_unit_count, 3);
        let preview = &encoder.frames()[0];
        assert_eq!((preview.width(), preview.height()), (64, 48));
        assert_eq!(preview.index(), 0);
    }
}
