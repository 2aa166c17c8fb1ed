//! Scripted collaborators for exercising the pipeline without models or codecs.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ndarray::ArrayView4;

use crate::classification::domain::face_classifier::FaceClassifier;
use crate::classification::domain::face_scorer::FaceScorer;
use crate::detection::domain::face_candidate_extractor::FaceCandidateExtractor;
use crate::detection::domain::face_detector::{FaceDetector, RawDetection};
use crate::media::domain::frame_decoder::FrameDecoder;
use crate::media::domain::preview_encoder::PreviewEncoder;
use crate::media::domain::video_reader::VideoReader;
use crate::pipeline::frame_analyzer::FrameAnalyzer;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::BoxError;

pub type Scripted<T> = Result<T, &'static str>;

/// Returns one scripted response per call, then no faces.
pub struct ScriptedDetector {
    script: Mutex<VecDeque<Scripted<Vec<RawDetection>>>>,
}

impl ScriptedDetector {
    pub fn new(script: Vec<Scripted<Vec<RawDetection>>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
        }
    }
}

impl FaceDetector for ScriptedDetector {
    fn detect(&self, _frame: &Frame) -> Result<Vec<RawDetection>, BoxError> {
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(dets)) => Ok(dets),
            Some(Err(e)) => Err(e.into()),
            None => Ok(Vec::new()),
        }
    }
}

/// Returns one scripted score per call; errors once the script runs out.
pub struct ScriptedClassifier {
    script: Mutex<VecDeque<Scripted<f32>>>,
}

impl ScriptedClassifier {
    pub fn new(script: Vec<Scripted<f32>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
        }
    }
}

impl FaceClassifier for ScriptedClassifier {
    fn predict(&self, _input: ArrayView4<'_, f32>) -> Result<f32, BoxError> {
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(score)) => Ok(score),
            Some(Err(e)) => Err(e.into()),
            None => Err("classifier script exhausted".into()),
        }
    }
}

pub fn analyzer(
    detections: Vec<Scripted<Vec<RawDetection>>>,
    classifier: ScriptedClassifier,
) -> FrameAnalyzer {
    FrameAnalyzer::new(
        FaceCandidateExtractor::new(Arc::new(ScriptedDetector::new(detections))),
        FaceScorer::new(Arc::new(classifier), 8),
    )
}

pub fn det(x: f32, y: f32, width: f32, height: f32, confidence: f32) -> RawDetection {
    RawDetection {
        x,
        y,
        width,
        height,
        confidence,
    }
}

pub fn solid_frame(width: u32, height: u32, index: usize) -> Frame {
    Frame::new(
        vec![90u8; (width * height) as usize * 3],
        width,
        height,
        index,
    )
}

/// Hands back a fixed frame, or fails like a corrupt upload.
pub struct StubDecoder(pub Option<Frame>);

impl FrameDecoder for StubDecoder {
    fn decode(&self, _bytes: &[u8]) -> Result<Frame, BoxError> {
        self.0.clone().ok_or_else(|| "not an image".into())
    }
}

/// Remembers every frame it encodes and returns `preview-<n>`.
#[derive(Default)]
pub struct RecordingEncoder {
    frames: Mutex<Vec<Frame>>,
}

impl RecordingEncoder {
    pub fn frames(&self) -> Vec<Frame> {
        self.frames.lock().unwrap().clone()
    }
}

impl PreviewEncoder for RecordingEncoder {
    fn encode(&self, frame: &Frame) -> Result<String, BoxError> {
        let mut frames = self.frames.lock().unwrap();
        frames.push(frame.clone());
        Ok(format!("preview-{}", frames.len() - 1))
    }
}

pub struct FailingEncoder;

impl PreviewEncoder for FailingEncoder {
    fn encode(&self, _frame: &Frame) -> Result<String, BoxError> {
        Err("encoder broke".into())
    }
}

/// Yields scripted frames and counts how often it is closed.
pub struct ScriptedReader {
    frames: Vec<Scripted<Frame>>,
    fail_open: bool,
    pub closes: Arc<AtomicUsize>,
}

impl ScriptedReader {
    pub fn new(frames: Vec<Scripted<Frame>>) -> Self {
        Self {
            frames,
            fail_open: false,
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing_open() -> Self {
        Self {
            fail_open: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl VideoReader for ScriptedReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, BoxError> {
        if self.fail_open {
            return Err("unsupported container".into());
        }
        Ok(VideoMetadata {
            width: 0,
            height: 0,
            fps: 30.0,
            total_frames: self.frames.len(),
            codec: "scripted".to_string(),
            source_path: Some(path.to_path_buf()),
            rotation: 0,
        })
    }

    fn frames(&mut self) -> Box<dyn Iterator<Item = Result<Frame, BoxError>> + '_> {
        Box::new(
            std::mem::take(&mut self.frames)
                .into_iter()
                .map(|f| f.map_err(|e| e.into())),
        )
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}
