use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::{
    CLASSIFIER_INPUT_SIZE, DEFAULT_FRAME_STRIDE, DEFAULT_NMS_THRESHOLD, DEFAULT_PREVIEW_QUALITY,
    DEFAULT_SCORE_THRESHOLD, DEFAULT_TOP_K, REAL_THRESHOLD,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    Invalid(String),
}

/// Face detector tuning. These trade recall against latency and false
/// positives, so they are configurable rather than fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    /// Minimum detector confidence for a candidate to be returned.
    pub score_threshold: f32,
    /// IoU above which the weaker of two overlapping candidates is dropped.
    pub nms_threshold: f32,
    /// Maximum number of candidates kept per frame.
    pub top_k: usize,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            nms_threshold: DEFAULT_NMS_THRESHOLD,
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// Everything the aggregation pipelines need besides the model handles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Only video frames whose index is a multiple of this are analysed.
    pub frame_stride: usize,
    pub detection: DetectionSettings,
    /// Side length of the square crop handed to the classifier.
    pub classifier_input_size: u32,
    /// Average scores strictly above this are labelled "real".
    pub real_threshold: f64,
    /// JPEG quality for the preview images.
    pub preview_quality: u8,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            frame_stride: DEFAULT_FRAME_STRIDE,
            detection: DetectionSettings::default(),
            classifier_input_size: CLASSIFIER_INPUT_SIZE,
            real_threshold: REAL_THRESHOLD,
            preview_quality: DEFAULT_PREVIEW_QUALITY,
        }
    }
}

impl AnalysisSettings {
    /// Loads settings from a JSON file; absent fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_stride == 0 {
            return Err(ConfigError::Invalid(
                "frame stride must be at least 1".to_string(),
            ));
        }
        let detection = &self.detection;
        if !(0.0..=1.0).contains(&detection.score_threshold) {
            return Err(ConfigError::Invalid(format!(
                "score threshold must be between 0.0 and 1.0, got {}",
                detection.score_threshold
            )));
        }
        if !(0.0..=1.0).contains(&detection.nms_threshold) {
            return Err(ConfigError::Invalid(format!(
                "NMS threshold must be between 0.0 and 1.0, got {}",
                detection.nms_threshold
            )));
        }
        if detection.top_k == 0 {
            return Err(ConfigError::Invalid("top-k must be at least 1".to_string()));
        }
        if self.classifier_input_size == 0 {
            return Err(ConfigError::Invalid(
                "classifier input size must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.real_threshold) {
            return Err(ConfigError::Invalid(format!(
                "real threshold must be between 0.0 and 1.0, got {}",
                self.real_threshold
            )));
        }
        if !(1..=100).contains(&self.preview_quality) {
            return Err(ConfigError::Invalid(format!(
                "preview quality must be between 1 and 100, got {}",
                self.preview_quality
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_defaults_match_service_constants() {
        let s = AnalysisSettings::default();
        assert_eq!(s.frame_stride, 5);
        assert_relative_eq!(s.detection.score_threshold, 0.4);
        assert_relative_eq!(s.detection.nms_threshold, 0.3);
        assert_eq!(s.detection.top_k, 5000);
        assert_eq!(s.classifier_input_size, 256);
        assert_relative_eq!(s.real_threshold, 0.5);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_load_partial_json_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"frame_stride": 10, "detection": {"top_k": 50}}"#).unwrap();

        let s = AnalysisSettings::load(&path).unwrap();
        assert_eq!(s.frame_stride, 10);
        assert_eq!(s.detection.top_k, 50);
        assert_relative_eq!(s.detection.score_threshold, 0.4);
        assert_eq!(s.preview_quality, 75);
    }

    #[test]
    fn test_load_missing_file() {
        let err = AnalysisSettings::load(Path::new("/nonexistent/settings.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        let err = AnalysisSettings::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"frame_stride": 0}"#).unwrap();
        let err = AnalysisSettings::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[rstest]
    #[case::score_above_one(|s: &mut AnalysisSettings| s.detection.score_threshold = 1.5)]
    #[case::negative_nms(|s: &mut AnalysisSettings| s.detection.nms_threshold = -0.1)]
    #[case::zero_top_k(|s: &mut AnalysisSettings| s.detection.top_k = 0)]
    #[case::zero_input(|s: &mut AnalysisSettings| s.classifier_input_size = 0)]
    #[case::threshold_above_one(|s: &mut AnalysisSettings| s.real_threshold = 2.0)]
    #[case::zero_quality(|s: &mut AnalysisSettings| s.preview_quality = 0)]
    #[case::quality_above_max(|s: &mut AnalysisSettings| s.preview_quality = 101)]
    fn test_validate_rejects(#[case] mutate: fn(&mut AnalysisSettings)) {
        let mut s = AnalysisSettings::default();
        mutate(&mut s);
        assert!(matches!(s.validate(), Err(ConfigError::Invalid(_))));
    }
}
