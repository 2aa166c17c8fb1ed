pub const YUNET_MODEL_NAME: &str = "face_detection_yunet_2023mar.onnx";
pub const YUNET_MODEL_URL: &str =
    "https://github.com/opencv/opencv_zoo/raw/main/models/face_detection_yunet/face_detection_yunet_2023mar.onnx";

/// Exported from the Keras deepfake classifier; not published, so it must
/// be supplied locally.
pub const CLASSIFIER_MODEL_NAME: &str = "deepfake_classifier.onnx";

pub const DEFAULT_FRAME_STRIDE: usize = 5;
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.4;
pub const DEFAULT_NMS_THRESHOLD: f32 = 0.3;
pub const DEFAULT_TOP_K: usize = 5000;

/// Side length of the square face crop the classifier expects.
pub const CLASSIFIER_INPUT_SIZE: u32 = 256;

/// Scores strictly above this are labelled "real".
pub const REAL_THRESHOLD: f64 = 0.5;

pub const DEFAULT_PREVIEW_QUALITY: u8 = 75;
