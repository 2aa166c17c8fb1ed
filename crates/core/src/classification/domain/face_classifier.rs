use ndarray::ArrayView4;

use crate::BoxError;

/// Domain interface for the deepfake classifier.
///
/// Takes a `[1, S, S, 3]` RGB tensor scaled to `[0, 1]` and returns the raw
/// score, where higher means more likely real.
pub trait FaceClassifier: Send + Sync {
    fn predict(&self, input: ArrayView4<'_, f32>) -> Result<f32, BoxError>;
}
