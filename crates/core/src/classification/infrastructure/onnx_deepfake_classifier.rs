use std::path::Path;
use std::sync::Mutex;

use ndarray::ArrayView4;
use ort::session::Session;

use crate::classification::domain::face_classifier::FaceClassifier;
use crate::shared::onnx_session::{first_input_dims, load_session};
use crate::BoxError;

/// Deepfake classifier exported to ONNX.
///
/// The domain hands over NHWC tensors. Exports that expect NCHW (channel
/// axis declared as 3 at position 1) get a permuted copy.
pub struct OnnxDeepfakeClassifier {
    session: Mutex<Session>,
    channels_first: bool,
}

impl OnnxDeepfakeClassifier {
    pub fn new(model_path: &Path) -> Result<Self, BoxError> {
        let session = load_session(model_path)?;
        let channels_first = is_channels_first(&first_input_dims(&session));
        log::info!(
            "Classifier input layout: {}",
            if channels_first { "NCHW" } else { "NHWC" }
        );
        Ok(Self {
            session: Mutex::new(session),
            channels_first,
        })
    }
}

impl FaceClassifier for OnnxDeepfakeClassifier {
    fn predict(&self, input: ArrayView4<'_, f32>) -> Result<f32, BoxError> {
        let tensor = if self.channels_first {
            input.permuted_axes([0, 3, 1, 2]).as_standard_layout().into_owned()
        } else {
            input.to_owned()
        };
        let input_value = ort::value::Tensor::from_array(tensor)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| "classifier session lock poisoned")?;
        let outputs = session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("classifier produced no outputs".into());
        }
        let scores = outputs[0].try_extract_array::<f32>()?;
        let score = scores
            .iter()
            .next()
            .copied()
            .ok_or("classifier output is empty")?;
        Ok(score)
    }
}

fn is_channels_first(dims: &[Option<usize>]) -> bool {
    matches!(dims, [_, Some(3), _, _]) && !matches!(dims, [_, _, _, Some(3)])
}
