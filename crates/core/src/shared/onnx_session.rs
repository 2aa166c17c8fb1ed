use std::path::{Path, PathBuf};

use ort::session::Session;
use thiserror::Error;

use crate::BoxError;

/// Startup failures for the two inference models. Either one is fatal:
/// the service must not begin serving without both.
#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("face detector unavailable at {path}: {source}")]
    DetectorUnavailable {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
    #[error("deepfake classifier unavailable at {path}: {source}")]
    ClassifierUnavailable {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
}

/// Builds an ONNX Runtime session using the platform's accelerated
/// execution provider when one is compiled in, CPU otherwise.
pub fn load_session(model_path: &Path) -> Result<Session, BoxError> {
    let session = Session::builder()?
        .with_execution_providers(platform_execution_providers())?
        .commit_from_file(model_path)?;
    log::debug!(
        "Loaded ONNX session from {} ({} inputs, {} outputs)",
        model_path.display(),
        session.inputs().len(),
        session.outputs().len()
    );
    Ok(session)
}

/// Reads the declared dimensions of the session's first input, with
/// dynamic axes reported as `None`.
pub fn first_input_dims(session: &Session) -> Vec<Option<usize>> {
    session
        .inputs()
        .first()
        .and_then(|input| match input.dtype() {
            ort::value::ValueType::Tensor { shape, .. } => Some(
                shape
                    .iter()
                    .map(|&d| usize::try_from(d).ok().filter(|&d| d > 0))
                    .collect(),
            ),
            _ => None,
        })
        .unwrap_or_default()
}

fn platform_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}
