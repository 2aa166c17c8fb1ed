use thiserror::Error;

use crate::BoxError;

/// Request-level outcomes that abort an analysis.
///
/// Per-face and per-frame failures never surface here; they are logged and
/// excluded from the aggregate.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("could not decode image: {0}")]
    Decode(#[source] BoxError),
    #[error("could not open video: {0}")]
    Open(#[source] BoxError),
    #[error("no faces could be detected and scored")]
    NoFacesProcessed,
    #[error("face detection failed: {0}")]
    Detection(#[source] BoxError),
    #[error("could not encode preview: {0}")]
    Preview(#[source] BoxError),
}

impl AnalysisError {
    /// Whether the failure is attributable to the uploaded file rather than
    /// to the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Decode(_) | Self::Open(_) | Self::NoFacesProcessed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(AnalysisError::Decode("bad".into()).is_client_error());
        assert!(AnalysisError::Open("bad".into()).is_client_error());
        assert!(AnalysisError::NoFacesProcessed.is_client_error());
        assert!(!AnalysisError::Detection("gpu".into()).is_client_error());
        assert!(!AnalysisError::Preview("jpeg".into()).is_client_error());
    }
}
