use crate::shared::frame::Frame;
use crate::BoxError;

/// Encodes a frame as an inline `data:` URL for the response previews.
pub trait PreviewEncoder: Send + Sync {
    fn encode(&self, frame: &Frame) -> Result<String, BoxError>;
}
