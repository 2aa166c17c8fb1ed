use crate::shared::frame::Frame;
use crate::BoxError;

/// Turns uploaded image bytes into an upright RGB [`Frame`].
pub trait FrameDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Frame, BoxError>;
}
