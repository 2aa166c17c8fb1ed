use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::BoxError;

/// Reads frames from a video file.
///
/// Implementations handle I/O details (codec, container format, display
/// rotation) while the pipeline works with upright `Frame`s.
pub trait VideoReader: Send {
    /// Opens a video file and returns its metadata.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, BoxError>;

    /// Returns an iterator over frames in decode order, indexed from 0.
    fn frames(&mut self) -> Box<dyn Iterator<Item = Result<Frame, BoxError>> + '_>;

    /// Releases any resources held by the reader. Safe to call repeatedly.
    fn close(&mut self);
}
