use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Container's frame count estimate; 0 when unknown.
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
    /// Clockwise display rotation in degrees: 0, 90, 180 or 270.
    pub rotation: i32,
}

impl VideoMetadata {
    /// Frame dimensions after the display rotation is applied.
    pub fn display_size(&self) -> (u32, u32) {
        match self.rotation {
            90 | 270 => (self.height, self.width),
            _ => (self.width, self.height),
        }
    }
}
