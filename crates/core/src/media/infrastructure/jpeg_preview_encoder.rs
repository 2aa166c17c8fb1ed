use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};

use crate::media::domain::preview_encoder::PreviewEncoder;
use crate::shared::frame::Frame;
use crate::BoxError;

const DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// Encodes previews as base64 JPEG data URLs.
#[derive(Clone, Copy, Debug)]
pub struct JpegPreviewEncoder {
    quality: u8,
}

impl JpegPreviewEncoder {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }
}

impl PreviewEncoder for JpegPreviewEncoder {
    fn encode(&self, frame: &Frame) -> Result<String, BoxError> {
        if frame.is_empty() {
            return Err("cannot encode an empty frame".into());
        }
        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.quality).write_image(
            frame.data(),
            frame.width(),
            frame.height(),
            ExtendedColorType::Rgb8,
        )?;
        Ok(format!("{DATA_URL_PREFIX}{}", STANDARD.encode(&jpeg)))
    }
}
