use std::io::Cursor;

use image::{DynamicImage, ImageDecoder, ImageReader};

use crate::media::domain::frame_decoder::FrameDecoder;
use crate::shared::frame::Frame;
use crate::BoxError;

/// Decodes any format the `image` crate recognises and applies the EXIF
/// orientation, so phone photos come out upright.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExifFrameDecoder;

impl FrameDecoder for ExifFrameDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Frame, BoxError> {
        let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
        let mut decoder = reader.into_decoder()?;
        let orientation = decoder.orientation()?;
        let mut image = DynamicImage::from_decoder(decoder)?;
        image.apply_orientation(orientation);

        let frame = Frame::from_rgb_image(image.into_rgb8(), 0);
        if frame.is_empty() {
            return Err("decoded image has no pixels".into());
        }
        Ok(frame)
    }
}
