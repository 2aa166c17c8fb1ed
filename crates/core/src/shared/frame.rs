use image::RgbImage;
use ndarray::ArrayView3;

use crate::shared::bounding_box::BoundingBox;

/// A decoded still image or video frame: contiguous RGB bytes in row-major order.
///
/// Channel-order conversion for the models happens inside the detector and
/// scorer adapters; everything else treats pixel data as RGB.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    index: usize,
}

pub const CHANNELS: usize = 3;

impl Frame {
    /// Buffers of the wrong length are a caller bug: they panic in debug
    /// builds and are zero-padded or truncated in release builds.
    pub fn new(mut data: Vec<u8>, width: u32, height: u32, index: usize) -> Self {
        let expected = (width as usize) * (height as usize) * CHANNELS;
        debug_assert_eq!(
            data.len(),
            expected,
            "data length must equal width * height * 3"
        );
        data.resize(expected, 0);
        Self {
            data,
            width,
            height,
            index,
        }
    }

    pub fn from_rgb_image(image: RgbImage, index: usize) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, index)
    }

    /// Copies the pixels into an `image` buffer for codec and drawing work.
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Position in the source stream; always 0 for still images.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Copies the half-open pixel range `[x0, x1) × [y0, y1)` of `bbox`.
    ///
    /// The box's far edge is exclusive, so a box touching the last
    /// row/column yields a crop one pixel short of it.
    pub fn crop(&self, bbox: &BoundingBox) -> Frame {
        let x0 = (bbox.x0.max(0) as u32).min(self.width) as usize;
        let y0 = (bbox.y0.max(0) as u32).min(self.height) as usize;
        let x1 = (bbox.x1.max(0) as u32).min(self.width) as usize;
        let y1 = (bbox.y1.max(0) as u32).min(self.height) as usize;
        let crop_w = x1.saturating_sub(x0);
        let crop_h = y1.saturating_sub(y0);

        let row_bytes = self.width as usize * CHANNELS;
        let mut data = Vec::with_capacity(crop_w * crop_h * CHANNELS);
        for row in y0..y0 + crop_h {
            let start = row * row_bytes + x0 * CHANNELS;
            data.extend_from_slice(&self.data[start..start + crop_w * CHANNELS]);
        }

        Frame::new(data, crop_w as u32, crop_h as u32, self.index)
    }

    /// Rotates clockwise by 90, 180 or 270 degrees; other angles are a no-op.
    pub fn rotated(self, degrees: i32) -> Frame {
        if !matches!(degrees, 90 | 180 | 270) {
            return self;
        }
        let index = self.index;
        let (width, height) = (self.width, self.height);
        let Some(image) = RgbImage::from_raw(width, height, self.data) else {
            // Frame::new keeps the buffer length consistent
            return Frame::new(Vec::new(), 0, 0, index);
        };
        let rotated = match degrees {
            90 => image::imageops::rotate90(&image),
            180 => image::imageops::rotate180(&image),
            _ => image::imageops::rotate270(&image),
        };
        Frame::from_rgb_image(rotated, index)
    }

    fn shape(&self) -> (usize, usize, usize) {
        (self.height as usize, self.width as usize, CHANNELS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> Frame {
        let mut data = Vec::with_capacity((width * height) as usize * CHANNELS);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[x as u8, y as u8, 0]);
            }
        }
        Frame::new(data, width, height, 0)
    }

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.data(), &data[..]);
        assert!(!frame.is_empty());
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * 3")]
    fn test_mismatched_data_length_panics_in_debug() {
        Frame::new(vec![0u8; 10], 2, 2, 0);
    }

    #[test]
    fn test_zero_dimension_frame_is_empty() {
        assert!(Frame::new(Vec::new(), 0, 4, 0).is_empty());
        assert!(Frame::new(Vec::new(), 4, 0, 0).is_empty());
    }

    #[test]
    fn test_as_ndarray_pixel_access() {
        let frame = gradient(4, 3);
        let arr = frame.as_ndarray();
        assert_eq!(arr.shape(), &[3, 4, 3]);
        assert_eq!(arr[[2, 1, 0]], 1); // x
        assert_eq!(arr[[2, 1, 1]], 2); // y
    }

    #[test]
    fn test_crop_excludes_far_edge() {
        let frame = gradient(10, 10);
        let bbox = BoundingBox {
            x0: 2,
            y0: 3,
            x1: 6,
            y1: 8,
        };
        let crop = frame.crop(&bbox);
        assert_eq!(crop.width(), 4);
        assert_eq!(crop.height(), 5);
        let arr = crop.as_ndarray();
        assert_eq!(arr[[0, 0, 0]], 2);
        assert_eq!(arr[[0, 0, 1]], 3);
        assert_eq!(arr[[4, 3, 0]], 5);
        assert_eq!(arr[[4, 3, 1]], 7);
    }

    #[test]
    fn test_crop_outside_frame_is_empty() {
        let frame = gradient(10, 10);
        let bbox = BoundingBox {
            x0: 12,
            y0: 12,
            x1: 20,
            y1: 20,
        };
        assert!(frame.crop(&bbox).is_empty());
    }

    #[test]
    fn test_rgb_image_roundtrip_keeps_pixels() {
        let frame = gradient(5, 4);
        let image = frame.to_rgb_image().unwrap();
        assert_eq!(image.get_pixel(3, 2).0, [3, 2, 0]);
        assert_eq!(Frame::from_rgb_image(image, 0), frame);
    }

    #[test]
    fn test_rotated_90_swaps_dimensions() {
        let frame = gradient(6, 4);
        let rotated = frame.rotated(90);
        assert_eq!(rotated.width(), 4);
        assert_eq!(rotated.height(), 6);
        // top-left of the rotated frame was the bottom-left of the source
        assert_eq!(&rotated.data()[..3], &[0, 3, 0]);
    }

    #[test]
    fn test_rotated_180_and_270() {
        let frame = gradient(6, 4);
        let flipped = frame.clone().rotated(180);
        assert_eq!((flipped.width(), flipped.height()), (6, 4));
        assert_eq!(&flipped.data()[..3], &[5, 3, 0]);

        let turned = frame.rotated(270);
        assert_eq!((turned.width(), turned.height()), (4, 6));
        // top-left of a counter-clockwise turn was the top-right of the source
        assert_eq!(&turned.data()[..3], &[5, 0, 0]);
    }

    #[test]
    fn test_rotated_zero_keeps_the_same_buffer() {
        let frame = gradient(6, 4);
        let ptr = frame.data().as_ptr();
        assert_eq!(frame.rotated(0).data().as_ptr(), ptr);
    }

    #[test]
    fn test_rotated_unknown_angle_is_noop() {
        let frame = gradient(6, 4);
        assert_eq!(frame.clone().rotated(45), frame);
        assert_eq!(frame.clone().rotated(0), frame);
    }
}
