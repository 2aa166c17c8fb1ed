use image::Rgb;
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const BOX_THICKNESS: i32 = 2;

/// Returns a copy of `frame` with a green outline drawn for every box.
///
/// Corners are inclusive and the stroke grows inwards, so a box touching
/// the frame edge stays fully visible.
pub fn draw_boxes(frame: &Frame, boxes: &[BoundingBox]) -> Frame {
    let Some(mut canvas) = frame.to_rgb_image() else {
        return frame.clone();
    };

    for bbox in boxes {
        for inset in 0..BOX_THICKNESS {
            let w = bbox.width() + 1 - 2 * inset;
            let h = bbox.height() + 1 - 2 * inset;
            if w <= 0 || h <= 0 {
                break;
            }
            let rect = Rect::at(bbox.x0 + inset, bbox.y0 + inset).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(&mut canvas, rect, BOX_COLOR);
        }
    }

    Frame::from_rgb_image(canvas, frame.index())
}
