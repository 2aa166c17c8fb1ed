/// Integer face box `(x0, y0) → (x1, y1)` in the pixel space of the frame it
/// was detected on.
///
/// Boxes built through [`BoundingBox::clamped`] always satisfy `x1 > x0`,
/// `y1 > y0` and lie inside `[0, width-1] × [0, height-1]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl BoundingBox {
    /// Converts a detector box `(x, y, w, h)` into frame-clamped corners.
    ///
    /// Coordinates are truncated to integers before clamping. Returns `None`
    /// when the clamped box has no area, which covers boxes lying entirely
    /// outside the frame as well as degenerate ones.
    pub fn clamped(
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        frame_width: u32,
        frame_height: u32,
    ) -> Option<Self> {
        if frame_width == 0 || frame_height == 0 {
            return None;
        }
        if !(x.is_finite() && y.is_finite() && width.is_finite() && height.is_finite()) {
            return None;
        }

        let (x, y, w, h) = (x as i32, y as i32, width as i32, height as i32);
        let max_x = frame_width as i32 - 1;
        let max_y = frame_height as i32 - 1;

        let bbox = Self {
            x0: x.max(0),
            y0: y.max(0),
            x1: x.saturating_add(w).min(max_x),
            y1: y.saturating_add(h).min(max_y),
        };

        (bbox.width() > 0 && bbox.height() > 0).then_some(bbox)
    }

    pub fn width(&self) -> i32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> i32 {
        self.y1 - self.y0
    }

    pub fn to_array(&self) -> [i32; 4] {
        [self.x0, self.y0, self.x1, self.y1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn bbox(x0: i32, y0: i32, x1: i32, y1: i32) -> BoundingBox {
        BoundingBox { x0, y0, x1, y1 }
    }

    #[test]
    fn test_box_inside_frame_is_unchanged() {
        let b = BoundingBox::clamped(10.0, 20.0, 30.0, 40.0, 100, 100).unwrap();
        assert_eq!(b, bbox(10, 20, 40, 60));
        assert_eq!(b.width(), 30);
        assert_eq!(b.height(), 40);
    }

    #[test]
    fn test_box_overflowing_far_edge_is_clamped() {
        let b = BoundingBox::clamped(95.0, 95.0, 20.0, 20.0, 100, 100).unwrap();
        assert_eq!(b, bbox(95, 95, 99, 99));
    }

    #[test]
    fn test_box_with_negative_origin_is_clamped() {
        let b = BoundingBox::clamped(-10.0, -5.0, 30.0, 30.0, 100, 100).unwrap();
        assert_eq!(b, bbox(0, 0, 20, 25));
    }

    #[test]
    fn test_fractional_coordinates_truncate() {
        let b = BoundingBox::clamped(10.9, 20.7, 30.9, 40.2, 100, 100).unwrap();
        assert_eq!(b, bbox(10, 20, 40, 60));
    }

    #[rstest]
    #[case::zero_width(10.0, 10.0, 0.0, 20.0)]
    #[case::zero_height(10.0, 10.0, 20.0, 0.0)]
    #[case::negative_width(10.0, 10.0, -5.0, 20.0)]
    #[case::past_right_edge(120.0, 10.0, 20.0, 20.0)]
    #[case::past_bottom_edge(10.0, 120.0, 20.0, 20.0)]
    #[case::on_last_column(99.0, 10.0, 20.0, 20.0)]
    #[case::entirely_left(-50.0, 10.0, 20.0, 20.0)]
    #[case::nan(f32::NAN, 10.0, 20.0, 20.0)]
    fn test_degenerate_boxes_are_discarded(
        #[case] x: f32,
        #[case] y: f32,
        #[case] w: f32,
        #[case] h: f32,
    ) {
        assert_eq!(BoundingBox::clamped(x, y, w, h, 100, 100), None);
    }

    #[test]
    fn test_empty_frame_yields_no_box() {
        assert_eq!(BoundingBox::clamped(0.0, 0.0, 10.0, 10.0, 0, 100), None);
    }

    #[test]
    fn test_to_array_order() {
        assert_eq!(bbox(1, 2, 3, 4).to_array(), [1, 2, 3, 4]);
    }
}
