//! Box geometry shared by the detector adapters.

/// IoU between two bounding boxes represented as `[x1, y1, x2, y2]`.
pub fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }

    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}

/// Corners of an `(x, y, width, height)` box in the form [`bbox_iou`] takes.
pub fn corners(x: f32, y: f32, width: f32, height: f32) -> [f64; 4] {
    let (x, y) = (x as f64, y as f64);
    [x, y, x + width as f64, y + height as f64]
}
