/// One detector output: normalized box center and size plus confidence.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionRecord {
    /// Position in the detection stream; identifies the event in sample tables.
    pub id: usize,
    /// Frame number the detection belongs to (1-based, matches stack indices).
    pub frame: u32,
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
    pub confidence: f64,
}

/// A detection mapped onto a stack grid of a given size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelBox {
    pub col: i64,
    pub row: i64,
    pub width: i64,
    pub height: i64,
}

impl DetectionRecord {
    /// Map normalized coordinates onto a `height × width` grid.
    ///
    /// Centers are floored, box sizes truncated.
    pub fn to_pixels(&self, height: usize, width: usize) -> PixelBox {
        PixelBox {
            col: (self.x_center * width as f64).floor() as i64,
            row: (self.y_center * height as f64).floor() as i64,
            width: (self.width * width as f64).trunc().max(0.0) as i64,
            height: (self.height * height as f64).trunc().max(0.0) as i64,
        }
    }
}

impl PixelBox {
    pub fn is_inside(&self, height: usize, width: usize) -> bool {
        (0..width as i64).contains(&self.col) && (0..height as i64).contains(&self.row)
    }

    /// Sampling radius for a box scaled by `scale`.
    pub fn roi_radius(&self, scale: f64) -> usize {
        (self.width.max(self.height) as f64 * scale).round().max(0.0) as usize
    }
}
