use serde::Serialize;

/// Face box in pixel coordinates: `(start_x, start_y)` is the top-left
/// corner and `(end_x, end_y)` the bottom-right one.
///
/// Boxes built through [`BoundingBox::from_normalized`] or
/// [`BoundingBox::clamped`] always lie inside `[0, W-1] x [0, H-1]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct BoundingBox {
    pub start_x: i32,
    pub start_y: i32,
    pub end_x: i32,
    pub end_y: i32,
}

impl BoundingBox {
    pub fn new(start_x: i32, start_y: i32, end_x: i32, end_y: i32) -> Self {
        Self {
            start_x,
            start_y,
            end_x,
            end_y,
        }
    }

    /// Scales `[0,1]`-normalized detector coordinates to the frame and
    /// clamps the result to the frame bounds.
    ///
    /// Scaled values are truncated toward zero before clamping.
    pub fn from_normalized(
        nx1: f32,
        ny1: f32,
        nx2: f32,
        ny2: f32,
        frame_width: u32,
        frame_height: u32,
    ) -> Self {
        let w = frame_width as f64;
        let h = frame_height as f64;
        Self::new(
            (nx1 as f64 * w) as i32,
            (ny1 as f64 * h) as i32,
            (nx2 as f64 * w) as i32,
            (ny2 as f64 * h) as i32,
        )
        .clamped(frame_width, frame_height)
    }

    /// Clamps every coordinate into `[0, W-1] x [0, H-1]`.
    pub fn clamped(&self, frame_width: u32, frame_height: u32) -> Self {
        let max_x = (frame_width as i32 - 1).max(0);
        let max_y = (frame_height as i32 - 1).max(0);
        Self {
            start_x: self.start_x.clamp(0, max_x),
            start_y: self.start_y.clamp(0, max_y),
            end_x: self.end_x.clamp(0, max_x),
            end_y: self.end_y.clamp(0, max_y),
        }
    }

    pub fn width(&self) -> i32 {
        (self.end_x - self.start_x).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.end_y - self.start_y).max(0)
    }

    /// True when the box covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn is_within(&self, frame_width: u32, frame_height: u32) -> bool {
        *self == self.clamped(frame_width, frame_height)
    }
}
